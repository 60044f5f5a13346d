use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use tracing::{debug, error};

pub const DEFAULT_THRESHOLD: f32 = 0.7;
pub const DEFAULT_PADDING: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory searched for the ONNX model files.
    pub model_dir: PathBuf,
    /// Hugging Face repo used when a model is not present locally.
    pub model_repo: Option<String>,
    pub face_model: String,
    pub age_model: String,
    pub gender_model: String,
    /// Detections at or below this confidence are discarded.
    pub confidence_threshold: f32,
    /// Margin in pixels added around every face box before cropping.
    pub padding: u32,
    pub bind: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model_repo: None,
            face_model: "opencv_face_detector.onnx".to_string(),
            age_model: "age_net.onnx".to_string(),
            gender_model: "gender_net.onnx".to_string(),
            confidence_threshold: DEFAULT_THRESHOLD,
            padding: DEFAULT_PADDING,
            bind: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

pub fn config_path() -> PathBuf {
    env::var_os("AGE_GENDER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("age-gender.json"))
}

/// Loads the config file, falling back to defaults, then applies env overrides.
pub fn load_config() -> Config {
    let path = config_path();
    let mut cfg = match fs::read(&path) {
        Ok(data) => match serde_json::from_slice(&data) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(path = %path.display(), "ignoring malformed config: {e}");
                Config::default()
            }
        },
        Err(_) => {
            debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        }
    };
    if let Some(dir) = env::var_os("AGE_GENDER_MODEL_DIR") {
        cfg.model_dir = PathBuf::from(dir);
    }
    if let Ok(repo) = env::var("AGE_GENDER_MODEL_REPO") {
        if !repo.is_empty() {
            cfg.model_repo = Some(repo);
        }
    }
    cfg
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::from)?;
    fs::write(&path, data)?;
    Ok(())
}
