use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to fetch {file} from {repo}: {reason}")]
    ModelFetch {
        file: String,
        repo: String,
        reason: String,
    },

    #[error("failed to load model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    #[error("model {0} has no graph")]
    MissingGraph(PathBuf),

    #[error("model {0} declares no inputs")]
    MissingInput(PathBuf),

    #[error("model output {0} missing")]
    MissingOutput(String),

    #[error("unexpected output shape {dims:?}: {reason}")]
    OutputShape { dims: Vec<usize>, reason: String },

    #[error("inference failed: {0}")]
    Inference(#[from] candle_core::Error),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;
