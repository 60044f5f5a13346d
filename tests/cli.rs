mod common;

use age_gender::{execute, report_faces, Cli, Commands, Config, Error, ModelArgs, Outcome, USAGE};
use clap::Parser;
use common::{photo, pipeline, row, write_png};
use proptest::prelude::*;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::tempdir;

const MALE_INFANT: ([f32; 8], [f32; 2]) = ([0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1], [0.6, 0.4]);

fn run(cli: Cli) -> (age_gender::Result<Outcome>, String) {
    let mut out = Vec::new();
    let result = execute(cli, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn isolate_config(dir: &std::path::Path) {
    std::env::set_var("AGE_GENDER_CONFIG", dir.join("config.json"));
    std::env::set_var("AGE_GENDER_MODEL_DIR", dir.join("models"));
    std::env::remove_var("AGE_GENDER_MODEL_REPO");
}

proptest! {
    #[test]
    fn parse_threshold_in_range(value in 0.0f32..=1.0) {
        let args = ["age-gender", "--threshold", &value.to_string(), "photo.jpg"];
        let cli = Cli::parse_from(args);
        prop_assert_eq!(cli.model.threshold, Some(value));
        prop_assert_eq!(cli.image, Some(PathBuf::from("photo.jpg")));
    }

    #[test]
    fn reject_threshold_out_of_range(value in 1.0001f32..100.0) {
        let args = ["age-gender", "--threshold", &value.to_string(), "photo.jpg"];
        prop_assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn parse_serve_bind(port in 1u16..u16::MAX) {
        let addr = format!("0.0.0.0:{port}");
        let args = ["age-gender", "serve", "--bind", &addr, "--models", "nets"];
        let cli = Cli::parse_from(args);
        match cli.command {
            Some(Commands::Serve { bind, model }) => {
                prop_assert_eq!(bind, Some(addr));
                prop_assert_eq!(model.models, Some(PathBuf::from("nets")));
            }
            _ => prop_assert!(false, "unexpected subcommand"),
        }
    }
}

#[test]
fn parse_image_only() {
    let cli = Cli::parse_from(["age-gender", "group.png"]);
    assert_eq!(cli.image, Some(PathBuf::from("group.png")));
    assert!(cli.command.is_none());
    assert!(cli.model.models.is_none());
}

#[test]
#[serial]
fn no_argument_prints_usage() {
    let dir = tempdir().unwrap();
    isolate_config(dir.path());
    let cli = Cli::parse_from(["age-gender"]);
    let (result, out) = run(cli);
    assert_eq!(result.unwrap(), Outcome::Usage);
    assert_eq!(out, format!("{USAGE}\n"));
}

#[test]
#[serial]
fn missing_image_is_reported() {
    let dir = tempdir().unwrap();
    isolate_config(dir.path());
    let missing = dir.path().join("nope.jpg");
    let cli = Cli {
        image: Some(missing.clone()),
        model: ModelArgs::default(),
        command: None,
    };
    let (result, out) = run(cli);
    assert_eq!(result.unwrap(), Outcome::ImageNotFound);
    assert_eq!(out, format!("Image not found: {}\n", missing.display()));
}

#[test]
#[serial]
fn undecodable_image_is_reported() {
    let dir = tempdir().unwrap();
    isolate_config(dir.path());
    let bogus = dir.path().join("bogus.png");
    std::fs::write(&bogus, b"not an image").unwrap();
    let cli = Cli::parse_from(["age-gender".into(), bogus.clone().into_os_string()]);
    let (result, out) = run(cli);
    assert_eq!(result.unwrap(), Outcome::ImageNotFound);
    assert!(out.starts_with("Image not found"));
}

#[test]
#[serial]
fn readable_image_without_models_fails_to_load() {
    let dir = tempdir().unwrap();
    isolate_config(dir.path());
    let img = write_png(dir.path(), "face.png", 32, 32);
    let cli = Cli::parse_from(["age-gender".into(), img.into_os_string()]);
    let (result, out) = run(cli);
    assert!(matches!(result, Err(Error::ModelNotFound(_))));
    assert!(out.is_empty());
}

#[test]
fn no_face_detected_message() {
    let (age, gender) = MALE_INFANT;
    let pipeline = pipeline(&[row(0.3, 0.1, 0.1, 0.5, 0.5)], &age, &gender);
    let mut out = Vec::new();
    let outcome = report_faces(&pipeline, &photo(100, 100), &mut out).unwrap();
    assert_eq!(outcome, Outcome::NoFace);
    assert_eq!(String::from_utf8(out).unwrap(), "No face detected\n");
}

#[test]
fn one_line_per_face() {
    let (age, gender) = MALE_INFANT;
    let rows = [
        row(0.99, 0.1, 0.1, 0.4, 0.4),
        row(0.85, 0.5, 0.5, 0.9, 0.9),
    ];
    let pipeline = pipeline(&rows, &age, &gender);
    let mut out = Vec::new();
    let outcome = report_faces(&pipeline, &photo(200, 100), &mut out).unwrap();
    assert_eq!(outcome, Outcome::Reported(2));
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Male, (0-2)\nMale, (0-2)\n"
    );
}

#[test]
fn degenerate_crop_is_skipped_silently() {
    let (age, gender) = MALE_INFANT;
    // Entirely right of the image: x1 stays past the clamped x2.
    let pipeline = pipeline(&[row(0.95, 2.0, 0.1, 3.0, 0.5)], &age, &gender);
    let mut out = Vec::new();
    let outcome = report_faces(&pipeline, &photo(100, 100), &mut out).unwrap();
    assert_eq!(outcome, Outcome::Reported(0));
    assert!(out.is_empty());
}

#[test]
fn flags_before_serve_reach_the_config() {
    let cli = Cli::parse_from(["age-gender", "--models", "nets", "--threshold", "0.5", "serve"]);
    assert!(matches!(cli.command, Some(Commands::Serve { .. })));
    let cfg = cli.effective_config(Config::default());
    assert_eq!(cfg.model_dir, PathBuf::from("nets"));
    assert_eq!(cfg.confidence_threshold, 0.5);
    assert_eq!(cfg.bind, Config::default().bind);
}

#[test]
fn serve_flags_override_top_level_flags() {
    let cli = Cli::parse_from([
        "age-gender", "--models", "outer", "serve", "--models", "inner", "--bind", "0.0.0.0:8000",
    ]);
    let cfg = cli.effective_config(Config::default());
    assert_eq!(cfg.model_dir, PathBuf::from("inner"));
    assert_eq!(cfg.bind, "0.0.0.0:8000");
}

#[test]
#[serial]
fn init_config_fails_when_file_cannot_be_written() {
    let dir = tempdir().unwrap();
    isolate_config(dir.path());
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    std::env::set_var("AGE_GENDER_CONFIG", blocker.join("cfg.json"));
    let (result, _) = run(Cli::parse_from(["age-gender", "init-config"]));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
#[serial]
fn init_config_writes_effective_settings() {
    let dir = tempdir().unwrap();
    isolate_config(dir.path());
    let (result, _) = run(Cli::parse_from(["age-gender", "--threshold", "0.9", "init-config"]));
    assert_eq!(result.unwrap(), Outcome::ConfigWritten);
    let written: Config =
        serde_json::from_slice(&std::fs::read(dir.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(written.confidence_threshold, 0.9);
}
