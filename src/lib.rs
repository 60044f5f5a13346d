pub mod blob;
pub mod classify;
pub mod cli;
pub mod config;
pub mod crop;
pub mod detect;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod web;

pub use classify::{AgeRange, AttributeClassifier, FaceAttributes, Gender};
pub use cli::{execute, report_faces, run_cli, Cli, Commands, ModelArgs, Outcome, USAGE};
pub use config::{load_config, Config};
pub use crop::CropRegion;
pub use detect::{BoundingBox, FaceLocator};
pub use error::{Error, Result};
pub use model::{Network, OnnxNet};
pub use pipeline::{Analysis, Pipeline};
pub use web::{render_page, router};
