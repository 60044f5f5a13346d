use crate::classify::{AttributeClassifier, FaceAttributes};
use crate::config::{Config, DEFAULT_PADDING};
use crate::crop::CropRegion;
use crate::detect::{BoundingBox, FaceLocator};
use crate::error::Result;
use crate::model::load_network;
use image::DynamicImage;
use tracing::{debug, info};

/// Result of running the full pipeline over one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Every box the detector reported, before cropping.
    pub boxes: Vec<BoundingBox>,
    /// One entry per box whose padded crop was non-empty.
    pub faces: Vec<FaceAttributes>,
}

/// Detector and classifiers loaded once and shared by all callers.
pub struct Pipeline {
    locator: FaceLocator,
    classifier: AttributeClassifier,
    padding: u32,
}

impl Pipeline {
    pub fn new(locator: FaceLocator, classifier: AttributeClassifier) -> Self {
        Self {
            locator,
            classifier,
            padding: DEFAULT_PADDING,
        }
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn load(config: &Config) -> Result<Self> {
        let dir = &config.model_dir;
        let repo = config.model_repo.as_deref();
        let face = load_network(dir, &config.face_model, repo)?;
        let age = load_network(dir, &config.age_model, repo)?;
        let gender = load_network(dir, &config.gender_model, repo)?;
        info!(dir = %dir.display(), "models loaded");
        let locator = FaceLocator::new(Box::new(face)).with_threshold(config.confidence_threshold);
        let classifier = AttributeClassifier::new(Box::new(age), Box::new(gender));
        Ok(Self::new(locator, classifier).with_padding(config.padding))
    }

    pub fn analyze(&self, image: &DynamicImage) -> Result<Analysis> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let boxes = self.locator.locate(&rgb)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in &boxes {
            let Some(region) = CropRegion::from_box(bbox, self.padding, width, height) else {
                debug!(?bbox, "skipping empty crop");
                continue;
            };
            faces.push(self.classifier.classify(&region.extract(&rgb))?);
        }
        Ok(Analysis { boxes, faces })
    }
}
