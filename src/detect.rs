use crate::blob::{blob_from_image, DETECTOR_INPUT};
use crate::config::DEFAULT_THRESHOLD;
use crate::error::{Error, Result};
use crate::model::Network;
use candle_core::Tensor;
use image::RgbImage;
use tracing::{debug, trace};

/// Values per detection row: image id, label, confidence, x1, y1, x2, y2.
const DETECTION_WIDTH: usize = 7;

/// Face rectangle in pixel coordinates of the source image. Not clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub confidence: f32,
}

pub struct FaceLocator {
    net: Box<dyn Network>,
    threshold: f32,
}

impl FaceLocator {
    pub fn new(net: Box<dyn Network>) -> Self {
        Self {
            net,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Runs the detector once and returns every box above the threshold.
    /// An empty result means no face was found.
    pub fn locate(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        let blob = blob_from_image(image, &DETECTOR_INPUT)?;
        let output = self.net.forward(blob)?;
        let boxes = parse_detections(&output, image.width(), image.height(), self.threshold)?;
        debug!(
            faces = boxes.len(),
            threshold = self.threshold,
            "face detection complete"
        );
        Ok(boxes)
    }
}

/// Reads SSD `DetectionOutput` rows and scales the kept ones to pixel space.
pub fn parse_detections(
    output: &Tensor,
    width: u32,
    height: u32,
    threshold: f32,
) -> Result<Vec<BoundingBox>> {
    if output.dims().last() != Some(&DETECTION_WIDTH) {
        return Err(Error::OutputShape {
            dims: output.dims().to_vec(),
            reason: format!("expected rows of {DETECTION_WIDTH} values"),
        });
    }
    let values = output.flatten_all()?.to_vec1::<f32>()?;
    let (w, h) = (width as f32, height as f32);
    let boxes = values
        .chunks_exact(DETECTION_WIDTH)
        .filter(|row| row[2] > threshold)
        .map(|row| {
            let bbox = BoundingBox {
                x1: (row[3] * w) as i32,
                y1: (row[4] * h) as i32,
                x2: (row[5] * w) as i32,
                y2: (row[6] * h) as i32,
                confidence: row[2],
            };
            trace!(?bbox, "face kept");
            bbox
        })
        .collect();
    Ok(boxes)
}
