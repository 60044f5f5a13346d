use crate::detect::BoundingBox;
use image::RgbImage;

/// Padded face region clamped to the image. Always non-empty:
/// `0 <= x1 < x2 <= width - 1` and `0 <= y1 < y2 <= height - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRegion {
    /// Grows `bbox` by `padding` on every side and clamps it to a
    /// `width` x `height` image. Returns `None` when nothing is left.
    pub fn from_box(bbox: &BoundingBox, padding: u32, width: u32, height: u32) -> Option<Self> {
        let pad = i64::from(padding);
        let x1 = (i64::from(bbox.x1) - pad).max(0);
        let y1 = (i64::from(bbox.y1) - pad).max(0);
        let x2 = (i64::from(bbox.x2) + pad).min(i64::from(width) - 1);
        let y2 = (i64::from(bbox.y2) + pad).min(i64::from(height) - 1);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self {
            x1: x1 as u32,
            y1: y1 as u32,
            x2: x2 as u32,
            y2: y2 as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Copies out columns `x1..x2` and rows `y1..y2`.
    pub fn extract(&self, image: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(image, self.x1, self.y1, self.width(), self.height()).to_image()
    }
}
