//! Conversion of images into the `[1, 3, H, W]` float blobs the networks expect.

use crate::error::Result;
use candle_core::{Device, Tensor};
use image::{Rgb, RgbImage};

/// Channel layout of the produced blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Input geometry and normalisation for one network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobLayout {
    pub width: u32,
    pub height: u32,
    /// Per-channel mean, given in the blob's channel order.
    pub mean: [f32; 3],
    pub order: ChannelOrder,
}

/// Face detector input: 300x300, RGB, mean (104, 117, 123) on R, G, B.
pub const DETECTOR_INPUT: BlobLayout = BlobLayout {
    width: 300,
    height: 300,
    mean: [104.0, 117.0, 123.0],
    order: ChannelOrder::Rgb,
};

/// Age and gender classifier input: 227x227, BGR.
pub const CLASSIFIER_INPUT: BlobLayout = BlobLayout {
    width: 227,
    height: 227,
    mean: [78.426_34, 87.768_914, 114.895_85],
    order: ChannelOrder::Bgr,
};

/// Resizes `image` bilinearly and lays it out as a mean-subtracted CHW blob.
pub fn blob_from_image(image: &RgbImage, input: &BlobLayout) -> Result<Tensor> {
    let (w, h) = (input.width, input.height);
    let resized = if image.dimensions() == (w, h) {
        image.clone()
    } else {
        resize_bilinear(image, w, h)
    };
    let plane = (w * h) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (i, px) in resized.pixels().enumerate() {
        let [r, g, b] = px.0;
        let ordered = match input.order {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Bgr => [b, g, r],
        };
        for c in 0..3 {
            data[c * plane + i] = ordered[c] as f32 - input.mean[c];
        }
    }
    Ok(Tensor::from_vec(
        data,
        (1, 3, h as usize, w as usize),
        &Device::Cpu,
    )?)
}

/// Two-tap bilinear resize with half-pixel centres. The kernel does not
/// widen when shrinking: each output pixel blends at most four source pixels.
pub fn resize_bilinear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let scale_x = src_w as f32 / width as f32;
    let scale_y = src_h as f32 / height as f32;
    RgbImage::from_fn(width, height, |x, y| {
        let (x0, x1, fx) = taps(x, scale_x, src_w);
        let (y0, y1, fy) = taps(y, scale_y, src_h);
        let (a, b) = (image.get_pixel(x0, y0).0, image.get_pixel(x1, y0).0);
        let (c, d) = (image.get_pixel(x0, y1).0, image.get_pixel(x1, y1).0);
        let mut out = [0u8; 3];
        for ch in 0..3 {
            let top = a[ch] as f32 * (1.0 - fx) + b[ch] as f32 * fx;
            let bottom = c[ch] as f32 * (1.0 - fx) + d[ch] as f32 * fx;
            out[ch] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

/// Source neighbours and weight for destination index `dst`; `len` must be non-zero.
fn taps(dst: u32, scale: f32, len: u32) -> (u32, u32, f32) {
    let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (src.floor() as u32).min(len - 1);
    let i1 = (i0 + 1).min(len - 1);
    (i0, i1, (src - i0 as f32).clamp(0.0, 1.0))
}
