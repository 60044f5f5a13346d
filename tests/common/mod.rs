#![allow(dead_code)]

use age_gender::{AttributeClassifier, FaceLocator, Network, Pipeline, Result};
use candle_core::{Device, Tensor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Network stub that ignores its input and returns a fixed tensor.
pub struct Canned {
    values: Vec<f32>,
    shape: Vec<usize>,
    expect_input: Option<Vec<usize>>,
}

impl Canned {
    pub fn scores(values: &[f32]) -> Self {
        Self {
            values: values.to_vec(),
            shape: vec![1, values.len()],
            expect_input: None,
        }
    }

    pub fn detections(rows: &[[f32; 7]]) -> Self {
        Self {
            values: rows.iter().flatten().copied().collect(),
            shape: vec![1, 1, rows.len(), 7],
            expect_input: None,
        }
    }

    pub fn raw(values: Vec<f32>, shape: Vec<usize>) -> Self {
        Self {
            values,
            shape,
            expect_input: None,
        }
    }

    /// Panics in `forward` unless the input has exactly these dims.
    pub fn expecting(mut self, dims: &[usize]) -> Self {
        self.expect_input = Some(dims.to_vec());
        self
    }
}

impl Network for Canned {
    fn forward(&self, input: Tensor) -> Result<Tensor> {
        if let Some(dims) = &self.expect_input {
            assert_eq!(input.dims(), dims.as_slice());
        }
        Ok(Tensor::from_vec(
            self.values.clone(),
            self.shape.clone(),
            &Device::Cpu,
        )?)
    }
}

/// Detection row with the given confidence and normalized corners.
pub fn row(confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> [f32; 7] {
    [0.0, 1.0, confidence, x1, y1, x2, y2]
}

pub fn pipeline(rows: &[[f32; 7]], age: &[f32], gender: &[f32]) -> Pipeline {
    let locator = FaceLocator::new(Box::new(Canned::detections(rows)));
    let classifier = AttributeClassifier::new(
        Box::new(Canned::scores(age)),
        Box::new(Canned::scores(gender)),
    );
    Pipeline::new(locator, classifier)
}

pub fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    photo(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).unwrap();
    path
}
