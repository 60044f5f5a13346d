use crate::blob::{blob_from_image, CLASSIFIER_INPUT};
use crate::error::{Error, Result};
use crate::model::Network;
use candle_core::Tensor;
use image::RgbImage;
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeRange {
    Infant,
    EarlyChild,
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAged,
    Senior,
}

impl AgeRange {
    pub const ALL: [AgeRange; 8] = [
        AgeRange::Infant,
        AgeRange::EarlyChild,
        AgeRange::Child,
        AgeRange::Teen,
        AgeRange::YoungAdult,
        AgeRange::Adult,
        AgeRange::MiddleAged,
        AgeRange::Senior,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeRange::Infant => "(0-2)",
            AgeRange::EarlyChild => "(4-6)",
            AgeRange::Child => "(8-12)",
            AgeRange::Teen => "(15-20)",
            AgeRange::YoungAdult => "(25-32)",
            AgeRange::Adult => "(38-43)",
            AgeRange::MiddleAged => "(48-53)",
            AgeRange::Senior => "(60-100)",
        }
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of one detected face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceAttributes {
    pub gender: Gender,
    pub age: AgeRange,
}

impl fmt::Display for FaceAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.gender, self.age)
    }
}

pub struct AttributeClassifier {
    age_net: Box<dyn Network>,
    gender_net: Box<dyn Network>,
}

impl AttributeClassifier {
    pub fn new(age_net: Box<dyn Network>, gender_net: Box<dyn Network>) -> Self {
        Self {
            age_net,
            gender_net,
        }
    }

    /// Runs the gender and age networks on a cropped face.
    pub fn classify(&self, face: &RgbImage) -> Result<FaceAttributes> {
        let blob = blob_from_image(face, &CLASSIFIER_INPUT)?;
        let gender = pick(&self.gender_net.forward(blob.clone())?, &Gender::ALL)?;
        let age = pick(&self.age_net.forward(blob)?, &AgeRange::ALL)?;
        trace!(%gender, %age, "face classified");
        Ok(FaceAttributes { gender, age })
    }
}

fn pick<T: Copy>(scores: &Tensor, labels: &[T]) -> Result<T> {
    let values = scores.flatten_all()?.to_vec1::<f32>()?;
    if values.len() != labels.len() {
        return Err(Error::OutputShape {
            dims: scores.dims().to_vec(),
            reason: format!("expected {} class scores", labels.len()),
        });
    }
    argmax(&values)
        .map(|i| labels[i])
        .ok_or_else(|| Error::OutputShape {
            dims: scores.dims().to_vec(),
            reason: "no class scores".to_string(),
        })
}

/// Index of the first maximum, skipping NaN. `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
