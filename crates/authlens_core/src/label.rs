//! Class labels and prediction results.

use serde::{Deserialize, Serialize};

/// Binary authenticity label produced by the detector.
///
/// The wire representation is the class index: `0` for real media,
/// `1` for manipulated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// The image is classified as genuine.
    Real,
    /// The image is classified as manipulated ("deepfake").
    Manipulated,
}

impl Label {
    /// Build a label from a class index.
    ///
    /// The detector head is binary, so any non-zero index maps to
    /// [`Label::Manipulated`].
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        match index {
            0 => Label::Real,
            _ => Label::Manipulated,
        }
    }

    /// Class index of this label (0 = real, 1 = manipulated).
    #[must_use]
    pub const fn as_index(&self) -> usize {
        match self {
            Label::Real => 0,
            Label::Manipulated => 1,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Real => write!(f, "real"),
            Label::Manipulated => write!(f, "manipulated"),
        }
    }
}

/// Classifier output for a single image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class.
    pub label: Label,
    /// Confidence of the predicted class as a percentage in `[0, 100]`,
    /// rounded to two decimal places.
    pub confidence: f32,
}

/// Round a value to two decimal places.
#[must_use]
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
