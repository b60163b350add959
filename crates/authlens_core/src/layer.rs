//! Designation of the layer whose activations feed the explanation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Capture point inside a detector architecture.
///
/// Which layers exist is an architecture concern; a model reports whether it
/// can capture a given target via
/// [`CaptureClassifier::supports_target`](crate::CaptureClassifier::supports_target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetLayer {
    /// The activation after the entry convolution stage.
    Entry,
    /// The activation after the given feature block (zero-based).
    Block(usize),
}

impl std::fmt::Display for TargetLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLayer::Entry => write!(f, "entry"),
            TargetLayer::Block(i) => write!(f, "block{i}"),
        }
    }
}

impl FromStr for TargetLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("entry") {
            return Ok(TargetLayer::Entry);
        }
        if let Some(index) = s.strip_prefix("block") {
            return index
                .parse::<usize>()
                .map(TargetLayer::Block)
                .map_err(|_| format!("invalid block index in target layer '{s}'"));
        }
        Err(format!(
            "unknown target layer '{s}' (expected 'entry' or 'blockN')"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        assert_eq!("entry".parse::<TargetLayer>().unwrap(), TargetLayer::Entry);
        assert_eq!("Entry".parse::<TargetLayer>().unwrap(), TargetLayer::Entry);
    }

    #[test]
    fn test_parse_block() {
        assert_eq!(
            "block3".parse::<TargetLayer>().unwrap(),
            TargetLayer::Block(3)
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!("act4".parse::<TargetLayer>().is_err());
        assert!("blockx".parse::<TargetLayer>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let layer = TargetLayer::Block(2);
        assert_eq!(layer.to_string().parse::<TargetLayer>().unwrap(), layer);
    }
}
