//! Post-hoc score adjustment by selected model.
//!
//! Works on the already-rounded displayed score, so applying an adjustment
//! repeatedly compounds.

use serde::Serialize;
use std::fmt;

/// Model selection offered alongside the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Transformer,
    S4,
    Lstm,
    Other(String),
}

impl From<&str> for ModelKind {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "transformer" => ModelKind::Transformer,
            "s4" => ModelKind::S4,
            "lstm" => ModelKind::Lstm,
            other => ModelKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Transformer => write!(f, "transformer"),
            ModelKind::S4 => write!(f, "s4"),
            ModelKind::Lstm => write!(f, "lstm"),
            ModelKind::Other(s) => write!(f, "{}", s),
        }
    }
}

impl ModelKind {
    /// Whether this model leaves the score untouched.
    pub fn is_baseline(&self) -> bool {
        matches!(self, ModelKind::Lstm | ModelKind::Other(_))
    }

    /// Adjust a displayed score: transformer +5 (max 100), s4 -3 (min 0), others unchanged.
    pub fn adjust(&self, displayed: i64) -> i64 {
        match self {
            ModelKind::Transformer => (displayed + 5).min(100),
            ModelKind::S4 => (displayed - 3).max(0),
            ModelKind::Lstm | ModelKind::Other(_) => displayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(ModelKind::from("Transformer"), ModelKind::Transformer);
        assert_eq!(ModelKind::from("S4"), ModelKind::S4);
        assert_eq!(ModelKind::from("lstm"), ModelKind::Lstm);
        assert_eq!(ModelKind::from("gru"), ModelKind::Other("gru".to_string()));
    }

    #[test]
    fn test_transformer_capped() {
        assert_eq!(ModelKind::Transformer.adjust(72), 77);
        assert_eq!(ModelKind::Transformer.adjust(98), 100);
    }

    #[test]
    fn test_s4_floored() {
        assert_eq!(ModelKind::S4.adjust(72), 69);
        assert_eq!(ModelKind::S4.adjust(1), 0);
    }

    #[test]
    fn test_baseline_and_unknown_unchanged() {
        assert_eq!(ModelKind::Lstm.adjust(55), 55);
        assert_eq!(ModelKind::from("xgboost").adjust(55), 55);
        assert!(ModelKind::Lstm.is_baseline());
        assert!(!ModelKind::S4.is_baseline());
    }

    #[test]
    fn test_repeated_adjustment_compounds() {
        let once = ModelKind::Transformer.adjust(80);
        let twice = ModelKind::Transformer.adjust(once);
        assert_eq!(once, 85);
        assert_eq!(twice, 90);
    }
}
