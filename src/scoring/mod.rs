//! Site scoring.
//!
//! Pure functions only: the weighted score and the model adjustment.

pub mod adjust;
pub mod calculator;

pub use adjust::ModelKind;
pub use calculator::{calculate_prediction, ClampPolicy, ScoreBreakdown};
