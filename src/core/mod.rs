//! Core Module - Risk Scoring Logic
//!
//! Pure scoring plus the metadata/AI reasoning layer on top of it.

pub mod risk_score;
pub mod scorer;

pub use risk_score::*;
pub use scorer::*;
