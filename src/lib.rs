//! Premia: Insurance Premium Regression Library
//!
//! Loads a policy dataset, cleans it, reduces rare categories, fits ordinary
//! least squares models, and reports diagnostics (QQ, Cook's distance, VIF).

pub mod cli;
pub mod pipeline;
pub mod plots;
pub mod report;
pub mod utils;

pub use pipeline::{AnalysisError, Result};
