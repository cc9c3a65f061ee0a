//! Pipeline module - the analysis stages, each a function over an immutable dataset

pub mod categories;
pub mod cleaner;
pub mod correlation;
pub mod design;
pub mod diagnostics;
pub mod error;
pub mod formula;
pub mod loader;
pub mod ols;
pub mod remedy;

pub use categories::*;
pub use cleaner::*;
pub use correlation::*;
pub use design::{build_design, DesignMatrix, TermColumns, INTERCEPT};
pub use diagnostics::*;
pub use error::{AnalysisError, Result};
pub use formula::{Formula, Term};
pub use loader::*;
pub use ols::*;
pub use remedy::*;
