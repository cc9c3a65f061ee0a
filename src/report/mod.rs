//! Report module - model summaries, comparison tables and exports

pub mod diagnostics;
pub mod export;
pub mod model_report;
pub mod summary;

pub use diagnostics::*;
pub use export::*;
pub use model_report::*;
pub use summary::*;
