// Curation module
// Selects a per-post subset of scored images for downstream video production

pub mod engine;
pub mod report;
pub mod resolve;


pub use engine::{CurationConfig, CurationEngine};
pub use report::{CurationReport, ImageOutcome, OutcomeStatus};
pub use resolve::{PathResolver, PostKey, Resolved};
