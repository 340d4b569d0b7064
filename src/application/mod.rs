//! Application layer: Use cases orchestrating domain and ports.

mod assessment;

pub use assessment::{requires_scaling, AssessmentError, AssessmentService, ModelEntry, Score};
