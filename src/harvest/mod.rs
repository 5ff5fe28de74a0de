//! Harvest module - sequential, rate-limited retrieval and classification.
//!
//! - **Traits**: [`Derivation`] and the [`HarvestObserver`] event channel
//! - **Pipeline**: the [`pipeline::HarvestLoop`] driving one pass over the input

pub mod pipeline;
pub mod traits;

pub use traits::{
    contains_keyword, derive_fields, line_count, Derivation, FailureReason, HarvestEvent,
    HarvestObserver, TracingObserver,
};

pub use pipeline::HarvestLoop;
