pub mod config;
pub mod fetch;
pub mod gate;
pub mod harvest;
pub mod links;
pub mod model;
pub mod report;
pub mod sources;
pub mod traits;

// Re-export common types for convenience
pub use config::HarvestConfig;
pub use fetch::GithubFetcher;
pub use gate::RateGate;
pub use harvest::{Derivation, HarvestEvent, HarvestLoop, HarvestObserver, TracingObserver};
pub use model::*;
pub use report::{read_items, write_items, ReportAssembler};
pub use traits::*;
