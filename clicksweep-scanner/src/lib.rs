pub mod catalog;
pub mod chromium;
pub mod crawler;
pub mod driver;
pub mod error;
pub mod executor;
pub mod policy;
pub mod recovery;
pub mod result;
pub mod state;

#[cfg(test)]
mod testing;

pub use catalog::{Catalog, CatalogBuilder, DEFAULT_HEURISTICS};
pub use chromium::ChromiumDriver;
pub use crawler::{Crawler, ProgressCallback};
pub use driver::{Driver, ElementRef};
pub use error::ScanError;
pub use executor::{Executor, InteractabilityGate};
pub use policy::{Policy, PolicyConfig, VolumeGroup};
pub use recovery::{RecoveryController, RecoveryStrategy};
pub use result::{
    ClassificationLabel, CrawlSummary, InteractionOutcome, InteractionStatus, InteractionTarget,
    ReportRow, RowSink, ScopeKind, ScopeReport, SkipReason, TraversalScope,
};
pub use state::{RunState, VolumeScope};
