pub mod builders;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
pub use builders::PerformanceBuilder;
#[allow(unused_imports)]
pub use mocks::FlakyStatsRepository;
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
