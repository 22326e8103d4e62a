//! Async half of the pricing engine: provider traits, concurrent factor
//! gathering and the `PricingEngine` façade over `fareflow-core`.

pub mod aggregator;
pub mod engine;
pub mod providers;
pub mod telemetry;

pub use aggregator::FactorAggregator;
pub use engine::PricingEngine;
pub use providers::{FactorProviders, ProviderError};
pub use telemetry::{init_logging, TelemetryError};
