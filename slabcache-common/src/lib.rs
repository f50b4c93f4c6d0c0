// slabcache-common - Shared types for the slab-backed item storage engine
//
// This crate defines the status taxonomy, configuration, clock, and metrics
// surfaces that the item layer (slabcache-engine) consumes and that its
// embedding server would otherwise have to hand-roll per deployment.

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Config;
pub use error::{ItemError, ItemResult};
pub use metrics::{Counter, Metrics, MetricsSnapshot};
