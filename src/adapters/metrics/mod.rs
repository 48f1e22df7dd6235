//! Metrics and Monitoring Adapters
//!
//! Prometheus registry for reconciliation outcomes and the health
//! state behind the `/live` and `/ready` probes. Both are served by
//! the trigger server in `adapters::http`.

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use prometheus::ReconcilerMetrics;
