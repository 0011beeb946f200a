//! Optional status server reporting dispatcher health.

pub mod health;
pub mod latency;
pub mod routes;

pub use health::HealthState;
pub use latency::LatencyStats;
