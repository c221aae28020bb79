//! UptimeView - uptime dashboard aggregation layer
//!
//! Pulls endpoints, observation history, alerts and analytics from an uptime
//! monitoring backend, derives per-endpoint health metrics and serves the
//! result as JSON.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod metrics;
pub mod model;
pub mod web;

pub use api::{ApiError, HttpTransport, Transport};
pub use config::ViewConfig;
pub use dashboard::{Dashboard, DashboardOptions, DashboardSnapshot, LoadState};
