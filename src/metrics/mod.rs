//! Metrics module: the pure derivations behind the dashboard.
//!
//! Relative time labels, per-endpoint window aggregation, alert
//! classification and the account overview. Nothing here performs I/O or
//! reads the clock; callers pass `now` in.

mod aggregate;
mod alerts;
mod overview;
mod relative;

pub use aggregate::*;
pub use alerts::*;
pub use overview::*;
pub use relative::*;
