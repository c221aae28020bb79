//! Model module for UptimeView.
//!
//! Canonical types the rest of the crate works with, the raw wire shapes the
//! backend delivers, and the normalizer that maps one onto the other.

mod models;
pub mod normalize;

pub use models::*;
pub use normalize::{
    normalize_endpoint, normalize_kind, normalize_log_page, normalize_observation,
    normalize_observations, normalize_overview, normalize_status, normalize_total,
    parse_timestamp,
};
