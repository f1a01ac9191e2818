//! Alert feed collection for presswatch.
//!
//! Downloads per-client Google Alerts (or any RSS/Atom) feeds and converts
//! their entries into [`presswatch_core::RawHit`]s for the normalizer.

pub mod client;
pub mod error;
pub mod parse;

mod rate_limit;
mod text;

pub use client::{FeedFetcher, DEFAULT_USER_AGENT};
pub use error::FeedError;
pub use parse::{parse_feed, unwrap_google_redirect, PROVIDER};
