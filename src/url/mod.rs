//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization, relative reference resolution,
//! host extraction and wildcard host matching. Normalized URLs are the identity
//! the frontier deduplicates on.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use matcher::{matches_wildcard, HostFilter};
pub use normalize::{normalize_url, resolve_url};
