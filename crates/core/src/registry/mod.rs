//! # Registry
//!
//! The fetch-and-normalize pipeline: a single-shot HTTP client for the
//! registry feed and the total, per-record normalizer that flattens raw
//! catalogs into `LibraryDisplay` records.

pub mod client;
pub mod normalize;

pub use client::{parse_registry, RegistryClient, RegistryConfig, RegistryError};
pub use normalize::normalize;
