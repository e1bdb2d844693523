//! # Stacks Core
//!
//! Domain logic for the Stacks library directory: fetch the registry
//! feed once, normalize the heterogeneous catalog records into a flat
//! display model, and derive the views the surface renders.
//!
//! ## Architecture
//!
//! - `models` - Registry wire types and the normalized `LibraryDisplay`
//! - `registry` - Single-shot relay-indirected fetch + total per-record
//!   normalization
//! - `directory` - Immutable session snapshot with the derived views
//!   (available states, filtered subset)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stacks_core::directory::LibraryDirectory;
//! use stacks_core::registry::{RegistryClient, RegistryConfig};
//!
//! let client = RegistryClient::new(RegistryConfig::from_env())?;
//! let directory = LibraryDirectory::new(client.fetch_libraries().await?);
//! let states = directory.available_states();
//! ```

pub mod directory;
pub mod models;
pub mod registry;
