//! stockroom-core - Core library for Stockroom
//!
//! This crate contains the data models, local store, remote API client and
//! the offline-first sync engine used by every Stockroom interface.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use connectivity::Connectivity;
pub use error::{Error, Result};
pub use models::{Record, RecordId};
