//! # SortiMate Common Library
//!
//! Shared code for the SortiMate hub service including:
//! - Database initialization, models and row helpers
//! - Event types (RecyclingEvent enum) and EventBus
//! - Waste category definitions and label normalization
//! - Configuration resolution
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod waste;

pub use error::{Error, Result};
pub use waste::WasteCategory;
