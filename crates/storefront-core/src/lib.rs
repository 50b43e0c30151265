//! # storefront-core
//!
//! Core types shared by the storefront admin crates. This crate has no
//! web-framework dependencies.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Runtime settings with defaults
//! - [`settings_loader`] - TOML loading and environment overrides
//! - [`logging`] - Tracing subscriber setup
//! - [`checks`] - System check messages
//! - [`utils`] - HTML escaping and URL encoding helpers

pub mod checks;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

pub use error::{StoreError, StoreResult, ValidationError};
pub use settings::Settings;
