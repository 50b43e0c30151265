//! # storefront-test
//!
//! Testing helpers for the storefront workspace. [`client::TestClient`] sends
//! simulated JSON requests through an Axum router without binding a socket.

pub mod client;
