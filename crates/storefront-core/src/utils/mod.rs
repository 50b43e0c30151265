//! Helpers for building admin output.
//!
//! - [`html`]: escaping and `format_html`-style interpolation.
//! - [`http`]: query-string encoding.

pub mod html;
pub mod http;
