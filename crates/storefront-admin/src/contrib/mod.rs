//! Supporting pieces shared by the admin views.
//!
//! - [`contenttypes`] - Content type registry backing generic relations
//! - [`messages`] - One-time notifications produced by saves and actions

pub mod contenttypes;
pub mod messages;
