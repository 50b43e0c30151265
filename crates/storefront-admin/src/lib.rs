//! # storefront-admin
//!
//! A Django-style admin runtime. Models are described with [`meta::ModelMeta`],
//! registered on an [`site::AdminSite`] together with a
//! [`model_admin::ModelAdmin`] configuration, and served as a JSON API with
//! changelists, change views, inline formsets, bulk actions, and autocomplete.
//!
//! Behaviour that a configuration cannot express as data (computed list
//! columns, bulk actions) plugs in through the [`display::DisplayColumn`] and
//! [`actions::AdminAction`] traits.

pub mod actions;
pub mod api;
pub mod changelist;
mod checks;
pub mod contrib;
pub mod db;
pub mod display;
mod edit;
pub mod filters;
pub mod forms;
pub mod meta;
pub mod model_admin;
pub mod site;
pub mod urls;
mod views;
