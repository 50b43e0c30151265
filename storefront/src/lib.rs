//! # storefront
//!
//! The store application served through the admin: catalogue, customer and
//! order models ([`models`]), the generic [`tags`] app, the admin
//! registrations ([`admin`]), demo data ([`seed`]) and the management
//! commands behind the `storefront` binary ([`commands`]).
//!
//! ```
//! use std::sync::Arc;
//!
//! use storefront::build_site;
//! use storefront_admin::db::InMemoryAdminDb;
//! use storefront_core::Settings;
//!
//! let site = build_site(&Settings::default(), Arc::new(InMemoryAdminDb::new()));
//! assert!(site.is_registered("store.product"));
//! let router = site.into_axum_router();
//! ```

pub mod admin;
pub mod commands;
pub mod models;
pub mod seed;
pub mod tags;

use std::sync::Arc;

use storefront_admin::db::AdminDbExecutor;
use storefront_admin::site::AdminSite;
use storefront_core::Settings;

/// Builds the admin site for `settings` on top of `db`, with every store
/// model registered.
pub fn build_site(settings: &Settings, db: Arc<dyn AdminDbExecutor>) -> AdminSite {
    let mut site = AdminSite::new(&settings.admin.site_name)
        .url_prefix(&settings.admin.url_prefix)
        .with_db(db);
    admin::register(&mut site);
    site
}
