//! The `serve` command: runs the admin API over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use storefront_admin::db::InMemoryAdminDb;
use storefront_admin::site::AdminSite;
use storefront_core::checks::has_errors;
use storefront_core::{Settings, StoreError, StoreResult};

use super::ManagementCommand;
use crate::{build_site, seed};

/// Serves the admin on `--addr`, or `settings.bind_address` when not given.
pub struct ServeCommand;

#[async_trait]
impl ManagementCommand for ServeCommand {
    fn name(&self) -> &'static str {
        "serve"
    }

    fn help(&self) -> &'static str {
        "Starts the admin server"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("addr")
                .long("addr")
                .value_name("HOST:PORT")
                .help("Address to bind to"),
        )
        .arg(
            clap::Arg::new("no-seed")
                .long("no-seed")
                .action(clap::ArgAction::SetTrue)
                .help("Start with an empty store"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> StoreResult<()> {
        let addr = matches
            .get_one::<String>("addr")
            .map_or(settings.bind_address.as_str(), String::as_str);
        let seed = settings.seed_demo_data && !matches.get_flag("no-seed");

        let site = prepare_site(settings, seed).await?;
        let prefix = site.urls().prefix().to_string();
        let router = site.into_axum_router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            "Serving {prefix}/ at http://{}/ (debug={})",
            listener.local_addr()?,
            settings.debug
        );
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("server stopped");
        Ok(())
    }
}

/// Builds the site on a fresh in-memory store, optionally seeded.
///
/// Check warnings are logged. Check errors abort startup.
pub async fn prepare_site(settings: &Settings, seed: bool) -> StoreResult<AdminSite> {
    let site = build_site(settings, Arc::new(InMemoryAdminDb::new()));

    let messages = site.check();
    for message in &messages {
        tracing::warn!("{message}");
    }
    if has_errors(&messages) {
        return Err(StoreError::ImproperlyConfigured(format!(
            "System check identified {} issues",
            messages.len()
        )));
    }

    if seed {
        seed::seed_demo_data(&site).await?;
    }
    Ok(site)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_site_seeds_when_asked() {
        let settings = Settings::default();
        let seeded = prepare_site(&settings, true).await.unwrap();
        assert_eq!(seeded.db().all_objects("store.product").await.unwrap().len(), 12);

        let empty = prepare_site(&settings, false).await.unwrap();
        assert!(empty.db().all_objects("store.product").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_site_uses_admin_settings() {
        let mut settings = Settings::default();
        settings.admin.site_name = "Shop".to_string();
        settings.admin.url_prefix = "/backoffice/".to_string();
        let site = prepare_site(&settings, false).await.unwrap();
        assert_eq!(site.name(), "Shop");
        assert_eq!(site.urls().prefix(), "/backoffice");
    }

    #[tokio::test]
    async fn test_serve_reports_bad_address() {
        let cmd = ServeCommand;
        let matches = cmd
            .add_arguments(clap::Command::new("serve"))
            .try_get_matches_from(["serve", "--addr", "not an address", "--no-seed"])
            .unwrap();
        let err = cmd.handle(&matches, &Settings::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::IoError(_)));
    }
}
