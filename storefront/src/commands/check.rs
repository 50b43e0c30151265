//! The `check` command.

use std::sync::Arc;

use async_trait::async_trait;
use storefront_admin::db::InMemoryAdminDb;
use storefront_core::checks::{has_errors, CheckMessage};
use storefront_core::{Settings, StoreError, StoreResult};

use super::ManagementCommand;
use crate::build_site;

/// Validates the admin registrations without starting the server.
pub struct CheckCommand;

/// Runs the site checks for `settings`.
pub fn run_checks(settings: &Settings) -> Vec<CheckMessage> {
    build_site(settings, Arc::new(InMemoryAdminDb::new())).check()
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Checks the admin configuration for problems"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> StoreResult<()> {
        let messages = run_checks(settings);
        if messages.is_empty() {
            println!("System check identified no issues.");
            return Ok(());
        }

        println!("System check identified some issues:\n");
        for message in &messages {
            println!("{message}");
        }
        if has_errors(&messages) {
            return Err(StoreError::ImproperlyConfigured(format!(
                "System check identified {} issues",
                messages.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_configuration_is_clean() {
        let messages = run_checks(&Settings::default());
        assert!(!has_errors(&messages), "{messages:?}");
    }

    #[tokio::test]
    async fn test_check_command_succeeds() {
        let matches = clap::Command::new("check").get_matches_from(["check"]);
        CheckCommand
            .handle(&matches, &Settings::default())
            .await
            .unwrap();
    }
}
