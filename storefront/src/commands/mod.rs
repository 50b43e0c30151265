//! Management commands for the `storefront` binary.
//!
//! Each subcommand implements [`ManagementCommand`] and is dispatched through a
//! [`CommandRegistry`]. The default registry carries `serve` and `check`.
//!
//! ```
//! use storefront::commands::CommandRegistry;
//!
//! let registry = CommandRegistry::default();
//! let matches = registry
//!     .build_cli()
//!     .try_get_matches_from(["storefront", "check"])
//!     .unwrap();
//! assert_eq!(matches.subcommand_name(), Some("check"));
//! ```

mod check;
mod serve;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use storefront_core::{settings_loader, Settings, StoreError, StoreResult};

pub use check::CheckCommand;
pub use serve::{prepare_site, ServeCommand};

/// A subcommand of the `storefront` binary.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// Name used to invoke the command.
    fn name(&self) -> &'static str;

    /// One-line help shown by `--help`.
    fn help(&self) -> &'static str;

    /// Adds the command's own arguments. The default adds none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> StoreResult<()>;
}

/// Commands registered by name.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn ManagementCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ServeCommand));
        registry.register(Box::new(CheckCommand));
        registry
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers a command, replacing one with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Sorted names of the registered commands.
    pub fn list_commands(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Builds the top-level CLI with one subcommand per registered command.
    ///
    /// `--config <FILE>` is accepted before or after the subcommand.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("storefront")
            .about("Storefront admin server")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                clap::Arg::new("config")
                    .long("config")
                    .short('c')
                    .global(true)
                    .value_name("FILE")
                    .help("TOML settings file; STOREFRONT_* variables still override it"),
            );

        for name in self.list_commands() {
            if let Some(cmd) = self.get(name) {
                let subcmd = clap::Command::new(name).about(cmd.help());
                app = app.subcommand(cmd.add_arguments(subcmd));
            }
        }
        app
    }

    /// Dispatches to the subcommand named in `matches`.
    pub async fn execute(&self, matches: &clap::ArgMatches, settings: &Settings) -> StoreResult<()> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            StoreError::ConfigurationError("No subcommand specified".to_string())
        })?;
        let cmd = self
            .get(name)
            .ok_or_else(|| StoreError::ConfigurationError(format!("Unknown command: {name}")))?;
        cmd.handle(sub_matches, settings).await
    }
}

/// Loads settings from `config` when given, otherwise from defaults.
/// Environment overrides apply either way.
pub fn load_settings(config: Option<&Path>) -> StoreResult<Settings> {
    match config {
        Some(path) => settings_loader::from_toml_file_with_env(path),
        None => Ok(settings_loader::from_env()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingCommand {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ManagementCommand for CountingCommand {
        fn name(&self) -> &'static str {
            "count"
        }

        fn help(&self) -> &'static str {
            "Counts invocations"
        }

        fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
            cmd.arg(
                clap::Arg::new("times")
                    .long("times")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("1"),
            )
        }

        async fn handle(&self, matches: &clap::ArgMatches, _settings: &Settings) -> StoreResult<()> {
            let times = matches.get_one::<usize>("times").copied().unwrap_or(1);
            self.calls.fetch_add(times, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_default_registry() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.list_commands(), vec!["check", "serve"]);
        assert!(registry.get("serve").is_some());
        assert!(registry.get("migrate").is_none());
    }

    #[test]
    fn test_build_cli_parses_global_config() {
        let cli = CommandRegistry::default().build_cli();
        let matches = cli
            .try_get_matches_from(["storefront", "serve", "--config", "site.toml", "--no-seed"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("config").map(String::as_str),
            Some("site.toml")
        );
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "serve");
        assert!(sub.get_flag("no-seed"));
    }

    #[test]
    fn test_build_cli_rejects_unknown_subcommand() {
        let cli = CommandRegistry::default().build_cli();
        assert!(cli.try_get_matches_from(["storefront", "migrate"]).is_err());
    }

    #[tokio::test]
    async fn test_execute_dispatches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(CountingCommand {
            calls: Arc::clone(&calls),
        }));
        let matches = registry
            .build_cli()
            .try_get_matches_from(["storefront", "count", "--times", "3"])
            .unwrap();
        registry.execute(&matches, &Settings::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "debug = false\nbind_address = \"0.0.0.0:9000\"\n\n[admin]\nsite_name = \"Shop\""
        )
        .unwrap();
        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.admin.site_name, "Shop");
        assert_eq!(settings.admin.url_prefix, "/admin");
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings(Some(Path::new("/nonexistent/storefront.toml"))).unwrap_err();
        assert!(matches!(err, StoreError::ConfigurationError(_)));
    }
}
