use std::path::PathBuf;
use std::process::ExitCode;

use storefront::commands::{load_settings, CommandRegistry};
use storefront_core::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let registry = CommandRegistry::default();
    let matches = registry.build_cli().get_matches();

    let config = matches.get_one::<String>("config").map(PathBuf::from);
    let settings = match load_settings(config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("storefront: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&settings);

    match registry.execute(&matches, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("storefront: {e}");
            ExitCode::FAILURE
        }
    }
}
