use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::error::CliError;
use crate::settings::{Settings, settings_path};

/// Show the settings file location and the effective settings.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = settings_path();
    let settings = Settings::load()?;

    log::info!(
        "{}",
        "Marquee Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    let status = if path.exists() { "(exists)" } else { "(not found, using defaults)" };
    log::info!(
        "  Settings file: {} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        status.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!(
        "  Database:      {}",
        settings
            .database_path(None)
            .display()
            .if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!("");

    for line in settings.to_toml()?.lines() {
        log::info!("  {line}");
    }
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
