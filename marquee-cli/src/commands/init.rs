use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::error::CliError;
use crate::settings::Settings;

/// Create the library database and schema, or verify an existing one.
pub(crate) fn run_init(db_override: Option<PathBuf>) -> Result<(), CliError> {
    let settings = Settings::load()?;
    let path = settings.database_path(db_override);
    let existed = path.exists();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = marquee_db::open_database(&path)
        .map_err(|e| CliError::database(format!("{}: {e}", path.display())))?;
    let version = marquee_db::schema::get_schema_version(&conn)
        .map_err(|e| CliError::database(e.to_string()))?;

    let status = if existed { "(existing)" } else { "(created)" };
    log::info!(
        "{} {} {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        status.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("  Schema version: {version}");
    Ok(())
}
