pub(crate) mod config;
pub(crate) mod explain;
pub(crate) mod init;
pub(crate) mod query;

use std::io::Read;
use std::path::{Path, PathBuf};

use marquee_core::{FindFilter, SortDirection};
use marquee_db::QueryConfig;
use rusqlite::Connection;
use serde::de::DeserializeOwned;

use crate::error::CliError;
use crate::settings::Settings;

/// Filter and find options shared by `query` and `explain`.
#[derive(clap::Args, Clone, Debug)]
pub(crate) struct QueryArgs {
    /// Filter file (.json, .toml, .yaml); `-` reads JSON from stdin
    #[arg(short, long)]
    pub(crate) filter: Option<PathBuf>,

    /// Free-text search
    #[arg(short, long = "query")]
    pub(crate) q: Option<String>,

    /// Sort key (defaults to the entity's name or title)
    #[arg(short, long)]
    pub(crate) sort: Option<String>,

    /// Sort direction: asc or desc
    #[arg(short, long)]
    pub(crate) direction: Option<SortDirection>,

    /// 1-based page number
    #[arg(short, long)]
    pub(crate) page: Option<i64>,

    /// Page size; -1 returns everything
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) per_page: Option<i64>,
}

impl QueryArgs {
    pub(crate) fn find_filter(&self) -> FindFilter {
        FindFilter {
            q: self.q.clone(),
            page: self.page,
            per_page: self.per_page,
            sort: self.sort.clone(),
            direction: self.direction,
        }
    }
}

/// An open library plus the configuration queries run with.
pub(crate) struct Library {
    pub(crate) conn: Connection,
    pub(crate) config: QueryConfig,
}

impl Library {
    /// Open an existing library database. Unlike `init`, a missing file
    /// is an error rather than a reason to create one.
    pub(crate) fn open(db_override: Option<PathBuf>) -> Result<Self, CliError> {
        let settings = Settings::load()?;
        let path = settings.database_path(db_override);
        if !path.exists() {
            return Err(CliError::database(format!(
                "No library database found at {}. Run 'marquee init' to create one.",
                path.display()
            )));
        }
        log::debug!("opening {}", path.display());
        let conn = marquee_db::open_database(&path)
            .map_err(|e| CliError::database(format!("{}: {e}", path.display())))?;
        Ok(Self {
            conn,
            config: settings.query,
        })
    }
}

/// Read a filter from `path`, picking the format from the extension.
/// Unknown extensions are read as JSON.
pub(crate) fn load_filter<F: DeserializeOwned>(path: Option<&Path>) -> Result<Option<F>, CliError> {
    let Some(path) = path else {
        return Ok(None);
    };

    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return parse_filter(&text, "json")
            .map(Some)
            .map_err(|e| CliError::filter(format!("stdin: {e}")));
    }

    let text = std::fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    parse_filter(&text, &ext)
        .map(Some)
        .map_err(|e| CliError::filter(format!("{}: {e}", path.display())))
}

fn parse_filter<F: DeserializeOwned>(text: &str, format: &str) -> Result<F, String> {
    match format {
        "toml" => toml::from_str(text).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yml::from_str(text).map_err(|e| e.to_string()),
        _ => serde_json::from_str(text).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::{CriterionModifier, SceneFilter, TagFilter};

    #[test]
    fn filter_formats_agree() {
        let json: SceneFilter =
            parse_filter(r#"{"title": {"value": "swim", "modifier": "INCLUDES"}}"#, "json")
                .unwrap();
        let toml: SceneFilter =
            parse_filter("[title]\nvalue = \"swim\"\nmodifier = \"INCLUDES\"\n", "toml").unwrap();
        let yaml: SceneFilter =
            parse_filter("title:\n  value: swim\n  modifier: INCLUDES\n", "yml").unwrap();

        assert_eq!(json, toml);
        assert_eq!(json, yaml);
        assert_eq!(json.title.unwrap().modifier, CriterionModifier::Includes);
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.yaml");
        std::fs::write(&path, "favorite: true\n").unwrap();

        let filter: Option<TagFilter> = load_filter(Some(path.as_path())).unwrap();
        assert_eq!(filter.unwrap().favorite, Some(true));
    }

    #[test]
    fn no_path_means_no_filter() {
        let filter: Option<TagFilter> = load_filter(None).unwrap();
        assert!(filter.is_none());
    }

    #[test]
    fn unknown_field_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"nmae": {}}"#).unwrap();

        let err = load_filter::<TagFilter>(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, CliError::Filter(ref msg) if msg.contains("bad.json")));
    }
}
