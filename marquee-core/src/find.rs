use serde::{Deserialize, Serialize};

/// `per_page` value that disables pagination.
pub const PER_PAGE_ALL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction: '{other}'")),
        }
    }
}

/// Free-text search, sort and pagination for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindFilter {
    /// Search string matched against the entity's search columns.
    pub q: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size; `-1` returns everything.
    pub per_page: Option<i64>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
}

impl FindFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(sort.into());
        self.direction = Some(direction);
        self
    }

    pub fn with_page(mut self, page: i64, per_page: i64) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    pub fn unpaginated(mut self) -> Self {
        self.page = None;
        self.per_page = Some(PER_PAGE_ALL);
        self
    }

    /// Page number, clamped to at least 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size, or `None` when results are unpaginated.
    pub fn page_size(&self, default: i64) -> Option<i64> {
        match self.per_page.unwrap_or(default) {
            n if n < 0 => None,
            n => Some(n),
        }
    }

    pub fn sort_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.sort.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => default,
        }
    }

    pub fn direction(&self) -> SortDirection {
        self.direction.unwrap_or_default()
    }

    /// Trimmed search text, if any.
    pub fn query_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}
