/// The kinds of entity the library stores and can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Scene,
    Image,
    Gallery,
    Performer,
    Studio,
    Tag,
    Group,
}

const ALL_ENTITIES: &[EntityKind] = &[
    EntityKind::Scene,
    EntityKind::Image,
    EntityKind::Gallery,
    EntityKind::Performer,
    EntityKind::Studio,
    EntityKind::Tag,
    EntityKind::Group,
];

impl EntityKind {
    /// Plural name, used on the command line and as the default table name.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Scene => "scenes",
            Self::Image => "images",
            Self::Gallery => "galleries",
            Self::Performer => "performers",
            Self::Studio => "studios",
            Self::Tag => "tags",
            Self::Group => "groups",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Image => "image",
            Self::Gallery => "gallery",
            Self::Performer => "performer",
            Self::Studio => "studio",
            Self::Tag => "tag",
            Self::Group => "group",
        }
    }

    pub fn all() -> &'static [EntityKind] {
        ALL_ENTITIES
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}

/// Error returned when a string names no entity kind.
#[derive(Debug, Clone)]
pub struct EntityParseError(pub String);

impl std::fmt::Display for EntityParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown entity: '{}'", self.0)
    }
}

impl std::error::Error for EntityParseError {}

impl std::str::FromStr for EntityKind {
    type Err = EntityParseError;

    /// Accepts singular or plural names, case-insensitive. `movies` is an
    /// older name for groups.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "movie" || lower == "movies" {
            return Ok(Self::Group);
        }
        ALL_ENTITIES
            .iter()
            .copied()
            .find(|e| e.plural() == lower || e.singular() == lower)
            .ok_or_else(|| EntityParseError(s.to_string()))
    }
}
