//! Hydrated entity rows returned by the readers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    TransgenderMale,
    TransgenderFemale,
    Intersex,
    NonBinary,
}

impl Gender {
    /// Stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::TransgenderMale => "TRANSGENDER_MALE",
            Self::TransgenderFemale => "TRANSGENDER_FEMALE",
            Self::Intersex => "INTERSEX",
            Self::NonBinary => "NON_BINARY",
        }
    }
}

impl AsRef<str> for Gender {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            "TRANSGENDER_MALE" => Ok(Self::TransgenderMale),
            "TRANSGENDER_FEMALE" => Ok(Self::TransgenderFemale),
            "INTERSEX" => Ok(Self::Intersex),
            "NON_BINARY" => Ok(Self::NonBinary),
            _ => Err(format!("unknown gender: '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: i64,
    pub title: Option<String>,
    pub code: Option<String>,
    pub details: Option<String>,
    pub director: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub organized: bool,
    pub studio_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub title: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub organized: bool,
    pub studio_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: i64,
    pub title: Option<String>,
    pub details: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    pub organized: bool,
    pub studio_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    pub id: i64,
    pub name: String,
    pub disambiguation: Option<String>,
    pub gender: Option<Gender>,
    pub birthdate: Option<String>,
    pub details: Option<String>,
    pub rating: Option<i64>,
    pub favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Studio {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub details: Option<String>,
    pub rating: Option<i64>,
    pub favorite: bool,
    pub parent_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A group of scenes (formerly "movie").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub director: Option<String>,
    pub synopsis: Option<String>,
    pub date: Option<String>,
    pub rating: Option<i64>,
    /// Seconds.
    pub duration: Option<i64>,
    pub studio_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}
