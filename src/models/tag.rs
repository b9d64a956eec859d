use serde::{Deserialize, Serialize};
use std::fmt;

use super::{clean_text, REQUIRED};
use crate::error::{Error, Result};

/// A label for grouping recipes, owned by one account.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub user_id: i64,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Request body for updating a tag or an ingredient.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameFields {
    pub name: Option<String>,
}

impl NameFields {
    /// The cleaned new name, or `None` for a partial update that leaves it
    /// untouched. A full update must supply a name.
    pub fn validate(self, partial: bool) -> Result<Option<String>> {
        match self.name {
            Some(name) => clean_text(&name)
                .map(Some)
                .map_err(|message| Error::invalid("name", message)),
            None if partial => Ok(None),
            None => Err(Error::invalid("name", REQUIRED)),
        }
    }
}
