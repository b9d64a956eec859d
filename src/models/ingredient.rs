use serde::Serialize;
use std::fmt;

/// An ingredient name, owned by one account and shared across its recipes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub user_id: i64,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
