use serde::{Deserialize, Serialize};
use std::fmt;

use super::ingredient::Ingredient;
use super::price::Price;
use super::tag::Tag;
use super::{check_length, clean_text, REQUIRED};
use crate::error::{Error, FieldErrors, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recipe {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// List view of a recipe: everything but the description.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            tags: recipe.tags,
            ingredients: recipe.ingredients,
        }
    }
}

/// A nested `{"name": ...}` reference to a tag or ingredient.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NameInput {
    pub name: String,
}

/// Raw recipe request body. Every field is optional here; which ones are
/// required depends on whether it is a create, a full or a partial update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<serde_json::Value>,
    pub link: Option<String>,
    pub tags: Option<Vec<NameInput>>,
    pub ingredients: Option<Vec<NameInput>>,
}

/// A validated recipe ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

impl NewRecipe {
    pub fn new(title: impl Into<String>, time_minutes: i32, price: Price) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            time_minutes,
            price,
            link: String::new(),
            tags: Vec::new(),
            ingredients: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<String>) -> Self {
        self.ingredients = ingredients;
        self
    }
}

/// Validated changes to an existing recipe. `None` leaves a field as is;
/// `Some` tag or ingredient lists replace the whole set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Price>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeFields {
    /// Validates a create request.
    pub fn into_new(self) -> Result<NewRecipe> {
        let changes = self.validate(false)?;
        match (changes.title, changes.time_minutes, changes.price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(NewRecipe {
                title,
                description: changes.description.unwrap_or_default(),
                time_minutes,
                price,
                link: changes.link.unwrap_or_default(),
                tags: changes.tags.unwrap_or_default(),
                ingredients: changes.ingredients.unwrap_or_default(),
            }),
            _ => Err(Error::invalid("non_field_errors", REQUIRED)),
        }
    }

    /// Validates an update. A full update (`partial == false`) must carry
    /// the title, time and price; a partial one may carry anything.
    pub fn validate(self, partial: bool) -> Result<RecipeChanges> {
        let mut errors = FieldErrors::new();
        let mut changes = RecipeChanges::default();

        match self.title {
            Some(title) => match clean_text(&title) {
                Ok(title) => changes.title = Some(title),
                Err(message) => errors.add("title", message),
            },
            None if !partial => errors.add("title", REQUIRED),
            None => {}
        }

        match self.time_minutes {
            Some(minutes) => match i32::try_from(minutes) {
                Ok(minutes) if minutes >= 0 => changes.time_minutes = Some(minutes),
                _ => errors.add(
                    "time_minutes",
                    "Ensure this value is a whole number of minutes, 0 or more.",
                ),
            },
            None if !partial => errors.add("time_minutes", REQUIRED),
            None => {}
        }

        match self.price {
            Some(value) => match Price::from_json(&value) {
                Ok(price) => changes.price = Some(price),
                Err(e) => errors.add("price", e.to_string()),
            },
            None if !partial => errors.add("price", REQUIRED),
            None => {}
        }

        if let Some(description) = self.description {
            changes.description = Some(description);
        }

        if let Some(link) = self.link {
            let link = link.trim().to_string();
            match check_length(&link) {
                Ok(()) => changes.link = Some(link),
                Err(message) => errors.add("link", message),
            }
        }

        if let Some(tags) = self.tags {
            changes.tags = clean_names("tags", tags, &mut errors);
        }
        if let Some(ingredients) = self.ingredients {
            changes.ingredients = clean_names("ingredients", ingredients, &mut errors);
        }

        errors.into_result()?;
        Ok(changes)
    }
}

/// Cleans nested names, dropping duplicates but keeping first-seen order.
fn clean_names(
    field: &str,
    inputs: Vec<NameInput>,
    errors: &mut FieldErrors,
) -> Option<Vec<String>> {
    let mut names: Vec<String> = Vec::with_capacity(inputs.len());
    for input in inputs {
        match clean_text(&input.name) {
            Ok(name) => {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            Err(message) => {
                errors.add(field, message);
                return None;
            }
        }
    }
    Some(names)
}
