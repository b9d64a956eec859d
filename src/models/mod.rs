mod ingredient;
mod price;
mod recipe;
mod tag;
mod user;

pub use ingredient::Ingredient;
pub use price::{Price, PriceError};
pub use recipe::{NameInput, NewRecipe, Recipe, RecipeChanges, RecipeFields, RecipeSummary};
pub use tag::{NameFields, Tag};
pub use user::{normalize_email, validate_email, User, UserProfile};

/// Longest value accepted for names, titles, emails and links.
pub const MAX_TEXT_LEN: usize = 255;

pub(crate) const REQUIRED: &str = "This field is required.";

/// Trims `value` and checks it is non-blank and within [`MAX_TEXT_LEN`].
pub(crate) fn clean_text(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    check_length(value)?;
    Ok(value.to_string())
}

pub(crate) fn check_length(value: &str) -> Result<(), String> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            MAX_TEXT_LEN
        ));
    }
    Ok(())
}
