//! Account creation and maintenance.
//!
//! This is the only path by which accounts come into existence. It
//! normalizes the email, enforces uniqueness, keeps callers to an explicit
//! allow-list of attributes and stores an Argon2 hash instead of the
//! password.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::db::{NewUser, UserRepository};
use crate::error::{Error, FieldErrors, Result};
use crate::models::{check_length, normalize_email, validate_email, User, REQUIRED};
use crate::passwords::Passwords;

const DUPLICATE_EMAIL: &str = "user with this email address already exists.";

/// Attributes a caller may set when creating an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountAttributes {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl AccountAttributes {
    /// Keys accepted by [`from_fields`](Self::from_fields).
    pub const ALLOWED: [&'static str; 4] = ["name", "is_active", "is_staff", "is_superuser"];

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Builds attributes from a loose key/value map. Keys outside
    /// [`ALLOWED`](Self::ALLOWED), and values of the wrong type, are dropped.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let mut attrs = Self::default();
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("name", Value::String(name)) => attrs.name = Some(name.clone()),
                ("is_active", Value::Bool(flag)) => attrs.is_active = Some(*flag),
                ("is_staff", Value::Bool(flag)) => attrs.is_staff = Some(*flag),
                ("is_superuser", Value::Bool(flag)) => attrs.is_superuser = Some(*flag),
                _ => tracing::debug!("Ignoring account attribute '{}'", key),
            }
        }
        attrs
    }
}

/// Body of the public sign-up request. Other keys are ignored, so public
/// callers can never set the staff or superuser flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUp {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Changes to the caller's own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AccountService {
    users: UserRepository,
    passwords: Passwords,
    min_password_length: usize,
}

impl AccountService {
    pub fn new(users: UserRepository, passwords: Passwords, min_password_length: usize) -> Self {
        Self {
            users,
            passwords,
            min_password_length,
        }
    }

    /// Creates a regular account. Staff and superuser default to false and
    /// the account is active unless `attrs` says otherwise.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        attrs: AccountAttributes,
    ) -> Result<User> {
        let mut errors = FieldErrors::new();
        let email = self.clean_email(email, &mut errors);
        if password.is_empty() {
            errors.add("password", REQUIRED);
        }
        let name = attrs.name.unwrap_or_default();
        let name = name.trim();
        if let Err(message) = check_length(name) {
            errors.add("name", message);
        }
        errors.into_result()?;

        self.ensure_email_free(&email, None).await?;

        let password_hash = self.passwords.hash_blocking(password.to_string()).await?;
        let user = self
            .users
            .insert(&NewUser {
                email: &email,
                name,
                password_hash: &password_hash,
                is_staff: attrs.is_staff.unwrap_or(false),
                is_active: attrs.is_active.unwrap_or(true),
                is_superuser: attrs.is_superuser.unwrap_or(false),
            })
            .await
            .map_err(duplicate_as_validation)?;

        tracing::info!("Created account {} (id {})", user.email, user.id);
        Ok(user)
    }

    /// Creates an account with staff and superuser forced on.
    pub async fn create_elevated_account(
        &self,
        email: &str,
        password: &str,
        attrs: AccountAttributes,
    ) -> Result<User> {
        let attrs = AccountAttributes {
            is_staff: Some(true),
            is_superuser: Some(true),
            ..attrs
        };
        self.create_account(email, password, attrs).await
    }

    /// Public sign-up: applies the password length policy, then creates a
    /// regular account with only a name attribute.
    pub async fn sign_up(&self, request: SignUp) -> Result<User> {
        let mut errors = FieldErrors::new();
        if request.email.trim().is_empty() {
            errors.add("email", REQUIRED);
        }
        self.check_password_policy(&request.password, &mut errors);
        errors.into_result()?;

        self.create_account(
            &request.email,
            &request.password,
            AccountAttributes::named(request.name),
        )
        .await
    }

    /// Updates the caller's own email, name or password. A full update
    /// (`partial == false`) must supply all three.
    pub async fn update_profile(
        &self,
        user: &User,
        changes: ProfileChanges,
        partial: bool,
    ) -> Result<User> {
        let mut errors = FieldErrors::new();
        if !partial {
            for (field, present) in [
                ("email", changes.email.is_some()),
                ("password", changes.password.is_some()),
                ("name", changes.name.is_some()),
            ] {
                if !present {
                    errors.add(field, REQUIRED);
                }
            }
        }

        let mut updated = user.clone();
        if let Some(email) = &changes.email {
            updated.email = self.clean_email(email, &mut errors);
        }
        if let Some(name) = &changes.name {
            let name = name.trim();
            match check_length(name) {
                Ok(()) => updated.name = name.to_string(),
                Err(message) => errors.add("name", message),
            }
        }
        if let Some(password) = &changes.password {
            self.check_password_policy(password, &mut errors);
        }
        errors.into_result()?;

        if updated.email != user.email {
            self.ensure_email_free(&updated.email, Some(user.id)).await?;
        }
        if let Some(password) = changes.password {
            updated.password_hash = self.passwords.hash_blocking(password).await?;
        }

        let saved = self
            .users
            .update(&updated)
            .await
            .map_err(duplicate_as_validation)?;
        tracing::info!("Updated profile for account {}", saved.id);
        Ok(saved)
    }

    pub async fn find(&self, email: &str) -> Result<User> {
        self.users
            .get_by_email(&normalize_email(email))
            .await?
            .ok_or(Error::NotFound)
    }

    pub async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<User>> {
        Ok(self.users.list(search).await?)
    }

    pub async fn set_active(&self, email: &str, active: bool) -> Result<User> {
        let mut user = self.find(email).await?;
        user.is_active = active;
        Ok(self.users.update(&user).await?)
    }

    pub async fn set_staff(&self, email: &str, staff: bool) -> Result<User> {
        let mut user = self.find(email).await?;
        user.is_staff = staff;
        Ok(self.users.update(&user).await?)
    }

    /// Deletes the account together with its tokens, recipes, tags and
    /// ingredients.
    pub async fn delete_account(&self, email: &str) -> Result<()> {
        let user = self.find(email).await?;
        if !self.users.delete(user.id).await? {
            return Err(Error::NotFound);
        }
        tracing::info!("Deleted account {}", user.email);
        Ok(())
    }

    fn clean_email(&self, email: &str, errors: &mut FieldErrors) -> String {
        let email = normalize_email(email);
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if let Err(message) = validate_email(&email) {
            errors.add("email", message);
        }
        email
    }

    fn check_password_policy(&self, password: &str, errors: &mut FieldErrors) {
        if password.is_empty() {
            errors.add("password", REQUIRED);
        } else if password.chars().count() < self.min_password_length {
            errors.add(
                "password",
                format!(
                    "Ensure this field has at least {} characters.",
                    self.min_password_length
                ),
            );
        }
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i64>) -> Result<()> {
        match self.users.get_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(Error::invalid("email", DUPLICATE_EMAIL))
            }
            _ => Ok(()),
        }
    }
}

/// A racing insert can still hit the UNIQUE constraint after the pre-check.
fn duplicate_as_validation(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::invalid("email", DUPLICATE_EMAIL)
        }
        _ => Error::Database(e),
    }
}
