//! Profile lifecycle.
//!
//! Profiles are never created by clients. The identity collaborator reports
//! each new account with a [`UserCreated`] event and synchronously invokes
//! [`on_user_created`], which describes the profile to store.

use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::model::{Profile, User};
use crate::request::UserId;

const MAX_PHONE_LEN: usize = 255;

/// Raised by the identity collaborator after it stored a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user: User,
}

/// A profile to be stored for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub owner: UserId,
    pub image: Option<String>,
    pub bio: String,
    pub phone_number: Option<String>,
}

/// Describes the empty profile every new user gets.
pub fn on_user_created(event: &UserCreated) -> NewProfile {
    tracing::info!(user_id = %event.user.id, username = %event.user.username, "creating profile for new user");
    NewProfile {
        owner: event.user.id,
        image: None,
        bio: String::new(),
        phone_number: None,
    }
}

/// Editable profile fields.
///
/// The owning user is never taken from the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    /// Checks field constraints.
    pub fn validate(&self) -> Result<(), Violation> {
        if let Some(phone) = &self.phone_number {
            if phone.chars().count() > MAX_PHONE_LEN {
                return Err(Violation::validation(
                    "phone_number",
                    format!("Ensure this field has no more than {} characters.", MAX_PHONE_LEN),
                ));
            }
        }
        Ok(())
    }

    /// Applies the update to `profile`.
    ///
    /// A full update clears the fields it leaves out; a partial update
    /// keeps them.
    pub fn apply_to(self, profile: &mut Profile, partial: bool) {
        if !partial || self.image.is_some() {
            profile.image = self.image;
        }
        if !partial || self.bio.is_some() {
            profile.bio = self.bio.unwrap_or_default();
        }
        if !partial || self.phone_number.is_some() {
            profile.phone_number = self.phone_number;
        }
    }
}
