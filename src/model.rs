//! Stored records of the recipe API.
//!
//! These are fully materialized snapshots handed over by the storage
//! collaborator. Nothing here fetches lazily.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::Target;
use crate::request::UserId;

macro_rules! record_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Recipe`].
    RecipeId
);
record_id!(
    /// Identifier of an [`Ingredient`].
    IngredientId
);
record_id!(
    /// Identifier of a [`LineItem`].
    LineItemId
);
record_id!(
    /// Identifier of a [`Comment`].
    CommentId
);
record_id!(
    /// Identifier of a [`Profile`].
    ProfileId
);

/// Records whose access depends on who owns them.
pub trait Owned {
    /// Snapshot of the ownership facts the decision engine needs.
    fn target(&self) -> Target;
}

/// A user account as known to the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A shared ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    /// Blob key of the ingredient picture
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Creator, cleared when the account is removed
    pub created_by: Option<UserId>,
}

impl Owned for Ingredient {
    fn target(&self) -> Target {
        Target::new(self.id.0, self.created_by)
    }
}

/// A recipe-to-ingredient association with per-recipe overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub recipe: RecipeId,
    pub ingredient: IngredientId,
    /// Replaces the ingredient name for this recipe when set
    pub custom_name: Option<String>,
    /// Replaces the ingredient picture for this recipe when non-empty
    pub custom_image: Option<String>,
    pub amount: f64,
    pub unit: String,
}

/// A user-authored recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    #[serde(rename = "user")]
    pub owner: UserId,
    pub title: String,
    pub time_minutes: u32,
    pub description: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Owned for Recipe {
    fn target(&self) -> Target {
        Target::new(self.id.0, Some(self.owner))
    }
}

/// A comment, bound to its recipe for life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "user")]
    pub owner: UserId,
    pub recipe: RecipeId,
    #[serde(rename = "comment")]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Owned for Comment {
    fn target(&self) -> Target {
        Target::new(self.id.0, Some(self.owner))
    }
}

/// Per-user profile, created by the system when the user is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(rename = "user")]
    pub owner: UserId,
    pub image: Option<String>,
    pub bio: String,
    pub phone_number: Option<String>,
}

impl Owned for Profile {
    fn target(&self) -> Target {
        Target::new(self.id.0, Some(self.owner))
    }
}
