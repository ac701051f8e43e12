//! The access policy as a static decision table.
//!
//! Every `(ResourceKind, Action)` pair maps to exactly one [`Requirement`].
//! The table is a `match` so adding a resource kind or action fails to
//! compile until the policy for it is written down.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of resources exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A user-authored recipe
    Recipe,
    /// A shared ingredient
    Ingredient,
    /// A comment nested under a recipe
    Comment,
    /// A user profile
    Profile,
}

impl ResourceKind {
    /// All resource kinds, for exhaustive checks.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Recipe,
        ResourceKind::Ingredient,
        ResourceKind::Comment,
        ResourceKind::Profile,
    ];

    /// Lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Recipe => "recipe",
            ResourceKind::Ingredient => "ingredient",
            ResourceKind::Comment => "comment",
            ResourceKind::Profile => "profile",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create a new object
    Create,
    /// List a collection
    List,
    /// Read a single object
    Retrieve,
    /// Replace an object
    Update,
    /// Modify some fields of an object
    PartialUpdate,
    /// Delete an object
    Destroy,
    /// The caller's own profile
    Me,
}

impl Action {
    /// All actions, for exhaustive checks.
    pub const ALL: [Action; 7] = [
        Action::Create,
        Action::List,
        Action::Retrieve,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
        Action::Me,
    ];

    /// Lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::PartialUpdate => "partial_update",
            Action::Destroy => "destroy",
            Action::Me => "me",
        }
    }

    /// True for actions that change stored state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Action::Create | Action::Update | Action::PartialUpdate | Action::Destroy
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability requirement that a principal must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, including anonymous callers
    Public,
    /// Any authenticated principal, no ownership check
    AuthenticatedAny,
    /// The authenticated owner of the target
    OwnerOnly,
    /// The authenticated owner of the target, or an admin
    OwnerOrAdmin,
    /// An authenticated admin
    AdminOnly,
    /// Performed by the system itself, never by a client
    SystemOnly,
}

/// Looks up the requirement for `action` on `kind`.
///
/// Comment update is owner-only while comment destroy also admits admins.
/// Ingredient writes only need authentication and carry no ownership check.
pub fn requirement_for(kind: ResourceKind, action: Action) -> Requirement {
    use Action::*;
    use Requirement::*;

    match (kind, action) {
        (ResourceKind::Recipe, Create) => AuthenticatedAny,
        (ResourceKind::Recipe, List | Retrieve) => Public,
        (ResourceKind::Recipe, Update | PartialUpdate | Destroy) => OwnerOnly,
        (ResourceKind::Recipe, Me) => AuthenticatedAny,

        (ResourceKind::Ingredient, Create) => AuthenticatedAny,
        (ResourceKind::Ingredient, List | Retrieve) => Public,
        (ResourceKind::Ingredient, Update | PartialUpdate | Destroy) => AuthenticatedAny,
        (ResourceKind::Ingredient, Me) => AuthenticatedAny,

        (ResourceKind::Comment, Create) => AuthenticatedAny,
        (ResourceKind::Comment, List | Retrieve) => Public,
        (ResourceKind::Comment, Update | PartialUpdate) => OwnerOnly,
        (ResourceKind::Comment, Destroy) => OwnerOrAdmin,
        (ResourceKind::Comment, Me) => AuthenticatedAny,

        (ResourceKind::Profile, Create) => SystemOnly,
        (ResourceKind::Profile, List | Retrieve) => AdminOnly,
        (ResourceKind::Profile, Update | PartialUpdate) => OwnerOnly,
        (ResourceKind::Profile, Destroy) => AdminOnly,
        (ResourceKind::Profile, Me) => AuthenticatedAny,
    }
}
