//! Access decisions, line-item composition and nested-resource scoping for
//! a recipe-sharing API.
//!
//! The crate is the decision core of the API. Storage, blob hosting and HTTP
//! routing are collaborators; the core only decides, composes and scopes:
//!
//! - **Access decisions**: [`decide`] maps a resource kind, an action, the
//!   caller and the target's ownership to a [`Verdict`]. [`AccessGate`] wraps
//!   it per request and hands out a [`Grant`] that every write requires.
//! - **Composition**: [`resolve_display`] picks the shown name and picture of
//!   a recipe line item from its per-recipe overrides and the shared
//!   ingredient.
//! - **Scoping**: [`scope_filter`], [`within_scope`] and [`bind_on_create`]
//!   keep comments bound to the recipe named by the request path.
//!
//! [`RecipeService`] wires these over a [`Storage`] into the full API, and
//! the [`web`] module maps framework-agnostic requests onto it.
//!
//! # Examples
//!
//! ```
//! use recipe_policy::{decide, Action, Principal, ResourceKind, Target, UserId, Verdict};
//!
//! let comment = Target::new(9, Some(UserId(4)));
//!
//! // Comments may be removed by their author or by an admin.
//! assert_eq!(
//!     decide(ResourceKind::Comment, Action::Destroy, &Principal::admin(1), Some(&comment)),
//!     Verdict::Allow,
//! );
//! assert_eq!(
//!     decide(ResourceKind::Comment, Action::Destroy, &Principal::user(5), Some(&comment)),
//!     Verdict::Forbidden,
//! );
//!
//! // Reads are public.
//! assert!(decide(ResourceKind::Recipe, Action::List, &Principal::anonymous(), None).is_allowed());
//! ```

#![forbid(unsafe_code)]

pub mod audit;
mod capability;
mod collection;
mod compose;
mod config;
mod context;
mod error;
mod gate;
mod model;
mod payload;
mod policy;
mod profile;
mod request;
mod scope;
mod service;
mod storage;
pub mod web;

pub use capability::Grant;
pub use collection::{paginate, Page, PageRequest, RecipeListing, RecipeQuery, SortKey, SortTerm};
pub use compose::{
    compose_line_item, compose_recipe, resolve_display, BlobResolver, ComposedLineItem,
    DisplayAttributes, LineItemSnapshot, MediaResolver, RecipeView,
};
pub use config::ApiConfig;
pub use context::{PrincipalContext, ScopeContext};
pub use error::{Error, Violation, ViolationKind};
pub use gate::{decide, AccessGate, Target, Verdict};
pub use model::{
    Comment, CommentId, Ingredient, IngredientId, LineItem, LineItemId, Owned, Profile, ProfileId,
    Recipe, RecipeId, User,
};
pub use payload::{CommentEdit, IngredientDraft, LineItemDraft, RecipeDraft, RecipePatch};
pub use policy::{requirement_for, Action, Requirement, ResourceKind};
pub use profile::{on_user_created, NewProfile, ProfileUpdate, UserCreated};
pub use request::{Principal, RequestMeta, UserId};
pub use scope::{bind_on_create, scope_filter, within_scope, CommentDraft, NewComment, Scoped};
pub use service::{IngredientView, ProfileView, RecipeService};
pub use storage::{MemoryStorage, Storage};
