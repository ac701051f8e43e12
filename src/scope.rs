//! Scoping of comments to the recipe named by the request path.
//!
//! The parent comes from the path, never from the payload. A comment
//! looked up under the wrong recipe is reported exactly like a missing one,
//! so callers cannot probe for comments under other recipes.

use serde::Deserialize;

use crate::context::{PrincipalContext, ScopeContext};
use crate::error::Violation;
use crate::model::{Comment, RecipeId};
use crate::request::UserId;

/// Child records bound to a parent recipe.
pub trait Scoped {
    /// The recipe this record belongs to.
    fn parent_id(&self) -> RecipeId;
}

impl Scoped for Comment {
    fn parent_id(&self) -> RecipeId {
        self.recipe
    }
}

/// Returns a predicate selecting the children of `parent`.
///
/// # Examples
///
/// ```
/// use recipe_policy::{scope_filter, RecipeId, Scoped};
///
/// struct Child(u64);
/// impl Scoped for Child {
///     fn parent_id(&self) -> RecipeId {
///         RecipeId(self.0)
///     }
/// }
///
/// let in_five = scope_filter(RecipeId(5));
/// assert!(in_five(&Child(5)));
/// assert!(!in_five(&Child(7)));
/// ```
pub fn scope_filter<T: Scoped>(parent: RecipeId) -> impl Fn(&T) -> bool {
    move |child| child.parent_id() == parent
}

/// Narrows a lookup result to `scope`.
///
/// `found` is whatever storage returned for the requested id, regardless of
/// parent. Both "absent" and "under another parent" yield `NotFound`.
pub fn within_scope<T: Scoped>(
    found: Option<T>,
    scope: &ScopeContext,
    resource: &'static str,
) -> Result<T, Violation> {
    match found {
        Some(child) if child.parent_id() == scope.parent() => Ok(child),
        _ => Err(Violation::not_found(resource)),
    }
}

/// A comment payload as submitted by a client.
///
/// Clients may send `recipe` and `user`; both are ignored in favour of the
/// path and the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentDraft {
    #[serde(default, alias = "recipe")]
    pub parent_id: Option<u64>,
    #[serde(default, alias = "user")]
    pub owner_id: Option<u64>,
    #[serde(alias = "comment")]
    pub body: String,
}

impl CommentDraft {
    /// Rejects blank comment bodies.
    pub fn validate(&self) -> Result<(), Violation> {
        if self.body.trim().is_empty() {
            return Err(Violation::validation("comment", "This field may not be blank."));
        }
        Ok(())
    }
}

/// A comment payload after binding, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub recipe: RecipeId,
    pub owner: UserId,
    pub body: String,
}

/// Binds a draft to the path-derived parent and the authenticated caller.
///
/// # Errors
///
/// Returns `Unauthenticated` if the caller is anonymous.
///
/// # Examples
///
/// ```
/// use recipe_policy::{bind_on_create, CommentDraft, Principal, PrincipalContext, RecipeId, ScopeContext, UserId};
///
/// let draft = CommentDraft {
///     parent_id: Some(999),
///     owner_id: Some(42),
///     body: "Lovely".to_string(),
/// };
/// let ctx = PrincipalContext::new("req-1", Principal::user(7));
///
/// let bound = bind_on_create(draft, &ScopeContext::new(RecipeId(5)), &ctx).unwrap();
/// assert_eq!(bound.recipe, RecipeId(5));
/// assert_eq!(bound.owner, UserId(7));
/// ```
pub fn bind_on_create(
    draft: CommentDraft,
    scope: &ScopeContext,
    ctx: &PrincipalContext,
) -> Result<NewComment, Violation> {
    let owner = ctx.require_authenticated()?;

    if draft.parent_id.is_some_and(|p| p != scope.parent().0)
        || draft.owner_id.is_some_and(|o| o != owner.0)
    {
        tracing::debug!(
            request_id = %ctx.request_id(),
            supplied_parent = ?draft.parent_id,
            supplied_owner = ?draft.owner_id,
            "discarding client-supplied comment binding"
        );
    }

    Ok(NewComment {
        recipe: scope.parent(),
        owner,
        body: draft.body,
    })
}
