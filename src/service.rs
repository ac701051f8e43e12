//! The recipe API operations, wired over a [`Storage`].
//!
//! Writes follow one order: load the target (absent is `NotFound`), ask the
//! gate, validate the payload, then write. Reads come back as composed views
//! with absolute image URLs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::audit::AuditTrail;
use crate::capability::Grant;
use crate::collection::{paginate, Page, PageRequest, RecipeListing, RecipeQuery};
use crate::compose::{compose_recipe, BlobResolver, MediaResolver, RecipeView};
use crate::config::ApiConfig;
use crate::context::{PrincipalContext, ScopeContext};
use crate::error::{Error, Violation};
use crate::gate::AccessGate;
use crate::model::{
    Comment, CommentId, Ingredient, IngredientId, LineItemId, Owned, Profile, ProfileId, Recipe,
    RecipeId,
};
use crate::payload::{CommentEdit, IngredientDraft, RecipeDraft, RecipePatch};
use crate::policy::{Action, ResourceKind};
use crate::profile::{on_user_created, ProfileUpdate, UserCreated};
use crate::request::UserId;
use crate::scope::{bind_on_create, scope_filter, within_scope, CommentDraft};
use crate::storage::Storage;

/// Read view of an ingredient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientView {
    pub id: IngredientId,
    pub name: String,
    pub image: Url,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Read view of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub id: ProfileId,
    pub user: UserId,
    pub image: Option<Url>,
    pub bio: String,
    pub phone_number: Option<String>,
}

fn update_action(partial: bool) -> Action {
    if partial {
        Action::PartialUpdate
    } else {
        Action::Update
    }
}

/// All API operations over one storage backend.
///
/// # Examples
///
/// ```
/// use recipe_policy::{ApiConfig, MemoryStorage, Principal, PrincipalContext, RecipeQuery, RecipeService};
///
/// let service = RecipeService::new(MemoryStorage::new(), ApiConfig::default()).unwrap();
/// let anonymous = PrincipalContext::new("req-1", Principal::anonymous());
///
/// let page = service.list_recipes(&anonymous, &RecipeQuery::default()).unwrap();
/// assert_eq!(page.count, 0);
/// ```
#[derive(Debug)]
pub struct RecipeService<S> {
    storage: S,
    config: ApiConfig,
    media: MediaResolver,
    trail: Option<Arc<AuditTrail>>,
}

impl<S: Storage> RecipeService<S> {
    /// Creates a service over `storage`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` is inconsistent.
    pub fn new(storage: S, config: ApiConfig) -> Result<Self, Error> {
        config.validate()?;
        let media = MediaResolver::from_config(&config)?;
        tracing::info!(origin = %config.origin, page_size = config.page_size, "recipe service ready");
        Ok(Self {
            storage,
            config,
            media,
            trail: None,
        })
    }

    /// Records every access decision into `trail` as well.
    ///
    /// Decisions always go to the `recipe_audit` tracing target; the trail is
    /// for callers that want to inspect them in process.
    pub fn with_trail(mut self, trail: Arc<AuditTrail>) -> Self {
        self.trail = Some(trail);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The attached audit trail, if any.
    pub fn trail(&self) -> Option<&AuditTrail> {
        self.trail.as_deref()
    }

    fn gate<'a>(&'a self, ctx: &'a PrincipalContext) -> AccessGate<'a> {
        match self.trail.as_deref() {
            Some(trail) => AccessGate::new(ctx).with_trail(trail),
            None => AccessGate::new(ctx),
        }
    }

    // Recipes

    /// Lists recipes, filtered, ordered and paginated by `query`.
    pub fn list_recipes(
        &self,
        ctx: &PrincipalContext,
        query: &RecipeQuery,
    ) -> Result<Page<RecipeView>, Violation> {
        self.gate(ctx).check(ResourceKind::Recipe, Action::List, None)?;

        let listings = self
            .storage
            .recipes()
            .into_iter()
            .map(|recipe| RecipeListing {
                owner_username: self
                    .storage
                    .user(recipe.owner)
                    .map(|u| u.username)
                    .unwrap_or_default(),
                items: self.storage.line_items(recipe.id),
                recipe,
            })
            .collect();

        let page = query.apply(listings, &self.config)?;
        Ok(page.map(|l| compose_recipe(&l.recipe, &l.items, &self.media)))
    }

    pub fn get_recipe(&self, ctx: &PrincipalContext, id: RecipeId) -> Result<RecipeView, Violation> {
        let recipe = self.load_recipe(id)?;
        self.gate(ctx)
            .check(ResourceKind::Recipe, Action::Retrieve, Some(&recipe.target()))?;
        Ok(self.recipe_view(&recipe))
    }

    /// Creates a recipe owned by the caller, with its line items.
    pub fn create_recipe(&self, ctx: &PrincipalContext, draft: RecipeDraft) -> Result<RecipeView, Violation> {
        let grant = self.gate(ctx).check(ResourceKind::Recipe, Action::Create, None)?;
        let owner = ctx.require_authenticated()?;
        draft.validate()?;

        let recipe = self.storage.insert_recipe(&grant, owner, &draft)?;
        tracing::info!(request_id = %ctx.request_id(), recipe_id = %recipe.id, "recipe created");
        Ok(self.recipe_view(&recipe))
    }

    /// Replaces a recipe and all of its line items.
    pub fn update_recipe(
        &self,
        ctx: &PrincipalContext,
        id: RecipeId,
        draft: RecipeDraft,
    ) -> Result<RecipeView, Violation> {
        let mut recipe = self.load_recipe(id)?;
        let grant = self
            .gate(ctx)
            .check(ResourceKind::Recipe, Action::Update, Some(&recipe.target()))?;
        draft.validate()?;

        draft.apply_to(&mut recipe);
        let recipe = self
            .storage
            .update_recipe(&grant, recipe, Some(&draft.ingredients))?;
        Ok(self.recipe_view(&recipe))
    }

    /// Changes the fields present in `patch`.
    pub fn partial_update_recipe(
        &self,
        ctx: &PrincipalContext,
        id: RecipeId,
        patch: RecipePatch,
    ) -> Result<RecipeView, Violation> {
        let mut recipe = self.load_recipe(id)?;
        let grant = self.gate(ctx).check(
            ResourceKind::Recipe,
            Action::PartialUpdate,
            Some(&recipe.target()),
        )?;
        patch.validate()?;

        patch.apply_to(&mut recipe);
        let recipe = self
            .storage
            .update_recipe(&grant, recipe, patch.ingredients.as_deref())?;
        Ok(self.recipe_view(&recipe))
    }

    pub fn delete_recipe(&self, ctx: &PrincipalContext, id: RecipeId) -> Result<(), Violation> {
        let recipe = self.load_recipe(id)?;
        let grant = self
            .gate(ctx)
            .check(ResourceKind::Recipe, Action::Destroy, Some(&recipe.target()))?;
        self.storage.delete_recipe(&grant, id)?;
        tracing::info!(request_id = %ctx.request_id(), recipe_id = %id, "recipe deleted");
        Ok(())
    }

    /// Removes one line item from a recipe; an edit of that recipe.
    pub fn remove_line_item(
        &self,
        ctx: &PrincipalContext,
        recipe: RecipeId,
        item: LineItemId,
    ) -> Result<RecipeView, Violation> {
        let recipe = self.load_recipe(recipe)?;
        let grant = self.gate(ctx).check(
            ResourceKind::Recipe,
            Action::PartialUpdate,
            Some(&recipe.target()),
        )?;
        if !self.storage.delete_line_item(&grant, recipe.id, item)? {
            return Err(Violation::not_found("line item"));
        }
        Ok(self.recipe_view(&recipe))
    }

    fn load_recipe(&self, id: RecipeId) -> Result<Recipe, Violation> {
        self.storage
            .recipe(id)
            .ok_or_else(|| Violation::not_found("recipe"))
    }

    fn recipe_view(&self, recipe: &Recipe) -> RecipeView {
        compose_recipe(recipe, &self.storage.line_items(recipe.id), &self.media)
    }

    // Ingredients

    pub fn list_ingredients(
        &self,
        ctx: &PrincipalContext,
        page: PageRequest,
    ) -> Result<Page<IngredientView>, Violation> {
        self.gate(ctx).check(ResourceKind::Ingredient, Action::List, None)?;
        let page = paginate(self.storage.ingredients(), page, &self.config)?;
        Ok(page.map(|i| self.ingredient_view(i)))
    }

    pub fn get_ingredient(&self, ctx: &PrincipalContext, id: IngredientId) -> Result<IngredientView, Violation> {
        let ingredient = self.load_ingredient(id)?;
        self.gate(ctx).check(
            ResourceKind::Ingredient,
            Action::Retrieve,
            Some(&ingredient.target()),
        )?;
        Ok(self.ingredient_view(ingredient))
    }

    /// Creates a shared ingredient; the caller is recorded as its creator.
    pub fn create_ingredient(
        &self,
        ctx: &PrincipalContext,
        draft: IngredientDraft,
    ) -> Result<IngredientView, Violation> {
        let grant = self.gate(ctx).check(ResourceKind::Ingredient, Action::Create, None)?;
        let creator = ctx.require_authenticated()?;
        draft.validate(false)?;
        let (Some(name), Some(image)) = (&draft.name, &draft.image) else {
            return Err(Violation::validation("name", "This field is required."));
        };

        let ingredient = self.storage.insert_ingredient(&grant, creator, name, image)?;
        tracing::info!(
            request_id = %ctx.request_id(),
            ingredient_id = %ingredient.id,
            name = %ingredient.name,
            "ingredient created"
        );
        Ok(self.ingredient_view(ingredient))
    }

    pub fn update_ingredient(
        &self,
        ctx: &PrincipalContext,
        id: IngredientId,
        draft: IngredientDraft,
    ) -> Result<IngredientView, Violation> {
        self.write_ingredient(ctx, id, draft, false)
    }

    pub fn partial_update_ingredient(
        &self,
        ctx: &PrincipalContext,
        id: IngredientId,
        draft: IngredientDraft,
    ) -> Result<IngredientView, Violation> {
        self.write_ingredient(ctx, id, draft, true)
    }

    pub fn delete_ingredient(&self, ctx: &PrincipalContext, id: IngredientId) -> Result<(), Violation> {
        let ingredient = self.load_ingredient(id)?;
        let grant = self.gate(ctx).check(
            ResourceKind::Ingredient,
            Action::Destroy,
            Some(&ingredient.target()),
        )?;
        self.storage.delete_ingredient(&grant, id)
    }

    fn write_ingredient(
        &self,
        ctx: &PrincipalContext,
        id: IngredientId,
        draft: IngredientDraft,
        partial: bool,
    ) -> Result<IngredientView, Violation> {
        let mut ingredient = self.load_ingredient(id)?;
        let grant = self.gate(ctx).check(
            ResourceKind::Ingredient,
            update_action(partial),
            Some(&ingredient.target()),
        )?;
        draft.validate(partial)?;

        draft.apply_to(&mut ingredient);
        let ingredient = self.storage.save_ingredient(&grant, ingredient)?;
        Ok(self.ingredient_view(ingredient))
    }

    fn load_ingredient(&self, id: IngredientId) -> Result<Ingredient, Violation> {
        self.storage
            .ingredient(id)
            .ok_or_else(|| Violation::not_found("ingredient"))
    }

    fn ingredient_view(&self, ingredient: Ingredient) -> IngredientView {
        IngredientView {
            id: ingredient.id,
            image: self.media.absolute_url(&ingredient.image),
            name: ingredient.name,
            created_by: ingredient.created_by,
            created_at: ingredient.created_at,
            modified_at: ingredient.modified_at,
        }
    }

    // Comments, always under the recipe named by `scope`

    /// Lists the comments of the scoped recipe, oldest first.
    pub fn list_comments(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        page: PageRequest,
    ) -> Result<Page<Comment>, Violation> {
        self.gate(ctx).check(ResourceKind::Comment, Action::List, None)?;
        let in_scope = scope_filter::<Comment>(scope.parent());
        let mut comments: Vec<_> = self
            .storage
            .comments()
            .into_iter()
            .filter(|c| in_scope(c))
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        paginate(comments, page, &self.config)
    }

    pub fn get_comment(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        id: CommentId,
    ) -> Result<Comment, Violation> {
        let comment = self.load_comment(scope, id)?;
        self.gate(ctx)
            .check(ResourceKind::Comment, Action::Retrieve, Some(&comment.target()))?;
        Ok(comment)
    }

    /// Posts a comment under the scoped recipe as the caller.
    ///
    /// Parent and author supplied in the draft are ignored.
    pub fn create_comment(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        draft: CommentDraft,
    ) -> Result<Comment, Violation> {
        let grant = self.gate(ctx).check(ResourceKind::Comment, Action::Create, None)?;
        self.load_recipe(scope.parent())?;
        draft.validate()?;

        let comment = self
            .storage
            .insert_comment(&grant, bind_on_create(draft, scope, ctx)?)?;
        tracing::info!(
            request_id = %ctx.request_id(),
            recipe_id = %comment.recipe,
            comment_id = %comment.id,
            "comment created"
        );
        Ok(comment)
    }

    pub fn update_comment(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        id: CommentId,
        edit: CommentEdit,
    ) -> Result<Comment, Violation> {
        self.write_comment(ctx, scope, id, edit, false)
    }

    pub fn partial_update_comment(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        id: CommentId,
        edit: CommentEdit,
    ) -> Result<Comment, Violation> {
        self.write_comment(ctx, scope, id, edit, true)
    }

    pub fn delete_comment(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        id: CommentId,
    ) -> Result<(), Violation> {
        let comment = self.load_comment(scope, id)?;
        let grant = self
            .gate(ctx)
            .check(ResourceKind::Comment, Action::Destroy, Some(&comment.target()))?;
        self.storage.delete_comment(&grant, id)
    }

    fn write_comment(
        &self,
        ctx: &PrincipalContext,
        scope: &ScopeContext,
        id: CommentId,
        edit: CommentEdit,
        partial: bool,
    ) -> Result<Comment, Violation> {
        let mut comment = self.load_comment(scope, id)?;
        let grant = self.gate(ctx).check(
            ResourceKind::Comment,
            update_action(partial),
            Some(&comment.target()),
        )?;
        edit.validate()?;

        comment.body = edit.body;
        self.storage.save_comment(&grant, comment)
    }

    fn load_comment(&self, scope: &ScopeContext, id: CommentId) -> Result<Comment, Violation> {
        within_scope(self.storage.comment(id), scope, "comment")
    }

    // Profiles

    /// Stores the profile of a newly created user.
    ///
    /// Invoked by the identity collaborator. Returns the existing profile if
    /// the user already has one.
    pub fn on_user_created(&self, event: &UserCreated) -> Result<ProfileView, Violation> {
        if let Some(existing) = self.storage.profile_of(event.user.id) {
            tracing::debug!(user_id = %event.user.id, "profile already exists");
            return Ok(self.profile_view(existing));
        }
        let grant = Grant::system(ResourceKind::Profile, Action::Create);
        let profile = self.storage.insert_profile(&grant, on_user_created(event))?;
        Ok(self.profile_view(profile))
    }

    /// Client-initiated profile creation, which the policy never allows.
    pub fn create_profile(&self, ctx: &PrincipalContext) -> Result<ProfileView, Violation> {
        self.gate(ctx).check(ResourceKind::Profile, Action::Create, None)?;
        Err(Violation::forbidden(
            "create",
            "Profiles are created together with their user",
        ))
    }

    pub fn list_profiles(
        &self,
        ctx: &PrincipalContext,
        page: PageRequest,
    ) -> Result<Page<ProfileView>, Violation> {
        self.gate(ctx).check(ResourceKind::Profile, Action::List, None)?;
        let page = paginate(self.storage.profiles(), page, &self.config)?;
        Ok(page.map(|p| self.profile_view(p)))
    }

    pub fn get_profile(&self, ctx: &PrincipalContext, id: ProfileId) -> Result<ProfileView, Violation> {
        let profile = self.load_profile(id)?;
        self.gate(ctx)
            .check(ResourceKind::Profile, Action::Retrieve, Some(&profile.target()))?;
        Ok(self.profile_view(profile))
    }

    pub fn update_profile(
        &self,
        ctx: &PrincipalContext,
        id: ProfileId,
        update: ProfileUpdate,
    ) -> Result<ProfileView, Violation> {
        let profile = self.load_profile(id)?;
        let grant = self
            .gate(ctx)
            .check(ResourceKind::Profile, Action::Update, Some(&profile.target()))?;
        self.write_profile(&grant, profile, update, false)
    }

    pub fn partial_update_profile(
        &self,
        ctx: &PrincipalContext,
        id: ProfileId,
        update: ProfileUpdate,
    ) -> Result<ProfileView, Violation> {
        let profile = self.load_profile(id)?;
        let grant = self.gate(ctx).check(
            ResourceKind::Profile,
            Action::PartialUpdate,
            Some(&profile.target()),
        )?;
        self.write_profile(&grant, profile, update, true)
    }

    pub fn delete_profile(&self, ctx: &PrincipalContext, id: ProfileId) -> Result<(), Violation> {
        let profile = self.load_profile(id)?;
        let grant = self
            .gate(ctx)
            .check(ResourceKind::Profile, Action::Destroy, Some(&profile.target()))?;
        self.storage.delete_profile(&grant, profile.id)
    }

    /// The caller's own profile.
    pub fn me(&self, ctx: &PrincipalContext) -> Result<ProfileView, Violation> {
        self.gate(ctx).check(ResourceKind::Profile, Action::Me, None)?;
        let profile = self.own_profile(ctx)?;
        Ok(self.profile_view(profile))
    }

    /// Updates the caller's own profile.
    pub fn update_me(
        &self,
        ctx: &PrincipalContext,
        update: ProfileUpdate,
        partial: bool,
    ) -> Result<ProfileView, Violation> {
        let own = ctx
            .principal()
            .authenticated_id()
            .and_then(|user| self.storage.profile_of(user));
        let target = own.as_ref().map(|profile| profile.target());
        let grant = self
            .gate(ctx)
            .check(ResourceKind::Profile, Action::Me, target.as_ref())?;
        let profile = own.ok_or_else(|| Violation::not_found("profile"))?;
        self.write_profile(&grant, profile, update, partial)
    }

    fn write_profile(
        &self,
        grant: &Grant,
        mut profile: Profile,
        update: ProfileUpdate,
        partial: bool,
    ) -> Result<ProfileView, Violation> {
        update.validate()?;
        update.apply_to(&mut profile, partial);
        let profile = self.storage.save_profile(grant, profile)?;
        Ok(self.profile_view(profile))
    }

    fn own_profile(&self, ctx: &PrincipalContext) -> Result<Profile, Violation> {
        let user = ctx.require_authenticated()?;
        self.storage
            .profile_of(user)
            .ok_or_else(|| Violation::not_found("profile"))
    }

    fn load_profile(&self, id: ProfileId) -> Result<Profile, Violation> {
        self.storage
            .profile(id)
            .ok_or_else(|| Violation::not_found("profile"))
    }

    fn profile_view(&self, profile: Profile) -> ProfileView {
        ProfileView {
            id: profile.id,
            user: profile.owner,
            image: profile
                .image
                .as_deref()
                .filter(|key| !key.is_empty())
                .map(|key| self.media.absolute_url(key)),
            bio: profile.bio,
            phone_number: profile.phone_number,
        }
    }
}
