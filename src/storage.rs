//! The storage collaborator.
//!
//! [`Storage`] is the seam to the persistence engine. Reads hand out owned
//! snapshots; every write takes the [`Grant`] the gate issued for it, and a
//! write to an existing record only accepts a grant checked against that record.
//! [`MemoryStorage`] keeps everything behind one lock, which gives each call
//! read-after-write consistency.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::capability::Grant;
use crate::error::Violation;
use crate::model::{
    Comment, CommentId, Ingredient, IngredientId, LineItem, LineItemId, Profile, ProfileId, Recipe,
    RecipeId, User,
};
use crate::payload::{LineItemDraft, RecipeDraft};
use crate::policy::{Action, ResourceKind};
use crate::profile::NewProfile;
use crate::request::UserId;
use crate::scope::NewComment;

const WRITE: &[Action] = &[Action::Update, Action::PartialUpdate];

/// Snapshot reads and grant-checked writes of every record.
pub trait Storage: Send + Sync {
    /// Looks up an account.
    fn user(&self, id: UserId) -> Option<User>;
    /// Stores a new account. Called by the identity collaborator only.
    fn insert_user(&self, username: &str) -> User;
    /// Removes an account with everything it owns; its ingredients lose their creator.
    fn delete_user(&self, id: UserId) -> bool;

    fn recipe(&self, id: RecipeId) -> Option<Recipe>;
    fn recipes(&self) -> Vec<Recipe>;
    /// Line items of `recipe`, each paired with its ingredient.
    fn line_items(&self, recipe: RecipeId) -> Vec<(LineItem, Ingredient)>;
    fn insert_recipe(&self, grant: &Grant, owner: UserId, draft: &RecipeDraft) -> Result<Recipe, Violation>;
    /// Saves the fields of `recipe` and, when `items` is given, replaces all
    /// of its line items. Either both changes apply or neither does.
    fn update_recipe(
        &self,
        grant: &Grant,
        recipe: Recipe,
        items: Option<&[LineItemDraft]>,
    ) -> Result<Recipe, Violation>;
    /// Removes one line item; `false` if `recipe` has no such item.
    fn delete_line_item(&self, grant: &Grant, recipe: RecipeId, item: LineItemId) -> Result<bool, Violation>;
    fn delete_recipe(&self, grant: &Grant, id: RecipeId) -> Result<(), Violation>;

    fn ingredient(&self, id: IngredientId) -> Option<Ingredient>;
    fn ingredients(&self) -> Vec<Ingredient>;
    fn insert_ingredient(
        &self,
        grant: &Grant,
        created_by: UserId,
        name: &str,
        image: &str,
    ) -> Result<Ingredient, Violation>;
    fn save_ingredient(&self, grant: &Grant, ingredient: Ingredient) -> Result<Ingredient, Violation>;
    fn delete_ingredient(&self, grant: &Grant, id: IngredientId) -> Result<(), Violation>;

    /// Looks up a comment under any recipe. Scoping is the caller's job.
    fn comment(&self, id: CommentId) -> Option<Comment>;
    fn comments(&self) -> Vec<Comment>;
    fn insert_comment(&self, grant: &Grant, comment: NewComment) -> Result<Comment, Violation>;
    fn save_comment(&self, grant: &Grant, comment: Comment) -> Result<Comment, Violation>;
    fn delete_comment(&self, grant: &Grant, id: CommentId) -> Result<(), Violation>;

    fn profile(&self, id: ProfileId) -> Option<Profile>;
    fn profile_of(&self, user: UserId) -> Option<Profile>;
    fn profiles(&self) -> Vec<Profile>;
    fn insert_profile(&self, grant: &Grant, profile: NewProfile) -> Result<Profile, Violation>;
    fn save_profile(&self, grant: &Grant, profile: Profile) -> Result<Profile, Violation>;
    fn delete_profile(&self, grant: &Grant, id: ProfileId) -> Result<(), Violation>;
}

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    users: BTreeMap<UserId, User>,
    recipes: BTreeMap<RecipeId, Recipe>,
    line_items: BTreeMap<LineItemId, LineItem>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    comments: BTreeMap<CommentId, Comment>,
    profiles: BTreeMap<ProfileId, Profile>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_unique_name(&self, name: &str, except: Option<IngredientId>) -> Result<(), Violation> {
        let taken = self
            .ingredients
            .values()
            .any(|i| i.name == name && Some(i.id) != except);
        if taken {
            return Err(Violation::validation(
                "name",
                "ingredient with this name already exists.",
            ));
        }
        Ok(())
    }

    fn ensure_ingredients(&self, items: &[LineItemDraft]) -> Result<(), Violation> {
        match items
            .iter()
            .find(|i| !self.ingredients.contains_key(&i.ingredient))
        {
            Some(missing) => Err(Violation::validation(
                "ingredients",
                format!("Invalid pk \"{}\" - object does not exist.", missing.ingredient),
            )),
            None => Ok(()),
        }
    }

    // Callers check the ingredients first.
    fn insert_line_items(&mut self, recipe: RecipeId, items: &[LineItemDraft]) {
        for draft in items {
            let id = LineItemId(self.next_id());
            self.line_items.insert(
                id,
                LineItem {
                    id,
                    recipe,
                    ingredient: draft.ingredient,
                    custom_name: draft.custom_name.clone(),
                    custom_image: draft.custom_image.clone(),
                    amount: draft.amount,
                    unit: draft.unit.clone(),
                },
            );
        }
    }

    fn delete_recipe(&mut self, id: RecipeId) {
        self.recipes.remove(&id);
        self.line_items.retain(|_, item| item.recipe != id);
        self.comments.retain(|_, c| c.recipe != id);
    }
}

/// In-process [`Storage`] for tests and embedding.
///
/// # Examples
///
/// ```
/// use recipe_policy::{MemoryStorage, Storage};
///
/// let storage = MemoryStorage::new();
/// let user = storage.insert_user("alice");
/// assert_eq!(storage.user(user.id), Some(user));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(resource: &'static str) -> Violation {
    Violation::not_found(resource)
}

impl Storage for MemoryStorage {
    fn user(&self, id: UserId) -> Option<User> {
        self.tables.read().users.get(&id).cloned()
    }

    fn insert_user(&self, username: &str) -> User {
        let mut tables = self.tables.write();
        let user = User {
            id: UserId(tables.next_id()),
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        user
    }

    fn delete_user(&self, id: UserId) -> bool {
        let mut tables = self.tables.write();
        if tables.users.remove(&id).is_none() {
            return false;
        }
        let owned: Vec<_> = tables
            .recipes
            .values()
            .filter(|r| r.owner == id)
            .map(|r| r.id)
            .collect();
        for recipe in owned {
            tables.delete_recipe(recipe);
        }
        tables.comments.retain(|_, c| c.owner != id);
        tables.profiles.retain(|_, p| p.owner != id);
        for ingredient in tables.ingredients.values_mut() {
            if ingredient.created_by == Some(id) {
                ingredient.created_by = None;
            }
        }
        true
    }

    fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.tables.read().recipes.get(&id).cloned()
    }

    fn recipes(&self) -> Vec<Recipe> {
        self.tables.read().recipes.values().cloned().collect()
    }

    fn line_items(&self, recipe: RecipeId) -> Vec<(LineItem, Ingredient)> {
        let tables = self.tables.read();
        tables
            .line_items
            .values()
            .filter(|item| item.recipe == recipe)
            .filter_map(|item| {
                let ingredient = tables.ingredients.get(&item.ingredient)?;
                Some((item.clone(), ingredient.clone()))
            })
            .collect()
    }

    fn insert_recipe(&self, grant: &Grant, owner: UserId, draft: &RecipeDraft) -> Result<Recipe, Violation> {
        grant.ensure(ResourceKind::Recipe, &[Action::Create])?;
        let mut tables = self.tables.write();
        tables.ensure_ingredients(&draft.ingredients)?;
        let now = Utc::now();
        let recipe = Recipe {
            id: RecipeId(tables.next_id()),
            owner,
            title: draft.title.clone(),
            time_minutes: draft.time_minutes,
            description: draft.description.clone(),
            image: draft.image.clone(),
            created_at: now,
            modified_at: now,
        };
        tables.insert_line_items(recipe.id, &draft.ingredients);
        tables.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    fn update_recipe(
        &self,
        grant: &Grant,
        mut recipe: Recipe,
        items: Option<&[LineItemDraft]>,
    ) -> Result<Recipe, Violation> {
        grant.ensure_for(ResourceKind::Recipe, WRITE, recipe.id.0)?;
        let mut tables = self.tables.write();
        let stored = tables.recipes.get(&recipe.id).ok_or_else(|| missing("recipe"))?;
        recipe.owner = stored.owner;
        recipe.created_at = stored.created_at;
        recipe.modified_at = Utc::now();

        if let Some(items) = items {
            tables.ensure_ingredients(items)?;
            tables.line_items.retain(|_, item| item.recipe != recipe.id);
            tables.insert_line_items(recipe.id, items);
        }
        tables.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    fn delete_line_item(&self, grant: &Grant, recipe: RecipeId, item: LineItemId) -> Result<bool, Violation> {
        grant.ensure_for(ResourceKind::Recipe, WRITE, recipe.0)?;
        let mut tables = self.tables.write();
        match tables.line_items.get(&item) {
            Some(found) if found.recipe == recipe => {
                tables.line_items.remove(&item);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_recipe(&self, grant: &Grant, id: RecipeId) -> Result<(), Violation> {
        grant.ensure_for(ResourceKind::Recipe, &[Action::Destroy], id.0)?;
        let mut tables = self.tables.write();
        if !tables.recipes.contains_key(&id) {
            return Err(missing("recipe"));
        }
        tables.delete_recipe(id);
        Ok(())
    }

    fn ingredient(&self, id: IngredientId) -> Option<Ingredient> {
        self.tables.read().ingredients.get(&id).cloned()
    }

    fn ingredients(&self) -> Vec<Ingredient> {
        let mut all: Vec<_> = self.tables.read().ingredients.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    fn insert_ingredient(
        &self,
        grant: &Grant,
        created_by: UserId,
        name: &str,
        image: &str,
    ) -> Result<Ingredient, Violation> {
        grant.ensure(ResourceKind::Ingredient, &[Action::Create])?;
        let mut tables = self.tables.write();
        tables.ensure_unique_name(name, None)?;
        let now = Utc::now();
        let ingredient = Ingredient {
            id: IngredientId(tables.next_id()),
            name: name.to_string(),
            image: image.to_string(),
            created_at: now,
            modified_at: now,
            created_by: Some(created_by),
        };
        tables.ingredients.insert(ingredient.id, ingredient.clone());
        Ok(ingredient)
    }

    fn save_ingredient(&self, grant: &Grant, mut ingredient: Ingredient) -> Result<Ingredient, Violation> {
        grant.ensure_for(ResourceKind::Ingredient, WRITE, ingredient.id.0)?;
        let mut tables = self.tables.write();
        tables.ensure_unique_name(&ingredient.name, Some(ingredient.id))?;
        let stored = tables
            .ingredients
            .get_mut(&ingredient.id)
            .ok_or_else(|| missing("ingredient"))?;
        ingredient.created_by = stored.created_by;
        ingredient.created_at = stored.created_at;
        ingredient.modified_at = Utc::now();
        *stored = ingredient.clone();
        Ok(ingredient)
    }

    fn delete_ingredient(&self, grant: &Grant, id: IngredientId) -> Result<(), Violation> {
        grant.ensure_for(ResourceKind::Ingredient, &[Action::Destroy], id.0)?;
        let mut tables = self.tables.write();
        if tables.ingredients.remove(&id).is_none() {
            return Err(missing("ingredient"));
        }
        tables.line_items.retain(|_, item| item.ingredient != id);
        Ok(())
    }

    fn comment(&self, id: CommentId) -> Option<Comment> {
        self.tables.read().comments.get(&id).cloned()
    }

    fn comments(&self) -> Vec<Comment> {
        self.tables.read().comments.values().cloned().collect()
    }

    fn insert_comment(&self, grant: &Grant, comment: NewComment) -> Result<Comment, Violation> {
        grant.ensure(ResourceKind::Comment, &[Action::Create])?;
        let mut tables = self.tables.write();
        if !tables.recipes.contains_key(&comment.recipe) {
            return Err(missing("recipe"));
        }
        let now = Utc::now();
        let stored = Comment {
            id: CommentId(tables.next_id()),
            owner: comment.owner,
            recipe: comment.recipe,
            body: comment.body,
            created_at: now,
            modified_at: now,
        };
        tables.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn save_comment(&self, grant: &Grant, mut comment: Comment) -> Result<Comment, Violation> {
        grant.ensure_for(ResourceKind::Comment, WRITE, comment.id.0)?;
        let mut tables = self.tables.write();
        let stored = tables.comments.get_mut(&comment.id).ok_or_else(|| missing("comment"))?;
        // The parent binding and author are fixed at creation.
        comment.recipe = stored.recipe;
        comment.owner = stored.owner;
        comment.created_at = stored.created_at;
        comment.modified_at = Utc::now();
        *stored = comment.clone();
        Ok(comment)
    }

    fn delete_comment(&self, grant: &Grant, id: CommentId) -> Result<(), Violation> {
        grant.ensure_for(ResourceKind::Comment, &[Action::Destroy], id.0)?;
        self.tables
            .write()
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("comment"))
    }

    fn profile(&self, id: ProfileId) -> Option<Profile> {
        self.tables.read().profiles.get(&id).cloned()
    }

    fn profile_of(&self, user: UserId) -> Option<Profile> {
        self.tables
            .read()
            .profiles
            .values()
            .find(|p| p.owner == user)
            .cloned()
    }

    fn profiles(&self) -> Vec<Profile> {
        self.tables.read().profiles.values().cloned().collect()
    }

    fn insert_profile(&self, grant: &Grant, profile: NewProfile) -> Result<Profile, Violation> {
        grant.ensure(ResourceKind::Profile, &[Action::Create])?;
        let mut tables = self.tables.write();
        if let Some(existing) = tables.profiles.values().find(|p| p.owner == profile.owner) {
            return Ok(existing.clone());
        }
        let stored = Profile {
            id: ProfileId(tables.next_id()),
            owner: profile.owner,
            image: profile.image,
            bio: profile.bio,
            phone_number: profile.phone_number,
        };
        tables.profiles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn save_profile(&self, grant: &Grant, mut profile: Profile) -> Result<Profile, Violation> {
        grant.ensure_for(
            ResourceKind::Profile,
            &[Action::Update, Action::PartialUpdate, Action::Me],
            profile.id.0,
        )?;
        let mut tables = self.tables.write();
        let stored = tables.profiles.get_mut(&profile.id).ok_or_else(|| missing("profile"))?;
        profile.owner = stored.owner;
        *stored = profile.clone();
        Ok(profile)
    }

    fn delete_profile(&self, grant: &Grant, id: ProfileId) -> Result<(), Violation> {
        grant.ensure_for(ResourceKind::Profile, &[Action::Destroy], id.0)?;
        self.tables
            .write()
            .profiles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("profile"))
    }
}
