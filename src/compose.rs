//! Resolution of the displayed attributes of recipe line items.
//!
//! A line item may override the shared ingredient's name and picture for
//! one recipe. The rules are deliberately asymmetric:
//!
//! - the name falls back to the ingredient only when no override is set;
//!   an empty override name is shown as-is;
//! - the picture falls back when the override is unset *or* empty.
//!
//! Callers materialize both attribute sets first; resolution never reaches
//! back into storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::config::ApiConfig;
use crate::error::Error;
use crate::model::{Ingredient, LineItem, LineItemId, Recipe, RecipeId};
use crate::request::UserId;

/// Turns stored blob keys into absolute URLs.
pub trait BlobResolver {
    /// Absolute URL under which `key` is served.
    fn absolute_url(&self, key: &str) -> Url;
}

/// Resolves blob keys against the request origin and media prefix.
///
/// # Examples
///
/// ```
/// use recipe_policy::{BlobResolver, MediaResolver};
/// use url::Url;
///
/// let media = MediaResolver::new(Url::parse("https://cook.example").unwrap(), "/media/").unwrap();
/// assert_eq!(
///     media.absolute_url("images/ingredients/pepper.png").as_str(),
///     "https://cook.example/media/images/ingredients/pepper.png",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MediaResolver {
    origin: Url,
    prefix: Vec<String>,
}

impl MediaResolver {
    /// Creates a resolver for `origin`, serving blobs under `media_prefix`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `origin` cannot carry a path.
    pub fn new(origin: Url, media_prefix: &str) -> Result<Self, Error> {
        if origin.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "origin '{}' cannot be used as a base URL",
                origin
            )));
        }
        let mut origin = origin;
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self {
            origin,
            prefix: clean_segments(media_prefix).map(str::to_string).collect(),
        })
    }

    /// Creates a resolver from the API configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self, Error> {
        Self::new(config.origin.clone(), &config.media_prefix)
    }
}

impl BlobResolver for MediaResolver {
    fn absolute_url(&self, key: &str) -> Url {
        let mut url = self.origin.clone();
        // The origin was checked to be a base URL at construction.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .clear()
                .extend(self.prefix.iter().map(String::as_str))
                .extend(clean_segments(key));
        }
        url
    }
}

/// Path segments of a key, without empty, `.` or `..` segments.
fn clean_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
}

/// Fully materialized inputs for resolving one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemSnapshot {
    pub override_name: Option<String>,
    pub override_image: Option<String>,
    pub base_name: String,
    pub base_image: String,
}

impl LineItemSnapshot {
    /// Pairs a line item with the ingredient it references.
    pub fn from_records(item: &LineItem, ingredient: &Ingredient) -> Self {
        Self {
            override_name: item.custom_name.clone(),
            override_image: item.custom_image.clone(),
            base_name: ingredient.name.clone(),
            base_image: ingredient.image.clone(),
        }
    }
}

/// The attributes a line item is displayed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayAttributes {
    pub name: String,
    pub image: Url,
}

/// Resolves the displayed name and image of a line item.
///
/// # Examples
///
/// ```
/// use recipe_policy::{resolve_display, LineItemSnapshot, MediaResolver};
/// use url::Url;
///
/// let media = MediaResolver::new(Url::parse("http://localhost:8000").unwrap(), "/media/").unwrap();
/// let item = LineItemSnapshot {
///     override_name: Some("Chili Pepper".to_string()),
///     override_image: Some(String::new()),
///     base_name: "Pepper".to_string(),
///     base_image: "pepper.png".to_string(),
/// };
///
/// let shown = resolve_display(&item, &media);
/// assert_eq!(shown.name, "Chili Pepper");
/// assert_eq!(shown.image.as_str(), "http://localhost:8000/media/pepper.png");
/// ```
pub fn resolve_display(item: &LineItemSnapshot, blobs: &impl BlobResolver) -> DisplayAttributes {
    let name = match &item.override_name {
        Some(name) => name.clone(),
        None => item.base_name.clone(),
    };
    let image_key = match item.override_image.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => item.base_image.as_str(),
    };

    DisplayAttributes {
        name,
        image: blobs.absolute_url(image_key),
    }
}

/// A line item as shown inside a recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedLineItem {
    pub id: LineItemId,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    pub image: Url,
}

/// Composes the read view of a line item.
pub fn compose_line_item(
    item: &LineItem,
    ingredient: &Ingredient,
    blobs: &impl BlobResolver,
) -> ComposedLineItem {
    let shown = resolve_display(&LineItemSnapshot::from_records(item, ingredient), blobs);
    ComposedLineItem {
        id: item.id,
        name: shown.name,
        amount: item.amount,
        unit: item.unit.clone(),
        image: shown.image,
    }
}

/// The read view of a recipe with its composed line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeView {
    pub id: RecipeId,
    pub user: UserId,
    pub title: String,
    pub time_minutes: u32,
    pub description: String,
    pub image: Url,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub ingredients: Vec<ComposedLineItem>,
}

/// Composes the read view of `recipe` from its materialized line items.
pub fn compose_recipe(
    recipe: &Recipe,
    items: &[(LineItem, Ingredient)],
    blobs: &impl BlobResolver,
) -> RecipeView {
    RecipeView {
        id: recipe.id,
        user: recipe.owner,
        title: recipe.title.clone(),
        time_minutes: recipe.time_minutes,
        description: recipe.description.clone(),
        image: blobs.absolute_url(&recipe.image),
        created_at: recipe.created_at,
        modified_at: recipe.modified_at,
        ingredients: items
            .iter()
            .map(|(item, ingredient)| compose_line_item(item, ingredient, blobs))
            .collect(),
    }
}
