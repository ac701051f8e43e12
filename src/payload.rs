//! Client payloads for recipe, ingredient and comment writes.
//!
//! Ownership fields are never part of a payload; the service fills them
//! from the request context.

use serde::Deserialize;

use crate::error::Violation;
use crate::model::{Ingredient, IngredientId, Recipe};

const MAX_CHARS: usize = 255;
/// Largest amount a `DECIMAL(10, 2)` column holds.
const MAX_AMOUNT: f64 = 99_999_999.99;

fn check_text(field: &'static str, value: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        return Err(Violation::validation(field, "This field may not be blank."));
    }
    if value.chars().count() > MAX_CHARS {
        return Err(Violation::validation(
            field,
            format!("Ensure this field has no more than {} characters.", MAX_CHARS),
        ));
    }
    Ok(())
}

/// One ingredient line of a recipe payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineItemDraft {
    pub ingredient: IngredientId,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub custom_image: Option<String>,
    pub amount: f64,
    pub unit: String,
}

impl LineItemDraft {
    fn validate(&self) -> Result<(), Violation> {
        if !self.amount.is_finite() || self.amount < 0.0 || self.amount > MAX_AMOUNT {
            return Err(Violation::validation(
                "amount",
                "Ensure the amount is a non-negative number with at most 8 integer digits.",
            ));
        }
        if let Some(name) = &self.custom_name {
            if name.chars().count() > MAX_CHARS {
                return Err(Violation::validation(
                    "custom_name",
                    format!("Ensure this field has no more than {} characters.", MAX_CHARS),
                ));
            }
        }
        check_text("unit", &self.unit)
    }
}

/// Full recipe payload, used for create and update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: u32,
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub ingredients: Vec<LineItemDraft>,
}

impl RecipeDraft {
    /// Checks field constraints.
    pub fn validate(&self) -> Result<(), Violation> {
        check_text("title", &self.title)?;
        if self.description.trim().is_empty() {
            return Err(Violation::validation("description", "This field may not be blank."));
        }
        if self.image.is_empty() {
            return Err(Violation::validation("image", "No file was submitted."));
        }
        self.ingredients.iter().try_for_each(LineItemDraft::validate)
    }

    /// Overwrites the editable fields of `recipe`.
    pub(crate) fn apply_to(&self, recipe: &mut Recipe) {
        recipe.title = self.title.clone();
        recipe.time_minutes = self.time_minutes;
        recipe.description = self.description.clone();
        recipe.image = self.image.clone();
    }
}

/// Partial recipe payload; absent fields are kept.
///
/// When `ingredients` is present it replaces all line items.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub time_minutes: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Vec<LineItemDraft>>,
}

impl RecipePatch {
    /// Checks the constraints of the fields present.
    pub fn validate(&self) -> Result<(), Violation> {
        if let Some(title) = &self.title {
            check_text("title", title)?;
        }
        if self.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err(Violation::validation("description", "This field may not be blank."));
        }
        if self.image.as_deref().is_some_and(str::is_empty) {
            return Err(Violation::validation("image", "No file was submitted."));
        }
        self.ingredients
            .iter()
            .flatten()
            .try_for_each(LineItemDraft::validate)
    }

    pub(crate) fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.clone();
        }
        if let Some(minutes) = self.time_minutes {
            recipe.time_minutes = minutes;
        }
        if let Some(description) = &self.description {
            recipe.description = description.clone();
        }
        if let Some(image) = &self.image {
            recipe.image = image.clone();
        }
    }
}

/// Ingredient payload; `partial` selects patch semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IngredientDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl IngredientDraft {
    /// Checks constraints; a full payload needs every field.
    pub fn validate(&self, partial: bool) -> Result<(), Violation> {
        match &self.name {
            Some(name) => check_text("name", name)?,
            None if !partial => {
                return Err(Violation::validation("name", "This field is required."))
            }
            None => {}
        }
        match &self.image {
            Some(image) if image.is_empty() => {
                Err(Violation::validation("image", "No file was submitted."))
            }
            None if !partial => Err(Violation::validation("image", "This field is required.")),
            _ => Ok(()),
        }
    }

    pub(crate) fn apply_to(&self, ingredient: &mut Ingredient) {
        if let Some(name) = &self.name {
            ingredient.name = name.clone();
        }
        if let Some(image) = &self.image {
            ingredient.image = image.clone();
        }
    }
}

/// Comment edit payload. Only the text can change; the parent is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentEdit {
    #[serde(alias = "comment")]
    pub body: String,
}

impl CommentEdit {
    /// Rejects blank comment bodies.
    pub fn validate(&self) -> Result<(), Violation> {
        if self.body.trim().is_empty() {
            return Err(Violation::validation("comment", "This field may not be blank."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    fn draft() -> RecipeDraft {
        serde_json::from_str(
            r#"{
                "title": "Chili",
                "time_minutes": 45,
                "description": "Hot",
                "image": "images/recipes/chili.png",
                "user": 99,
                "ingredients": [
                    {"ingredient": 1, "custom_name": "Chili Pepper", "amount": 2.5, "unit": "pc"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn recipe_draft_parses_and_validates() {
        let draft = draft();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.ingredients[0].custom_image, None);
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut draft = draft();
        draft.ingredients[0].amount = -1.0;
        assert_eq!(
            draft.validate().unwrap_err().kind,
            ViolationKind::Validation { field: "amount" }
        );
    }

    #[test]
    fn long_title_is_rejected() {
        let mut draft = draft();
        draft.title = "x".repeat(256);
        assert_eq!(
            draft.validate().unwrap_err().kind,
            ViolationKind::Validation { field: "title" }
        );
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let now = chrono::Utc::now();
        let mut recipe = Recipe {
            id: crate::model::RecipeId(1),
            owner: crate::request::UserId(1),
            title: "Old".to_string(),
            time_minutes: 10,
            description: "Desc".to_string(),
            image: "a.png".to_string(),
            created_at: now,
            modified_at: now,
        };
        let patch = RecipePatch {
            time_minutes: Some(15),
            ..RecipePatch::default()
        };
        assert!(patch.validate().is_ok());
        patch.apply_to(&mut recipe);
        assert_eq!(recipe.title, "Old");
        assert_eq!(recipe.time_minutes, 15);
    }

    #[test]
    fn ingredient_full_payload_requires_fields() {
        let partial = IngredientDraft {
            name: Some("Basil".to_string()),
            image: None,
        };
        assert!(partial.validate(true).is_ok());
        assert_eq!(
            partial.validate(false).unwrap_err().kind,
            ViolationKind::Validation { field: "image" }
        );
    }
}
