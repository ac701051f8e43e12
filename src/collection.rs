//! Filtering, search, ordering and pagination of recipe collections.
//!
//! These operators run after the access gate allowed the `list` action.
//! They only narrow or reorder what storage returned.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;

use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::{Violation, ViolationKind};
use crate::model::{Ingredient, LineItem, Recipe};

/// A recipe together with the related facts the filters look at.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeListing {
    pub recipe: Recipe,
    pub owner_username: String,
    pub items: Vec<(LineItem, Ingredient)>,
}

/// Fields a recipe collection can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    TimeMinutes,
}

/// One ordering term, e.g. `-time_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortTerm {
    pub key: SortKey,
    pub descending: bool,
}

impl SortTerm {
    fn parse(raw: &str) -> Result<Self, Violation> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        let key = match name {
            "created_at" => SortKey::CreatedAt,
            "time_minutes" => SortKey::TimeMinutes,
            _ => {
                return Err(Violation::validation(
                    "ordering",
                    format!("Cannot order by '{}'", name),
                ))
            }
        };
        Ok(Self { key, descending })
    }

    fn compare(&self, a: &Recipe, b: &Recipe) -> CmpOrdering {
        let ord = match self.key {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::TimeMinutes => a.time_minutes.cmp(&b.time_minutes),
        };
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Requested page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: usize,
    /// Requested size; the configured default when `None`
    pub page_size: Option<usize>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
        }
    }
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Number of items across all pages
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Converts the items of the page, keeping the pagination facts.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            has_next: self.has_next,
            has_previous: self.has_previous,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Cuts one page out of `items`.
///
/// Page sizes above `max_page_size` are clamped. A page beyond the last
/// one is `NotFound`; the first page of an empty collection is valid.
pub fn paginate<T>(items: Vec<T>, request: PageRequest, config: &ApiConfig) -> Result<Page<T>, Violation> {
    let page_size = request
        .page_size
        .unwrap_or(config.page_size)
        .min(config.max_page_size)
        .max(1);
    let count = items.len();
    let last_page = count.div_ceil(page_size).max(1);

    if request.page == 0 || request.page > last_page {
        return Err(Violation::new(
            ViolationKind::NotFound { resource: "page" },
            "Invalid page.",
        ));
    }

    let items = items
        .into_iter()
        .skip((request.page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Page {
        count,
        page: request.page,
        page_size,
        has_next: request.page < last_page,
        has_previous: request.page > 1,
        items,
    })
}

/// Filters, search and ordering for the recipe collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Case-insensitive exact match on any line item's ingredient name
    pub ingredient_name: Option<String>,
    pub time_minutes: Option<u32>,
    pub time_minutes_lte: Option<u32>,
    pub time_minutes_gte: Option<u32>,
    /// Case-insensitive exact match on the owner's username
    pub username: Option<String>,
    /// Terms that must each appear in the title or description
    pub search: Vec<String>,
    /// Ordering terms; creation time ascending when empty
    pub ordering: Vec<SortTerm>,
    pub page: PageRequest,
}

impl RecipeQuery {
    /// Builds a query from request query parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use recipe_policy::RecipeQuery;
    ///
    /// let params = HashMap::from([
    ///     ("time_minutes__lte".to_string(), "30".to_string()),
    ///     ("ordering".to_string(), "-created_at".to_string()),
    /// ]);
    /// let query = RecipeQuery::from_params(&params).unwrap();
    /// assert_eq!(query.time_minutes_lte, Some(30));
    /// ```
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, Violation> {
        let mut query = RecipeQuery::default();

        for (key, value) in params {
            match key.as_str() {
                "ingredients__ingredient__name__iexact" => {
                    query.ingredient_name = Some(value.clone())
                }
                "time_minutes" => query.time_minutes = Some(parse_number("time_minutes", value)?),
                "time_minutes__lte" => {
                    query.time_minutes_lte = Some(parse_number("time_minutes__lte", value)?)
                }
                "time_minutes__gte" => {
                    query.time_minutes_gte = Some(parse_number("time_minutes__gte", value)?)
                }
                "user__username__iexact" => query.username = Some(value.clone()),
                "search" => {
                    query.search = value
                        .split(|c: char| c.is_whitespace() || c == ',')
                        .filter(|t| !t.is_empty())
                        .map(str::to_lowercase)
                        .collect()
                }
                "ordering" => {
                    query.ordering = value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(SortTerm::parse)
                        .collect::<Result<_, _>>()?
                }
                "page" => query.page.page = parse_number("page", value)?,
                "page_size" => query.page.page_size = Some(parse_number("page_size", value)?),
                // Unknown parameters are ignored.
                _ => {}
            }
        }

        Ok(query)
    }

    /// True if `listing` passes every filter and search term.
    pub fn matches(&self, listing: &RecipeListing) -> bool {
        let recipe = &listing.recipe;

        if let Some(name) = &self.ingredient_name {
            let name = name.to_lowercase();
            if !listing
                .items
                .iter()
                .any(|(_, ingredient)| ingredient.name.to_lowercase() == name)
            {
                return false;
            }
        }
        if self.time_minutes.is_some_and(|t| recipe.time_minutes != t)
            || self.time_minutes_lte.is_some_and(|t| recipe.time_minutes > t)
            || self.time_minutes_gte.is_some_and(|t| recipe.time_minutes < t)
        {
            return false;
        }
        if let Some(username) = &self.username {
            if listing.owner_username.to_lowercase() != username.to_lowercase() {
                return false;
            }
        }

        let title = recipe.title.to_lowercase();
        let description = recipe.description.to_lowercase();
        self.search
            .iter()
            .all(|term| title.contains(term.as_str()) || description.contains(term.as_str()))
    }

    /// Filters and orders `listings`, then cuts out the requested page.
    pub fn apply(
        &self,
        listings: Vec<RecipeListing>,
        config: &ApiConfig,
    ) -> Result<Page<RecipeListing>, Violation> {
        let mut selected: Vec<_> = listings.into_iter().filter(|l| self.matches(l)).collect();

        let default_order = [SortTerm {
            key: SortKey::CreatedAt,
            descending: false,
        }];
        let terms = if self.ordering.is_empty() {
            &default_order[..]
        } else {
            &self.ordering[..]
        };
        selected.sort_by(|a, b| {
            let (a, b) = (&a.recipe, &b.recipe);
            terms
                .iter()
                .map(|term| term.compare(a, b))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| a.id.cmp(&b.id))
        });

        paginate(selected, self.page, config)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, Violation> {
    raw.trim()
        .parse()
        .map_err(|_| Violation::validation(field, format!("Enter a whole number, got '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::model::{IngredientId, LineItemId, RecipeId};
    use crate::request::UserId;

    fn listing(id: u64, title: &str, minutes: u32, owner: &str, ingredients: &[&str]) -> RecipeListing {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(id as i64);
        let recipe = Recipe {
            id: RecipeId(id),
            owner: UserId(id),
            title: title.to_string(),
            time_minutes: minutes,
            description: format!("How to make {}", title),
            image: "images/recipes/x.png".to_string(),
            created_at: created,
            modified_at: created,
        };
        let items = ingredients
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let ingredient = Ingredient {
                    id: IngredientId(i as u64),
                    name: name.to_string(),
                    image: String::new(),
                    created_at: created,
                    modified_at: created,
                    created_by: None,
                };
                let item = LineItem {
                    id: LineItemId(i as u64),
                    recipe: recipe.id,
                    ingredient: ingredient.id,
                    custom_name: Some("Renamed".to_string()),
                    custom_image: None,
                    amount: 1.0,
                    unit: "pc".to_string(),
                };
                (item, ingredient)
            })
            .collect();
        RecipeListing {
            recipe,
            owner_username: owner.to_string(),
            items,
        }
    }

    fn fixtures() -> Vec<RecipeListing> {
        vec![
            listing(1, "Pancakes", 20, "alice", &["Flour", "Egg"]),
            listing(2, "Omelette", 10, "bob", &["Egg"]),
            listing(3, "Bread", 180, "Alice", &["Flour", "Yeast"]),
        ]
    }

    fn ids(page: &Page<RecipeListing>) -> Vec<u64> {
        page.items.iter().map(|l| l.recipe.id.0).collect()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_order_is_creation_time() {
        let page = RecipeQuery::default().apply(fixtures(), &ApiConfig::default()).unwrap();
        assert_eq!(ids(&page), vec![1, 2, 3]);
        assert_eq!(page.count, 3);
        assert!(!page.has_next);
    }

    #[test]
    fn ingredient_filter_uses_base_name_case_insensitively() {
        let query = RecipeQuery::from_params(&params(&[(
            "ingredients__ingredient__name__iexact",
            "egg",
        )]))
        .unwrap();
        let page = query.apply(fixtures(), &ApiConfig::default()).unwrap();
        assert_eq!(ids(&page), vec![1, 2]);
    }

    #[test]
    fn time_bounds_and_username() {
        let query = RecipeQuery::from_params(&params(&[
            ("time_minutes__gte", "15"),
            ("user__username__iexact", "ALICE"),
        ]))
        .unwrap();
        let page = query.apply(fixtures(), &ApiConfig::default()).unwrap();
        assert_eq!(ids(&page), vec![1, 3]);

        let exact = RecipeQuery::from_params(&params(&[("time_minutes", "10")])).unwrap();
        assert_eq!(ids(&exact.apply(fixtures(), &ApiConfig::default()).unwrap()), vec![2]);
    }

    #[test]
    fn search_requires_every_term() {
        let query = RecipeQuery::from_params(&params(&[("search", "make pan")])).unwrap();
        let page = query.apply(fixtures(), &ApiConfig::default()).unwrap();
        assert_eq!(ids(&page), vec![1]);
    }

    #[test]
    fn ordering_by_time_descending() {
        let query = RecipeQuery::from_params(&params(&[("ordering", "-time_minutes")])).unwrap();
        let page = query.apply(fixtures(), &ApiConfig::default()).unwrap();
        assert_eq!(ids(&page), vec![3, 1, 2]);
    }

    #[test]
    fn invalid_parameters_are_validation_errors() {
        let err = RecipeQuery::from_params(&params(&[("ordering", "title")])).unwrap_err();
        assert_eq!(err.kind, ViolationKind::Validation { field: "ordering" });

        let err = RecipeQuery::from_params(&params(&[("time_minutes__lte", "soon")])).unwrap_err();
        assert_eq!(err.kind, ViolationKind::Validation { field: "time_minutes__lte" });
    }

    #[test]
    fn pagination_clamps_and_reports_neighbours() {
        let config = ApiConfig {
            page_size: 2,
            max_page_size: 2,
            ..ApiConfig::default()
        };
        let request = PageRequest {
            page: 1,
            page_size: Some(50),
        };
        let page = paginate(vec![1, 2, 3], request, &config).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.page_size, 2);
        assert!(page.has_next);
        assert!(!page.has_previous);

        let second = paginate(vec![1, 2, 3], PageRequest { page: 2, page_size: None }, &config).unwrap();
        assert_eq!(second.items, vec![3]);
        assert!(second.has_previous);
    }

    #[test]
    fn page_past_end_is_not_found() {
        let err = paginate(vec![1], PageRequest { page: 3, page_size: None }, &ApiConfig::default())
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::NotFound { resource: "page" });

        let empty: Page<u8> = paginate(Vec::new(), PageRequest::default(), &ApiConfig::default()).unwrap();
        assert!(empty.items.is_empty());
    }
}
