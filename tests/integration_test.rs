use std::collections::HashMap;
use std::sync::Arc;

use recipe_policy::{
    audit::{AuditEventKind, AuditTrail},
    AccessGate, Action, ApiConfig, CommentDraft, CommentEdit, IngredientDraft, IngredientId,
    LineItemDraft, MemoryStorage, PageRequest, Principal, PrincipalContext, ProfileUpdate,
    RecipeDraft, RecipeId, RecipePatch, RecipeQuery, RecipeService, ResourceKind, ScopeContext,
    Storage, Target, User, UserCreated, Verdict, ViolationKind,
};

struct Kitchen {
    service: RecipeService<MemoryStorage>,
    trail: Arc<AuditTrail>,
    alice: User,
    bob: User,
}

impl Kitchen {
    fn new() -> Self {
        let config = ApiConfig::from_json(r#"{"origin": "http://testserver", "page_size": 2}"#)
            .expect("valid config");
        let trail = Arc::new(AuditTrail::new());
        let service = RecipeService::new(MemoryStorage::new(), config)
            .expect("service")
            .with_trail(Arc::clone(&trail));
        let alice = Self::register(&service, "alice");
        let bob = Self::register(&service, "bob");
        Self {
            service,
            trail,
            alice,
            bob,
        }
    }

    fn register(service: &RecipeService<MemoryStorage>, username: &str) -> User {
        let user = service.storage().insert_user(username);
        service
            .on_user_created(&UserCreated { user: user.clone() })
            .expect("profile created");
        user
    }

    fn ctx(user: &User) -> PrincipalContext {
        PrincipalContext::new(format!("req-{}", user.username), Principal::user(user.id.0))
    }

    fn anonymous() -> PrincipalContext {
        PrincipalContext::new("req-anon", Principal::anonymous())
    }

    fn ingredient(&self, name: &str) -> IngredientId {
        self.service
            .create_ingredient(
                &Self::ctx(&self.alice),
                IngredientDraft {
                    name: Some(name.to_string()),
                    image: Some(format!("images/ingredients/{}.png", name.to_lowercase())),
                },
            )
            .expect("ingredient created")
            .id
    }

    fn recipe(&self, owner: &User, title: &str, minutes: u32, items: Vec<LineItemDraft>) -> RecipeId {
        self.service
            .create_recipe(
                &Self::ctx(owner),
                RecipeDraft {
                    title: title.to_string(),
                    time_minutes: minutes,
                    description: format!("How to make {}", title),
                    image: "images/recipes/dish.png".to_string(),
                    ingredients: items,
                },
            )
            .expect("recipe created")
            .id
    }
}

fn item(ingredient: IngredientId, custom_name: Option<&str>, custom_image: Option<&str>) -> LineItemDraft {
    LineItemDraft {
        ingredient,
        custom_name: custom_name.map(str::to_string),
        custom_image: custom_image.map(str::to_string),
        amount: 1.5,
        unit: "g".to_string(),
    }
}

#[test]
fn line_item_overrides_follow_fallback_rules() {
    let kitchen = Kitchen::new();
    let pepper = kitchen.ingredient("Pepper");
    let id = kitchen.recipe(
        &kitchen.alice,
        "Chili",
        40,
        vec![
            item(pepper, Some("Chili Pepper"), Some("")),
            item(pepper, None, Some("images/custom.png")),
            item(pepper, Some(""), None),
        ],
    );

    let view = kitchen.service.get_recipe(&Kitchen::anonymous(), id).unwrap();
    let shown: Vec<_> = view
        .ingredients
        .iter()
        .map(|i| (i.name.as_str(), i.image.as_str()))
        .collect();

    assert_eq!(
        shown,
        vec![
            ("Chili Pepper", "http://testserver/media/images/ingredients/pepper.png"),
            ("Pepper", "http://testserver/media/images/custom.png"),
            ("", "http://testserver/media/images/ingredients/pepper.png"),
        ]
    );
}

#[test]
fn only_the_owner_edits_a_recipe() {
    let kitchen = Kitchen::new();
    let id = kitchen.recipe(&kitchen.alice, "Soup", 20, vec![]);
    let patch = || RecipePatch {
        time_minutes: Some(25),
        ..RecipePatch::default()
    };

    let err = kitchen
        .service
        .partial_update_recipe(&Kitchen::ctx(&kitchen.bob), id, patch())
        .unwrap_err();
    assert!(matches!(err.kind, ViolationKind::Forbidden { .. }));
    assert_eq!(err.kind.status_code(), 403);

    let admin = PrincipalContext::new("req-admin", Principal::admin(999));
    assert!(kitchen.service.partial_update_recipe(&admin, id, patch()).is_err());

    let view = kitchen
        .service
        .partial_update_recipe(&Kitchen::ctx(&kitchen.alice), id, patch())
        .unwrap();
    assert_eq!(view.time_minutes, 25);
}

#[test]
fn full_update_replaces_line_items() {
    let kitchen = Kitchen::new();
    let salt = kitchen.ingredient("Salt");
    let basil = kitchen.ingredient("Basil");
    let id = kitchen.recipe(&kitchen.alice, "Pesto", 10, vec![item(salt, None, None)]);

    let view = kitchen
        .service
        .update_recipe(
            &Kitchen::ctx(&kitchen.alice),
            id,
            RecipeDraft {
                title: "Pesto".to_string(),
                time_minutes: 12,
                description: "Green".to_string(),
                image: "images/recipes/pesto.png".to_string(),
                ingredients: vec![item(basil, None, None)],
            },
        )
        .unwrap();

    assert_eq!(view.ingredients.len(), 1);
    assert_eq!(view.ingredients[0].name, "Basil");
}

#[test]
fn removing_a_line_item_is_an_owner_edit() {
    let kitchen = Kitchen::new();
    let salt = kitchen.ingredient("Salt");
    let id = kitchen.recipe(&kitchen.alice, "Fries", 30, vec![item(salt, None, None)]);
    let view = kitchen.service.get_recipe(&Kitchen::anonymous(), id).unwrap();
    let line = view.ingredients[0].id;

    assert!(kitchen
        .service
        .remove_line_item(&Kitchen::ctx(&kitchen.bob), id, line)
        .is_err());

    let view = kitchen
        .service
        .remove_line_item(&Kitchen::ctx(&kitchen.alice), id, line)
        .unwrap();
    assert!(view.ingredients.is_empty());

    let err = kitchen
        .service
        .remove_line_item(&Kitchen::ctx(&kitchen.alice), id, line)
        .unwrap_err();
    assert_eq!(err.kind, ViolationKind::NotFound { resource: "line item" });
}

#[test]
fn any_authenticated_user_edits_ingredients() {
    let kitchen = Kitchen::new();
    let salt = kitchen.ingredient("Salt");

    let view = kitchen
        .service
        .partial_update_ingredient(
            &Kitchen::ctx(&kitchen.bob),
            salt,
            IngredientDraft {
                name: Some("Sea Salt".to_string()),
                image: None,
            },
        )
        .unwrap();
    assert_eq!(view.name, "Sea Salt");
    assert_eq!(view.created_by, Some(kitchen.alice.id));

    let err = kitchen
        .service
        .delete_ingredient(&Kitchen::anonymous(), salt)
        .unwrap_err();
    assert_eq!(err.kind, ViolationKind::Unauthenticated);
}

#[test]
fn comments_are_scoped_to_their_recipe() {
    let kitchen = Kitchen::new();
    let five = kitchen.recipe(&kitchen.alice, "Stew", 90, vec![]);
    let seven = kitchen.recipe(&kitchen.alice, "Cake", 60, vec![]);

    let comment = kitchen
        .service
        .create_comment(
            &Kitchen::ctx(&kitchen.bob),
            &ScopeContext::new(seven),
            CommentDraft {
                parent_id: Some(five.0),
                owner_id: Some(kitchen.alice.id.0),
                body: "Moist".to_string(),
            },
        )
        .unwrap();
    assert_eq!(comment.recipe, seven);
    assert_eq!(comment.owner, kitchen.bob.id);

    let under_five = ScopeContext::new(five);
    let listed = kitchen
        .service
        .list_comments(&Kitchen::anonymous(), &under_five, PageRequest::default())
        .unwrap();
    assert_eq!(listed.count, 0);

    // Even the author cannot reach it through the wrong parent.
    let err = kitchen
        .service
        .delete_comment(&Kitchen::ctx(&kitchen.bob), &under_five, comment.id)
        .unwrap_err();
    assert_eq!(err.kind, ViolationKind::NotFound { resource: "comment" });
    assert_eq!(err.kind.status_code(), 404);
}

#[test]
fn comment_update_and_destroy_are_asymmetric() {
    let kitchen = Kitchen::new();
    let recipe = kitchen.recipe(&kitchen.alice, "Pie", 50, vec![]);
    let scope = ScopeContext::new(recipe);
    let comment = kitchen
        .service
        .create_comment(
            &Kitchen::ctx(&kitchen.bob),
            &scope,
            CommentDraft {
                parent_id: None,
                owner_id: None,
                body: "Flaky".to_string(),
            },
        )
        .unwrap();
    let admin = PrincipalContext::new("req-admin", Principal::admin(999));

    let err = kitchen
        .service
        .update_comment(
            &admin,
            &scope,
            comment.id,
            CommentEdit {
                body: "Edited by staff".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err.kind, ViolationKind::Forbidden { .. }));

    kitchen
        .service
        .delete_comment(&admin, &scope, comment.id)
        .unwrap();
    assert!(kitchen.service.storage().comment(comment.id).is_none());
}

#[test]
fn comment_on_missing_recipe_is_not_found() {
    let kitchen = Kitchen::new();
    let err = kitchen
        .service
        .create_comment(
            &Kitchen::ctx(&kitchen.bob),
            &ScopeContext::new(RecipeId(4040)),
            CommentDraft {
                parent_id: None,
                owner_id: None,
                body: "Hello?".to_string(),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind, ViolationKind::NotFound { resource: "recipe" });
}

#[test]
fn recipe_collection_filters_orders_and_pages() {
    let kitchen = Kitchen::new();
    let tomato = kitchen.ingredient("Tomato");
    kitchen.recipe(&kitchen.alice, "Quick salad", 10, vec![item(tomato, None, None)]);
    kitchen.recipe(&kitchen.bob, "Slow sauce", 120, vec![item(tomato, None, None)]);
    kitchen.recipe(&kitchen.alice, "Toast", 5, vec![]);

    let params = HashMap::from([
        ("ingredients__ingredient__name__iexact".to_string(), "tomato".to_string()),
        ("ordering".to_string(), "-time_minutes".to_string()),
    ]);
    let query = RecipeQuery::from_params(&params).unwrap();
    let page = kitchen
        .service
        .list_recipes(&Kitchen::anonymous(), &query)
        .unwrap();
    let titles: Vec<_> = page.items.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Slow sauce", "Quick salad"]);

    let params = HashMap::from([("user__username__iexact".to_string(), "ALICE".to_string())]);
    let page = kitchen
        .service
        .list_recipes(&Kitchen::anonymous(), &RecipeQuery::from_params(&params).unwrap())
        .unwrap();
    assert_eq!(page.count, 2);

    // Three recipes with a page size of two.
    let all = kitchen
        .service
        .list_recipes(&Kitchen::anonymous(), &RecipeQuery::default())
        .unwrap();
    assert_eq!((all.count, all.items.len(), all.has_next), (3, 2, true));

    let params = HashMap::from([("page".to_string(), "3".to_string())]);
    let err = kitchen
        .service
        .list_recipes(&Kitchen::anonymous(), &RecipeQuery::from_params(&params).unwrap())
        .unwrap_err();
    assert_eq!(err.kind, ViolationKind::NotFound { resource: "page" });
}

#[test]
fn profiles_are_admin_only_except_me() {
    let kitchen = Kitchen::new();
    let admin = PrincipalContext::new("req-admin", Principal::admin(999));

    let err = kitchen
        .service
        .list_profiles(&Kitchen::ctx(&kitchen.alice), PageRequest::default())
        .unwrap_err();
    assert!(matches!(err.kind, ViolationKind::Forbidden { .. }));
    assert_eq!(
        kitchen
            .service
            .list_profiles(&admin, PageRequest::default())
            .unwrap()
            .count,
        2
    );

    let err = kitchen.service.me(&Kitchen::anonymous()).unwrap_err();
    assert_eq!(err.kind, ViolationKind::Unauthenticated);

    let mine = kitchen
        .service
        .update_me(
            &Kitchen::ctx(&kitchen.bob),
            ProfileUpdate {
                bio: Some("Baker".to_string()),
                image: Some("images/profiles/bob.png".to_string()),
                phone_number: None,
            },
            false,
        )
        .unwrap();
    assert_eq!(mine.user, kitchen.bob.id);
    assert_eq!(
        mine.image.map(|u| u.to_string()),
        Some("http://testserver/media/images/profiles/bob.png".to_string())
    );

    // Owners edit their profile by id too, but nobody else's.
    let err = kitchen
        .service
        .partial_update_profile(
            &Kitchen::ctx(&kitchen.alice),
            mine.id,
            ProfileUpdate::default(),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ViolationKind::Forbidden { .. }));
}

#[test]
fn deleting_user_removes_owned_content() {
    let kitchen = Kitchen::new();
    let salt = kitchen.ingredient("Salt");
    kitchen.recipe(&kitchen.alice, "Brine", 5, vec![item(salt, None, None)]);

    assert!(kitchen.service.storage().delete_user(kitchen.alice.id));
    assert!(kitchen.service.storage().recipes().is_empty());
    assert!(kitchen.service.storage().profile_of(kitchen.alice.id).is_none());

    let ingredient = kitchen
        .service
        .get_ingredient(&Kitchen::anonymous(), salt)
        .unwrap();
    assert_eq!(ingredient.created_by, None);
}

#[test]
fn every_decision_reaches_the_trail() {
    let kitchen = Kitchen::new();
    let id = kitchen.recipe(&kitchen.alice, "Tea", 3, vec![]);
    kitchen.trail.clear();

    let _ = kitchen.service.delete_recipe(&Kitchen::ctx(&kitchen.bob), id);
    kitchen
        .service
        .delete_recipe(&Kitchen::ctx(&kitchen.alice), id)
        .unwrap();

    let events = kitchen.trail.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].verdict(), Verdict::Forbidden);
    assert_eq!(events[0].principal(), Some(kitchen.bob.id));
    assert_eq!(events[1].verdict(), Verdict::Allow);
    assert_eq!(events[1].kind(), AuditEventKind::Mutation);
    assert_eq!(events[1].target_id(), Some(id.0));
}

#[test]
fn grant_for_own_object_does_not_unlock_others() {
    let kitchen = Kitchen::new();
    let id = kitchen.recipe(&kitchen.alice, "Tea", 3, vec![]);

    let bob = Kitchen::ctx(&kitchen.bob);
    let grant = AccessGate::new(&bob)
        .check(
            ResourceKind::Recipe,
            Action::Update,
            Some(&Target::new(999, Some(kitchen.bob.id))),
        )
        .expect("bob owns recipe 999");

    let mut hijacked = kitchen.service.storage().recipe(id).unwrap();
    hijacked.title = "Hijacked".to_string();
    let err = kitchen
        .service
        .storage()
        .update_recipe(&grant, hijacked, None)
        .unwrap_err();
    assert!(matches!(err.kind, ViolationKind::Forbidden { .. }));
    assert_eq!(kitchen.service.storage().recipe(id).unwrap().title, "Tea");
}
