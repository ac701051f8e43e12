//! Recipe API walkthrough.
//!
//! This demo drives the service through the web boundary:
//! 1. A new user gets a profile from the identity collaborator's event
//! 2. The user shares an ingredient and a recipe with overrides
//! 3. Another user comments, then fails to edit the recipe
//! 4. The audit trail shows every decision
//!
//! Run with: `cargo run --example recipe_flow`

use recipe_policy::web::{handle, Endpoint, HttpMethod, RequestAdapter, RECIPE_PK};
use recipe_policy::audit::AuditTrail;
use recipe_policy::{ApiConfig, MemoryStorage, Principal, RecipeService, ResourceKind, Storage, UserCreated};
use serde_json::json;
use std::sync::Arc;

fn request(method: HttpMethod, resource: ResourceKind, endpoint: Endpoint, principal: Principal) -> RequestAdapter {
    let mut adapter = RequestAdapter::new("req-demo", method, resource, endpoint);
    adapter.set_principal(principal);
    adapter
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(true).init();

    let config = ApiConfig::from_json(r#"{"origin": "https://recipes.example"}"#)?;
    let trail = Arc::new(AuditTrail::new());
    let service = RecipeService::new(MemoryStorage::new(), config)?.with_trail(Arc::clone(&trail));

    println!("=== Recipe Flow Example ===\n");

    let alice = service.storage().insert_user("alice");
    service.on_user_created(&UserCreated { user: alice.clone() })?;
    let alice = Principal::user(alice.id.0);
    println!("✓ alice registered with an empty profile");

    let pepper = handle(
        &service,
        &request(HttpMethod::Post, ResourceKind::Ingredient, Endpoint::Collection, alice),
        Some(&json!({ "name": "Pepper", "image": "images/ingredients/pepper.png" })),
    );
    let recipe = handle(
        &service,
        &request(HttpMethod::Post, ResourceKind::Recipe, Endpoint::Collection, alice),
        Some(&json!({
            "title": "Chili",
            "time_minutes": 45,
            "description": "Slow-cooked and hot",
            "image": "images/recipes/chili.png",
            "ingredients": [
                { "ingredient": pepper.body["id"], "custom_name": "Chili Pepper", "amount": 3, "unit": "pc" }
            ]
        })),
    );
    println!("✓ recipe created ({}):\n{:#}", recipe.status, recipe.body);

    let bob = Principal::user(99);
    let mut comment = request(HttpMethod::Post, ResourceKind::Comment, Endpoint::Collection, bob);
    comment.add_path_param(RECIPE_PK, recipe.body["id"].to_string());
    let posted = handle(&service, &comment, Some(&json!({ "comment": "Great with rice", "user": 1 })));
    println!("\n✓ bob commented ({}), bound to user {}", posted.status, posted.body["user"]);

    let edit = handle(
        &service,
        &request(
            HttpMethod::Patch,
            ResourceKind::Recipe,
            Endpoint::Detail(recipe.body["id"].to_string()),
            bob,
        ),
        Some(&json!({ "title": "Bob's chili" })),
    );
    println!("✗ bob editing alice's recipe: {} {}", edit.status, edit.body["detail"]);

    println!("\n--- Audit trail ---");
    for event in trail.events() {
        println!("{}", event);
    }

    Ok(())
}
