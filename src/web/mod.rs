//! Web framework integration surface.
//!
//! This module is the boundary between HTTP frameworks and the access gate.
//! It handles:
//! - Mapping HTTP requests to domain types (`RequestMeta`, `Action`)
//! - Deriving the parent scope of nested routes from path parameters
//! - Mapping violations back onto status codes
//!
//! It contains no framework-specific code and never decides access itself.
//!
//! # Integration Model
//!
//! Framework-specific code should:
//! 1. Build a [`RequestAdapter`] from the framework request type
//! 2. Pass it with the decoded JSON body to [`handle`]
//! 3. Write the returned [`Response`] back
//!
//! # Example Flow
//!
//! ```
//! use recipe_policy::web::{handle, Endpoint, HttpMethod, RequestAdapter};
//! use recipe_policy::{ApiConfig, MemoryStorage, Principal, RecipeService, ResourceKind};
//! use serde_json::json;
//!
//! let service = RecipeService::new(MemoryStorage::new(), ApiConfig::default()).unwrap();
//!
//! let mut request = RequestAdapter::new(
//!     "req-42",
//!     HttpMethod::Post,
//!     ResourceKind::Ingredient,
//!     Endpoint::Collection,
//! );
//! request.set_principal(Principal::user(1));
//!
//! let body = json!({ "name": "Basil", "image": "images/ingredients/basil.png" });
//! let response = handle(&service, &request, Some(&body));
//! assert_eq!(response.status, 201);
//! assert_eq!(response.body["name"], "Basil");
//! ```

mod adapter;
mod extract;
mod handler;
mod method;

pub use adapter::{Endpoint, RequestAdapter, RECIPE_PK};
pub use extract::ExtractMetadata;
pub use handler::{handle, Response};
pub use method::HttpMethod;
