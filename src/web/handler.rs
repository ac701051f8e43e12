//! JSON dispatch of adapted requests onto a [`RecipeService`].
//!
//! This is the thinnest possible transport: the adapter supplies the action
//! and ids, the service decides and acts, and violations are mapped onto
//! status codes here and nowhere else.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::context::PrincipalContext;
use crate::error::{Error, Violation, ViolationKind};
use crate::model::{CommentId, IngredientId, ProfileId, RecipeId};
use crate::policy::{Action, ResourceKind};
use crate::service::RecipeService;
use crate::storage::Storage;

use super::{HttpMethod, RequestAdapter};

/// Status code and JSON body of a handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// `Value::Null` for 204 responses
    pub body: Value,
}

impl Response {
    fn with<T: Serialize>(status: u16, value: &T) -> Result<Self, Error> {
        Ok(Self {
            status,
            body: serde_json::to_value(value)?,
        })
    }

    fn ok<T: Serialize>(value: &T) -> Result<Self, Error> {
        Self::with(200, value)
    }

    fn created<T: Serialize>(value: &T) -> Result<Self, Error> {
        Self::with(201, value)
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    fn method_not_allowed(method: HttpMethod) -> Self {
        Self {
            status: 405,
            body: json!({ "detail": format!("Method \"{}\" not allowed.", method) }),
        }
    }

    /// Maps a violation onto its status code.
    ///
    /// Validation failures are keyed by the offending field.
    pub fn from_violation(violation: &Violation) -> Self {
        let body = match violation.kind {
            ViolationKind::Validation { field } => {
                let mut errors = serde_json::Map::new();
                errors.insert(field.to_string(), json!([violation.message]));
                Value::Object(errors)
            }
            _ => json!({ "detail": violation.message }),
        };
        Self {
            status: violation.kind.status_code(),
            body,
        }
    }
}

/// Handles one request against `service`.
///
/// # Examples
///
/// ```
/// use recipe_policy::web::{handle, Endpoint, HttpMethod, RequestAdapter};
/// use recipe_policy::{ApiConfig, MemoryStorage, RecipeService, ResourceKind};
///
/// let service = RecipeService::new(MemoryStorage::new(), ApiConfig::default()).unwrap();
/// let request = RequestAdapter::new(
///     "req-1",
///     HttpMethod::Post,
///     ResourceKind::Recipe,
///     Endpoint::Collection,
/// );
///
/// let response = handle(&service, &request, None);
/// assert_eq!(response.status, 401);
/// ```
pub fn handle<S: Storage>(
    service: &RecipeService<S>,
    request: &RequestAdapter,
    body: Option<&Value>,
) -> Response {
    match route(service, request, body) {
        Ok(response) => response,
        Err(Error::Violation(violation)) => Response::from_violation(&violation),
        Err(err) => {
            tracing::error!(request_id = %request.request_id(), error = %err, "request failed");
            Response {
                status: 500,
                body: json!({ "detail": "A server error occurred." }),
            }
        }
    }
}

fn payload<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, Violation> {
    let raw = body.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(raw).map_err(|e| Violation::validation("body", e.to_string()))
}

fn required(id: Option<u64>, kind: ResourceKind) -> Result<u64, Violation> {
    id.ok_or_else(|| Violation::not_found(kind.as_str()))
}

fn route<S: Storage>(
    service: &RecipeService<S>,
    request: &RequestAdapter,
    body: Option<&Value>,
) -> Result<Response, Error> {
    let Some(action) = request.action() else {
        return Ok(Response::method_not_allowed(request.method()));
    };
    let ctx = request.context();
    tracing::debug!(
        request_id = %ctx.request_id(),
        method = %request.method(),
        resource = %request.resource(),
        action = %action,
        "dispatching request"
    );

    match request.resource() {
        ResourceKind::Recipe => recipes(service, &ctx, request, action, body),
        ResourceKind::Ingredient => ingredients(service, &ctx, request, action, body),
        ResourceKind::Comment => comments(service, &ctx, request, action, body),
        ResourceKind::Profile => profiles(service, &ctx, request, action, body),
    }
}

fn recipes<S: Storage>(
    service: &RecipeService<S>,
    ctx: &PrincipalContext,
    request: &RequestAdapter,
    action: Action,
    body: Option<&Value>,
) -> Result<Response, Error> {
    let id = || -> Result<RecipeId, Violation> {
        Ok(RecipeId(required(request.detail_id()?, ResourceKind::Recipe)?))
    };
    match action {
        Action::List => Response::ok(&service.list_recipes(ctx, &request.recipe_query()?)?),
        Action::Retrieve => Response::ok(&service.get_recipe(ctx, id()?)?),
        Action::Create => Response::created(&service.create_recipe(ctx, payload(body)?)?),
        Action::Update => Response::ok(&service.update_recipe(ctx, id()?, payload(body)?)?),
        Action::PartialUpdate => {
            Response::ok(&service.partial_update_recipe(ctx, id()?, payload(body)?)?)
        }
        Action::Destroy => {
            service.delete_recipe(ctx, id()?)?;
            Ok(Response::no_content())
        }
        Action::Me => Ok(Response::from_violation(&Violation::not_found("recipe"))),
    }
}

fn ingredients<S: Storage>(
    service: &RecipeService<S>,
    ctx: &PrincipalContext,
    request: &RequestAdapter,
    action: Action,
    body: Option<&Value>,
) -> Result<Response, Error> {
    let id = || -> Result<IngredientId, Violation> {
        Ok(IngredientId(required(request.detail_id()?, ResourceKind::Ingredient)?))
    };
    match action {
        Action::List => Response::ok(&service.list_ingredients(ctx, request.page_request()?)?),
        Action::Retrieve => Response::ok(&service.get_ingredient(ctx, id()?)?),
        Action::Create => Response::created(&service.create_ingredient(ctx, payload(body)?)?),
        Action::Update => Response::ok(&service.update_ingredient(ctx, id()?, payload(body)?)?),
        Action::PartialUpdate => {
            Response::ok(&service.partial_update_ingredient(ctx, id()?, payload(body)?)?)
        }
        Action::Destroy => {
            service.delete_ingredient(ctx, id()?)?;
            Ok(Response::no_content())
        }
        Action::Me => Ok(Response::from_violation(&Violation::not_found("ingredient"))),
    }
}

fn comments<S: Storage>(
    service: &RecipeService<S>,
    ctx: &PrincipalContext,
    request: &RequestAdapter,
    action: Action,
    body: Option<&Value>,
) -> Result<Response, Error> {
    let scope = request
        .scope()?
        .ok_or_else(|| Violation::not_found("recipe"))?;
    let id = || -> Result<CommentId, Violation> {
        Ok(CommentId(required(request.detail_id()?, ResourceKind::Comment)?))
    };
    match action {
        Action::List => Response::ok(&service.list_comments(ctx, &scope, request.page_request()?)?),
        Action::Retrieve => Response::ok(&service.get_comment(ctx, &scope, id()?)?),
        Action::Create => Response::created(&service.create_comment(ctx, &scope, payload(body)?)?),
        Action::Update => {
            Response::ok(&service.update_comment(ctx, &scope, id()?, payload(body)?)?)
        }
        Action::PartialUpdate => {
            Response::ok(&service.partial_update_comment(ctx, &scope, id()?, payload(body)?)?)
        }
        Action::Destroy => {
            service.delete_comment(ctx, &scope, id()?)?;
            Ok(Response::no_content())
        }
        Action::Me => Ok(Response::from_violation(&Violation::not_found("comment"))),
    }
}

fn profiles<S: Storage>(
    service: &RecipeService<S>,
    ctx: &PrincipalContext,
    request: &RequestAdapter,
    action: Action,
    body: Option<&Value>,
) -> Result<Response, Error> {
    let id = || -> Result<ProfileId, Violation> {
        Ok(ProfileId(required(request.detail_id()?, ResourceKind::Profile)?))
    };
    match action {
        Action::List => Response::ok(&service.list_profiles(ctx, request.page_request()?)?),
        Action::Retrieve => Response::ok(&service.get_profile(ctx, id()?)?),
        Action::Create => Response::created(&service.create_profile(ctx)?),
        Action::Update => Response::ok(&service.update_profile(ctx, id()?, payload(body)?)?),
        Action::PartialUpdate => {
            Response::ok(&service.partial_update_profile(ctx, id()?, payload(body)?)?)
        }
        Action::Destroy => {
            service.delete_profile(ctx, id()?)?;
            Ok(Response::no_content())
        }
        Action::Me => match request.method() {
            HttpMethod::Get => Response::ok(&service.me(ctx)?),
            HttpMethod::Put => Response::ok(&service.update_me(ctx, payload(body)?, false)?),
            method => Ok(Response::method_not_allowed(method)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::request::Principal;
    use crate::storage::MemoryStorage;
    use crate::web::Endpoint;

    fn service() -> RecipeService<MemoryStorage> {
        RecipeService::new(MemoryStorage::new(), ApiConfig::default()).unwrap()
    }

    #[test]
    fn unsupported_method_is_405() {
        let request = RequestAdapter::new(
            "req-1",
            HttpMethod::Delete,
            ResourceKind::Recipe,
            Endpoint::Collection,
        );
        let response = handle(&service(), &request, None);
        assert_eq!(response.status, 405);
        assert_eq!(response.body["detail"], "Method \"DELETE\" not allowed.");
    }

    #[test]
    fn validation_errors_are_keyed_by_field() {
        let service = service();
        let mut request = RequestAdapter::new(
            "req-2",
            HttpMethod::Post,
            ResourceKind::Ingredient,
            Endpoint::Collection,
        );
        request.set_principal(Principal::user(1));

        let body = json!({ "name": "  ", "image": "salt.png" });
        let response = handle(&service, &request, Some(&body));
        assert_eq!(response.status, 400);
        assert!(response.body["name"].is_array());
    }

    #[test]
    fn malformed_body_is_400() {
        let service = service();
        let mut request = RequestAdapter::new(
            "req-3",
            HttpMethod::Post,
            ResourceKind::Recipe,
            Endpoint::Collection,
        );
        request.set_principal(Principal::user(1));

        let body = json!({ "title": 12 });
        let response = handle(&service, &request, Some(&body));
        assert_eq!(response.status, 400);
        assert!(response.body["body"].is_array());
    }

    #[test]
    fn profile_creation_is_refused_to_clients() {
        let mut request = RequestAdapter::new(
            "req-4",
            HttpMethod::Post,
            ResourceKind::Profile,
            Endpoint::Collection,
        );
        request.set_principal(Principal::admin(1));
        assert_eq!(handle(&service(), &request, None).status, 403);
    }

    #[test]
    fn anonymous_list_is_public() {
        let request = RequestAdapter::new(
            "req-5",
            HttpMethod::Get,
            ResourceKind::Ingredient,
            Endpoint::Collection,
        );
        let response = handle(&service(), &request, None);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["count"], 0);
    }
}
