//! Request adapter for mapping HTTP requests to recipe-policy types.

use std::collections::HashMap;

use crate::collection::{PageRequest, RecipeQuery};
use crate::context::{PrincipalContext, ScopeContext};
use crate::error::Violation;
use crate::model::RecipeId;
use crate::policy::{Action, ResourceKind};
use crate::request::{Principal, RequestMeta};

use super::{ExtractMetadata, HttpMethod};

/// Path parameter naming the parent recipe of nested comment routes.
pub const RECIPE_PK: &str = "recipe_pk";

/// Which route of a resource a request hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `/<resource>/`
    Collection,
    /// `/<resource>/<id>/`, with the raw id segment
    Detail(String),
    /// `/<resource>/me/`
    Me,
}

/// Framework-agnostic view of one HTTP request.
///
/// Framework integrations fill an adapter from their own request type; the
/// adapter then yields the decision inputs: the caller, the action verb and
/// the parent scope of nested routes.
///
/// # Examples
///
/// ```
/// use recipe_policy::web::{Endpoint, HttpMethod, RequestAdapter};
/// use recipe_policy::{Action, Principal, RecipeId, ResourceKind};
///
/// let mut adapter = RequestAdapter::new(
///     "req-12345",
///     HttpMethod::Post,
///     ResourceKind::Comment,
///     Endpoint::Collection,
/// );
/// adapter.set_principal(Principal::user(7));
/// adapter.add_path_param("recipe_pk", "5");
///
/// assert_eq!(adapter.action(), Some(Action::Create));
/// assert_eq!(adapter.scope().unwrap().map(|s| s.parent()), Some(RecipeId(5)));
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    request_id: String,
    /// Anonymous until the authentication layer says otherwise
    principal: Principal,
    method: HttpMethod,
    resource: ResourceKind,
    endpoint: Endpoint,
    query_params: HashMap<String, String>,
    path_params: HashMap<String, String>,
}

impl RequestAdapter {
    /// Creates an adapter for an anonymous request.
    pub fn new(
        request_id: impl Into<String>,
        method: HttpMethod,
        resource: ResourceKind,
        endpoint: Endpoint,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            principal: Principal::anonymous(),
            method,
            resource,
            endpoint,
            query_params: HashMap::new(),
            path_params: HashMap::new(),
        }
    }

    /// Sets the caller, as established by the authentication layer.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = principal;
    }

    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query_params.insert(key.into(), value.into());
    }

    pub fn add_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.path_params.insert(key.into(), value.into());
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// The action verb of this request.
    ///
    /// `None` for method and route combinations the API does not serve;
    /// callers answer those with 405.
    pub fn action(&self) -> Option<Action> {
        use HttpMethod::*;

        match (&self.endpoint, self.method) {
            (Endpoint::Collection, Get) => Some(Action::List),
            (Endpoint::Collection, Post) => Some(Action::Create),
            (Endpoint::Detail(_), Get) => Some(Action::Retrieve),
            (Endpoint::Detail(_), Put) => Some(Action::Update),
            (Endpoint::Detail(_), Patch) => Some(Action::PartialUpdate),
            (Endpoint::Detail(_), Delete) => Some(Action::Destroy),
            (Endpoint::Me, Get | Put) => Some(Action::Me),
            _ => None,
        }
    }

    /// The parent scope of nested comment routes, `None` elsewhere.
    ///
    /// # Errors
    ///
    /// A missing or non-numeric `recipe_pk` on a comment route is `NotFound`.
    pub fn scope(&self) -> Result<Option<ScopeContext>, Violation> {
        if self.resource != ResourceKind::Comment {
            return Ok(None);
        }
        self.path_params
            .get(RECIPE_PK)
            .and_then(|raw| raw.parse().ok())
            .map(|id| Some(ScopeContext::new(RecipeId(id))))
            .ok_or_else(|| Violation::not_found("recipe"))
    }

    /// The numeric id of a detail route, `None` on other routes.
    ///
    /// # Errors
    ///
    /// A non-numeric id is `NotFound`, as no record could match it.
    pub fn detail_id(&self) -> Result<Option<u64>, Violation> {
        match &self.endpoint {
            Endpoint::Detail(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| Violation::not_found(self.resource.as_str())),
            _ => Ok(None),
        }
    }

    /// Parses the recipe collection filters from the query string.
    pub fn recipe_query(&self) -> Result<RecipeQuery, Violation> {
        RecipeQuery::from_params(&self.query_params)
    }

    /// Parses `page` and `page_size` from the query string.
    pub fn page_request(&self) -> Result<PageRequest, Violation> {
        let mut page = PageRequest::default();
        if let Some(raw) = self.query_params.get("page") {
            page.page = raw
                .trim()
                .parse()
                .map_err(|_| Violation::not_found("page"))?;
        }
        if let Some(raw) = self.query_params.get("page_size") {
            page.page_size = Some(raw.trim().parse().map_err(|_| {
                Violation::validation("page_size", format!("Enter a whole number, got '{}'", raw))
            })?);
        }
        Ok(page)
    }

    /// The principal context core operations take.
    pub fn context(&self) -> PrincipalContext {
        self.extract_metadata().into()
    }
}

impl ExtractMetadata for RequestAdapter {
    fn extract_metadata(&self) -> RequestMeta {
        RequestMeta::new(self.request_id.clone(), self.principal)
    }
}
