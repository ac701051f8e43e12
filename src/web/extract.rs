//! Extraction boundary trait for web integration.

use crate::request::RequestMeta;

/// Extracts request metadata from a framework-specific request.
///
/// This is the boundary between web framework types and the
/// [`RequestMeta`] the access gate works from. Implementations map request
/// ids and authenticated sessions; they never decide access.
///
/// # Examples
///
/// ```
/// use recipe_policy::web::ExtractMetadata;
/// use recipe_policy::{Principal, RequestMeta};
///
/// struct MyFrameworkRequest {
///     request_id: String,
///     session_user: Option<u64>,
/// }
///
/// impl ExtractMetadata for MyFrameworkRequest {
///     fn extract_metadata(&self) -> RequestMeta {
///         let principal = self
///             .session_user
///             .map(Principal::user)
///             .unwrap_or_else(Principal::anonymous);
///         RequestMeta::new(self.request_id.clone(), principal)
///     }
/// }
///
/// let req = MyFrameworkRequest { request_id: "req-1".to_string(), session_user: None };
/// assert!(!req.extract_metadata().principal.is_authenticated);
/// ```
pub trait ExtractMetadata {
    /// Extracts the request id and the caller.
    fn extract_metadata(&self) -> RequestMeta;
}
