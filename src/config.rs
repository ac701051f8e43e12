//! API configuration.

use serde::Deserialize;
use url::Url;

use crate::error::Error;

/// Settings the core needs from its deployment.
///
/// Every field has a default, so an empty JSON object is a valid config.
///
/// # Examples
///
/// ```
/// use recipe_policy::ApiConfig;
///
/// let config = ApiConfig::from_json(r#"{"origin": "https://recipes.example", "page_size": 20}"#)
///     .expect("valid config");
/// assert_eq!(config.page_size, 20);
/// assert_eq!(config.media_prefix, "/media/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Origin used to turn blob keys into absolute URLs
    pub origin: Url,
    /// Path prefix under which blobs are served
    pub media_prefix: String,
    /// Page size when the client does not ask for one
    pub page_size: usize,
    /// Upper bound for client-requested page sizes
    pub max_page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:8000").expect("static origin is a valid URL"),
            media_prefix: "/media/".to_string(),
            page_size: 10,
            max_page_size: 100,
        }
    }
}

impl ApiConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is malformed or inconsistent.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let config: ApiConfig =
            serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.origin.scheme(), "http" | "https") || self.origin.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "origin must be an http(s) base URL, got '{}'",
                self.origin
            )));
        }
        if self.page_size == 0 || self.max_page_size == 0 {
            return Err(Error::Config("page sizes must be positive".to_string()));
        }
        if self.page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "page_size {} exceeds max_page_size {}",
                self.page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ApiConfig::from_json("{}").unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.origin.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn rejects_non_http_origin() {
        let err = ApiConfig::from_json(r#"{"origin": "mailto:chef@example.com"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_page_size_above_cap() {
        let err = ApiConfig::from_json(r#"{"page_size": 50, "max_page_size": 20}"#).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(ApiConfig::from_json(r#"{"pagesize": 5}"#).is_err());
    }
}
