use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata about an incoming request.
///
/// Contains the request identifier and the caller. Anonymous callers are
/// represented by [`Principal::anonymous`], never by a missing principal.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Unique identifier for this request
    pub request_id: String,
    /// The caller issuing the request
    pub principal: Principal,
}

impl RequestMeta {
    /// Creates request metadata for `principal`.
    pub fn new(request_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            request_id: request_id.into(),
            principal,
        }
    }
}

/// The actor issuing a request, as reported by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account identifier; meaningless when `is_authenticated` is false
    pub id: UserId,
    /// Whether the identity collaborator authenticated this caller
    pub is_authenticated: bool,
    /// Staff flag of the account
    pub is_admin: bool,
}

impl Principal {
    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self {
            id: UserId(0),
            is_authenticated: false,
            is_admin: false,
        }
    }

    /// An authenticated, non-admin user.
    pub fn user(id: u64) -> Self {
        Self {
            id: UserId(id),
            is_authenticated: true,
            is_admin: false,
        }
    }

    /// An authenticated admin.
    pub fn admin(id: u64) -> Self {
        Self {
            id: UserId(id),
            is_authenticated: true,
            is_admin: true,
        }
    }

    /// Returns the account id of an authenticated caller.
    pub fn authenticated_id(&self) -> Option<UserId> {
        self.is_authenticated.then_some(self.id)
    }

    /// True when the caller is an authenticated admin.
    ///
    /// An unauthenticated principal never counts as admin, whatever its flag says.
    pub fn is_effective_admin(&self) -> bool {
        self.is_authenticated && self.is_admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_authenticated_id() {
        assert_eq!(Principal::anonymous().authenticated_id(), None);
        assert_eq!(Principal::user(4).authenticated_id(), Some(UserId(4)));
    }

    #[test]
    fn admin_flag_requires_authentication() {
        let forged = Principal {
            id: UserId(1),
            is_authenticated: false,
            is_admin: true,
        };
        assert!(!forged.is_effective_admin());
        assert!(Principal::admin(1).is_effective_admin());
    }
}
