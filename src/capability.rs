use crate::error::Violation;
use crate::policy::{Action, ResourceKind};
use crate::request::Principal;

/// Proof that the access gate allowed one action on one resource kind.
///
/// A `Grant` can only be produced by [`AccessGate::check`](crate::AccessGate::check),
/// so any function taking one cannot run before the decision was made.
/// Every mutating operation of the crate takes a `&Grant`. A grant checked
/// against an object covers that object only.
#[derive(Debug, Clone, Copy)]
pub struct Grant {
    kind: ResourceKind,
    action: Action,
    /// Id of the object the decision was made about
    target: Option<u64>,
    /// `None` for grants the system issues to itself
    principal: Option<Principal>,
    // Private field prevents construction outside the crate
    _private: (),
}

impl Grant {
    /// Creates a new Grant.
    ///
    /// This is `pub(crate)` so only the gate can create it.
    pub(crate) fn new(
        kind: ResourceKind,
        action: Action,
        principal: Principal,
        target: Option<u64>,
    ) -> Self {
        Self {
            kind,
            action,
            target,
            principal: Some(principal),
            _private: (),
        }
    }

    /// Creates a grant for an operation the system performs on its own,
    /// such as creating the profile of a new user.
    pub(crate) fn system(kind: ResourceKind, action: Action) -> Self {
        Self {
            kind,
            action,
            target: None,
            principal: None,
            _private: (),
        }
    }

    /// The resource kind this grant covers.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The action this grant covers.
    pub fn action(&self) -> Action {
        self.action
    }

    /// The object this grant was checked against, if any.
    pub fn target(&self) -> Option<u64> {
        self.target
    }

    /// The principal the grant was issued to, `None` for system grants.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Checks that this grant covers `kind` and one of `actions`.
    pub fn ensure(&self, kind: ResourceKind, actions: &[Action]) -> Result<(), Violation> {
        if self.kind == kind && actions.contains(&self.action) {
            Ok(())
        } else {
            Err(Violation::forbidden(
                actions.first().map(Action::as_str).unwrap_or("unknown"),
                format!(
                    "Grant for {} {} does not cover this {} operation",
                    self.action, self.kind, kind
                ),
            ))
        }
    }

    /// Like [`Grant::ensure`], and also checks that the grant was issued for
    /// object `id`.
    pub fn ensure_for(&self, kind: ResourceKind, actions: &[Action], id: u64) -> Result<(), Violation> {
        self.ensure(kind, actions)?;
        if self.target == Some(id) {
            return Ok(());
        }
        Err(Violation::forbidden(
            self.action.as_str(),
            format!("Grant for {} {} does not cover {} {}", self.action, self.kind, kind, id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;

    #[test]
    fn grant_cannot_be_constructed_publicly() {
        // Grant has a private field; outside the crate this does not compile:
        // let fake = Grant { kind, action, principal, _private: () };
    }

    #[test]
    fn ensure_accepts_matching_grant() {
        let grant = Grant::new(ResourceKind::Recipe, Action::PartialUpdate, Principal::user(1), None);
        assert!(grant
            .ensure(ResourceKind::Recipe, &[Action::Update, Action::PartialUpdate])
            .is_ok());
    }

    #[test]
    fn ensure_rejects_other_kind_or_action() {
        let grant = Grant::new(ResourceKind::Comment, Action::Create, Principal::user(1), None);

        let err = grant
            .ensure(ResourceKind::Recipe, &[Action::Create])
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::Forbidden { action: "create" });

        assert!(grant.ensure(ResourceKind::Comment, &[Action::Destroy]).is_err());
    }

    #[test]
    fn grant_covers_only_its_target() {
        let grant = Grant::new(ResourceKind::Recipe, Action::Update, Principal::user(2), Some(7));
        assert!(grant.ensure_for(ResourceKind::Recipe, &[Action::Update], 7).is_ok());

        let err = grant
            .ensure_for(ResourceKind::Recipe, &[Action::Update], 8)
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::Forbidden { action: "update" });
    }

    #[test]
    fn untargeted_grant_covers_no_existing_object() {
        let grant = Grant::new(ResourceKind::Profile, Action::Me, Principal::user(2), None);
        assert!(grant.ensure_for(ResourceKind::Profile, &[Action::Me], 1).is_err());
    }

    #[test]
    fn system_grant_has_no_principal() {
        let grant = Grant::system(ResourceKind::Profile, Action::Create);
        assert!(grant.principal().is_none());
        assert!(grant.ensure(ResourceKind::Profile, &[Action::Create]).is_ok());
    }
}
