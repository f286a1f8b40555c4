//! Writes issued but not yet observed in the cache
//!
//! Before creating an object the sweep raises the pending-add count for its
//! (owner, kind). Whoever observes the object arriving in the cache lowers
//! it again. Until all counts for an owner are settled, the reconcile loop
//! should not trust the cache as a complete picture of that owner's writes.

use dashmap::DashMap;

use crate::kind::AuthzKind;

/// Counter adjustments keyed by owner and kind
///
/// Implementations must tolerate concurrent calls from reconciles of
/// different owners.
pub trait Expectations: Send + Sync {
    /// Expect `adds` more creates and `deletes` more deletions to show up
    fn raise(&self, owner: &str, kind: AuthzKind, adds: i64, deletes: i64);

    /// Withdraw or satisfy previously raised expectations
    fn lower(&self, owner: &str, kind: AuthzKind, adds: i64, deletes: i64);
}

/// Outstanding writes for one (owner, kind)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingWrites {
    /// Creates not yet observed
    pub adds: i64,
    /// Deletions not yet observed
    pub deletes: i64,
}

impl PendingWrites {
    /// Nothing is left to wait for. Counts may go negative when an
    /// observation races ahead of its raise.
    pub fn is_settled(&self) -> bool {
        self.adds <= 0 && self.deletes <= 0
    }
}

/// In-memory expectation store
#[derive(Debug, Default)]
pub struct ExpectationStore {
    pending: DashMap<(String, AuthzKind), PendingWrites>,
}

impl ExpectationStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding writes for (owner, kind)
    pub fn pending(&self, owner: &str, kind: AuthzKind) -> PendingWrites {
        self.pending
            .get(&(owner.to_string(), kind))
            .map(|p| *p)
            .unwrap_or_default()
    }

    /// Whether every kind is settled for `owner`
    pub fn satisfied(&self, owner: &str) -> bool {
        AuthzKind::ALL
            .iter()
            .all(|kind| self.pending(owner, *kind).is_settled())
    }

    /// A created object for `owner` has appeared in the cache
    pub fn observed_add(&self, owner: &str, kind: AuthzKind) {
        self.lower(owner, kind, 1, 0);
    }

    /// A deleted object for `owner` has disappeared from the cache
    pub fn observed_delete(&self, owner: &str, kind: AuthzKind) {
        self.lower(owner, kind, 0, 1);
    }

    /// Forget everything recorded for `owner`
    pub fn clear(&self, owner: &str) {
        self.pending.retain(|(o, _), _| o != owner);
    }

    fn adjust(&self, owner: &str, kind: AuthzKind, adds: i64, deletes: i64) {
        let mut entry = self.pending.entry((owner.to_string(), kind)).or_default();
        entry.adds += adds;
        entry.deletes += deletes;
    }
}

impl Expectations for ExpectationStore {
    fn raise(&self, owner: &str, kind: AuthzKind, adds: i64, deletes: i64) {
        self.adjust(owner, kind, adds, deletes);
    }

    fn lower(&self, owner: &str, kind: AuthzKind, adds: i64, deletes: i64) {
        self.adjust(owner, kind, -adds, -deletes);
    }
}
