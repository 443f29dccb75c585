#![forbid(unsafe_code)]

//! Gate registry and owner election.
//!
//! The host dashboard may mount several widget instances for the same logical
//! overlay set. The [`Gate`] is the coordination object that keeps them from
//! stepping on each other: it tracks the live instances in registration
//! order, elects exactly one **owner**, and owns the shared layer roots and
//! the single fragment-listener slot. Only the owner renders the shared menu,
//! runs reconciliation, or mutates shared layers; every other instance
//! no-ops those operations.
//!
//! The gate is created by the host once per page session and passed `&mut`
//! into every widget operation. When the last instance unregisters, the
//! shared layers are torn down and the listener slot is released.
//!
//! Election never fails: having no electable owner (no instances mounted) is
//! a legitimate terminal state, and everything that depends on ownership
//! degrades to a no-op.

use std::fmt;

use hashpane_core::{ContentModel, PaneId};
use tracing::debug;

use crate::effect::Effect;
use crate::layer::LayerSet;

/// Identity of one registered widget instance, stable across remounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// What an instance owns, summarized for election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTag {
    /// Menu-only: never a content owner by ID, still electable as fallback.
    MenuOnly,
    /// Legacy single-ID instance.
    Legacy(PaneId),
    /// Definition-list instance.
    List(Vec<PaneId>),
}

impl ContentTag {
    /// Derive the election summary from a content model.
    pub fn from_model(model: &ContentModel) -> Self {
        match model {
            ContentModel::MenuOnly => Self::MenuOnly,
            ContentModel::LegacySingle(def) => Self::Legacy(def.id),
            ContentModel::Definitions(defs) => Self::List(defs.iter().map(|d| d.id).collect()),
        }
    }

    fn owns(&self, id: PaneId) -> bool {
        match self {
            Self::MenuOnly => false,
            Self::Legacy(own) => *own == id,
            Self::List(ids) => ids.contains(&id),
        }
    }
}

#[derive(Debug)]
struct Record {
    id: InstanceId,
    tag: ContentTag,
}

/// Process-wide coordination state for one overlay set.
#[derive(Debug, Default)]
pub struct Gate {
    /// Registration order preserved; first-registered wins ties.
    records: Vec<Record>,
    owner: Option<InstanceId>,
    layers: LayerSet,
    listener_attached: bool,
    ref_count: usize,
    next_instance: u64,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance. Idempotent: re-registering a live instance only
    /// refreshes its tag. A previously used `existing` ID is honored so an
    /// instance keeps its identity across remounts. `targets` are the pane
    /// IDs the current fragment requests, consulted if election is needed.
    pub fn register(
        &mut self,
        existing: Option<InstanceId>,
        tag: ContentTag,
        targets: &[PaneId],
    ) -> InstanceId {
        if let Some(id) = existing {
            if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
                record.tag = tag;
                return id;
            }
            self.records.push(Record { id, tag });
            self.ref_count += 1;
            self.elect(targets);
            return id;
        }

        self.next_instance += 1;
        let id = InstanceId(self.next_instance);
        self.records.push(Record { id, tag });
        self.ref_count += 1;
        self.elect(targets);
        debug!(%id, ref_count = self.ref_count, "gate registered instance");
        id
    }

    /// Unregister an instance. Idempotent. Re-elects if the owner left,
    /// consulting the current fragment `targets`; tears down shared layers
    /// and the listener slot at ref-count zero.
    pub fn unregister(&mut self, id: InstanceId, targets: &[PaneId], fx: &mut Vec<Effect>) {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return;
        }
        self.ref_count = self.ref_count.saturating_sub(1);

        if self.owner == Some(id) {
            self.owner = None;
            self.elect(targets);
        }

        if self.ref_count == 0 {
            debug!("last instance left; tearing down shared layers");
            self.layers.teardown(fx);
            self.listener_attached = false;
            self.owner = None;
        }
    }

    /// Elect an owner, preferring stability over churn.
    ///
    /// A still-registered owner keeps the seat. Otherwise, when the fragment
    /// names target panes, the first registered instance whose definition set
    /// contains the first target wins, list-mode instances checked before
    /// legacy single-ID ones. Failing that, the first registered instance.
    pub fn elect(&mut self, targets: &[PaneId]) {
        if let Some(owner) = self.owner
            && self.records.iter().any(|r| r.id == owner)
        {
            return;
        }
        self.owner = None;

        if let Some(&target) = targets.first() {
            let list_match = self
                .records
                .iter()
                .find(|r| matches!(r.tag, ContentTag::List(_)) && r.tag.owns(target));
            let legacy_match = self
                .records
                .iter()
                .find(|r| matches!(r.tag, ContentTag::Legacy(_)) && r.tag.owns(target));
            self.owner = list_match.or(legacy_match).map(|r| r.id);
        }

        if self.owner.is_none() {
            self.owner = self.records.first().map(|r| r.id);
        }
        if let Some(owner) = self.owner {
            debug!(%owner, "gate elected owner");
        }
    }

    pub fn owner(&self) -> Option<InstanceId> {
        self.owner
    }

    pub fn is_owner(&self, id: InstanceId) -> bool {
        self.owner == Some(id)
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Whether the single shared fragment listener is armed.
    pub fn listener_attached(&self) -> bool {
        self.listener_attached
    }

    /// Arm the shared fragment listener. Returns true only the first time, so
    /// the host attaches exactly one listener.
    pub fn arm_listener(&mut self) -> bool {
        if self.listener_attached {
            false
        } else {
            self.listener_attached = true;
            true
        }
    }

    /// Mount the shared layer roots on first use.
    pub(crate) fn ensure_layers(&mut self, fx: &mut Vec<Effect>) {
        self.layers.ensure(fx);
    }

    pub(crate) fn layers_mut(&mut self) -> &mut LayerSet {
        &mut self.layers
    }

    /// Shared layers exist (for host introspection and tests).
    pub fn layers_mounted(&self) -> bool {
        self.layers.is_mounted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PaneId {
        PaneId::parse(s).unwrap()
    }

    #[test]
    fn first_registered_becomes_owner() {
        let mut gate = Gate::new();
        let a = gate.register(None, ContentTag::Legacy(id("001")), &[]);
        let b = gate.register(None, ContentTag::Legacy(id("002")), &[]);
        assert_eq!(gate.owner(), Some(a));
        assert!(gate.is_owner(a));
        assert!(!gate.is_owner(b));
        assert_eq!(gate.ref_count(), 2);
    }

    #[test]
    fn register_is_idempotent_for_live_instances() {
        let mut gate = Gate::new();
        let a = gate.register(None, ContentTag::MenuOnly, &[]);
        let same = gate.register(Some(a), ContentTag::MenuOnly, &[]);
        assert_eq!(a, same);
        assert_eq!(gate.ref_count(), 1);
    }

    #[test]
    fn owner_is_stable_across_elections() {
        let mut gate = Gate::new();
        let a = gate.register(None, ContentTag::Legacy(id("001")), &[]);
        let _b = gate.register(None, ContentTag::List(vec![id("002")]), &[]);
        // A fragment targeting 002 does not unseat a live owner.
        gate.elect(&[id("002")]);
        assert_eq!(gate.owner(), Some(a));
    }

    #[test]
    fn election_prefers_list_instances_for_the_target() {
        let mut gate = Gate::new();
        let mut fx = Vec::new();
        let owner = gate.register(None, ContentTag::MenuOnly, &[]);
        let legacy = gate.register(None, ContentTag::Legacy(id("002")), &[]);
        let list = gate.register(None, ContentTag::List(vec![id("002"), id("003")]), &[]);
        assert_eq!(gate.owner(), Some(owner));

        // The owner leaves while the fragment targets 002: the list-mode
        // instance wins even though the legacy one registered earlier.
        gate.unregister(owner, &[id("002")], &mut fx);
        assert_eq!(gate.owner(), Some(list));
        assert_ne!(gate.owner(), Some(legacy));
    }

    #[test]
    fn election_falls_back_to_legacy_match() {
        let mut gate = Gate::new();
        let mut fx = Vec::new();
        let owner = gate.register(None, ContentTag::MenuOnly, &[]);
        let other = gate.register(None, ContentTag::List(vec![id("009")]), &[]);
        let legacy = gate.register(None, ContentTag::Legacy(id("002")), &[]);
        let _ = other;

        gate.unregister(owner, &[id("002")], &mut fx);
        assert_eq!(gate.owner(), Some(legacy));
    }

    #[test]
    fn unregistering_owner_reelects() {
        let mut gate = Gate::new();
        let mut fx = Vec::new();
        let a = gate.register(None, ContentTag::MenuOnly, &[]);
        let b = gate.register(None, ContentTag::MenuOnly, &[]);
        gate.unregister(a, &[], &mut fx);
        assert_eq!(gate.owner(), Some(b));
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut gate = Gate::new();
        let mut fx = Vec::new();
        let a = gate.register(None, ContentTag::MenuOnly, &[]);
        gate.unregister(a, &[], &mut fx);
        gate.unregister(a, &[], &mut fx);
        assert_eq!(gate.ref_count(), 0);
        assert_eq!(gate.owner(), None);
    }

    #[test]
    fn last_unregister_tears_down_layers_and_listener() {
        let mut gate = Gate::new();
        let mut fx = Vec::new();
        let a = gate.register(None, ContentTag::MenuOnly, &[]);
        gate.ensure_layers(&mut fx);
        assert!(gate.arm_listener());
        assert!(!gate.arm_listener(), "listener arms once");
        fx.clear();

        gate.unregister(a, &[], &mut fx);
        assert!(!gate.layers_mounted());
        assert!(!gate.listener_attached());
        assert_eq!(
            fx.iter()
                .filter(|e| matches!(e, Effect::RemoveLayer(_)))
                .count(),
            3
        );
    }

    #[test]
    fn no_instances_means_no_owner() {
        let mut gate = Gate::new();
        gate.elect(&[id("001")]);
        assert_eq!(gate.owner(), None);
    }
}
