#![forbid(unsafe_code)]

//! Fragment-driven reconciliation.
//!
//! The location fragment is the single source of truth for which panes are
//! open. [`Reconciler::check`] diffs the decoded fragment against the set of
//! currently open panes and emits exactly the effects that close the gap:
//! panes named by the fragment but not open are opened (and their content
//! loaded once), open panes no longer named are hidden. Running the same
//! check twice against the same fragment emits nothing the second time.
//!
//! Three guards keep the loop convergent:
//!
//! * **Single-capacity rewrite.** When capacity is one and the fragment names
//!   several panes, only the last survives; the fragment is rewritten to the
//!   canonical single form once, latched so the echo of that rewrite does not
//!   trigger another.
//! * **Single-flight loads.** At most one content load per pane is in flight,
//!   keyed by [`LoadToken`]; a resolution carrying a token the reconciler no
//!   longer expects is dropped.
//! * **Open before load.** A pane joins the open set before its content
//!   resolves, so closing it mid-load just hides the root; the late result
//!   still mounts into the hidden root for reuse.
//!
//! Pane roots are hidden on close, never removed, so a reopen is a pure
//! show with no remount and no reload.

use std::collections::{BTreeMap, HashMap, HashSet};

use hashpane_core::{Capacity, ContentModel, PaneDef, PaneId, WidgetConfig, fragment};
use tracing::{debug, trace};

use crate::effect::{ContentDescriptor, Effect, LoadError, LoadToken};
use crate::layer::{LayerId, LayerKind, LayerSet, LayerSlot};

/// Open-set bookkeeping for one widget (or for the shared layers it owns).
#[derive(Debug, Default)]
pub(crate) struct Reconciler {
    /// Open panes in the order they were requested.
    open: Vec<PaneId>,
    /// Per-pane content roots, retained across close/open cycles.
    roots: BTreeMap<PaneId, LayerSlot>,
    /// Panes whose content has been mounted; never loaded twice.
    loaded: HashSet<PaneId>,
    /// One load per pane at a time.
    inflight: HashMap<PaneId, LoadToken>,
    next_token: u64,
    /// The canonical fragment a single-capacity rewrite expects to observe
    /// next; distinguishes the self-caused echo from external events.
    pending_rewrite: Option<String>,
    /// Layers hidden by a visibility override, to re-show on restore.
    suppressed: Vec<PaneId>,
    suppressed_single: bool,
}

impl Reconciler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open_panes(&self) -> &[PaneId] {
        &self.open
    }

    pub(crate) fn is_open(&self, id: PaneId) -> bool {
        self.open.contains(&id)
    }

    /// Reconcile the open set against `fragment`.
    pub(crate) fn check(
        &mut self,
        config: &WidgetConfig,
        layers: &mut LayerSet,
        fragment_text: &str,
        fx: &mut Vec<Effect>,
    ) {
        // Menu-only widgets have no content to reconcile.
        if matches!(config.content, ContentModel::MenuOnly) {
            return;
        }

        let requested = fragment::decode(fragment_text);

        if config.capacity == Capacity::Single && requested.len() > 1 {
            // Keep the most recent request and rewrite the fragment to the
            // canonical single form, with no visual change yet: the echoed
            // event re-enters with one ID. The latch holds the expected
            // echo so a duplicate delivery does not rewrite again.
            let last = requested[requested.len() - 1];
            let target = fragment::single(last);
            if self.pending_rewrite.as_deref() != Some(target.as_str()) {
                debug!(%last, "collapsing multi-pane fragment at capacity one");
                self.pending_rewrite = Some(target.clone());
                fx.push(Effect::WriteFragment(target));
            }
            return;
        }
        self.pending_rewrite = None;

        trace!(?requested, open = ?self.open, "reconciling");
        match &config.content {
            ContentModel::MenuOnly => {}
            ContentModel::LegacySingle(def) => self.check_legacy(def, layers, &requested, fx),
            ContentModel::Definitions(defs) => {
                self.check_list(defs, config.capacity, &requested, fx)
            }
        }
    }

    fn check_legacy(
        &mut self,
        def: &PaneDef,
        layers: &mut LayerSet,
        requested: &[PaneId],
        fx: &mut Vec<Effect>,
    ) {
        let want = requested.contains(&def.id);
        let have = self.open.contains(&def.id);
        if want && !have {
            self.open.push(def.id);
            if let Some(slot) = layers.single_mut() {
                slot.show(fx);
            }
            self.load(def, fx);
            fx.push(Effect::HideSiblings);
        } else if !want && have {
            self.open.retain(|id| *id != def.id);
            if let Some(slot) = layers.single_mut() {
                slot.hide(fx);
            }
        }
    }

    fn check_list(
        &mut self,
        defs: &[PaneDef],
        capacity: Capacity,
        requested: &[PaneId],
        fx: &mut Vec<Effect>,
    ) {
        let to_close: Vec<PaneId> = self
            .open
            .iter()
            .copied()
            .filter(|id| !requested.contains(id))
            .collect();
        for id in to_close {
            self.open.retain(|o| *o != id);
            if let Some(slot) = self.roots.get_mut(&id) {
                slot.hide(fx);
            }
        }

        let mut opened = false;
        for &id in requested {
            if self.open.contains(&id) {
                continue;
            }
            // Membership precedes the (possibly slow) content load so a
            // close arriving mid-load wins.
            self.open.push(id);
            opened = true;

            let layer = self.ensure_root(id, fx);
            match defs.iter().find(|d| d.id == id) {
                Some(def) => self.load(def, fx),
                None => {
                    // The fragment names a pane this widget does not define.
                    // The root stays open with an inline error and closes
                    // like any other pane.
                    debug!(%id, "fragment requests an undefined pane");
                    self.loaded.insert(id);
                    fx.push(Effect::RenderError {
                        layer,
                        id,
                        message: format!("no pane defined for #{id}"),
                    });
                }
            }
        }
        // Outside multi capacity, one pane on screen means siblings hide.
        if opened && capacity == Capacity::Single {
            fx.push(Effect::HideSiblings);
        }
    }

    /// Mount (or reuse) the pane's root and show it.
    fn ensure_root(&mut self, id: PaneId, fx: &mut Vec<Effect>) -> LayerId {
        let slot = match self.roots.entry(id) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(v) => {
                v.insert(LayerSlot::mount(LayerKind::PaneRoot(id), fx))
            }
        };
        slot.show(fx);
        slot.id()
    }

    /// Start a content load unless one already ran or is running.
    fn load(&mut self, def: &PaneDef, fx: &mut Vec<Effect>) {
        if self.loaded.contains(&def.id) || self.inflight.contains_key(&def.id) {
            return;
        }
        self.next_token += 1;
        let token = LoadToken(self.next_token);
        self.inflight.insert(def.id, token);
        fx.push(Effect::LoadContent {
            token,
            source: def.source.clone(),
            id: def.id,
            show_title: def.show_title(),
        });
    }

    /// Settle a content load. Stale tokens are dropped; a result for a pane
    /// closed mid-load still mounts into its (hidden) root.
    pub(crate) fn resolve(
        &mut self,
        config: &WidgetConfig,
        layers: &LayerSet,
        token: LoadToken,
        result: Result<ContentDescriptor, LoadError>,
        fx: &mut Vec<Effect>,
    ) {
        let id = self
            .inflight
            .iter()
            .find_map(|(id, t)| (*t == token).then_some(*id));
        let Some(id) = id else {
            trace!(?token, "dropping stale content resolution");
            return;
        };
        self.inflight.remove(&id);

        let Some(layer) = self.layer_of(config, layers, id) else {
            return;
        };
        match result {
            Ok(content) => {
                self.loaded.insert(id);
                fx.push(Effect::MountContent { layer, content });
            }
            Err(err) => {
                // Not marked loaded: a later reopen retries the load.
                debug!(%id, error = %err, "content load failed");
                fx.push(Effect::RenderError {
                    layer,
                    id,
                    message: err.to_string(),
                });
            }
        }
    }

    fn layer_of(&self, config: &WidgetConfig, layers: &LayerSet, id: PaneId) -> Option<LayerId> {
        match &config.content {
            ContentModel::LegacySingle(def) if def.id == id => layers.single_id(),
            _ => self.roots.get(&id).map(LayerSlot::id),
        }
    }

    /// Open the pane flagged `default_visible` at mount: layer shown and
    /// content loaded, but no open-set membership and no fragment write, so
    /// an empty fragment does not close it.
    pub(crate) fn open_default_visible(
        &mut self,
        config: &WidgetConfig,
        layers: &mut LayerSet,
        fx: &mut Vec<Effect>,
    ) {
        let Some(id) = config.default_visible_pane() else {
            return;
        };
        let Some(def) = config.content.definition(id) else {
            return;
        };
        let def = def.clone();
        debug!(%id, "opening default-visible pane");
        match &config.content {
            ContentModel::LegacySingle(_) => {
                if let Some(slot) = layers.single_mut() {
                    slot.show(fx);
                }
                self.load(&def, fx);
            }
            _ => {
                self.ensure_root(id, fx);
                self.load(&def, fx);
            }
        }
    }

    /// Hide every visible content layer, remembering which were visible so
    /// [`Reconciler::restore`] can bring exactly those back. The open set is
    /// untouched.
    pub(crate) fn force_hide_all(&mut self, layers: &mut LayerSet, fx: &mut Vec<Effect>) {
        if let Some(slot) = layers.single_mut() {
            self.suppressed_single = slot.is_visible();
            slot.hide(fx);
        }
        self.suppressed.clear();
        for (id, slot) in self.roots.iter_mut() {
            if slot.is_visible() {
                self.suppressed.push(*id);
            }
            slot.hide(fx);
        }
    }

    /// Undo [`Reconciler::force_hide_all`].
    pub(crate) fn restore(&mut self, layers: &mut LayerSet, fx: &mut Vec<Effect>) {
        if std::mem::take(&mut self.suppressed_single)
            && let Some(slot) = layers.single_mut()
        {
            slot.show(fx);
        }
        for id in std::mem::take(&mut self.suppressed) {
            if let Some(slot) = self.roots.get_mut(&id) {
                slot.show(fx);
            }
        }
    }

    /// Drop every pane root and all transient state. Teardown only.
    pub(crate) fn evict_all(&mut self, fx: &mut Vec<Effect>) {
        for (_, slot) in std::mem::take(&mut self.roots) {
            slot.remove(fx);
        }
        self.open.clear();
        self.loaded.clear();
        self.inflight.clear();
        self.pending_rewrite = None;
        self.suppressed.clear();
        self.suppressed_single = false;
    }
}
