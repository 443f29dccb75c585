#![forbid(unsafe_code)]

//! Logical layer bookkeeping.
//!
//! The engine never touches a real presentation tree. It hands the host
//! opaque [`LayerId`] handles through [`Effect::MountLayer`] and afterwards
//! addresses layers only by handle. Each [`LayerSlot`] tracks the logical
//! visibility of one layer so redundant show/hide requests collapse into
//! nothing (the idempotency that prevents flicker and duplicate mutations).
//!
//! Hiding a layer suppresses display and pointer interaction but keeps the
//! node; removal happens only at teardown. Pane roots are retained across
//! close/open cycles for reuse.
//!
//! [`Effect::MountLayer`]: crate::effect::Effect::MountLayer

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hashpane_core::PaneId;

use crate::effect::Effect;

/// Opaque handle to a host-side layer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

static NEXT_LAYER: AtomicU64 = AtomicU64::new(1);

impl LayerId {
    fn fresh() -> Self {
        Self(NEXT_LAYER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// What a layer is for; the host uses this to decide where to mount it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// The fixed menu strip.
    Menu,
    /// The legacy single-pane content root.
    SingleContent,
    /// Click-through container holding per-pane roots.
    MultiContainer,
    /// One pane's content root, mounted inside the container.
    PaneRoot(PaneId),
}

/// One mounted layer plus its logical visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSlot {
    id: LayerId,
    visible: bool,
}

impl LayerSlot {
    /// Mount a fresh layer, hidden, emitting the mount effect.
    pub(crate) fn mount(kind: LayerKind, fx: &mut Vec<Effect>) -> Self {
        let id = LayerId::fresh();
        fx.push(Effect::MountLayer { layer: id, kind });
        Self { id, visible: false }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show if hidden; a visible layer is left alone.
    pub(crate) fn show(&mut self, fx: &mut Vec<Effect>) {
        if !self.visible {
            self.visible = true;
            fx.push(Effect::ShowLayer(self.id));
        }
    }

    /// Hide if visible; a hidden layer is left alone.
    pub(crate) fn hide(&mut self, fx: &mut Vec<Effect>) {
        if self.visible {
            self.visible = false;
            fx.push(Effect::HideLayer(self.id));
        }
    }

    /// Remove the layer outright. Only valid at teardown.
    pub(crate) fn remove(self, fx: &mut Vec<Effect>) {
        fx.push(Effect::RemoveLayer(self.id));
    }
}

/// The three long-lived layers a widget (or the gate, in global mode) owns:
/// menu strip, legacy single content root, and the multi-pane container.
///
/// Created lazily on first use, removed together at teardown.
#[derive(Debug, Default)]
pub struct LayerSet {
    menu: Option<LayerSlot>,
    single: Option<LayerSlot>,
    container: Option<LayerSlot>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self) -> bool {
        self.menu.is_some()
    }

    /// Mount the shared roots once.
    pub(crate) fn ensure(&mut self, fx: &mut Vec<Effect>) {
        if self.menu.is_none() {
            self.menu = Some(LayerSlot::mount(LayerKind::Menu, fx));
            self.single = Some(LayerSlot::mount(LayerKind::SingleContent, fx));
            self.container = Some(LayerSlot::mount(LayerKind::MultiContainer, fx));
        }
    }

    pub(crate) fn menu_mut(&mut self) -> Option<&mut LayerSlot> {
        self.menu.as_mut()
    }

    pub(crate) fn single_mut(&mut self) -> Option<&mut LayerSlot> {
        self.single.as_mut()
    }

    pub(crate) fn single_id(&self) -> Option<LayerId> {
        self.single.as_ref().map(LayerSlot::id)
    }

    /// Remove every mounted root. The set can be re-ensured afterwards.
    pub(crate) fn teardown(&mut self, fx: &mut Vec<Effect>) {
        for slot in [self.menu.take(), self.single.take(), self.container.take()]
            .into_iter()
            .flatten()
        {
            slot.remove(fx);
        }
    }
}
