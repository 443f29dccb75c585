#![forbid(unsafe_code)]

//! The overlay widget: one mounted instance of the card.
//!
//! An [`OverlayWidget`] owns its validated configuration, its reconciler and
//! its visibility gate. In global portal mode it registers with the shared
//! [`Gate`] and defers every shared-layer mutation to whichever instance is
//! the elected owner; non-owners answer every input with no effects. In
//! local portal mode the widget owns private layers and skips the gate
//! entirely.
//!
//! Entry points are infallible after construction: coordination problems
//! (no electable owner, layers not mounted yet) degrade to no-op effect
//! lists, never to panics or errors.

use hashpane_core::{
    Capacity, ConfigError, PaneId, PortalMode, RawConfig, WidgetConfig, fragment,
};
use tracing::debug;

use crate::effect::{Effect, Input};
use crate::gate::{ContentTag, Gate, InstanceId};
use crate::layer::LayerSet;
use crate::reconcile::Reconciler;
use crate::visibility::{Transition, VisibilityGate};

/// One card instance, driven by host inputs.
#[derive(Debug)]
pub struct OverlayWidget {
    config: WidgetConfig,
    /// Gate identity, kept across unmount so a remount is recognized.
    instance: Option<InstanceId>,
    mounted: bool,
    /// Private layers for [`PortalMode::Local`]; unused in global mode.
    local_layers: LayerSet,
    recon: Reconciler,
    visibility: VisibilityGate,
    last_fragment: String,
    /// Menu render-key of the last [`Effect::RenderMenu`], for dedup.
    menu_key: Option<String>,
    /// A fragment arrived while hidden; re-check on restore.
    check_deferred: bool,
}

impl OverlayWidget {
    /// Validate a raw configuration and build a widget from it.
    pub fn new(raw: RawConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_config(WidgetConfig::from_raw(raw)?))
    }

    /// Build a widget from an already-validated configuration.
    pub fn from_config(config: WidgetConfig) -> Self {
        Self {
            config,
            instance: None,
            mounted: false,
            local_layers: LayerSet::new(),
            recon: Reconciler::new(),
            visibility: VisibilityGate::new(),
            last_fragment: String::new(),
            menu_key: None,
            check_deferred: false,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether this instance is allowed to mutate layers: always in local
    /// mode, only as the elected owner in global mode.
    pub fn is_owner(&self, gate: &Gate) -> bool {
        match self.config.portal {
            PortalMode::Local => true,
            PortalMode::Global => self.instance.is_some_and(|i| gate.is_owner(i)),
        }
    }

    /// Panes currently open through this widget's reconciler.
    pub fn open_panes(&self) -> &[PaneId] {
        self.recon.open_panes()
    }

    /// Mount: register with the gate (global mode), ensure layers, apply
    /// default visibility, and ask the host for the deferred initial check.
    /// Idempotent while mounted.
    pub fn mount(&mut self, gate: &mut Gate) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.mounted {
            return fx;
        }
        self.mounted = true;

        match self.config.portal {
            PortalMode::Global => {
                let targets = fragment::decode(&self.last_fragment);
                let id = gate.register(
                    self.instance,
                    ContentTag::from_model(&self.config.content),
                    &targets,
                );
                self.instance = Some(id);
                gate.ensure_layers(&mut fx);
                gate.arm_listener();
            }
            PortalMode::Local => self.local_layers.ensure(&mut fx),
        }

        if self.is_owner(gate) {
            let layers = shared_or_local(self.config.portal, &mut self.local_layers, gate);
            sync_menu(&mut self.menu_key, &self.config, layers, &mut fx);
            self.recon.open_default_visible(&self.config, layers, &mut fx);
        }

        // The host re-reads the fragment once things settle and answers
        // with `Input::FragmentChanged`.
        fx.push(Effect::ScheduleCheck);
        fx
    }

    /// Unmount: drop this widget's pane roots and leave the gate. The last
    /// instance out triggers shared-layer teardown.
    pub fn unmount(&mut self, gate: &mut Gate) -> Vec<Effect> {
        let mut fx = Vec::new();
        if !self.mounted {
            return fx;
        }
        self.mounted = false;

        self.recon.evict_all(&mut fx);
        match self.config.portal {
            PortalMode::Local => self.local_layers.teardown(&mut fx),
            PortalMode::Global => {
                if let Some(id) = self.instance {
                    let targets = fragment::decode(&self.last_fragment);
                    gate.unregister(id, &targets, &mut fx);
                }
            }
        }
        fx
    }

    /// The event pump.
    pub fn handle(&mut self, gate: &mut Gate, input: Input) -> Vec<Effect> {
        let mut fx = Vec::new();
        if !self.mounted {
            return fx;
        }

        match input {
            Input::FragmentChanged(frag) => {
                self.last_fragment = frag;
                if !self.visibility.is_active() {
                    self.check_deferred = true;
                    return fx;
                }
                if self.is_owner(gate) {
                    let layers =
                        shared_or_local(self.config.portal, &mut self.local_layers, gate);
                    sync_menu(&mut self.menu_key, &self.config, layers, &mut fx);
                    self.recon
                        .check(&self.config, layers, &self.last_fragment, &mut fx);
                }
            }
            Input::ContentResolved { token, result } => {
                if self.is_owner(gate) {
                    let layers =
                        shared_or_local(self.config.portal, &mut self.local_layers, gate);
                    self.recon
                        .resolve(&self.config, layers, token, result, &mut fx);
                }
            }
            Input::ViewVisibility(visible) => self.apply_visibility(gate, visible, &mut fx),
            Input::Navigated => {
                // Force-hide now; the host re-probes visibility and re-reads
                // the fragment after the navigation settles.
                self.apply_visibility(gate, false, &mut fx);
                fx.push(Effect::ScheduleCheck);
            }
            Input::SiblingOpened => {
                if self.is_owner(gate) {
                    debug!("sibling opened; closing own panes");
                    let layers =
                        shared_or_local(self.config.portal, &mut self.local_layers, gate);
                    self.recon.check(&self.config, layers, "", &mut fx);
                }
            }
            Input::Show(id) => return self.show(gate, id),
            Input::Hide(id) => return self.hide(gate, id),
            Input::Toggle(id) => return self.toggle(gate, id),
        }
        fx
    }

    /// Open a pane (the widget's own pane when `id` is `None`) by rewriting
    /// the fragment: single capacity sets the single form, multi capacity
    /// appends to the decoded list.
    pub fn show(&mut self, gate: &mut Gate, id: Option<PaneId>) -> Vec<Effect> {
        let mut fx = Vec::new();
        let Some(target) = self.target(id) else {
            return fx;
        };
        let next = match self.config.capacity {
            Capacity::Single => fragment::single(target),
            Capacity::Multi => {
                let mut ids = fragment::decode(&self.last_fragment);
                if !ids.contains(&target) {
                    ids.push(target);
                }
                fragment::encode(&ids)
            }
        };
        self.rewrite(gate, next, &mut fx);
        fx
    }

    /// Close a pane by removing its ID from the fragment; an empty result
    /// clears the fragment.
    pub fn hide(&mut self, gate: &mut Gate, id: Option<PaneId>) -> Vec<Effect> {
        let mut fx = Vec::new();
        let Some(target) = self.target(id) else {
            return fx;
        };
        let ids: Vec<PaneId> = fragment::decode(&self.last_fragment)
            .into_iter()
            .filter(|i| *i != target)
            .collect();
        self.rewrite(gate, fragment::encode(&ids), &mut fx);
        fx
    }

    /// Show or hide depending on the fragment's current claim.
    pub fn toggle(&mut self, gate: &mut Gate, id: Option<PaneId>) -> Vec<Effect> {
        let Some(target) = self.target(id) else {
            return Vec::new();
        };
        if fragment::decode(&self.last_fragment).contains(&target) {
            self.hide(gate, Some(target))
        } else {
            self.show(gate, Some(target))
        }
    }

    /// Default control target: the widget's first (or only) own pane.
    fn target(&self, id: Option<PaneId>) -> Option<PaneId> {
        id.or_else(|| self.config.content.ids().first().copied())
    }

    /// Write the fragment and reconcile against it immediately. The host's
    /// echoed `FragmentChanged` re-enters as a no-op.
    fn rewrite(&mut self, gate: &mut Gate, next: String, fx: &mut Vec<Effect>) {
        if next == self.last_fragment {
            return;
        }
        fx.push(Effect::WriteFragment(next.clone()));
        self.last_fragment = next;
        if !self.visibility.is_active() {
            self.check_deferred = true;
            return;
        }
        if self.is_owner(gate) {
            let layers = shared_or_local(self.config.portal, &mut self.local_layers, gate);
            self.recon
                .check(&self.config, layers, &self.last_fragment, fx);
        }
    }

    fn apply_visibility(&mut self, gate: &mut Gate, visible: bool, fx: &mut Vec<Effect>) {
        match self.visibility.transition(visible) {
            Transition::Unchanged => {}
            Transition::Hidden => {
                if self.is_owner(gate) {
                    let layers =
                        shared_or_local(self.config.portal, &mut self.local_layers, gate);
                    self.recon.force_hide_all(layers, fx);
                    if let Some(menu) = layers.menu_mut() {
                        menu.hide(fx);
                    }
                }
            }
            Transition::Restored => {
                if self.is_owner(gate) {
                    let layers =
                        shared_or_local(self.config.portal, &mut self.local_layers, gate);
                    self.recon.restore(layers, fx);
                    sync_menu(&mut self.menu_key, &self.config, layers, fx);
                    // Catch up with whatever the fragment did while hidden.
                    self.check_deferred = false;
                    self.recon
                        .check(&self.config, layers, &self.last_fragment, fx);
                }
            }
        }
    }
}

/// Pick the layer set the widget operates on.
fn shared_or_local<'a>(
    portal: PortalMode,
    local: &'a mut LayerSet,
    gate: &'a mut Gate,
) -> &'a mut LayerSet {
    match portal {
        PortalMode::Local => local,
        PortalMode::Global => gate.layers_mut(),
    }
}

/// Show the menu layer and re-render the strip when its model changed.
fn sync_menu(
    menu_key: &mut Option<String>,
    config: &WidgetConfig,
    layers: &mut LayerSet,
    fx: &mut Vec<Effect>,
) {
    if !config.menu.enabled {
        return;
    }
    let Some(slot) = layers.menu_mut() else {
        return;
    };
    slot.show(fx);
    let layer = slot.id();

    let key = config.menu.render_key();
    if menu_key.as_deref() != Some(key.as_str()) {
        *menu_key = Some(key);
        fx.push(Effect::RenderMenu {
            layer,
            menu: config.menu.clone(),
        });
    }
}
