#![forbid(unsafe_code)]

//! Host-visibility tracking.
//!
//! A widget embedded in a view that is swiped away or covered must not keep
//! its overlays on screen, and must not run reconciliation it would only have
//! to redo. [`VisibilityGate`] debounces the host's visibility probes into
//! edge transitions; the widget reacts to [`Transition::Hidden`] and
//! [`Transition::Restored`] and ignores [`Transition::Unchanged`] repeats.

/// Edge detected by [`VisibilityGate::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Same state as before; nothing to do.
    Unchanged,
    /// Went visible to hidden: force-hide layers, defer reconciliation.
    Hidden,
    /// Came back: re-show suppressed layers and re-run the deferred check.
    Restored,
}

/// Latched visibility state. Widgets start active: a host that never probes
/// behaves as always-visible.
#[derive(Debug)]
pub(crate) struct VisibilityGate {
    active: bool,
}

impl VisibilityGate {
    pub(crate) fn new() -> Self {
        Self { active: true }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn transition(&mut self, visible: bool) -> Transition {
        match (self.active, visible) {
            (true, false) => {
                self.active = false;
                Transition::Hidden
            }
            (false, true) => {
                self.active = true;
                Transition::Restored
            }
            _ => Transition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_active_and_detects_edges() {
        let mut gate = VisibilityGate::new();
        assert!(gate.is_active());
        assert_eq!(gate.transition(true), Transition::Unchanged);
        assert_eq!(gate.transition(false), Transition::Hidden);
        assert_eq!(gate.transition(false), Transition::Unchanged);
        assert_eq!(gate.transition(true), Transition::Restored);
        assert!(gate.is_active());
    }
}
