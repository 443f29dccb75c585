#![forbid(unsafe_code)]

//! The engine's input and effect vocabulary.
//!
//! Every widget entry point consumes an [`Input`] and returns a list of
//! [`Effect`]s for the host to apply, in order, to its real presentation
//! layer. Content resolution is the one asynchronous collaboration: the
//! engine emits [`Effect::LoadContent`] carrying a [`LoadToken`] and the host
//! answers later with [`Input::ContentResolved`] echoing that token. A token
//! the engine no longer expects is ignored (the load was superseded).

use std::fmt;

use hashpane_core::{MenuConfig, PaneId, SourceRef};

use crate::layer::{LayerId, LayerKind};

/// Correlation token for one in-flight content load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken(pub(crate) u64);

/// What the content loader resolved for a pane; opaque to the engine and
/// handed back to the host through [`Effect::MountContent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub source: SourceRef,
    pub id: PaneId,
    /// Source title, if the pane wants it shown.
    pub title: Option<String>,
}

/// Content resolution failures. Recovered locally: the engine renders them
/// as an inline error panel in the pane's own root and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No source tagged with the pane's discovery key in the dashboard.
    SourceNotFound { id: PaneId, dashboard: String },
    /// The dashboard itself could not be fetched.
    DashboardUnavailable { dashboard: String },
    /// Several sources carry the same discovery key; the loader used the
    /// first occurrence and reports the rest.
    Ambiguous { id: PaneId, dashboard: String },
    /// Anything else the loader wants surfaced.
    Other(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceNotFound { id, dashboard } => {
                write!(f, "source #{id} not found in dashboard {dashboard:?}")
            }
            Self::DashboardUnavailable { dashboard } => {
                write!(f, "dashboard {dashboard:?} not found or inaccessible")
            }
            Self::Ambiguous { id, dashboard } => {
                write!(f, "several sources tagged #{id} in dashboard {dashboard:?}")
            }
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Everything the host can feed into a widget.
#[derive(Debug, Clone)]
pub enum Input {
    /// The location fragment changed (or was read at startup). Carries the
    /// full fragment, leading `#` included; empty string means cleared.
    FragmentChanged(String),
    /// A previously requested content load settled.
    ContentResolved {
        token: LoadToken,
        result: Result<ContentDescriptor, LoadError>,
    },
    /// The widget's host container became visible or invisible.
    ViewVisibility(bool),
    /// The host navigated to another view. Layers are force-hidden; the host
    /// should re-probe and send [`Input::ViewVisibility`] once settled.
    Navigated,
    /// Another widget in the same visual scope opened a pane
    /// (see [`Effect::HideSiblings`]).
    SiblingOpened,
    /// Public control surface: open a pane (or the legacy single layer).
    Show(Option<PaneId>),
    /// Public control surface: close a pane (or the legacy single layer).
    Hide(Option<PaneId>),
    /// Public control surface: toggle a pane (or the legacy single layer).
    Toggle(Option<PaneId>),
}

/// Everything a widget can ask the host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Create a presentation node for `layer`, initially hidden.
    /// `PaneRoot` layers belong inside the `MultiContainer` layer.
    MountLayer { layer: LayerId, kind: LayerKind },
    /// Display the layer and enable pointer interaction.
    ShowLayer(LayerId),
    /// Suppress display and pointer interaction; keep the node for reuse.
    HideLayer(LayerId),
    /// Remove the node outright (teardown only).
    RemoveLayer(LayerId),
    /// Replace the location fragment. Empty string means clear it.
    WriteFragment(String),
    /// Start resolving content for a pane; answer with
    /// [`Input::ContentResolved`] carrying the same token.
    LoadContent {
        token: LoadToken,
        source: SourceRef,
        id: PaneId,
        show_title: bool,
    },
    /// Mount resolved content into a pane's root (which may be hidden).
    MountContent {
        layer: LayerId,
        content: ContentDescriptor,
    },
    /// Render the menu strip into its layer.
    RenderMenu { layer: LayerId, menu: MenuConfig },
    /// Render an inline error panel into a pane's root.
    RenderError {
        layer: LayerId,
        id: PaneId,
        message: String,
    },
    /// Ask sibling widgets in the same visual scope to hide their content
    /// (deliver [`Input::SiblingOpened`] to each).
    HideSiblings,
    /// After the host settles (one tick), re-read the fragment and send
    /// [`Input::FragmentChanged`]; after navigation, also re-probe
    /// visibility.
    ScheduleCheck,
}
