#![forbid(unsafe_code)]

//! Widget configuration: raw user-supplied shape and the normalized model.
//!
//! Configuration arrives as loosely-typed data (YAML/JSON from the host
//! dashboard), deserialized into [`RawConfig`] with permissive defaults, then
//! normalized and validated into [`WidgetConfig`]. Validation failures are
//! fatal at setup time: a widget with a broken configuration never mounts.
//!
//! What an instance is capable of ("does it carry a definition list?") is
//! not probed at runtime; it is the [`ContentModel`] tag, fixed at
//! configuration time.

use std::fmt;

use bitflags::bitflags;
use serde::Deserialize;

use crate::id::{IdError, PaneId};

// ─────────────────────────────────────────────────────────────────────────────
// Raw (wire) configuration
// ─────────────────────────────────────────────────────────────────────────────

/// A pane ID as users write it: a bare number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Numeric form (`embed_id: 1`).
    Num(u64),
    /// String form (`embed_id: "001"`).
    Text(String),
}

impl RawId {
    fn as_string(&self) -> String {
        match self {
            Self::Num(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// A CSS-ish length: a bare number (pixels) or a passthrough string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Extent {
    /// Pixels (`width: 520`).
    Px(f64),
    /// Raw unit string handed to the host unchanged (`top: "15%"`).
    Raw(String),
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// User-supplied configuration, deserialized with permissive defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub dashboard: Option<String>,
    pub embed_id: Option<RawId>,
    pub menu_only: bool,
    pub multi_mode: bool,
    /// Legacy alias for `multi_mode`.
    pub multi: bool,
    pub portal_mode: Option<String>,
    pub overlay_log: bool,
    pub show_close: bool,
    pub show_title: Option<bool>,
    pub default_visible: bool,
    pub enable_scroll: Option<bool>,
    pub embedder_title: Option<String>,
    pub menu: Option<RawMenu>,
    pub content: Option<RawContent>,
    pub embedders: Vec<RawPane>,
}

/// One entry of the `embedders:` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPane {
    pub embed_id: Option<RawId>,
    pub dashboard: Option<String>,
    pub embedder_title: Option<String>,
    pub show_close: Option<bool>,
    pub show_title: Option<bool>,
    pub default_visible: Option<bool>,
    pub enable_scroll: Option<bool>,
    pub content: Option<RawContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawContent {
    pub position: Option<RawPosition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMenu {
    pub enabled: bool,
    pub position: Option<RawPosition>,
    pub buttons: Vec<RawButton>,
    pub button_style: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawButton {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub target: Option<RawId>,
    /// Legacy alias for `target`.
    pub embed_id: Option<RawId>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPosition {
    pub mode: Option<String>,
    pub top: Option<Extent>,
    pub left: Option<Extent>,
    pub right: Option<Extent>,
    pub bottom: Option<Extent>,
    pub width: Option<Extent>,
    pub height: Option<Extent>,
    pub z_index: Option<i32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalized model
// ─────────────────────────────────────────────────────────────────────────────

/// Where the widget mounts its layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortalMode {
    /// Shared layer roots, coordinated through the gate. Default.
    #[default]
    Global,
    /// Isolated: private roots and a private fragment listener, no election.
    /// For embedding inside shadow-isolated containers.
    Local,
}

/// How many panes may be open at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    /// At most one open pane; multi-ID fragments are rewritten. Default.
    #[default]
    Single,
    /// Unbounded concurrent panes with independent roots.
    Multi,
}

/// Positioning strategy for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionMode {
    #[default]
    Fixed,
    Absolute,
}

bitflags! {
    /// Per-pane display options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PaneFlags: u8 {
        /// Render a close button in the pane header.
        const SHOW_CLOSE = 1 << 0;
        /// Keep the source content's title visible.
        const SHOW_TITLE = 1 << 1;
        /// Open this pane at mount without a fragment write.
        const DEFAULT_VISIBLE = 1 << 2;
        /// Scroll overflowing content instead of clipping.
        const SCROLLABLE = 1 << 3;
    }
}

impl Default for PaneFlags {
    fn default() -> Self {
        Self::SHOW_TITLE | Self::SCROLLABLE
    }
}

/// Layout rectangle descriptor passed through to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSpec {
    pub mode: PositionMode,
    pub top: Option<Extent>,
    pub left: Option<Extent>,
    pub right: Option<Extent>,
    pub bottom: Option<Extent>,
    pub width: Option<Extent>,
    pub height: Option<Extent>,
    pub z_index: i32,
}

const CONTENT_Z_INDEX: i32 = 1000;
const MENU_Z_INDEX: i32 = 1100;
const CONTENT_WIDTH: f64 = 520.0;
const CONTENT_HEIGHT: f64 = 420.0;

impl PositionSpec {
    fn mode_from(raw: Option<&RawPosition>) -> PositionMode {
        match raw.and_then(|p| p.mode.as_deref()) {
            Some("absolute") => PositionMode::Absolute,
            _ => PositionMode::Fixed,
        }
    }

    /// Content defaults: z-index 1000, 520x420, offsets left to the host's
    /// fallback anchoring when unset.
    pub fn content_from(raw: Option<&RawPosition>) -> Self {
        Self {
            mode: Self::mode_from(raw),
            top: raw.and_then(|p| p.top.clone()),
            left: raw.and_then(|p| p.left.clone()),
            right: raw.and_then(|p| p.right.clone()),
            bottom: raw.and_then(|p| p.bottom.clone()),
            width: Some(
                raw.and_then(|p| p.width.clone())
                    .unwrap_or(Extent::Px(CONTENT_WIDTH)),
            ),
            height: Some(
                raw.and_then(|p| p.height.clone())
                    .unwrap_or(Extent::Px(CONTENT_HEIGHT)),
            ),
            z_index: raw.and_then(|p| p.z_index).unwrap_or(CONTENT_Z_INDEX),
        }
    }

    /// Menu defaults: z-index 1100, no intrinsic size.
    pub fn menu_from(raw: Option<&RawPosition>) -> Self {
        Self {
            mode: Self::mode_from(raw),
            top: raw.and_then(|p| p.top.clone()),
            left: raw.and_then(|p| p.left.clone()),
            right: raw.and_then(|p| p.right.clone()),
            bottom: raw.and_then(|p| p.bottom.clone()),
            width: None,
            height: None,
            z_index: raw.and_then(|p| p.z_index).unwrap_or(MENU_Z_INDEX),
        }
    }
}

/// Reference to where a pane's content is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Host dashboard name holding the tagged source.
    pub dashboard: String,
}

/// One pane definition, immutable after configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneDef {
    pub id: PaneId,
    pub source: SourceRef,
    pub title: String,
    pub flags: PaneFlags,
    pub position: PositionSpec,
}

impl PaneDef {
    pub fn show_title(&self) -> bool {
        self.flags.contains(PaneFlags::SHOW_TITLE)
    }

    pub fn default_visible(&self) -> bool {
        self.flags.contains(PaneFlags::DEFAULT_VISIBLE)
    }
}

/// What content this widget instance owns.
///
/// Replaces the original's runtime capability probing with a tag fixed at
/// configuration time.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentModel {
    /// Menu-only legacy mode: no content is ever opened.
    MenuOnly,
    /// Legacy single-pane mode: this instance owns exactly one ID.
    LegacySingle(PaneDef),
    /// Definition-list mode: one widget manages several panes.
    Definitions(Vec<PaneDef>),
}

impl ContentModel {
    /// The IDs this instance is allowed to act on.
    pub fn ids(&self) -> Vec<PaneId> {
        match self {
            Self::MenuOnly => Vec::new(),
            Self::LegacySingle(def) => vec![def.id],
            Self::Definitions(defs) => defs.iter().map(|d| d.id).collect(),
        }
    }

    /// Look up a pane definition by ID.
    pub fn definition(&self, id: PaneId) -> Option<&PaneDef> {
        match self {
            Self::MenuOnly => None,
            Self::LegacySingle(def) => (def.id == id).then_some(def),
            Self::Definitions(defs) => defs.iter().find(|d| d.id == id),
        }
    }
}

/// One menu button, toggling a target pane through the fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuButton {
    pub label: String,
    pub icon: Option<String>,
    pub target: PaneId,
    pub style: Option<String>,
}

/// Menu model: a fixed button strip on its own shared layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuConfig {
    pub enabled: bool,
    pub position: PositionSpec,
    pub buttons: Vec<MenuButton>,
    pub button_style: Option<String>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            position: PositionSpec::menu_from(None),
            buttons: Vec::new(),
            button_style: None,
        }
    }
}

impl MenuConfig {
    /// Stable key for re-render deduplication: the owner rebuilds the shared
    /// menu only when this changes (the blink fix).
    pub fn render_key(&self) -> String {
        format!(
            "{:?}|{:?}|{:?}|{:?}",
            self.enabled, self.position, self.button_style, self.buttons
        )
    }
}

/// Fully normalized widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub portal: PortalMode,
    pub capacity: Capacity,
    pub content: ContentModel,
    pub menu: MenuConfig,
    /// Verbose reconciliation logging requested by the user.
    pub verbose: bool,
}

impl WidgetConfig {
    /// Normalize and validate a raw configuration.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let portal = match raw.portal_mode.as_deref() {
            Some("local") => PortalMode::Local,
            _ => PortalMode::Global,
        };
        let capacity = if raw.multi_mode || raw.multi {
            Capacity::Multi
        } else {
            Capacity::Single
        };

        let content = Self::content_from(&raw)?;
        let menu = Self::menu_from(raw.menu.as_ref())?;

        Ok(Self {
            portal,
            capacity,
            content,
            menu,
            verbose: raw.overlay_log,
        })
    }

    fn content_from(raw: &RawConfig) -> Result<ContentModel, ConfigError> {
        if raw.embedders.is_empty() {
            if raw.menu_only {
                return Ok(ContentModel::MenuOnly);
            }

            // Legacy single-pane mode: global dashboard + embed_id required.
            let dashboard = raw
                .dashboard
                .clone()
                .ok_or(ConfigError::MissingDashboard { entry: None })?;
            let id = raw
                .embed_id
                .as_ref()
                .ok_or(ConfigError::MissingPaneId)?
                .as_string();
            let id = PaneId::parse(&id)
                .and_then(PaneId::validate)
                .map_err(|source| ConfigError::BadPaneId { entry: None, source })?;

            let mut flags = PaneFlags::empty();
            flags.set(PaneFlags::SHOW_CLOSE, raw.show_close);
            flags.set(PaneFlags::SHOW_TITLE, raw.show_title != Some(false));
            flags.set(PaneFlags::DEFAULT_VISIBLE, raw.default_visible);
            flags.set(PaneFlags::SCROLLABLE, raw.enable_scroll != Some(false));

            return Ok(ContentModel::LegacySingle(PaneDef {
                id,
                source: SourceRef { dashboard },
                title: raw.embedder_title.clone().unwrap_or_default(),
                flags,
                position: PositionSpec::content_from(
                    raw.content.as_ref().and_then(|c| c.position.as_ref()),
                ),
            }));
        }

        // Definition-list mode: per-pane dashboard falls back to the global one.
        let mut defs = Vec::with_capacity(raw.embedders.len());
        for (entry, pane) in raw.embedders.iter().enumerate() {
            let id = pane
                .embed_id
                .as_ref()
                .map(|r| r.as_string())
                .unwrap_or_default();
            let id = PaneId::parse(&id)
                .and_then(PaneId::validate)
                .map_err(|source| ConfigError::BadPaneId {
                    entry: Some(entry),
                    source,
                })?;
            if defs.iter().any(|d: &PaneDef| d.id == id) {
                return Err(ConfigError::DuplicatePane(id));
            }

            let dashboard = pane
                .dashboard
                .clone()
                .or_else(|| raw.dashboard.clone())
                .ok_or(ConfigError::MissingDashboard { entry: Some(entry) })?;

            let mut flags = PaneFlags::empty();
            flags.set(PaneFlags::SHOW_CLOSE, pane.show_close == Some(true));
            flags.set(PaneFlags::SHOW_TITLE, pane.show_title != Some(false));
            flags.set(PaneFlags::DEFAULT_VISIBLE, pane.default_visible == Some(true));
            flags.set(PaneFlags::SCROLLABLE, pane.enable_scroll != Some(false));

            defs.push(PaneDef {
                id,
                source: SourceRef { dashboard },
                title: pane.embedder_title.clone().unwrap_or_default(),
                flags,
                position: PositionSpec::content_from(
                    pane.content.as_ref().and_then(|c| c.position.as_ref()),
                ),
            });
        }
        Ok(ContentModel::Definitions(defs))
    }

    fn menu_from(raw: Option<&RawMenu>) -> Result<MenuConfig, ConfigError> {
        let Some(raw) = raw else {
            return Ok(MenuConfig::default());
        };

        let mut buttons = Vec::with_capacity(raw.buttons.len());
        for button in &raw.buttons {
            // `target` wins over the legacy `embed_id` alias; buttons with
            // neither are dropped, like the original.
            let Some(target) = button.target.as_ref().or(button.embed_id.as_ref()) else {
                continue;
            };
            let target = PaneId::parse_padded(&target.as_string())
                .and_then(PaneId::validate)
                .map_err(|source| ConfigError::BadButtonTarget {
                    label: button.label.clone().unwrap_or_default(),
                    source,
                })?;
            buttons.push(MenuButton {
                label: button.label.clone().unwrap_or_else(|| target.to_string()),
                icon: button.icon.clone(),
                target,
                style: button.style.clone(),
            });
        }

        Ok(MenuConfig {
            enabled: raw.enabled,
            position: PositionSpec::menu_from(raw.position.as_ref()),
            buttons,
            button_style: raw.button_style.clone(),
        })
    }

    /// First pane flagged default-visible, if any.
    pub fn default_visible_pane(&self) -> Option<PaneId> {
        match &self.content {
            ContentModel::MenuOnly => None,
            ContentModel::LegacySingle(def) => def.default_visible().then_some(def.id),
            ContentModel::Definitions(defs) => {
                defs.iter().find(|d| d.default_visible()).map(|d| d.id)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Fatal configuration errors; a widget carrying one never mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No dashboard given (globally in legacy mode, or for a list entry
    /// without a global fallback).
    MissingDashboard { entry: Option<usize> },
    /// Legacy mode without an `embed_id`.
    MissingPaneId,
    /// A pane ID that fails shape or range validation.
    BadPaneId { entry: Option<usize>, source: IdError },
    /// The same ID declared twice within one widget.
    DuplicatePane(PaneId),
    /// A menu button whose target is not a usable pane ID.
    BadButtonTarget { label: String, source: IdError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDashboard { entry: None } => {
                write!(f, "dashboard parameter is required (legacy mode)")
            }
            Self::MissingDashboard { entry: Some(i) } => {
                write!(f, "embedders[{i}].dashboard is required (or set a global dashboard)")
            }
            Self::MissingPaneId => write!(f, "embed_id is required (unless menu_only: true)"),
            Self::BadPaneId { entry: None, source } => write!(f, "embed_id: {source}"),
            Self::BadPaneId { entry: Some(i), source } => {
                write!(f, "embedders[{i}].embed_id: {source}")
            }
            Self::DuplicatePane(id) => write!(f, "duplicate pane id {id} in definition list"),
            Self::BadButtonTarget { label, source } => {
                write!(f, "menu button {label:?}: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadPaneId { source, .. } | Self::BadButtonTarget { source, .. } => Some(source),
            _ => None,
        }
    }
}
