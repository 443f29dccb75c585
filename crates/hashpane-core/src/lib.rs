#![forbid(unsafe_code)]

//! Core: pane identifiers, the fragment codec, and the configuration model.

pub mod config;
pub mod fragment;
pub mod id;

pub use config::{
    Capacity, ConfigError, ContentModel, Extent, MenuButton, MenuConfig, PaneDef, PaneFlags,
    PortalMode, PositionMode, PositionSpec, RawConfig, SourceRef, WidgetConfig,
};
pub use fragment::{decode, encode, single};
pub use id::{IdError, PaneId};
