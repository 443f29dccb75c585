#![forbid(unsafe_code)]

//! Hashpane public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for hosts. It
//! re-exports common types from the internal crates and offers a lightweight
//! prelude for day-to-day usage.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use hashpane_core::{
    Capacity, ConfigError, ContentModel, Extent, IdError, MenuButton, MenuConfig, PaneDef,
    PaneFlags, PaneId, PortalMode, PositionMode, PositionSpec, RawConfig, SourceRef, WidgetConfig,
    fragment,
};

// --- Engine re-exports -----------------------------------------------------

pub use hashpane_engine::{
    ContentDescriptor, ContentTag, Effect, Gate, Input, InstanceId, LayerId, LayerKind, LoadError,
    LoadToken, OverlayWidget,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for hashpane hosts.
#[derive(Debug)]
pub enum Error {
    /// Invalid widget configuration; the widget never mounts.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for hashpane APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Effect, Error, Gate, Input, OverlayWidget, PaneId, RawConfig, Result, WidgetConfig,
    };
}
