#![forbid(unsafe_code)]

//! Overlay coordination engine.
//!
//! The state machine behind the overlay card: redundant widget instances
//! register with a [`Gate`] that elects a single owner; the owner reconciles
//! the set of open panes against the URL fragment and drives the host through
//! a typed [`Effect`] vocabulary. The engine never touches a presentation
//! tree itself, which is what keeps every scenario synchronously testable.
//!
//! Host integration loop:
//!
//! 1. create one [`Gate`] per page session;
//! 2. build an [`OverlayWidget`] per card and call
//!    [`OverlayWidget::mount`];
//! 3. feed [`Input`]s (fragment events, visibility probes, settled content
//!    loads, control calls) through [`OverlayWidget::handle`];
//! 4. apply the returned [`Effect`]s, in order, to the real layer tree.
//!
//! [`Gate`]: gate::Gate
//! [`Effect`]: effect::Effect
//! [`Input`]: effect::Input
//! [`OverlayWidget`]: widget::OverlayWidget
//! [`OverlayWidget::mount`]: widget::OverlayWidget::mount
//! [`OverlayWidget::handle`]: widget::OverlayWidget::handle

pub mod effect;
pub mod gate;
pub mod layer;
pub mod widget;

mod reconcile;
mod visibility;

pub use effect::{ContentDescriptor, Effect, Input, LoadError, LoadToken};
pub use gate::{ContentTag, Gate, InstanceId};
pub use layer::{LayerId, LayerKind};
pub use widget::OverlayWidget;
