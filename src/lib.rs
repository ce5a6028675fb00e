//! # spark-touch
//!
//! Touch ownership negotiation for retained UI element trees.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals): the
//! scene's structural version is a signal, so reactive code can depend on
//! tree changes.
//!
//! ## Architecture
//!
//! Elements live in an arena ([`Scene`]) and may carry a [`TouchInteraction`]:
//! an interaction area, a cover area and eleven hooks. Each tick the
//! [`Negotiator`] re-validates live touches, then applies platform events:
//!
//! ```text
//! TouchEvent batch → FrameSnapshot → HitMap → Touch diff → element hooks
//! ```
//!
//! Elements subscribe to a touch (strong or weak) to keep receiving its
//! events, and at most one subscriber owns it as primary. Ownership only
//! changes hands with the owner's consent.
//!
//! ## Modules
//!
//! - [`types`] - Core types (TouchEvent, TouchPoint, event flags)
//! - [`area`] - Point-containment predicates
//! - [`engine`] - Element arena and per-tick snapshots
//! - [`touch`] - Touch protocol, element hooks, negotiator
//! - [`input`] - crossterm mouse as touch input
//! - [`config`] - Negotiator tunables
//! - [`error`] - Error types

pub mod area;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod touch;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use area::{area, Area, SharedArea};

pub use config::NegotiatorConfig;

pub use engine::{ChildLayer, ElementId, FrameSnapshot, HitMap, HitState, Scene, SnapshotPool};

pub use error::{ConfigError, SceneError};

pub use input::{disable_mouse, enable_mouse, MouseTouchBridge};

pub use touch::{
    Negotiator, Subscription, Touch, TouchContext, TouchHandlers, TouchInteraction,
    TouchLifecycle,
};
