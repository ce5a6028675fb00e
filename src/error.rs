//! Error types.
//!
//! Touch dispatch itself never fails; these cover caller mistakes on the
//! scene mutation API and configuration loading.

use thiserror::Error;

use crate::engine::ElementId;

/// Error returned by structural scene mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The id does not resolve to a live element
    #[error("element {0} does not exist")]
    UnknownElement(ElementId),

    /// The child already has a parent
    #[error("element {child} is already attached to {parent}")]
    AlreadyAttached { child: ElementId, parent: ElementId },

    /// Attaching would make an element its own ancestor
    #[error("attaching {child} under {parent} would create a cycle")]
    WouldCreateCycle { child: ElementId, parent: ElementId },

    /// The scene root cannot be attached, detached or despawned
    #[error("the scene root cannot be moved or removed")]
    RootIsFixed,
}

/// Error returned when loading a [`NegotiatorConfig`](crate::NegotiatorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON or wrong field types
    #[error("invalid negotiator config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field is out of range
    #[error("invalid negotiator config: {0}")]
    Invalid(String),
}
