//! Touch Module - Per-finger state, ownership protocol and element hooks.
//!
//! # API
//!
//! - [`Touch`] - one finger: position history, subscribers, primary owner
//! - [`TouchInteraction`] - what an element does with touches
//! - [`TouchHandlers`] - closure-based [`TouchInteraction`]
//! - [`TouchContext`] - what every hook receives

mod dispatch;
mod interaction;
mod negotiator;
mod protocol;

pub use interaction::*;
pub use negotiator::Negotiator;
pub use protocol::{Subscription, Touch, TouchLifecycle};
