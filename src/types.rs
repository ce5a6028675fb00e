//! Core types shared by the touch engine.
//!
//! - [`Coord`] / [`GameTime`] - coordinate and clock units
//! - [`TouchEventKind`] / [`TouchEventFlags`] - platform event classification
//! - [`TouchEvent`] - one platform touch event
//! - [`TouchPoint`] - a timestamped position sample

use std::time::Duration;

// =============================================================================
// UNITS
// =============================================================================

/// UI coordinate unit.
pub type Coord = f32;

/// Frame clock. Measured from an arbitrary, application-chosen origin.
pub type GameTime = Duration;

/// Platform identity of one finger (or one pointer button).
pub type TouchId = u64;

// =============================================================================
// EVENT FLAGS
// =============================================================================

bitflags::bitflags! {
    /// What a platform touch event changes.
    ///
    /// Each [`TouchEventKind`] is a fixed combination of these bits; a
    /// [`TouchEvent`] may drop `UPDATE_POSITION` when the platform did not
    /// report fresh coordinates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TouchEventFlags: u8 {
        const STATE_CHANGED = 1 << 0;
        const UPDATE_POSITION = 1 << 1;
        const FORCED_CHANGE = 1 << 2;
        const STARTED = 1 << 4;
        const ENDED = 1 << 5;
    }
}

/// Platform touch event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    Down,
    Move,
    Up,
    Cancel,
}

impl TouchEventKind {
    /// The flag set this kind carries when the position is reported.
    pub fn flags(self) -> TouchEventFlags {
        match self {
            Self::Down => {
                TouchEventFlags::STATE_CHANGED
                    | TouchEventFlags::UPDATE_POSITION
                    | TouchEventFlags::STARTED
            }
            Self::Move => TouchEventFlags::UPDATE_POSITION,
            Self::Up => {
                TouchEventFlags::STATE_CHANGED
                    | TouchEventFlags::UPDATE_POSITION
                    | TouchEventFlags::ENDED
            }
            Self::Cancel => {
                TouchEventFlags::STATE_CHANGED
                    | TouchEventFlags::FORCED_CHANGE
                    | TouchEventFlags::ENDED
            }
        }
    }

    /// Whether this kind terminates the touch.
    pub fn is_terminal(self) -> bool {
        self.flags().contains(TouchEventFlags::ENDED)
    }
}

// =============================================================================
// TOUCH EVENT
// =============================================================================

/// One platform touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    /// Finger identity
    pub touch_id: TouchId,
    /// Event type
    pub kind: TouchEventKind,
    /// X coordinate (meaningless when `has_position_update` is false)
    pub x: Coord,
    /// Y coordinate (meaningless when `has_position_update` is false)
    pub y: Coord,
    /// Platform timestamp
    pub time: GameTime,
    /// Whether `x`/`y` carry a fresh position
    pub has_position_update: bool,
}

impl TouchEvent {
    /// Create an event carrying a position.
    pub fn new(kind: TouchEventKind, touch_id: TouchId, x: Coord, y: Coord, time: GameTime) -> Self {
        Self {
            touch_id,
            kind,
            x,
            y,
            time,
            has_position_update: kind.flags().contains(TouchEventFlags::UPDATE_POSITION),
        }
    }

    /// Create a down event.
    pub fn down(touch_id: TouchId, x: Coord, y: Coord, time: GameTime) -> Self {
        Self::new(TouchEventKind::Down, touch_id, x, y, time)
    }

    /// Create a move event.
    pub fn move_to(touch_id: TouchId, x: Coord, y: Coord, time: GameTime) -> Self {
        Self::new(TouchEventKind::Move, touch_id, x, y, time)
    }

    /// Create an up event.
    pub fn up(touch_id: TouchId, x: Coord, y: Coord, time: GameTime) -> Self {
        Self::new(TouchEventKind::Up, touch_id, x, y, time)
    }

    /// Create a cancel event. Cancels never carry a position.
    pub fn cancel(touch_id: TouchId, time: GameTime) -> Self {
        Self {
            touch_id,
            kind: TouchEventKind::Cancel,
            x: Coord::NAN,
            y: Coord::NAN,
            time,
            has_position_update: false,
        }
    }

    /// Effective flags of this event.
    pub fn flags(&self) -> TouchEventFlags {
        let mut flags = self.kind.flags();
        flags.set(TouchEventFlags::UPDATE_POSITION, self.has_position_update);
        flags
    }
}

// =============================================================================
// TOUCH POINT
// =============================================================================

/// A timestamped touch position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchPoint {
    pub x: Coord,
    pub y: Coord,
    pub time: GameTime,
}

impl TouchPoint {
    pub fn new(x: Coord, y: Coord, time: GameTime) -> Self {
        Self { x, y, time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_flags() {
        assert!(TouchEventKind::Down.flags().contains(TouchEventFlags::STARTED));
        assert!(TouchEventKind::Up.is_terminal());
        assert!(TouchEventKind::Cancel.is_terminal());
        assert!(!TouchEventKind::Move.is_terminal());
        assert!(!TouchEventKind::Cancel.flags().contains(TouchEventFlags::UPDATE_POSITION));
        assert!(TouchEventKind::Cancel.flags().contains(TouchEventFlags::FORCED_CHANGE));
    }

    #[test]
    fn test_event_flags_follow_position_update() {
        let mut event = TouchEvent::move_to(3, 1.0, 2.0, GameTime::from_millis(16));
        assert!(event.flags().contains(TouchEventFlags::UPDATE_POSITION));

        event.has_position_update = false;
        assert_eq!(event.flags(), TouchEventFlags::empty());

        let cancel = TouchEvent::cancel(3, GameTime::ZERO);
        assert!(!cancel.has_position_update);
        assert!(cancel.x.is_nan());
    }
}
