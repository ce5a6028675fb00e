//! Input Module - Terminal mouse as touch input
//!
//! Bridges crossterm's event system with the negotiator. Each mouse button
//! behaves as one finger: press starts a touch, drag moves it, release ends it.
//!
//! # API
//!
//! - `MouseTouchBridge::convert` - Convert one crossterm event to touch events
//! - `MouseTouchBridge::poll_touch_events` - Drain pending terminal events
//! - `touch_id_for` - Touch id used for a mouse button
//! - `enable_mouse` / `disable_mouse` - Control mouse capture
//!
//! # Example
//!
//! ```ignore
//! use spark_touch::input::{enable_mouse, MouseTouchBridge};
//! use std::time::{Duration, Instant};
//!
//! enable_mouse()?;
//! let started = Instant::now();
//! let mut bridge = MouseTouchBridge::new();
//! loop {
//!     let now = started.elapsed();
//!     let events = bridge.poll_touch_events(Duration::from_millis(16), now)?;
//!     negotiator.process_touch_events(&events, now);
//! }
//! ```

use crossterm::event::{
    Event as CrosstermEvent,
    MouseButton as CrosstermMouseButton,
    MouseEvent as CrosstermMouseEvent,
    MouseEventKind,
    poll, read,
    EnableMouseCapture, DisableMouseCapture,
};
use crossterm::execute;
use std::io::stdout;
use std::time::Duration;

use crate::types::{Coord, GameTime, TouchEvent, TouchId};

// =============================================================================
// BUTTON MAPPING
// =============================================================================

pub const LEFT_BUTTON_TOUCH_ID: TouchId = 0;
pub const RIGHT_BUTTON_TOUCH_ID: TouchId = 1;
pub const MIDDLE_BUTTON_TOUCH_ID: TouchId = 2;

/// Touch id used for a mouse button.
pub fn touch_id_for(button: CrosstermMouseButton) -> TouchId {
    match button {
        CrosstermMouseButton::Left => LEFT_BUTTON_TOUCH_ID,
        CrosstermMouseButton::Right => RIGHT_BUTTON_TOUCH_ID,
        CrosstermMouseButton::Middle => MIDDLE_BUTTON_TOUCH_ID,
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

/// Tracks pressed buttons so releases and focus loss map to the right touches.
#[derive(Debug, Default, Clone)]
pub struct MouseTouchBridge {
    pressed: [bool; 3],
}

impl MouseTouchBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, button: CrosstermMouseButton) -> bool {
        self.pressed[touch_id_for(button) as usize]
    }

    /// Convert one crossterm event. Non-mouse events other than focus loss
    /// produce nothing.
    pub fn convert(&mut self, event: &CrosstermEvent, time: GameTime) -> Vec<TouchEvent> {
        match event {
            CrosstermEvent::Mouse(mouse) => self.convert_mouse_event(*mouse, time).into_iter().collect(),
            CrosstermEvent::FocusLost => self.cancel_all(time),
            _ => Vec::new(),
        }
    }

    /// Convert a crossterm mouse event.
    pub fn convert_mouse_event(&mut self, event: CrosstermMouseEvent, time: GameTime) -> Option<TouchEvent> {
        let x = event.column as Coord;
        let y = event.row as Coord;

        match event.kind {
            MouseEventKind::Down(button) => {
                let id = touch_id_for(button);
                self.pressed[id as usize] = true;
                Some(TouchEvent::down(id, x, y, time))
            }
            MouseEventKind::Drag(button) => {
                let id = touch_id_for(button);
                if self.pressed[id as usize] {
                    Some(TouchEvent::move_to(id, x, y, time))
                } else {
                    // Press happened before capture started
                    self.pressed[id as usize] = true;
                    Some(TouchEvent::down(id, x, y, time))
                }
            }
            MouseEventKind::Up(button) => {
                let id = touch_id_for(button);
                if std::mem::take(&mut self.pressed[id as usize]) {
                    Some(TouchEvent::up(id, x, y, time))
                } else {
                    None
                }
            }
            // Hover and wheel are not touches
            _ => None,
        }
    }

    /// Cancel every pressed button.
    pub fn cancel_all(&mut self, time: GameTime) -> Vec<TouchEvent> {
        let mut events = Vec::new();
        for (index, pressed) in self.pressed.iter_mut().enumerate() {
            if std::mem::take(pressed) {
                events.push(TouchEvent::cancel(index as TouchId, time));
            }
        }
        if !events.is_empty() {
            tracing::debug!(count = events.len(), "cancelling pressed buttons");
        }
        events
    }

    /// Wait up to `timeout` for terminal input, then drain everything pending.
    pub fn poll_touch_events(&mut self, timeout: Duration, time: GameTime) -> std::io::Result<Vec<TouchEvent>> {
        let mut events = Vec::new();
        let mut wait = timeout;
        while poll(wait)? {
            events.extend(self.convert(&read()?, time));
            wait = Duration::ZERO;
        }
        Ok(events)
    }
}

// =============================================================================
// MOUSE CAPTURE
// =============================================================================

/// Enable mouse capture.
pub fn enable_mouse() -> std::io::Result<()> {
    execute!(stdout(), EnableMouseCapture)
}

/// Disable mouse capture.
pub fn disable_mouse() -> std::io::Result<()> {
    execute!(stdout(), DisableMouseCapture)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TouchEventKind;
    use crossterm::event::KeyModifiers;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> CrosstermEvent {
        CrosstermEvent::Mouse(CrosstermMouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    fn ms(n: u64) -> GameTime {
        GameTime::from_millis(n)
    }

    #[test]
    fn test_buttons_map_to_ids() {
        assert_eq!(touch_id_for(CrosstermMouseButton::Left), 0);
        assert_eq!(touch_id_for(CrosstermMouseButton::Right), 1);
        assert_eq!(touch_id_for(CrosstermMouseButton::Middle), 2);
    }

    #[test]
    fn test_press_drag_release() {
        let mut bridge = MouseTouchBridge::new();

        let down = bridge.convert(&mouse(MouseEventKind::Down(CrosstermMouseButton::Right), 10, 5), ms(1));
        assert_eq!(down, vec![TouchEvent::down(1, 10.0, 5.0, ms(1))]);
        assert!(bridge.is_pressed(CrosstermMouseButton::Right));

        let drag = bridge.convert(&mouse(MouseEventKind::Drag(CrosstermMouseButton::Right), 12, 6), ms(2));
        assert_eq!(drag, vec![TouchEvent::move_to(1, 12.0, 6.0, ms(2))]);

        let up = bridge.convert(&mouse(MouseEventKind::Up(CrosstermMouseButton::Right), 12, 6), ms(3));
        assert_eq!(up[0].kind, TouchEventKind::Up);
        assert!(!bridge.is_pressed(CrosstermMouseButton::Right));
    }

    #[test]
    fn test_hover_scroll_and_stray_release_ignored() {
        let mut bridge = MouseTouchBridge::new();
        assert!(bridge.convert(&mouse(MouseEventKind::Moved, 1, 1), ms(0)).is_empty());
        assert!(bridge.convert(&mouse(MouseEventKind::ScrollDown, 1, 1), ms(0)).is_empty());
        assert!(bridge
            .convert(&mouse(MouseEventKind::Up(CrosstermMouseButton::Left), 1, 1), ms(0))
            .is_empty());
        assert!(bridge.convert(&CrosstermEvent::Resize(80, 24), ms(0)).is_empty());
    }

    #[test]
    fn test_drag_without_press_starts_touch() {
        let mut bridge = MouseTouchBridge::new();
        let events = bridge.convert(&mouse(MouseEventKind::Drag(CrosstermMouseButton::Middle), 3, 4), ms(0));
        assert_eq!(events, vec![TouchEvent::down(2, 3.0, 4.0, ms(0))]);
    }

    #[test]
    fn test_focus_lost_cancels_pressed() {
        let mut bridge = MouseTouchBridge::new();
        bridge.convert(&mouse(MouseEventKind::Down(CrosstermMouseButton::Left), 0, 0), ms(0));
        bridge.convert(&mouse(MouseEventKind::Down(CrosstermMouseButton::Middle), 0, 0), ms(0));

        let events = bridge.convert(&CrosstermEvent::FocusLost, ms(9));
        let ids: Vec<_> = events.iter().map(|e| (e.touch_id, e.kind)).collect();
        assert_eq!(ids, vec![(0, TouchEventKind::Cancel), (2, TouchEventKind::Cancel)]);
        assert!(!bridge.is_pressed(CrosstermMouseButton::Left));
        assert!(bridge.convert(&CrosstermEvent::FocusLost, ms(10)).is_empty());
    }
}
