//! Negotiator - Frame-coherent touch dispatch.
//!
//! Once per tick the application hands over the platform events gathered
//! since the previous tick. The negotiator first re-validates every live
//! touch against the current tree (geometry may have moved under a finger
//! that did not), then applies the events in order.
//!
//! All walks enumerate a [`FrameSnapshot`]. A snapshot is reused across
//! touches and events within a tick until a callback changes the scene's
//! structural version, at which point it is returned to the pool and the
//! next walk captures a fresh one.
//!
//! # Example
//!
//! ```ignore
//! let scene = Scene::new();
//! let mut negotiator = Negotiator::new(scene.clone());
//!
//! loop {
//!     let events = bridge.poll(Duration::from_millis(16))?;
//!     negotiator.process_touch_events(&events, clock.elapsed());
//! }
//! ```

use std::collections::BTreeMap;

use crate::config::NegotiatorConfig;
use crate::engine::{FrameSnapshot, Scene, SnapshotPool};
use crate::touch::Touch;
use crate::types::{GameTime, TouchEvent, TouchEventKind, TouchId};

/// Owns the live touches of one scene and drives their callbacks.
pub struct Negotiator {
    scene: Scene,
    config: NegotiatorConfig,
    active: BTreeMap<TouchId, Touch>,
    pool: SnapshotPool,
}

impl Negotiator {
    pub fn new(scene: Scene) -> Self {
        Self::with_config(scene, NegotiatorConfig::default())
    }

    pub fn with_config(scene: Scene, config: NegotiatorConfig) -> Self {
        let pool = SnapshotPool::new(config.snapshot_pool_capacity);
        Self {
            scene,
            config,
            active: BTreeMap::new(),
            pool,
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Process one tick: re-validate live touches, then apply `events` in order.
    pub fn process_touch_events(&mut self, events: &[TouchEvent], frame_time: GameTime) {
        tracing::trace!(
            touches = self.active.len(),
            events = events.len(),
            "processing touch tick"
        );

        let mut snapshot: Option<FrameSnapshot> = None;

        if self.config.revalidate_each_tick {
            self.revalidate(&mut snapshot, frame_time);
        }

        for event in events {
            match event.kind {
                TouchEventKind::Down => self.handle_down(event, &mut snapshot),
                kind if kind.is_terminal() => self.handle_end(event),
                _ => self.handle_move(event, &mut snapshot),
            }
        }

        if let Some(snapshot) = snapshot.take() {
            self.pool.release(snapshot);
        }
    }

    /// Cancel every live touch and forget it.
    pub fn clear_all_touches(&mut self) {
        let touches = std::mem::take(&mut self.active);
        if !touches.is_empty() {
            tracing::debug!(count = touches.len(), "cancelling all touches");
        }
        for touch in touches.into_values() {
            touch.end();
            touch.process_cancel();
        }
    }

    fn revalidate(&mut self, snapshot: &mut Option<FrameSnapshot>, frame_time: GameTime) {
        let touches: Vec<Touch> = self.active.values().cloned().collect();
        for touch in touches {
            let captured = snapshot.get_or_insert_with(|| self.pool.capture(&self.scene));

            let point = touch.current();
            let map = captured.hit_test(&self.scene, point.x, point.y);
            touch.update_virtual_change_time(frame_time);
            touch.run_pass(&map, Some(captured.members()), false);

            self.release_if_stale(snapshot);
        }
    }

    fn handle_down(&mut self, event: &TouchEvent, snapshot: &mut Option<FrameSnapshot>) {
        if let Some(old) = self.active.remove(&event.touch_id) {
            tracing::debug!(touch = event.touch_id, "down reuses a live touch id, cancelling old touch");
            old.end();
            old.process_cancel();
        }

        let touch = Touch::new(event.touch_id, self.scene.clone(), event.x, event.y, event.time);
        self.active.insert(event.touch_id, touch.clone());

        let captured = snapshot.get_or_insert_with(|| self.pool.capture(&self.scene));
        let map = captured.hit_test(&self.scene, event.x, event.y);
        touch.dispatch_down(&map);

        self.release_if_stale(snapshot);
    }

    fn handle_move(&mut self, event: &TouchEvent, snapshot: &mut Option<FrameSnapshot>) {
        let Some(touch) = self.active.get(&event.touch_id).cloned() else {
            tracing::debug!(touch = event.touch_id, "move for unknown touch ignored");
            return;
        };
        touch.update_with_event(event);

        let captured = snapshot.get_or_insert_with(|| self.pool.capture(&self.scene));
        let point = touch.current();
        let map = captured.hit_test(&self.scene, point.x, point.y);
        touch.run_pass(&map, None, true);

        self.release_if_stale(snapshot);
    }

    fn handle_end(&mut self, event: &TouchEvent) {
        let Some(touch) = self.active.remove(&event.touch_id) else {
            tracing::debug!(touch = event.touch_id, kind = ?event.kind, "end for unknown touch ignored");
            return;
        };
        touch.update_with_event(event);
        match event.kind {
            TouchEventKind::Up => touch.process_up(),
            _ => touch.process_cancel(),
        }
    }

    fn release_if_stale(&mut self, snapshot: &mut Option<FrameSnapshot>) {
        let version = self.scene.structural_version();
        if snapshot.as_ref().is_some_and(|s| s.version() != version) {
            if let Some(stale) = snapshot.take() {
                tracing::trace!(from = stale.version(), to = version, "scene changed, dropping snapshot");
                self.pool.release(stale);
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn active_touch(&self, id: TouchId) -> Option<Touch> {
        self.active.get(&id).cloned()
    }

    /// Live touch ids, ascending.
    pub fn active_touch_ids(&self) -> Vec<TouchId> {
        self.active.keys().copied().collect()
    }

    pub fn active_touch_count(&self) -> usize {
        self.active.len()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Snapshot nodes waiting in the pool.
    pub fn pooled_snapshot_nodes(&self) -> usize {
        self.pool.pooled()
    }
}

impl Drop for Negotiator {
    fn drop(&mut self) {
        self.clear_all_touches();
    }
}
