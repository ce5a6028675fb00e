//! Per-pass delivery of a hit map to a touch's elements.
//!
//! One pass = one hit map for one touch: the subscriber diff, then the late
//! touch-in walk, then the history update. Down uses its own delivery.

use std::collections::HashSet;

use crate::engine::{ElementId, HitMap};
use crate::touch::{Touch, TouchContext};

impl Touch {
    /// Deliver `on_touch_down` to every element the touch is inside, topmost first.
    pub(crate) fn dispatch_down(&self, map: &HitMap) {
        let point = self.current();
        for (element, state) in map.iter() {
            if !state.is_touch_in() {
                continue;
            }
            // Earlier handlers may have removed or hidden this element
            if !self.scene().is_active(element) {
                continue;
            }
            self.notify(element, |interaction, ctx| {
                interaction.on_touch_down(ctx, point, state.covered_by_descendant)
            });
        }
    }

    /// Run the subscriber diff against a fresh hit map.
    ///
    /// With `membership`, subscribers missing from it are cancelled and
    /// dropped. `real_move` gates `on_touch_move`. Returns the elements the
    /// diff handled.
    pub(crate) fn dispatch_hit_map(
        &self,
        map: &HitMap,
        membership: Option<&HashSet<ElementId>>,
        real_move: bool,
    ) -> HashSet<ElementId> {
        let mut processed = HashSet::new();
        let scene = self.scene();
        let time = self.current().time;

        let primary = self.primary();
        if let Some(owner) = primary {
            if !scene.is_alive(owner) {
                self.unsubscribe(owner);
            } else if membership.is_some_and(|members| !members.contains(&owner)) {
                self.notify(owner, |interaction, ctx| interaction.on_touch_cancel(ctx, time));
                self.unsubscribe(owner);
            } else if self.notify_strong(owner, map, &mut processed, real_move) {
                self.unsubscribe(owner);
            }
        }

        let others: Vec<ElementId> = self
            .subscribers()
            .into_iter()
            .map(|s| s.element)
            .filter(|&element| Some(element) != primary)
            .collect();

        let mut dropped = Vec::new();
        for element in others {
            // Re-read: earlier callbacks may have unsubscribed or re-subscribed it
            let Some(subscription) = self.subscription(element) else {
                continue;
            };
            if !scene.is_alive(element) {
                dropped.push(element);
                continue;
            }
            if membership.is_some_and(|members| !members.contains(&element)) {
                self.notify(element, |interaction, ctx| interaction.on_touch_cancel(ctx, time));
                dropped.push(element);
                continue;
            }

            let drop = if subscription.is_strong {
                self.notify_strong(element, map, &mut processed, real_move)
            } else {
                self.notify_weak(element, map, &mut processed, real_move)
            };
            if drop {
                dropped.push(element);
            }
        }

        for element in dropped {
            self.unsubscribe(element);
        }
        processed
    }

    /// Returns whether the subscriber must be dropped.
    fn notify_strong(
        &self,
        element: ElementId,
        map: &HitMap,
        processed: &mut HashSet<ElementId>,
        real_move: bool,
    ) -> bool {
        let point = self.current();
        if !self.scene().is_active(element) {
            self.notify(element, |interaction, ctx| interaction.on_touch_cancel(ctx, point.time));
            return true;
        }
        let Some(interaction) = self.scene().interaction(element) else {
            return false;
        };
        processed.insert(element);

        let ctx = TouchContext::new(self, element);
        let was_in = self.was_touch_in(element);
        match map.get(element) {
            None => {
                if was_in {
                    interaction.on_touch_out(&ctx, point);
                } else if real_move {
                    interaction.on_touch_move(&ctx, point);
                }
            }
            Some(state) if state.is_touch_in() => {
                if !was_in {
                    let is_first_in = !self.has_been_in(element);
                    interaction.on_touch_in(&ctx, point, is_first_in, state.covered_by_descendant);
                } else if real_move {
                    interaction.on_touch_move(&ctx, point);
                }
            }
            Some(_) => interaction.on_touch_covered(&ctx, point),
        }
        false
    }

    /// Returns whether the subscriber must be dropped.
    fn notify_weak(
        &self,
        element: ElementId,
        map: &HitMap,
        processed: &mut HashSet<ElementId>,
        real_move: bool,
    ) -> bool {
        let point = self.current();
        let Some(interaction) = self.scene().interaction(element) else {
            return false;
        };
        processed.insert(element);

        let ctx = TouchContext::new(self, element);
        match map.get(element) {
            None => {
                interaction.on_touch_out(&ctx, point);
                true
            }
            Some(state) if state.is_touch_in() => {
                if real_move {
                    interaction.on_touch_move(&ctx, point);
                }
                false
            }
            Some(_) => {
                interaction.on_touch_covered(&ctx, point);
                true
            }
        }
    }

    /// `on_touch_in` for elements the diff did not handle that the touch
    /// just entered or that just became uncovered.
    pub(crate) fn dispatch_late_touch_in(&self, map: &HitMap, processed: &HashSet<ElementId>) {
        let point = self.current();
        for (element, state) in map.iter() {
            if !state.is_touch_in() || processed.contains(&element) || self.was_touch_in(element) {
                continue;
            }
            if !self.scene().is_active(element) {
                continue;
            }
            let is_first_in = !self.has_been_in(element);
            self.notify(element, |interaction, ctx| {
                interaction.on_touch_in(ctx, point, is_first_in, state.covered_by_descendant)
            });
        }
    }

    /// Remember which elements the touch is inside after this pass.
    fn record_touch_in(&self, map: &HitMap) {
        let touch_in: HashSet<ElementId> = map.touch_in().collect();
        self.with_state_mut(|state| {
            state.ever_in.extend(touch_in.iter().copied());
            state.last_touch_in = touch_in;
        });
    }

    /// Subscriber diff, late touch-in walk and history update for one pass.
    pub(crate) fn run_pass(
        &self,
        map: &HitMap,
        membership: Option<&HashSet<ElementId>>,
        real_move: bool,
    ) {
        let processed = self.dispatch_hit_map(map, membership, real_move);
        self.dispatch_late_touch_in(map, &processed);
        self.record_touch_in(map);
    }
}
