//! Touch - One finger's state and its ownership protocol.
//!
//! A touch keeps an ordered subscriber list and at most one primary owner.
//! Subscribers are strong (kept through out/covered until they unsubscribe)
//! or weak (dropped on their first out/covered). The primary owner is always
//! a subscriber; ownership moves only with the current owner's consent.
//!
//! [`Touch`] is a handle; clones share state. Hooks receive it through a
//! [`TouchContext`] and may call any method here re-entrantly.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::engine::{ElementId, Scene};
use crate::touch::{TouchContext, TouchInteraction};
use crate::types::{Coord, GameTime, TouchEvent, TouchEventFlags, TouchId, TouchPoint};

// =============================================================================
// TYPES
// =============================================================================

/// One entry in a touch's subscriber list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub element: ElementId,
    pub is_strong: bool,
}

/// Coarse touch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchLifecycle {
    ActiveUnowned,
    ActiveOwned,
    Ended,
}

pub(crate) struct TouchState {
    alive: bool,
    start: TouchPoint,
    last: TouchPoint,
    current: TouchPoint,
    pub(crate) primary: Option<ElementId>,
    pub(crate) subscribers: Vec<Subscription>,
    pub(crate) last_touch_in: HashSet<ElementId>,
    pub(crate) ever_in: HashSet<ElementId>,
}

struct TouchInner {
    id: TouchId,
    scene: Scene,
    state: RefCell<TouchState>,
}

/// Shared handle to one live (or ended) touch.
#[derive(Clone)]
pub struct Touch {
    inner: Rc<TouchInner>,
}

impl fmt::Debug for Touch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Touch")
            .field("id", &self.inner.id)
            .field("alive", &state.alive)
            .field("current", &state.current)
            .field("primary", &state.primary)
            .field("subscribers", &state.subscribers)
            .finish()
    }
}

impl Touch {
    /// Start a touch at `(x, y)`.
    pub fn new(id: TouchId, scene: Scene, x: Coord, y: Coord, time: GameTime) -> Self {
        let point = TouchPoint::new(x, y, time);
        Self {
            inner: Rc::new(TouchInner {
                id,
                scene,
                state: RefCell::new(TouchState {
                    alive: true,
                    start: point,
                    last: point,
                    current: point,
                    primary: None,
                    subscribers: Vec::new(),
                    last_touch_in: HashSet::new(),
                    ever_in: HashSet::new(),
                }),
            }),
        }
    }

    pub(crate) fn state(&self) -> Ref<'_, TouchState> {
        self.inner.state.borrow()
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut TouchState) -> R) -> R {
        f(&mut self.inner.state.borrow_mut())
    }

    /// Whether two handles refer to the same touch.
    pub fn ptr_eq(&self, other: &Touch) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Identity and position
    // -------------------------------------------------------------------------

    pub fn id(&self) -> TouchId {
        self.inner.id
    }

    pub fn scene(&self) -> &Scene {
        &self.inner.scene
    }

    pub fn is_alive(&self) -> bool {
        self.state().alive
    }

    pub fn is_ended(&self) -> bool {
        !self.is_alive()
    }

    /// Where and when the touch started.
    pub fn start(&self) -> TouchPoint {
        self.state().start
    }

    /// Position before the latest change.
    pub fn last(&self) -> TouchPoint {
        self.state().last
    }

    /// Latest position and change time.
    pub fn current(&self) -> TouchPoint {
        self.state().current
    }

    pub fn lifecycle(&self) -> TouchLifecycle {
        let state = self.state();
        if !state.alive {
            TouchLifecycle::Ended
        } else if state.primary.is_some() {
            TouchLifecycle::ActiveOwned
        } else {
            TouchLifecycle::ActiveUnowned
        }
    }

    /// Apply a platform event to the position history.
    pub fn update_with_event(&self, event: &TouchEvent) {
        let flags = event.flags();
        let mut state = self.inner.state.borrow_mut();
        state.last = state.current;
        state.current.time = event.time;
        if flags.contains(TouchEventFlags::UPDATE_POSITION) {
            state.current.x = event.x;
            state.current.y = event.y;
        }
        if event.kind.is_terminal() {
            state.alive = false;
        }
    }

    /// Mark the touch ended without a platform event.
    pub(crate) fn end(&self) {
        self.inner.state.borrow_mut().alive = false;
    }

    /// Advance the change time without new coordinates.
    pub fn update_virtual_change_time(&self, time: GameTime) {
        self.inner.state.borrow_mut().current.time = time;
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Whether the element counted the touch as inside after the last pass.
    pub fn was_touch_in(&self, element: ElementId) -> bool {
        self.state().last_touch_in.contains(&element)
    }

    /// Whether the touch has ever been inside the element.
    pub fn has_been_in(&self, element: ElementId) -> bool {
        self.state().ever_in.contains(&element)
    }

    // -------------------------------------------------------------------------
    // Subscription
    // -------------------------------------------------------------------------

    /// Subscribe an element to this touch's events.
    ///
    /// Repeating the same strength is a no-op. Changing strength moves the
    /// element to the end of the list.
    pub fn subscribe(&self, element: ElementId, is_strong: bool) {
        if !self.scene().is_alive(element) {
            return;
        }
        let mut state = self.inner.state.borrow_mut();
        if let Some(pos) = state.subscribers.iter().position(|s| s.element == element) {
            if state.subscribers[pos].is_strong == is_strong {
                return;
            }
            state.subscribers.remove(pos);
        }
        state.subscribers.push(Subscription { element, is_strong });
    }

    /// Remove an element from the subscribers. A primary owner loses ownership.
    pub fn unsubscribe(&self, element: ElementId) {
        let was_primary = self.with_state_mut(|state| {
            state.subscribers.retain(|s| s.element != element);
            if state.primary == Some(element) {
                state.primary = None;
                true
            } else {
                false
            }
        });
        if was_primary {
            self.broadcast_primary_lost(element);
        }
    }

    pub fn is_subscribed(&self, element: ElementId) -> bool {
        self.subscription(element).is_some()
    }

    pub(crate) fn subscription(&self, element: ElementId) -> Option<Subscription> {
        self.state()
            .subscribers
            .iter()
            .find(|s| s.element == element)
            .copied()
    }

    /// Current subscribers, in subscription order.
    pub fn subscribers(&self) -> Vec<Subscription> {
        self.state().subscribers.clone()
    }

    // -------------------------------------------------------------------------
    // Primary ownership
    // -------------------------------------------------------------------------

    pub fn primary(&self) -> Option<ElementId> {
        self.state().primary
    }

    pub fn is_primary_occupied(&self) -> bool {
        self.primary().is_some()
    }

    pub fn is_own_primary(&self, element: ElementId) -> bool {
        self.primary() == Some(element)
    }

    /// Try to become the primary owner. Only subscribers may claim.
    ///
    /// A current owner is asked first and may refuse. On success the old
    /// owner is told it lost the touch, the other subscribers learn the new
    /// holder, then the claimant is told it was given the touch.
    pub fn claim_primary(&self, claimant: ElementId) -> bool {
        if !self.is_subscribed(claimant) {
            return false;
        }

        if let Some(owner) = self.primary() {
            if owner == claimant {
                return true;
            }

            if let Some(interaction) = self.scene().interaction(owner) {
                let ctx = TouchContext::new(self, owner);
                if !interaction.on_primary_touch_steal(&ctx, claimant) {
                    tracing::debug!(touch = self.id(), %owner, %claimant, "primary steal refused");
                    return false;
                }

                match self.primary() {
                    Some(current) if current == owner => {
                        self.with_state_mut(|state| state.primary = None);
                        interaction.on_primary_touch_lose(&ctx);
                    }
                    // Owner already resigned while being asked
                    None => {}
                    Some(other) => {
                        tracing::debug!(touch = self.id(), %claimant, %other, "primary moved during steal");
                        return false;
                    }
                }
            } else {
                self.with_state_mut(|state| state.primary = None);
            }

            if self.is_primary_occupied() {
                return false;
            }
        }

        if !self.is_subscribed(claimant) {
            self.broadcast_holder_changed(None, None);
            return false;
        }

        self.with_state_mut(|state| state.primary = Some(claimant));
        if !self.broadcast_holder_changed(Some(claimant), Some(claimant)) {
            return false;
        }

        self.notify(claimant, |interaction, ctx| interaction.on_primary_touch_given(ctx));
        true
    }

    /// Give up ownership. Only the current owner can resign.
    pub fn resign_primary(&self, element: ElementId) {
        let resigned = self.with_state_mut(|state| {
            if state.primary == Some(element) {
                state.primary = None;
                true
            } else {
                false
            }
        });
        if resigned {
            self.broadcast_primary_lost(element);
        }
    }

    fn broadcast_primary_lost(&self, former: ElementId) {
        self.notify(former, |interaction, ctx| interaction.on_primary_touch_lose(ctx));
        self.broadcast_holder_changed(None, Some(former));
    }

    /// Tell every subscriber except `skip` who holds the touch now.
    ///
    /// Stops as soon as ownership no longer matches `holder`; returns whether
    /// it ran to completion.
    fn broadcast_holder_changed(&self, holder: Option<ElementId>, skip: Option<ElementId>) -> bool {
        let recipients: Vec<ElementId> = self.state().subscribers.iter().map(|s| s.element).collect();
        for element in recipients {
            if Some(element) == skip || !self.is_subscribed(element) {
                continue;
            }
            let notified = self.notify(element, |interaction, ctx| {
                interaction.on_primary_touch_holder_changed(ctx, holder)
            });
            if notified && self.primary() != holder {
                return false;
            }
        }
        true
    }

    // -------------------------------------------------------------------------
    // Termination
    // -------------------------------------------------------------------------

    /// Deliver `on_touch_up` to the owner, then every other subscriber, and clear.
    pub(crate) fn process_up(&self) {
        let point = self.current();
        self.fan_out_terminal(|interaction, ctx| interaction.on_touch_up(ctx, point));
    }

    /// Deliver `on_touch_cancel` to the owner, then every other subscriber, and clear.
    pub(crate) fn process_cancel(&self) {
        let time = self.current().time;
        self.fan_out_terminal(|interaction, ctx| interaction.on_touch_cancel(ctx, time));
    }

    fn fan_out_terminal(&self, hook: impl Fn(&dyn TouchInteraction, &TouchContext<'_>)) {
        let primary = self.primary();
        if let Some(owner) = primary {
            self.notify(owner, &hook);
        }

        let others: Vec<ElementId> = self
            .state()
            .subscribers
            .iter()
            .map(|s| s.element)
            .filter(|&element| Some(element) != primary)
            .collect();
        for element in others {
            self.notify(element, &hook);
        }

        self.with_state_mut(|state| {
            state.primary = None;
            state.subscribers.clear();
        });
    }

    /// Run a hook on an element's capability. Returns whether it ran.
    pub(crate) fn notify(
        &self,
        element: ElementId,
        hook: impl FnOnce(&dyn TouchInteraction, &TouchContext<'_>),
    ) -> bool {
        let Some(interaction) = self.scene().interaction(element) else {
            return false;
        };
        let ctx = TouchContext::new(self, element);
        hook(interaction.as_ref(), &ctx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::TouchHandlers;
    use crate::types::TouchEventKind;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging_handlers(name: &'static str, log: &Log) -> TouchHandlers {
        let lose = log.clone();
        let given = log.clone();
        let holder = log.clone();
        let up = log.clone();
        let cancel = log.clone();
        TouchHandlers::new()
            .on_lose(move |_| lose.borrow_mut().push(format!("{name}.lose")))
            .on_given(move |_| given.borrow_mut().push(format!("{name}.given")))
            .on_holder_changed(move |ctx, holder_id| {
                let label = match holder_id {
                    Some(id) if Some(id) == ctx.touch().primary() => "owner",
                    Some(_) => "other",
                    None => "none",
                };
                holder.borrow_mut().push(format!("{name}.holder({label})"));
            })
            .on_up(move |_, _| up.borrow_mut().push(format!("{name}.up")))
            .on_cancel(move |_, _| cancel.borrow_mut().push(format!("{name}.cancel")))
    }

    fn setup() -> (Scene, Touch) {
        let scene = Scene::new();
        let touch = Touch::new(7, scene.clone(), 1.0, 1.0, GameTime::ZERO);
        (scene, touch)
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let (scene, touch) = setup();
        let e = scene.spawn_empty();

        touch.subscribe(e, true);
        touch.subscribe(e, true);
        assert_eq!(touch.subscribers(), vec![Subscription { element: e, is_strong: true }]);

        let f = scene.spawn_empty();
        touch.subscribe(f, false);
        touch.subscribe(e, false);
        assert_eq!(
            touch.subscribers(),
            vec![
                Subscription { element: f, is_strong: false },
                Subscription { element: e, is_strong: false },
            ]
        );
    }

    #[test]
    fn test_subscribe_ignores_dead_elements() {
        let (scene, touch) = setup();
        let e = scene.spawn_empty();
        scene.despawn(e).unwrap();
        touch.subscribe(e, true);
        assert!(touch.subscribers().is_empty());
    }

    #[test]
    fn test_claim_requires_subscription() {
        let (scene, touch) = setup();
        let e = scene.spawn_empty();
        assert!(!touch.claim_primary(e));
        touch.subscribe(e, true);
        assert!(touch.claim_primary(e));
        assert!(touch.claim_primary(e), "owner claiming again");
        assert_eq!(touch.lifecycle(), TouchLifecycle::ActiveOwned);
    }

    #[test]
    fn test_steal_refused() {
        let (scene, touch) = setup();
        let log: Log = Rc::default();
        let a = scene.spawn(logging_handlers("a", &log).on_steal(|_, _| false));
        let b = scene.spawn(logging_handlers("b", &log));

        touch.subscribe(a, true);
        touch.subscribe(b, true);
        assert!(touch.claim_primary(a));
        log.borrow_mut().clear();

        assert!(!touch.claim_primary(b));
        assert_eq!(touch.primary(), Some(a));
        assert!(log.borrow().is_empty(), "{:?}", log.borrow());
    }

    #[test]
    fn test_steal_accepted_order() {
        let (scene, touch) = setup();
        let log: Log = Rc::default();
        let a = scene.spawn(logging_handlers("a", &log));
        let b = scene.spawn(logging_handlers("b", &log));
        let c = scene.spawn(logging_handlers("c", &log));

        touch.subscribe(a, true);
        touch.subscribe(b, true);
        touch.subscribe(c, false);
        assert!(touch.claim_primary(a));
        log.borrow_mut().clear();

        assert!(touch.claim_primary(b));
        assert_eq!(touch.primary(), Some(b));
        assert_eq!(
            *log.borrow(),
            vec!["a.lose", "a.holder(owner)", "c.holder(owner)", "b.given"]
        );
    }

    #[test]
    fn test_unsubscribing_owner_broadcasts_loss() {
        let (scene, touch) = setup();
        let log: Log = Rc::default();
        let a = scene.spawn(logging_handlers("a", &log));
        let b = scene.spawn(logging_handlers("b", &log));
        touch.subscribe(a, true);
        touch.subscribe(b, false);
        touch.claim_primary(a);
        log.borrow_mut().clear();

        touch.unsubscribe(a);
        assert!(!touch.is_primary_occupied());
        assert!(!touch.is_subscribed(a));
        assert_eq!(*log.borrow(), vec!["a.lose", "b.holder(none)"]);
    }

    #[test]
    fn test_resign_keeps_subscription() {
        let (scene, touch) = setup();
        let log: Log = Rc::default();
        let a = scene.spawn(logging_handlers("a", &log));
        let b = scene.spawn(logging_handlers("b", &log));
        touch.subscribe(a, true);
        touch.subscribe(b, true);
        touch.claim_primary(a);
        log.borrow_mut().clear();

        touch.resign_primary(b);
        assert_eq!(touch.primary(), Some(a), "only the owner can resign");

        touch.resign_primary(a);
        assert!(touch.is_subscribed(a));
        assert_eq!(touch.primary(), None);
        assert_eq!(*log.borrow(), vec!["a.lose", "b.holder(none)"]);
    }

    #[test]
    fn test_loss_broadcast_stops_when_reclaimed() {
        let (scene, touch) = setup();
        let log: Log = Rc::default();
        let a = scene.spawn(logging_handlers("a", &log));
        let b_log = log.clone();
        let b = scene.spawn(TouchHandlers::new().on_holder_changed(move |ctx, holder| {
            b_log.borrow_mut().push("b.holder".into());
            if holder.is_none() {
                ctx.claim_primary();
            }
        }));
        let c = scene.spawn(logging_handlers("c", &log));
        touch.subscribe(a, true);
        touch.subscribe(b, true);
        touch.subscribe(c, true);
        touch.claim_primary(a);
        log.borrow_mut().clear();

        touch.unsubscribe(a);
        assert_eq!(touch.primary(), Some(b));
        // c hears about b's claim only, never the stale "none"
        assert_eq!(
            *log.borrow(),
            vec!["a.lose", "b.holder", "c.holder(owner)"]
        );
    }

    #[test]
    fn test_claim_aborts_when_holder_changes_mid_broadcast() {
        let (scene, touch) = setup();
        let b = scene.spawn_empty();
        let a = scene.spawn(TouchHandlers::new().on_holder_changed(|ctx, holder| {
            if let Some(holder) = holder {
                ctx.touch().resign_primary(holder);
            }
        }));
        touch.subscribe(a, true);
        touch.subscribe(b, true);

        assert!(!touch.claim_primary(b));
        assert_eq!(touch.primary(), None);
    }

    #[test]
    fn test_terminal_fan_out_primary_first() {
        let (scene, touch) = setup();
        let log: Log = Rc::default();
        let a = scene.spawn(logging_handlers("a", &log));
        let b = scene.spawn(logging_handlers("b", &log));
        touch.subscribe(a, false);
        touch.subscribe(b, true);
        touch.claim_primary(b);
        log.borrow_mut().clear();

        touch.update_with_event(&TouchEvent::up(7, 3.0, 4.0, GameTime::from_millis(5)));
        touch.process_up();

        assert_eq!(*log.borrow(), vec!["b.up", "a.up"]);
        assert!(touch.subscribers().is_empty());
        assert_eq!(touch.lifecycle(), TouchLifecycle::Ended);
    }

    #[test]
    fn test_update_with_event() {
        let (_, touch) = setup();
        touch.update_with_event(&TouchEvent::move_to(7, 5.0, 6.0, GameTime::from_millis(10)));
        assert_eq!(touch.last(), TouchPoint::new(1.0, 1.0, GameTime::ZERO));
        assert_eq!(touch.current(), TouchPoint::new(5.0, 6.0, GameTime::from_millis(10)));
        assert!(touch.is_alive());

        let mut stale = TouchEvent::new(TouchEventKind::Move, 7, 99.0, 99.0, GameTime::from_millis(20));
        stale.has_position_update = false;
        touch.update_with_event(&stale);
        assert_eq!(touch.current(), TouchPoint::new(5.0, 6.0, GameTime::from_millis(20)));

        touch.update_virtual_change_time(GameTime::from_millis(30));
        assert_eq!(touch.current().time, GameTime::from_millis(30));
        assert_eq!(touch.start(), TouchPoint::new(1.0, 1.0, GameTime::ZERO));

        touch.update_with_event(&TouchEvent::cancel(7, GameTime::from_millis(40)));
        assert!(touch.is_ended());
        assert_eq!(touch.current().x, 5.0);
    }
}
