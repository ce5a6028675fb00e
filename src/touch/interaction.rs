//! Interaction capability - What an element does with touches.
//!
//! # API
//!
//! - [`TouchInteraction`] - areas plus eleven hooks, all defaulted
//! - [`TouchContext`] - passed to every hook: the touch, the receiving element
//!   and shortcuts for the subscription / primary protocol
//! - [`TouchHandlers`] - closure-based implementation with builder methods
//!
//! # Example
//!
//! ```ignore
//! use spark_touch::{area, TouchHandlers};
//!
//! // A button: subscribe on down, try to own the touch, fire on up
//! let button = TouchHandlers::new()
//!     .with_interaction_area(area(|x, y| x < 10.0 && y < 3.0))
//!     .on_down(|ctx, _point, covered_by_descendant| {
//!         if covered_by_descendant && ctx.touch().is_primary_occupied() {
//!             return;
//!         }
//!         ctx.subscribe(true);
//!         if !ctx.claim_primary() {
//!             ctx.unsubscribe();
//!         }
//!     })
//!     .on_up(|ctx, _point| {
//!         if ctx.is_own_primary() {
//!             println!("clicked");
//!         }
//!     });
//! let id = scene.spawn(button);
//! ```

use std::rc::Rc;

use crate::area::SharedArea;
use crate::engine::{ElementId, Scene};
use crate::touch::Touch;
use crate::types::{GameTime, TouchPoint};

// =============================================================================
// CONTEXT
// =============================================================================

/// The touch and the element a hook is being called for.
#[derive(Clone, Copy)]
pub struct TouchContext<'a> {
    touch: &'a Touch,
    element: ElementId,
}

impl<'a> TouchContext<'a> {
    pub fn new(touch: &'a Touch, element: ElementId) -> Self {
        Self { touch, element }
    }

    pub fn touch(&self) -> &'a Touch {
        self.touch
    }

    /// The element receiving the hook.
    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn scene(&self) -> &'a Scene {
        self.touch.scene()
    }

    /// Current touch position.
    pub fn point(&self) -> TouchPoint {
        self.touch.current()
    }

    pub fn subscribe(&self, is_strong: bool) {
        self.touch.subscribe(self.element, is_strong);
    }

    pub fn unsubscribe(&self) {
        self.touch.unsubscribe(self.element);
    }

    pub fn is_subscribed(&self) -> bool {
        self.touch.is_subscribed(self.element)
    }

    pub fn claim_primary(&self) -> bool {
        self.touch.claim_primary(self.element)
    }

    pub fn resign_primary(&self) {
        self.touch.resign_primary(self.element);
    }

    pub fn is_own_primary(&self) -> bool {
        self.touch.is_own_primary(self.element)
    }
}

// =============================================================================
// CAPABILITY
// =============================================================================

/// Touch behavior of one element.
///
/// Hooks run synchronously on the thread driving the negotiator. They may
/// freely mutate the scene and the touch through the context.
#[allow(unused_variables)]
pub trait TouchInteraction {
    /// Where the element receives touches. `None` never hits.
    fn interaction_area(&self) -> Option<SharedArea> {
        None
    }

    /// Where the element hides what is painted below it. `None` never covers.
    fn cover_area(&self) -> Option<SharedArea> {
        None
    }

    fn on_touch_down(&self, ctx: &TouchContext<'_>, point: TouchPoint, covered_by_descendant: bool) {}

    fn on_touch_in(
        &self,
        ctx: &TouchContext<'_>,
        point: TouchPoint,
        is_first_in: bool,
        covered_by_descendant: bool,
    ) {
    }

    fn on_touch_move(&self, ctx: &TouchContext<'_>, point: TouchPoint) {}

    fn on_touch_out(&self, ctx: &TouchContext<'_>, point: TouchPoint) {}

    fn on_touch_covered(&self, ctx: &TouchContext<'_>, point: TouchPoint) {}

    fn on_touch_cancel(&self, ctx: &TouchContext<'_>, time: GameTime) {}

    fn on_touch_up(&self, ctx: &TouchContext<'_>, point: TouchPoint) {}

    /// Asked when `stealer` claims a touch this element owns. Return `false` to refuse.
    fn on_primary_touch_steal(&self, ctx: &TouchContext<'_>, stealer: ElementId) -> bool {
        true
    }

    fn on_primary_touch_holder_changed(&self, ctx: &TouchContext<'_>, holder: Option<ElementId>) {}

    fn on_primary_touch_given(&self, ctx: &TouchContext<'_>) {}

    fn on_primary_touch_lose(&self, ctx: &TouchContext<'_>) {}
}

// =============================================================================
// CLOSURE BINDING
// =============================================================================

pub type DownHandler = Rc<dyn Fn(&TouchContext<'_>, TouchPoint, bool)>;
pub type InHandler = Rc<dyn Fn(&TouchContext<'_>, TouchPoint, bool, bool)>;
pub type PointHandler = Rc<dyn Fn(&TouchContext<'_>, TouchPoint)>;
pub type CancelHandler = Rc<dyn Fn(&TouchContext<'_>, GameTime)>;
pub type StealHandler = Rc<dyn Fn(&TouchContext<'_>, ElementId) -> bool>;
pub type HolderChangedHandler = Rc<dyn Fn(&TouchContext<'_>, Option<ElementId>)>;
pub type OwnershipHandler = Rc<dyn Fn(&TouchContext<'_>)>;

/// Touch behavior built from closures.
///
/// Uses `Rc<dyn Fn>` so handlers can be cloned into other handlers
/// (e.g. a steal guard that reuses the element's up handler).
#[derive(Default, Clone)]
pub struct TouchHandlers {
    pub interaction_area: Option<SharedArea>,
    pub cover_area: Option<SharedArea>,
    pub on_touch_down: Option<DownHandler>,
    pub on_touch_in: Option<InHandler>,
    pub on_touch_move: Option<PointHandler>,
    pub on_touch_out: Option<PointHandler>,
    pub on_touch_covered: Option<PointHandler>,
    pub on_touch_cancel: Option<CancelHandler>,
    pub on_touch_up: Option<PointHandler>,
    pub on_primary_touch_steal: Option<StealHandler>,
    pub on_primary_touch_holder_changed: Option<HolderChangedHandler>,
    pub on_primary_touch_given: Option<OwnershipHandler>,
    pub on_primary_touch_lose: Option<OwnershipHandler>,
}

impl TouchHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interaction_area(mut self, area: SharedArea) -> Self {
        self.interaction_area = Some(area);
        self
    }

    pub fn with_cover_area(mut self, area: SharedArea) -> Self {
        self.cover_area = Some(area);
        self
    }

    pub fn on_down(mut self, f: impl Fn(&TouchContext<'_>, TouchPoint, bool) + 'static) -> Self {
        self.on_touch_down = Some(Rc::new(f));
        self
    }

    /// `f(ctx, point, is_first_in, covered_by_descendant)`
    pub fn on_in(mut self, f: impl Fn(&TouchContext<'_>, TouchPoint, bool, bool) + 'static) -> Self {
        self.on_touch_in = Some(Rc::new(f));
        self
    }

    pub fn on_move(mut self, f: impl Fn(&TouchContext<'_>, TouchPoint) + 'static) -> Self {
        self.on_touch_move = Some(Rc::new(f));
        self
    }

    pub fn on_out(mut self, f: impl Fn(&TouchContext<'_>, TouchPoint) + 'static) -> Self {
        self.on_touch_out = Some(Rc::new(f));
        self
    }

    pub fn on_covered(mut self, f: impl Fn(&TouchContext<'_>, TouchPoint) + 'static) -> Self {
        self.on_touch_covered = Some(Rc::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl Fn(&TouchContext<'_>, GameTime) + 'static) -> Self {
        self.on_touch_cancel = Some(Rc::new(f));
        self
    }

    pub fn on_up(mut self, f: impl Fn(&TouchContext<'_>, TouchPoint) + 'static) -> Self {
        self.on_touch_up = Some(Rc::new(f));
        self
    }

    pub fn on_steal(mut self, f: impl Fn(&TouchContext<'_>, ElementId) -> bool + 'static) -> Self {
        self.on_primary_touch_steal = Some(Rc::new(f));
        self
    }

    pub fn on_holder_changed(
        mut self,
        f: impl Fn(&TouchContext<'_>, Option<ElementId>) + 'static,
    ) -> Self {
        self.on_primary_touch_holder_changed = Some(Rc::new(f));
        self
    }

    pub fn on_given(mut self, f: impl Fn(&TouchContext<'_>) + 'static) -> Self {
        self.on_primary_touch_given = Some(Rc::new(f));
        self
    }

    pub fn on_lose(mut self, f: impl Fn(&TouchContext<'_>) + 'static) -> Self {
        self.on_primary_touch_lose = Some(Rc::new(f));
        self
    }
}

impl TouchInteraction for TouchHandlers {
    fn interaction_area(&self) -> Option<SharedArea> {
        self.interaction_area.clone()
    }

    fn cover_area(&self) -> Option<SharedArea> {
        self.cover_area.clone()
    }

    fn on_touch_down(&self, ctx: &TouchContext<'_>, point: TouchPoint, covered_by_descendant: bool) {
        if let Some(handler) = &self.on_touch_down {
            handler(ctx, point, covered_by_descendant);
        }
    }

    fn on_touch_in(
        &self,
        ctx: &TouchContext<'_>,
        point: TouchPoint,
        is_first_in: bool,
        covered_by_descendant: bool,
    ) {
        if let Some(handler) = &self.on_touch_in {
            handler(ctx, point, is_first_in, covered_by_descendant);
        }
    }

    fn on_touch_move(&self, ctx: &TouchContext<'_>, point: TouchPoint) {
        if let Some(handler) = &self.on_touch_move {
            handler(ctx, point);
        }
    }

    fn on_touch_out(&self, ctx: &TouchContext<'_>, point: TouchPoint) {
        if let Some(handler) = &self.on_touch_out {
            handler(ctx, point);
        }
    }

    fn on_touch_covered(&self, ctx: &TouchContext<'_>, point: TouchPoint) {
        if let Some(handler) = &self.on_touch_covered {
            handler(ctx, point);
        }
    }

    fn on_touch_cancel(&self, ctx: &TouchContext<'_>, time: GameTime) {
        if let Some(handler) = &self.on_touch_cancel {
            handler(ctx, time);
        }
    }

    fn on_touch_up(&self, ctx: &TouchContext<'_>, point: TouchPoint) {
        if let Some(handler) = &self.on_touch_up {
            handler(ctx, point);
        }
    }

    fn on_primary_touch_steal(&self, ctx: &TouchContext<'_>, stealer: ElementId) -> bool {
        match &self.on_primary_touch_steal {
            Some(handler) => handler(ctx, stealer),
            None => true,
        }
    }

    fn on_primary_touch_holder_changed(&self, ctx: &TouchContext<'_>, holder: Option<ElementId>) {
        if let Some(handler) = &self.on_primary_touch_holder_changed {
            handler(ctx, holder);
        }
    }

    fn on_primary_touch_given(&self, ctx: &TouchContext<'_>) {
        if let Some(handler) = &self.on_primary_touch_given {
            handler(ctx);
        }
    }

    fn on_primary_touch_lose(&self, ctx: &TouchContext<'_>) {
        if let Some(handler) = &self.on_primary_touch_lose {
            handler(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::area;
    use std::cell::Cell;

    #[test]
    fn test_default_hooks() {
        struct Inert;
        impl TouchInteraction for Inert {}

        let scene = Scene::new();
        let element = scene.spawn(Inert);
        let touch = Touch::new(0, scene.clone(), 0.0, 0.0, GameTime::ZERO);
        let ctx = TouchContext::new(&touch, element);

        let inert = Inert;
        assert!(inert.interaction_area().is_none());
        assert!(inert.cover_area().is_none());
        assert!(inert.on_primary_touch_steal(&ctx, element));
    }

    #[test]
    fn test_handlers_forward_to_closures() {
        let scene = Scene::new();
        let touch = Touch::new(0, scene.clone(), 1.0, 2.0, GameTime::ZERO);

        let downs = Rc::new(Cell::new(0));
        let downs_in_handler = downs.clone();
        let handlers = TouchHandlers::new()
            .with_interaction_area(area(|_, _| true))
            .on_down(move |ctx, point, covered| {
                assert_eq!(point, ctx.point());
                assert!(!covered);
                downs_in_handler.set(downs_in_handler.get() + 1);
            })
            .on_steal(|_, _| false);

        let element = scene.spawn(handlers.clone());
        let ctx = TouchContext::new(&touch, element);

        handlers.on_touch_down(&ctx, touch.current(), false);
        assert_eq!(downs.get(), 1);
        assert!(!handlers.on_primary_touch_steal(&ctx, element));
        assert!(handlers.interaction_area().is_some());
        assert!(handlers.cover_area().is_none());
    }

    #[test]
    fn test_context_shortcuts() {
        let scene = Scene::new();
        let element = scene.spawn(TouchHandlers::new());
        let touch = Touch::new(0, scene.clone(), 0.0, 0.0, GameTime::ZERO);
        let ctx = TouchContext::new(&touch, element);

        assert!(!ctx.claim_primary(), "must subscribe first");
        ctx.subscribe(false);
        assert!(ctx.is_subscribed());
        assert!(ctx.claim_primary());
        assert!(ctx.is_own_primary());
        ctx.resign_primary();
        assert!(!ctx.is_own_primary());
        assert!(ctx.is_subscribed());
        ctx.unsubscribe();
        assert!(!ctx.is_subscribed());
        assert!(ctx.scene().ptr_eq(&scene));
    }
}
