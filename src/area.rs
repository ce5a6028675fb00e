//! Area predicates consumed by hit testing.
//!
//! An area answers one question: does a point lie inside it? Shapes and
//! boolean combinators live with the scene graph; this crate only calls
//! [`Area::is_in_area`]. Any `Fn(Coord, Coord) -> bool` is an area.

use std::rc::Rc;

use crate::types::Coord;

/// Point-containment predicate.
pub trait Area {
    fn is_in_area(&self, x: Coord, y: Coord) -> bool;
}

impl<F> Area for F
where
    F: Fn(Coord, Coord) -> bool,
{
    fn is_in_area(&self, x: Coord, y: Coord) -> bool {
        self(x, y)
    }
}

/// Shared area handle, as returned by interaction capabilities.
pub type SharedArea = Rc<dyn Area>;

/// Wrap a closure as a [`SharedArea`].
pub fn area(f: impl Fn(Coord, Coord) -> bool + 'static) -> SharedArea {
    Rc::new(f)
}

/// Whether an optional area contains the point. A missing area never hits.
pub fn contains(area: Option<&SharedArea>, x: Coord, y: Coord) -> bool {
    area.is_some_and(|area| area.is_in_area(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_area() {
        let left_half = area(|x, _| x < 50.0);
        assert!(left_half.is_in_area(10.0, 999.0));
        assert!(!left_half.is_in_area(60.0, 0.0));
    }

    #[test]
    fn test_missing_area_never_hits() {
        assert!(!contains(None, 0.0, 0.0));
        let everywhere = area(|_, _| true);
        assert!(contains(Some(&everywhere), 0.0, 0.0));
    }
}
