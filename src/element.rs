//! Sketch elements: the line segments the solver mutates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable identifier for a [`SketchElement`], assigned by the caller.
pub type ElementId = String;

/// A line segment in the sketch's 2D plane, in millimetres.
///
/// The solver treats every element as a pair of endpoints `(x1, y1)` and
/// `(x2, y2)`; circles, arcs, and anything else the caller's sketch may hold
/// are outside this crate and pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchElement {
    /// X coordinate of the first endpoint.
    pub x1: f64,
    /// Y coordinate of the first endpoint.
    pub y1: f64,
    /// X coordinate of the second endpoint.
    pub x2: f64,
    /// Y coordinate of the second endpoint.
    pub y2: f64,
}

impl SketchElement {
    /// Build an element from explicit endpoint coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Euclidean length of the segment.
    pub fn length(&self) -> f64 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }

    /// Coordinates of the given endpoint.
    pub fn endpoint(&self, which: EndpointIndex) -> (f64, f64) {
        match which {
            EndpointIndex::Start => (self.x1, self.y1),
            EndpointIndex::End => (self.x2, self.y2),
        }
    }
}

/// Selects one of a line's two endpoints.
///
/// Used by `coincident` constraints, which reference a specific endpoint of
/// each of their two elements rather than the element as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointIndex {
    /// The `(x1, y1)` endpoint.
    Start,
    /// The `(x2, y2)` endpoint.
    End,
}

impl EndpointIndex {
    /// Variable-name field suffixes for this endpoint, in `(x, y)` order.
    pub(crate) fn field_names(self) -> (&'static str, &'static str) {
        match self {
            EndpointIndex::Start => ("x1", "y1"),
            EndpointIndex::End => ("x2", "y2"),
        }
    }
}

/// A caller-supplied mapping from element id to its current coordinates.
///
/// A `BTreeMap` keeps iteration order lexicographic by id, which matches the
/// canonical variable ordering the solver builds in [`crate::variables`] and
/// makes the data model's own iteration order deterministic for free.
pub type ElementMap = BTreeMap<ElementId, SketchElement>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_euclidean() {
        let e = SketchElement::new(0.0, 0.0, 3.0, 4.0);
        assert_eq!(e.length(), 5.0);
    }

    #[test]
    fn endpoint_selects_correct_pair() {
        let e = SketchElement::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(e.endpoint(EndpointIndex::Start), (1.0, 2.0));
        assert_eq!(e.endpoint(EndpointIndex::End), (3.0, 4.0));
    }

    #[test]
    fn field_names_match_naming_convention() {
        assert_eq!(EndpointIndex::Start.field_names(), ("x1", "y1"));
        assert_eq!(EndpointIndex::End.field_names(), ("x2", "y2"));
    }
}
