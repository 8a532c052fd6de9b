//! Constraint records: the immutable relations the solver enforces.

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, EndpointIndex};

/// Stable identifier for a [`Constraint`], assigned by the caller.
pub type ConstraintId = String;

/// The six constraint types this version of the solver understands.
///
/// Curves beyond line segments (circle/arc centers and radii) are
/// constrained only by length and endpoint coincidence in this version;
/// tangent, concentric, and equal-radius constraints are not represented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ConstraintKind {
    /// The referenced element's length equals a target value, in millimetres.
    Length {
        /// Target length. Strictly positive; enforced at the API boundary,
        /// not by this crate.
        value: f64,
    },
    /// The referenced element's two endpoints share the same y coordinate.
    Horizontal,
    /// The referenced element's two endpoints share the same x coordinate.
    Vertical,
    /// A specific endpoint of one element coincides with a specific endpoint
    /// of another.
    Coincident {
        /// Endpoint of the first referenced element.
        point_a: EndpointIndex,
        /// Endpoint of the second referenced element.
        point_b: EndpointIndex,
    },
    /// Two referenced elements' direction vectors are orthogonal.
    Perpendicular,
    /// Two referenced elements' direction vectors are collinear.
    Parallel,
}

impl ConstraintKind {
    /// Number of elements a constraint of this kind must reference.
    pub fn arity(&self) -> usize {
        match self {
            ConstraintKind::Length { .. }
            | ConstraintKind::Horizontal
            | ConstraintKind::Vertical => 1,
            ConstraintKind::Coincident { .. }
            | ConstraintKind::Perpendicular
            | ConstraintKind::Parallel => 2,
        }
    }
}

/// An immutable geometric relation between the endpoints of one or two
/// [`SketchElement`](crate::element::SketchElement)s.
///
/// `Constraint` carries exactly the fields the solver consumes. The broader
/// sketch model a caller persists may additionally track `satisfied`,
/// `inferred`, and `confirmed` provenance flags; those are outside the
/// solver's remit (it is stateless across calls, see the crate-level
/// concurrency notes) and are not part of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Unique identifier within the sketch this constraint belongs to.
    pub id: ConstraintId,
    /// The relation this constraint enforces.
    pub kind: ConstraintKind,
    /// The one or two elements this constraint refers to, in order.
    pub element_ids: Vec<ElementId>,
}

impl Constraint {
    /// Build a `length` constraint on a single element.
    pub fn length(id: impl Into<ConstraintId>, element_id: impl Into<ElementId>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: ConstraintKind::Length { value },
            element_ids: vec![element_id.into()],
        }
    }

    /// Build a `horizontal` constraint on a single element.
    pub fn horizontal(id: impl Into<ConstraintId>, element_id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            kind: ConstraintKind::Horizontal,
            element_ids: vec![element_id.into()],
        }
    }

    /// Build a `vertical` constraint on a single element.
    pub fn vertical(id: impl Into<ConstraintId>, element_id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            kind: ConstraintKind::Vertical,
            element_ids: vec![element_id.into()],
        }
    }

    /// Build a `coincident` constraint between an endpoint of each of two
    /// elements.
    pub fn coincident(
        id: impl Into<ConstraintId>,
        element_a: impl Into<ElementId>,
        point_a: EndpointIndex,
        element_b: impl Into<ElementId>,
        point_b: EndpointIndex,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ConstraintKind::Coincident { point_a, point_b },
            element_ids: vec![element_a.into(), element_b.into()],
        }
    }

    /// Build a `perpendicular` constraint between two elements.
    pub fn perpendicular(
        id: impl Into<ConstraintId>,
        element_a: impl Into<ElementId>,
        element_b: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ConstraintKind::Perpendicular,
            element_ids: vec![element_a.into(), element_b.into()],
        }
    }

    /// Build a `parallel` constraint between two elements.
    pub fn parallel(
        id: impl Into<ConstraintId>,
        element_a: impl Into<ElementId>,
        element_b: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ConstraintKind::Parallel,
            element_ids: vec![element_a.into(), element_b.into()],
        }
    }

    /// Whether `element_ids` has the length this constraint's kind expects.
    pub fn has_valid_arity(&self) -> bool {
        self.element_ids.len() == self.kind.arity()
    }
}
