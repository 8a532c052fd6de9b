#![warn(missing_docs)]

//! A parametric 2D sketch constraint solver.
//!
//! The crate accepts a set of [`SketchElement`]s (line segments identified
//! by endpoint coordinates) together with a set of [`Constraint`]s between
//! them, and returns either updated coordinates that simultaneously satisfy
//! every constraint within [`TOLERANCE`], or a structured [`SolveError`]
//! identifying the offending constraints.
//!
//! The pipeline has four parts, built leaves-first:
//!
//! - [`equation`] — for each constraint type, the scalar residual and exact
//!   analytic Jacobian.
//! - [`variables`] — the named-variable ↔ dense-vector bridge the solver's
//!   iteration loop runs over.
//! - [`solver`] — the Newton-Raphson driver: [`solve`] and
//!   [`validate_constraint`].
//! - [`inference`] — [`detect_inferred_constraints`], which proposes ghost
//!   constraints for a newly drawn line but never mutates anything.
//!
//! `solve` is a pure function: no I/O, no state retained across calls, safe
//! to run concurrently on independent inputs.
//!
//! # Example
//!
//! ```
//! use sketch_solver::{solve, Constraint, ElementMap, SketchElement};
//!
//! let mut elements = ElementMap::new();
//! elements.insert("line1".to_string(), SketchElement::new(0.0, 0.0, 10.0, 0.0));
//! elements.insert("line2".to_string(), SketchElement::new(5.0, 0.0, 10.0, 5.0));
//!
//! let constraints = vec![Constraint::perpendicular("c1", "line1", "line2")];
//!
//! let outcome = solve(&constraints, &elements).expect("should converge");
//! let l1 = &outcome.updated_elements["line1"];
//! let l2 = &outcome.updated_elements["line2"];
//! let dot = (l1.x2 - l1.x1) * (l2.x2 - l2.x1) + (l1.y2 - l1.y1) * (l2.y2 - l2.y1);
//! assert!(dot.abs() < 1e-2);
//! ```

mod constraint;
mod element;
mod equation;
mod inference;
mod solver;
mod variables;

pub use constraint::{Constraint, ConstraintId, ConstraintKind};
pub use element::{ElementId, ElementMap, EndpointIndex, SketchElement};
pub use inference::{detect_inferred_constraints, Candidate};
pub use solver::{solve, validate_constraint, ErrorKind, SolveError, SolveOutcome, MAX_ITERATIONS, TOLERANCE};
pub use variables::VariableRegistry;
