//! Equation set (component A): residuals and analytic Jacobians.
//!
//! Each supported [`ConstraintKind`] contributes one scalar equation of the
//! form `f(v) = 0`, except `coincident`, which contributes two (x and y
//! separately). An `Equation` is a closed tagged variant over the six
//! residual shapes below; dispatch is a single match, not virtual calls, so
//! the complete set is known and exhaustive at compile time.
//!
//! Jacobians here are exact, hand-derived partial derivatives, not finite
//! differences: the driver (component C) needs quadratic convergence near
//! the solution, which a finite-difference Jacobian cannot reliably give at
//! the tolerances this crate targets.

use crate::constraint::{Constraint, ConstraintId, ConstraintKind};
use crate::variables::{LineVarIndex, PointVarIndex, VariableRegistry};

/// Below this segment length, a `length` equation's direction is considered
/// degenerate and its Jacobian row is the zero vector.
const DEGENERATE_LENGTH: f64 = 1e-10;

/// A single scalar equation derived from one constraint.
///
/// Carries the originating [`ConstraintId`] so a failed solve can report
/// which constraints participated, and the registry column indices of every
/// variable it touches, resolved once at construction time.
#[derive(Debug, Clone)]
pub enum Equation {
    /// `√(dx² + dy²) − L = 0`
    Length {
        constraint_id: ConstraintId,
        length: f64,
        idx: LineVarIndex,
    },
    /// `y2 − y1 = 0`
    Horizontal { constraint_id: ConstraintId, idx: LineVarIndex },
    /// `x2 − x1 = 0`
    Vertical { constraint_id: ConstraintId, idx: LineVarIndex },
    /// `a.x − b.x = 0`
    CoincidentX {
        constraint_id: ConstraintId,
        a: PointVarIndex,
        b: PointVarIndex,
    },
    /// `a.y − b.y = 0`
    CoincidentY {
        constraint_id: ConstraintId,
        a: PointVarIndex,
        b: PointVarIndex,
    },
    /// `dax·dbx + day·dby = 0`
    Perpendicular {
        constraint_id: ConstraintId,
        a: LineVarIndex,
        b: LineVarIndex,
    },
    /// `dax·dby − day·dbx = 0`
    Parallel {
        constraint_id: ConstraintId,
        a: LineVarIndex,
        b: LineVarIndex,
    },
}

impl Equation {
    /// The constraint this equation was derived from.
    pub fn constraint_id(&self) -> &ConstraintId {
        match self {
            Equation::Length { constraint_id, .. }
            | Equation::Horizontal { constraint_id, .. }
            | Equation::Vertical { constraint_id, .. }
            | Equation::CoincidentX { constraint_id, .. }
            | Equation::CoincidentY { constraint_id, .. }
            | Equation::Perpendicular { constraint_id, .. }
            | Equation::Parallel { constraint_id, .. } => constraint_id,
        }
    }

    /// Evaluate the residual `f(v)` at the given variable assignment.
    pub fn residual(&self, v: &[f64]) -> f64 {
        match self {
            Equation::Length { length, idx, .. } => {
                let (dx, dy) = (v[idx.x2] - v[idx.x1], v[idx.y2] - v[idx.y1]);
                (dx * dx + dy * dy).sqrt() - length
            }
            Equation::Horizontal { idx, .. } => v[idx.y2] - v[idx.y1],
            Equation::Vertical { idx, .. } => v[idx.x2] - v[idx.x1],
            Equation::CoincidentX { a, b, .. } => v[a.x] - v[b.x],
            Equation::CoincidentY { a, b, .. } => v[a.y] - v[b.y],
            Equation::Perpendicular { a, b, .. } => {
                let (dax, day) = (v[a.x2] - v[a.x1], v[a.y2] - v[a.y1]);
                let (dbx, dby) = (v[b.x2] - v[b.x1], v[b.y2] - v[b.y1]);
                dax * dbx + day * dby
            }
            Equation::Parallel { a, b, .. } => {
                let (dax, day) = (v[a.x2] - v[a.x1], v[a.y2] - v[a.y1]);
                let (dbx, dby) = (v[b.x2] - v[b.x1], v[b.y2] - v[b.y1]);
                dax * dby - day * dbx
            }
        }
    }

    /// Accumulate this equation's partial derivatives into `row`, a slice of
    /// length `n_vars` (one entry per registry column). Entries this
    /// equation doesn't touch are left unmodified; callers pass a
    /// zero-initialized row per equation.
    pub fn accumulate_jacobian_row(&self, v: &[f64], row: &mut [f64]) {
        match self {
            Equation::Length { idx, .. } => {
                let (dx, dy) = (v[idx.x2] - v[idx.x1], v[idx.y2] - v[idx.y1]);
                let r = (dx * dx + dy * dy).sqrt();
                if r < DEGENERATE_LENGTH {
                    return;
                }
                row[idx.x1] += -dx / r;
                row[idx.y1] += -dy / r;
                row[idx.x2] += dx / r;
                row[idx.y2] += dy / r;
            }
            Equation::Horizontal { idx, .. } => {
                row[idx.y1] += -1.0;
                row[idx.y2] += 1.0;
            }
            Equation::Vertical { idx, .. } => {
                row[idx.x1] += -1.0;
                row[idx.x2] += 1.0;
            }
            Equation::CoincidentX { a, b, .. } => {
                row[a.x] += 1.0;
                row[b.x] += -1.0;
            }
            Equation::CoincidentY { a, b, .. } => {
                row[a.y] += 1.0;
                row[b.y] += -1.0;
            }
            Equation::Perpendicular { a, b, .. } => {
                let (dax, day) = (v[a.x2] - v[a.x1], v[a.y2] - v[a.y1]);
                let (dbx, dby) = (v[b.x2] - v[b.x1], v[b.y2] - v[b.y1]);
                row[a.x1] += -dbx;
                row[a.x2] += dbx;
                row[a.y1] += -dby;
                row[a.y2] += dby;
                row[b.x1] += -dax;
                row[b.x2] += dax;
                row[b.y1] += -day;
                row[b.y2] += day;
            }
            Equation::Parallel { a, b, .. } => {
                let (dax, day) = (v[a.x2] - v[a.x1], v[a.y2] - v[a.y1]);
                let (dbx, dby) = (v[b.x2] - v[b.x1], v[b.y2] - v[b.y1]);
                row[a.x1] += -dby;
                row[a.x2] += dby;
                row[a.y1] += dbx;
                row[a.y2] += -dbx;
                row[b.x1] += day;
                row[b.x2] += -day;
                row[b.y1] += -dax;
                row[b.y2] += dax;
            }
        }
    }

    /// Whether this equation's direction is currently degenerate (only
    /// possible for `length` equations on a zero-length segment).
    pub fn is_degenerate(&self, v: &[f64]) -> bool {
        match self {
            Equation::Length { idx, .. } => {
                let (dx, dy) = (v[idx.x2] - v[idx.x1], v[idx.y2] - v[idx.y1]);
                (dx * dx + dy * dy).sqrt() < DEGENERATE_LENGTH
            }
            _ => false,
        }
    }
}

/// Build the equation list from a constraint list and a registry already
/// covering every element those constraints reference.
///
/// Constraints whose arity doesn't match their kind, or that reference an
/// element missing from `registry`, are silently skipped: they cannot
/// become part of the equation system (see the data model invariants).
pub fn build_equations(constraints: &[Constraint], registry: &VariableRegistry) -> Vec<Equation> {
    let mut equations = Vec::new();
    for c in constraints {
        if !c.has_valid_arity() {
            continue;
        }
        match &c.kind {
            ConstraintKind::Length { value } => {
                if let Some(idx) = registry.line_indices(&c.element_ids[0]) {
                    equations.push(Equation::Length {
                        constraint_id: c.id.clone(),
                        length: *value,
                        idx,
                    });
                }
            }
            ConstraintKind::Horizontal => {
                if let Some(idx) = registry.line_indices(&c.element_ids[0]) {
                    equations.push(Equation::Horizontal {
                        constraint_id: c.id.clone(),
                        idx,
                    });
                }
            }
            ConstraintKind::Vertical => {
                if let Some(idx) = registry.line_indices(&c.element_ids[0]) {
                    equations.push(Equation::Vertical {
                        constraint_id: c.id.clone(),
                        idx,
                    });
                }
            }
            ConstraintKind::Coincident { point_a, point_b } => {
                let a = registry.point_indices(&c.element_ids[0], *point_a);
                let b = registry.point_indices(&c.element_ids[1], *point_b);
                if let (Some(a), Some(b)) = (a, b) {
                    equations.push(Equation::CoincidentX {
                        constraint_id: c.id.clone(),
                        a,
                        b,
                    });
                    equations.push(Equation::CoincidentY {
                        constraint_id: c.id.clone(),
                        a,
                        b,
                    });
                }
            }
            ConstraintKind::Perpendicular => {
                let a = registry.line_indices(&c.element_ids[0]);
                let b = registry.line_indices(&c.element_ids[1]);
                if let (Some(a), Some(b)) = (a, b) {
                    equations.push(Equation::Perpendicular {
                        constraint_id: c.id.clone(),
                        a,
                        b,
                    });
                }
            }
            ConstraintKind::Parallel => {
                let a = registry.line_indices(&c.element_ids[0]);
                let b = registry.line_indices(&c.element_ids[1]);
                if let (Some(a), Some(b)) = (a, b) {
                    equations.push(Equation::Parallel {
                        constraint_id: c.id.clone(),
                        a,
                        b,
                    });
                }
            }
        }
    }
    equations
}
