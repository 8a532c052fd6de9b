//! Newton-Raphson driver (component C).
//!
//! Iterates: evaluate residuals, assemble the Jacobian, solve the linearized
//! system by least squares, apply the full step. Detects convergence,
//! degenerate equations, and (on non-convergence) distinguishes an
//! over-constrained system from a merely unsolvable one by inspecting the
//! rank of the final Jacobian.

use nalgebra::{DMatrix, DVector, SVD};
use thiserror::Error;

use crate::constraint::{Constraint, ConstraintId};
use crate::element::ElementMap;
use crate::equation::{build_equations, Equation};
use crate::variables::VariableRegistry;

/// Maximum residual magnitude, at any equation, accepted as "solved".
pub const TOLERANCE: f64 = 1e-6;

/// Iteration budget for the Newton-Raphson loop.
pub const MAX_ITERATIONS: usize = 50;

/// The coarse classification of a failed solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The equation system has no exact solution: some equations are
    /// linearly dependent on others (rank-deficient Jacobian) and the
    /// residual they jointly express cannot be driven to zero.
    OverConstrained,
    /// Iteration limit reached, or a numerical singularity (e.g. a
    /// zero-length line under a `length` constraint) prevented progress.
    Unsolvable,
}

/// A failed [`solve`], carrying enough detail for a caller to identify and
/// roll back the offending constraints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// See [`ErrorKind::OverConstrained`].
    #[error("{message}")]
    OverConstrained {
        /// Every constraint id that participated in the failing system.
        conflicting_constraints: Vec<ConstraintId>,
        /// Human-readable explanation, not meant to be parsed.
        message: String,
    },
    /// See [`ErrorKind::Unsolvable`].
    #[error("{message}")]
    Unsolvable {
        /// Every constraint id that participated in the failing system.
        conflicting_constraints: Vec<ConstraintId>,
        /// Human-readable explanation, not meant to be parsed.
        message: String,
    },
}

impl SolveError {
    /// The coarse classification of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolveError::OverConstrained { .. } => ErrorKind::OverConstrained,
            SolveError::Unsolvable { .. } => ErrorKind::Unsolvable,
        }
    }

    /// Constraint ids that participated in the failing equation system.
    pub fn conflicting_constraints(&self) -> &[ConstraintId] {
        match self {
            SolveError::OverConstrained { conflicting_constraints, .. }
            | SolveError::Unsolvable { conflicting_constraints, .. } => conflicting_constraints,
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        match self {
            SolveError::OverConstrained { message, .. } | SolveError::Unsolvable { message, .. } => message,
        }
    }
}

/// A successful [`solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// Updated coordinates for every element present in the input, in the
    /// same shape; elements the constraint set never touched are returned
    /// verbatim.
    pub updated_elements: ElementMap,
    /// Number of Newton-Raphson iterations performed. `0` means the input
    /// was already satisfied (or there were no constraints to satisfy).
    pub iterations: usize,
}

/// Solve `constraints` over `elements`, returning updated coordinates or a
/// structured failure.
///
/// This is a pure function: it performs no I/O, holds no state across
/// calls, and is safe to invoke concurrently from independent threads on
/// independent inputs.
///
/// # Examples
///
/// ```
/// use sketch_solver::{solve, Constraint, ElementMap, SketchElement};
///
/// let mut elements = ElementMap::new();
/// elements.insert("line1".to_string(), SketchElement::new(0.0, 0.0, 10.0, 5.0));
///
/// let constraints = vec![
///     Constraint::horizontal("c1", "line1"),
///     Constraint::length("c2", "line1", 15.0),
/// ];
///
/// let outcome = solve(&constraints, &elements).unwrap();
/// let line1 = &outcome.updated_elements["line1"];
/// assert!((line1.y2 - line1.y1).abs() < 1e-6);
/// assert!((line1.length() - 15.0).abs() < 1e-6);
/// ```
pub fn solve(constraints: &[Constraint], elements: &ElementMap) -> Result<SolveOutcome, SolveError> {
    let referenced_ids: Vec<_> = constraints
        .iter()
        .filter(|c| c.has_valid_arity())
        .flat_map(|c| c.element_ids.iter())
        .filter(|id| elements.contains_key(*id))
        .cloned()
        .collect();
    let registry = VariableRegistry::build(&referenced_ids);
    let equations = build_equations(constraints, &registry);

    let referenced: ElementMap = elements
        .iter()
        .filter(|(id, _)| registry.field_index(id, "x1").is_some())
        .map(|(id, e)| (id.clone(), *e))
        .collect();

    let mut v = registry.assign_to_vector(&referenced);

    if max_abs_residual(&equations, &v) <= TOLERANCE {
        return Ok(finish(&registry, &v, elements, &referenced, 0));
    }

    let n_vars = registry.len();
    let mut last_jacobian: Option<DMatrix<f64>> = None;
    let mut last_residual_norm = f64::INFINITY;

    for iteration in 1..=MAX_ITERATIONS {
        if let Some(eq) = equations
            .iter()
            .find(|eq| eq.is_degenerate(&v) && eq.residual(&v).abs() > TOLERANCE)
        {
            return Err(SolveError::Unsolvable {
                conflicting_constraints: vec![eq.constraint_id().clone()],
                message: "zero-length line prevents a length constraint from making progress"
                    .to_string(),
            });
        }

        let r = residual_vector(&equations, &v);
        let j = jacobian_matrix(&equations, &v, n_vars);

        let delta = match least_squares_step(&j, &r) {
            Some(delta) => delta,
            None => {
                return Err(SolveError::Unsolvable {
                    conflicting_constraints: conflicting_ids(&equations),
                    message: "linear system became singular during solving".to_string(),
                });
            }
        };

        for k in 0..n_vars {
            v[k] -= delta[k];
        }

        let r_new = residual_vector(&equations, &v);
        last_residual_norm = max_abs(&r_new);
        last_jacobian = Some(j);

        if last_residual_norm <= TOLERANCE {
            return Ok(finish(&registry, &v, elements, &referenced, iteration));
        }
    }

    let rank = last_jacobian
        .map(|j| numerical_rank(&j))
        .unwrap_or(0);
    let kind = if rank < equations.len() {
        ErrorKind::OverConstrained
    } else {
        ErrorKind::Unsolvable
    };
    let conflicting = conflicting_ids(&equations);
    Err(match kind {
        ErrorKind::OverConstrained => SolveError::OverConstrained {
            conflicting_constraints: conflicting,
            message: format!(
                "constraints are over-constrained: {} equations collapse to rank {}",
                equations.len(),
                rank
            ),
        },
        ErrorKind::Unsolvable => SolveError::Unsolvable {
            conflicting_constraints: conflicting,
            message: format!(
                "failed to converge within {} iterations (residual {:.3e})",
                MAX_ITERATIONS, last_residual_norm
            ),
        },
    })
}

/// Check whether `candidate`, appended to `existing_constraints`, would
/// solve successfully.
///
/// Returns `(true, None)` if the augmented system solves; otherwise
/// `(false, Some(message))` suitable for direct display to a user. Does not
/// persist anything; the caller re-invokes [`solve`] itself to do that.
pub fn validate_constraint(
    candidate: &Constraint,
    existing_constraints: &[Constraint],
    elements: &ElementMap,
) -> (bool, Option<String>) {
    let mut combined = existing_constraints.to_vec();
    combined.push(candidate.clone());
    match solve(&combined, elements) {
        Ok(_) => (true, None),
        Err(err) => (false, Some(err.message().to_string())),
    }
}

fn finish(
    registry: &VariableRegistry,
    v: &[f64],
    elements: &ElementMap,
    referenced: &ElementMap,
    iterations: usize,
) -> SolveOutcome {
    let mut updated_elements = elements.clone();
    for (id, e) in registry.vector_to_elements(v, referenced, referenced) {
        updated_elements.insert(id, e);
    }
    SolveOutcome { updated_elements, iterations }
}

fn residual_vector(equations: &[Equation], v: &[f64]) -> Vec<f64> {
    equations.iter().map(|e| e.residual(v)).collect()
}

fn max_abs_residual(equations: &[Equation], v: &[f64]) -> f64 {
    max_abs(&residual_vector(equations, v))
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

fn jacobian_matrix(equations: &[Equation], v: &[f64], n_vars: usize) -> DMatrix<f64> {
    let mut j = DMatrix::zeros(equations.len().max(1), n_vars.max(1));
    for (i, eq) in equations.iter().enumerate() {
        let mut row = vec![0.0; n_vars];
        eq.accumulate_jacobian_row(v, &mut row);
        for (k, value) in row.into_iter().enumerate() {
            j[(i, k)] = value;
        }
    }
    j
}

/// Solve `J·δ = r` for the minimum-norm least-squares `δ`, using a
/// rank-revealing SVD. Returns `None` when the decomposition cannot produce
/// a solution (numerically singular with an inconsistent right-hand side).
fn least_squares_step(j: &DMatrix<f64>, r: &[f64]) -> Option<Vec<f64>> {
    let rhs = DVector::from_column_slice(r);
    let svd = SVD::new(j.clone(), true, true);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let eps = max_sv * (j.nrows().max(j.ncols()) as f64) * f64::EPSILON;
    svd.solve(&rhs, eps).ok().map(|delta| delta.iter().cloned().collect())
}

/// Numerical rank of a Jacobian, via the largest-singular-value threshold
/// convention used throughout this corpus's least-squares code.
fn numerical_rank(j: &DMatrix<f64>) -> usize {
    let svd = SVD::new(j.clone(), false, false);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let threshold = max_sv * (j.nrows().max(j.ncols()) as f64) * f64::EPSILON;
    svd.singular_values.iter().filter(|&&s| s > threshold).count()
}

fn conflicting_ids(equations: &[Equation]) -> Vec<ConstraintId> {
    let mut ids = Vec::new();
    for eq in equations {
        let id = eq.constraint_id();
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::SketchElement;

    fn elements_with(pairs: &[(&str, SketchElement)]) -> ElementMap {
        pairs.iter().map(|(id, e)| (id.to_string(), *e)).collect()
    }

    #[test]
    fn empty_constraints_returns_input_unchanged() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 0.0))]);
        let outcome = solve(&[], &elements).unwrap();
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.updated_elements, elements);
    }

    #[test]
    fn already_satisfied_returns_zero_iterations() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 0.0))]);
        let constraints = vec![Constraint::length("c1", "line1", 10.0)];
        let outcome = solve(&constraints, &elements).unwrap();
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn length_resize_converges() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 0.0))]);
        let constraints = vec![Constraint::length("c1", "line1", 20.0)];
        let outcome = solve(&constraints, &elements).unwrap();
        assert!(outcome.iterations >= 1);
        let line1 = &outcome.updated_elements["line1"];
        assert!((line1.length() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn horizontalize_converges() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 5.0))]);
        let constraints = vec![Constraint::horizontal("c1", "line1")];
        let outcome = solve(&constraints, &elements).unwrap();
        let line1 = &outcome.updated_elements["line1"];
        assert!((line1.y2 - line1.y1).abs() <= 1e-6);
    }

    #[test]
    fn over_constrained_length_pair_fails() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 0.0))]);
        let constraints = vec![
            Constraint::length("c1", "line1", 10.0),
            Constraint::length("c2", "line1", 20.0),
        ];
        let err = solve(&constraints, &elements).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OverConstrained | ErrorKind::Unsolvable));
        assert!(err.conflicting_constraints().contains(&"c1".to_string()));
        assert!(err.conflicting_constraints().contains(&"c2".to_string()));
    }

    #[test]
    fn zero_length_line_is_unsolvable() {
        let elements = elements_with(&[("line1", SketchElement::new(1.0, 1.0, 1.0, 1.0))]);
        let constraints = vec![Constraint::length("c1", "line1", 5.0)];
        let err = solve(&constraints, &elements).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsolvable);
        assert_eq!(err.conflicting_constraints(), &["c1".to_string()]);
    }

    #[test]
    fn missing_element_is_skipped_not_fatal() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 0.0))]);
        let constraints = vec![Constraint::length("ghost", "nonexistent", 5.0)];
        let outcome = solve(&constraints, &elements).unwrap();
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.updated_elements, elements);
    }

    #[test]
    fn validate_constraint_detects_conflict() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 0.0))]);
        let existing = vec![Constraint::length("c1", "line1", 10.0)];
        let candidate = Constraint::length("c2", "line1", 20.0);
        let (ok, message) = validate_constraint(&candidate, &existing, &elements);
        assert!(!ok);
        assert!(message.is_some());
    }

    #[test]
    fn validate_constraint_accepts_compatible_addition() {
        let elements = elements_with(&[("line1", SketchElement::new(0.0, 0.0, 10.0, 5.0))]);
        let existing = vec![Constraint::horizontal("c1", "line1")];
        let candidate = Constraint::length("c2", "line1", 15.0);
        let (ok, message) = validate_constraint(&candidate, &existing, &elements);
        assert!(ok);
        assert!(message.is_none());
    }

    #[test]
    fn long_coincidence_chain_converges_within_budget() {
        let mut elements = ElementMap::new();
        let n = 22;
        for i in 0..n {
            let x = i as f64;
            elements.insert(format!("line{i}"), SketchElement::new(x, 0.0, x + 1.0, (i % 3) as f64));
        }
        let mut constraints = Vec::new();
        for i in 0..n - 1 {
            constraints.push(Constraint::coincident(
                format!("c{i}"),
                format!("line{i}"),
                crate::element::EndpointIndex::End,
                format!("line{}", i + 1),
                crate::element::EndpointIndex::Start,
            ));
        }
        let outcome = solve(&constraints, &elements).expect("chain should converge");
        assert!(outcome.iterations <= MAX_ITERATIONS);
        for i in 0..n - 1 {
            let a = &outcome.updated_elements[&format!("line{i}")];
            let b = &outcome.updated_elements[&format!("line{}", i + 1)];
            assert!((a.x2 - b.x1).abs() < 1e-5);
            assert!((a.y2 - b.y1).abs() < 1e-5);
        }
    }
}
