//! Inference detector (component D).
//!
//! Given a newly drawn line and the set of other lines already in the
//! sketch, proposes candidate constraints within angle/distance thresholds.
//! Read-only: nothing here ever mutates a constraint list. Promotion to a
//! real constraint always flows back through [`crate::solver::solve`] or
//! [`crate::solver::validate_constraint`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintKind;
use crate::element::{ElementId, ElementMap, EndpointIndex, SketchElement};

/// Angle threshold for horizontal/vertical/perpendicular/parallel
/// inference: 2 degrees.
const TAU_ANGLE: f64 = 2.0 * PI / 180.0;

/// Distance threshold for coincident-endpoint inference, in millimetres.
const TAU_DIST: f64 = 0.5;

/// Below this endpoint distance, the two points are already exactly
/// coincident and not worth suggesting as a new constraint.
const EPSILON_DIST: f64 = 1e-4;

/// A proposed constraint the caller may display as a "ghost" and, if
/// confirmed, submit through [`crate::solver::solve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The kind of constraint this candidate would become.
    pub kind: ConstraintKind,
    /// The element(s) the candidate constraint would reference.
    pub element_ids: Vec<ElementId>,
    /// How confident the detector is, in `[0, 1]`. `1.0` means the geometry
    /// is already exactly at the ideal; `0.0` means it is right at the
    /// threshold boundary.
    pub confidence: f64,
}

/// Propose candidate constraints for `new_line` against every line in
/// `other_lines`.
///
/// `new_line_id` and `sketch_id` are caller-side context, not used by the
/// geometric checks themselves; `sketch_id` is accepted to match this
/// operation's public contract and is otherwise unused here (candidates are
/// scoped to whatever set of `other_lines` the caller passes in).
pub fn detect_inferred_constraints(
    new_line_id: &ElementId,
    new_line: &SketchElement,
    other_lines: &ElementMap,
    _sketch_id: &str,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let angle = line_angle(new_line);

    if let Some(confidence) = axis_confidence(angle, 0.0) {
        candidates.push(Candidate {
            kind: ConstraintKind::Horizontal,
            element_ids: vec![new_line_id.clone()],
            confidence,
        });
    }
    if let Some(confidence) = axis_confidence(angle, PI / 2.0) {
        candidates.push(Candidate {
            kind: ConstraintKind::Vertical,
            element_ids: vec![new_line_id.clone()],
            confidence,
        });
    }

    for (other_id, other_line) in other_lines {
        if other_id == new_line_id {
            continue;
        }
        let other_angle = line_angle(other_line);
        let diff = undirected_angle_diff(angle, other_angle);

        if let Some(confidence) = threshold_confidence(diff, TAU_ANGLE) {
            candidates.push(Candidate {
                kind: ConstraintKind::Parallel,
                element_ids: vec![new_line_id.clone(), other_id.clone()],
                confidence,
            });
        }
        if let Some(confidence) = threshold_confidence((diff - PI / 2.0).abs(), TAU_ANGLE) {
            candidates.push(Candidate {
                kind: ConstraintKind::Perpendicular,
                element_ids: vec![new_line_id.clone(), other_id.clone()],
                confidence,
            });
        }

        for new_point in [EndpointIndex::Start, EndpointIndex::End] {
            for other_point in [EndpointIndex::Start, EndpointIndex::End] {
                let (ax, ay) = new_line.endpoint(new_point);
                let (bx, by) = other_line.endpoint(other_point);
                let dist = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
                if dist > EPSILON_DIST && dist < TAU_DIST {
                    candidates.push(Candidate {
                        kind: ConstraintKind::Coincident {
                            point_a: new_point,
                            point_b: other_point,
                        },
                        element_ids: vec![new_line_id.clone(), other_id.clone()],
                        confidence: clamp01(1.0 - dist / TAU_DIST),
                    });
                }
            }
        }
    }

    candidates
}

fn line_angle(line: &SketchElement) -> f64 {
    (line.y2 - line.y1).atan2(line.x2 - line.x1)
}

/// Confidence that `angle` lies within [`TAU_ANGLE`] of `target`, treating
/// `angle` as an undirected line orientation (so both `target` and
/// `target + π` count).
fn axis_confidence(angle: f64, target: f64) -> Option<f64> {
    threshold_confidence(undirected_angle_diff(angle, target), TAU_ANGLE)
}

fn threshold_confidence(distance_from_ideal: f64, threshold: f64) -> Option<f64> {
    if distance_from_ideal < threshold {
        Some(clamp01(1.0 - distance_from_ideal / threshold))
    } else {
        None
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Minimal separation between two angles under the undirected-line
/// equivalence `θ ~ θ + π`, folded into `[0, π/2]`.
fn undirected_angle_diff(a: f64, b: f64) -> f64 {
    let d = (normalize_mod_pi(a) - normalize_mod_pi(b)).abs();
    d.min(PI - d)
}

fn normalize_mod_pi(angle: f64) -> f64 {
    angle.rem_euclid(PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> SketchElement {
        SketchElement::new(x1, y1, x2, y2)
    }

    #[test]
    fn horizontal_candidate_within_threshold() {
        let new_line = line(0.0, 0.0, 10.0, 10.0 * (1.9_f64.to_radians()).tan());
        let others = ElementMap::new();
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");
        assert!(candidates.iter().any(|c| matches!(c.kind, ConstraintKind::Horizontal) && c.confidence > 0.0));
    }

    #[test]
    fn horizontal_candidate_excluded_past_threshold() {
        let new_line = line(0.0, 0.0, 10.0, 10.0 * (2.1_f64.to_radians()).tan());
        let others = ElementMap::new();
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");
        assert!(!candidates.iter().any(|c| matches!(c.kind, ConstraintKind::Horizontal)));
    }

    #[test]
    fn vertical_candidate_for_near_vertical_line() {
        let new_line = line(0.0, 0.0, 0.1, 10.0);
        let others = ElementMap::new();
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");
        assert!(candidates.iter().any(|c| matches!(c.kind, ConstraintKind::Vertical)));
    }

    #[test]
    fn parallel_and_perpendicular_candidates() {
        let new_line = line(0.0, 0.0, 10.0, 0.0);
        let mut others = ElementMap::new();
        others.insert("para".to_string(), line(0.0, 5.0, 10.0, 5.0));
        others.insert("perp".to_string(), line(3.0, 0.0, 3.0, 10.0));
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");

        let para = candidates
            .iter()
            .find(|c| c.element_ids.contains(&"para".to_string()) && matches!(c.kind, ConstraintKind::Parallel));
        assert!(para.is_some());
        assert_abs_diff_eq!(para.unwrap().confidence, 1.0, epsilon = 1e-9);

        let perp = candidates
            .iter()
            .find(|c| c.element_ids.contains(&"perp".to_string()) && matches!(c.kind, ConstraintKind::Perpendicular));
        assert!(perp.is_some());
        assert_abs_diff_eq!(perp.unwrap().confidence, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn coincident_candidate_within_distance_band() {
        let new_line = line(10.2, 0.0, 20.0, 0.0);
        let mut others = ElementMap::new();
        others.insert("other".to_string(), line(0.0, 0.0, 10.0, 0.0));
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");
        assert!(candidates
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Coincident { .. })));
    }

    #[test]
    fn exact_overlap_is_not_a_coincident_candidate() {
        let new_line = line(10.0, 0.0, 20.0, 0.0);
        let mut others = ElementMap::new();
        others.insert("other".to_string(), line(0.0, 0.0, 10.0, 0.0));
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");
        assert!(!candidates
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Coincident { .. })));
    }

    #[test]
    fn far_endpoint_is_not_a_coincident_candidate() {
        let new_line = line(100.0, 100.0, 120.0, 120.0);
        let mut others = ElementMap::new();
        others.insert("other".to_string(), line(0.0, 0.0, 10.0, 0.0));
        let candidates = detect_inferred_constraints(&"new".to_string(), &new_line, &others, "sketch1");
        assert!(!candidates
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Coincident { .. })));
    }
}
