//! Variable registry (component B): the named-variable ↔ dense-vector bridge.
//!
//! The solver's iteration loop is indexed purely by integer column; this
//! module is the only place that knows variable names. It is built once per
//! solve, at the top of [`crate::solver::solve`], and consulted by equation
//! construction (component A) to resolve each equation's variable columns.

use std::collections::BTreeMap;

use crate::element::{ElementId, ElementMap, EndpointIndex, SketchElement};

/// Maps `"{element_id}_{field}"` variable names to a dense column index, in
/// canonical (lexicographic) order.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    names: Vec<String>,
    index: BTreeMap<String, usize>,
}

impl VariableRegistry {
    /// Build a registry covering every endpoint coordinate of every element
    /// in `element_ids`, and no others.
    ///
    /// `element_ids` should be the set of elements actually referenced by
    /// the constraint list being solved; elements outside that set get no
    /// variables and are left untouched by [`Self::vector_to_elements`].
    pub fn build<'a>(element_ids: impl IntoIterator<Item = &'a ElementId>) -> Self {
        let mut names: Vec<String> = Vec::new();
        for id in element_ids {
            for field in ["x1", "y1", "x2", "y2"] {
                names.push(format!("{id}_{field}"));
            }
        }
        names.sort();
        names.dedup();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Number of variables (columns) in the registry.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry covers no variables.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column index of a named variable, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column index of a specific field of a specific element.
    pub fn field_index(&self, element_id: &str, field: &str) -> Option<usize> {
        self.index_of(&format!("{element_id}_{field}"))
    }

    /// Column indices of both endpoints of an element, as `(x1, y1, x2, y2)`.
    pub(crate) fn line_indices(&self, element_id: &str) -> Option<LineVarIndex> {
        Some(LineVarIndex {
            x1: self.field_index(element_id, "x1")?,
            y1: self.field_index(element_id, "y1")?,
            x2: self.field_index(element_id, "x2")?,
            y2: self.field_index(element_id, "y2")?,
        })
    }

    /// Column indices of one endpoint of an element, as `(x, y)`.
    pub(crate) fn point_indices(&self, element_id: &str, which: EndpointIndex) -> Option<PointVarIndex> {
        let (fx, fy) = which.field_names();
        Some(PointVarIndex {
            x: self.field_index(element_id, fx)?,
            y: self.field_index(element_id, fy)?,
        })
    }

    /// Build the dense variable vector from the current element coordinates.
    ///
    /// Every element referenced by the registry must be present in
    /// `elements`; callers only ever build a registry from elements they
    /// already hold, so this cannot fail in practice.
    pub fn assign_to_vector(&self, elements: &ElementMap) -> Vec<f64> {
        self.names
            .iter()
            .map(|name| {
                let (element_id, field) = split_variable_name(name);
                let element = &elements[element_id];
                read_field(element, field)
            })
            .collect()
    }

    /// Reconstruct an element coordinate map from an updated variable
    /// vector, restricted to the elements named in `subset`. Elements in
    /// `subset` with no variables in this registry are passed through
    /// unchanged from `original`.
    pub fn vector_to_elements(
        &self,
        vector: &[f64],
        subset: &ElementMap,
        original: &ElementMap,
    ) -> ElementMap {
        subset
            .keys()
            .map(|id| {
                let mut element = original[id];
                for field in ["x1", "y1", "x2", "y2"] {
                    if let Some(idx) = self.field_index(id, field) {
                        write_field(&mut element, field, vector[idx]);
                    }
                }
                (id.clone(), element)
            })
            .collect()
    }
}

/// Column indices of a line's four endpoint variables.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineVarIndex {
    /// Column of `x1`.
    pub x1: usize,
    /// Column of `y1`.
    pub y1: usize,
    /// Column of `x2`.
    pub x2: usize,
    /// Column of `y2`.
    pub y2: usize,
}

/// Column indices of a single point's two variables.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PointVarIndex {
    /// Column of the x coordinate.
    pub x: usize,
    /// Column of the y coordinate.
    pub y: usize,
}

fn split_variable_name(name: &str) -> (&str, &str) {
    // Field suffixes are always exactly "x1", "y1", "x2", or "y2", preceded
    // by an underscore; drop the underscore from both halves.
    let (head, tail) = name.split_at(name.len() - 2);
    (&head[..head.len() - 1], tail)
}

fn read_field(element: &SketchElement, field: &str) -> f64 {
    match field {
        "x1" => element.x1,
        "y1" => element.y1,
        "x2" => element.x2,
        "y2" => element.y2,
        _ => unreachable!("field suffix is always one of x1/y1/x2/y2"),
    }
}

fn write_field(element: &mut SketchElement, field: &str, value: f64) {
    match field {
        "x1" => element.x1 = value,
        "y1" => element.y1 = value,
        "x2" => element.x2 = value,
        "y2" => element.y2 = value,
        _ => unreachable!("field suffix is always one of x1/y1/x2/y2"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_elements() -> ElementMap {
        let mut m = ElementMap::new();
        m.insert("line1".to_string(), SketchElement::new(0.0, 0.0, 10.0, 0.0));
        m.insert("line2".to_string(), SketchElement::new(5.0, 5.0, 5.0, 10.0));
        m
    }

    #[test]
    fn canonical_order_is_lexicographic() {
        let ids = vec!["line2".to_string(), "line1".to_string()];
        let reg = VariableRegistry::build(&ids);
        assert_eq!(
            reg.names,
            vec!["line1_x1", "line1_x2", "line1_y1", "line1_y2", "line2_x1", "line2_x2", "line2_y1", "line2_y2"]
        );
    }

    #[test]
    fn assign_and_reconstruct_round_trips() {
        let elements = sample_elements();
        let ids: Vec<_> = elements.keys().cloned().collect();
        let reg = VariableRegistry::build(&ids);
        let vector = reg.assign_to_vector(&elements);
        let back = reg.vector_to_elements(&vector, &elements, &elements);
        assert_eq!(back, elements);
    }

    #[test]
    fn unreferenced_elements_get_no_variables() {
        let elements = sample_elements();
        let reg = VariableRegistry::build(std::iter::once(&"line1".to_string()));
        assert_eq!(reg.len(), 4);
        assert!(reg.field_index("line2", "x1").is_none());
    }

    #[test]
    fn line_and_point_indices_resolve() {
        let elements = sample_elements();
        let ids: Vec<_> = elements.keys().cloned().collect();
        let reg = VariableRegistry::build(&ids);
        let line = reg.line_indices("line1").unwrap();
        assert_eq!(reg.index_of("line1_x1"), Some(line.x1));
        let pt = reg.point_indices("line2", EndpointIndex::End).unwrap();
        assert_eq!(reg.index_of("line2_x2"), Some(pt.x));
        assert_eq!(reg.index_of("line2_y2"), Some(pt.y));
    }
}
