use crate::FacetSelections;

/// Selections as sent to the backend: empty properties are dropped.
pub fn normalized(selections: &FacetSelections) -> FacetSelections {
    selections
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(property, values)| (property.clone(), values.clone()))
        .collect()
}

/// Filter predicate for one facet's value counts.
///
/// The standard view applies every selection, including the facet's own. The
/// constrain-self view drops the facet's own selection and keeps all others.
pub fn for_facet(selections: &FacetSelections, property: &str, constrain_self: bool) -> FacetSelections {
    let mut filter = normalized(selections);
    if constrain_self {
        filter.remove(property);
    }
    filter
}

/// Trimmed value identifier, or `None` when nothing selectable remains.
pub fn normalize_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}
