//! Facet selection state and the two facet-value tables built on it.
//!
//! A faceted perspective owns exactly one [`Selections`]. The standard
//! [`FacetsSlice`] counts values under every selection; the
//! [`ConstrainSelfSlice`] counts each facet's values under every selection
//! except the facet's own. Both read the same selection set, so their
//! `selectionsSet` snapshots cannot diverge.

use crate::action::Dispatch;
use crate::error::{Result, StateError};
use crate::seed::{FacetSeed, FacetsSeed};
use crate::token::TokenIssuer;
use indexmap::IndexMap;
use portal_protocol::selection_filters;
use portal_protocol::{ErrorInfo, FacetSelections, FacetValue, FetchIntent, FetchTarget, RequestToken};
use serde::Serialize;
use std::collections::BTreeSet;

static NO_SELECTIONS: BTreeSet<String> = BTreeSet::new();

/// The single owned selection state of a perspective.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    by_property: FacetSelections,
}

impl Selections {
    fn new<'a>(properties: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            by_property: properties
                .into_iter()
                .map(|p| (p.clone(), BTreeSet::new()))
                .collect(),
        }
    }

    #[must_use]
    pub fn of(&self, property: &str) -> &BTreeSet<String> {
        self.by_property.get(property).unwrap_or(&NO_SELECTIONS)
    }

    #[must_use]
    pub const fn as_map(&self) -> &FacetSelections {
        &self.by_property
    }

    fn select(&mut self, property: &str, value: &str) -> bool {
        self.by_property
            .entry(property.to_string())
            .or_default()
            .insert(value.to_string())
    }

    fn deselect(&mut self, property: &str, value: &str) -> bool {
        self.by_property
            .get_mut(property)
            .is_some_and(|values| values.remove(value))
    }

    fn clear(&mut self, property: &str) -> bool {
        match self.by_property.get_mut(property) {
            Some(values) if !values.is_empty() => {
                values.clear();
                true
            }
            _ => false,
        }
    }
}

/// Selection edit on one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Select(String),
    Deselect(String),
    Clear,
}

/// Validate and apply a selection edit. `Ok(false)` when nothing changed.
pub(crate) fn apply_selection(
    perspective_id: &str,
    descriptors: &IndexMap<String, FacetSeed>,
    selections: &mut Selections,
    property: &str,
    change: &SelectionChange,
) -> Result<bool> {
    if !descriptors.contains_key(property) {
        return Err(StateError::UnknownFacet {
            perspective: perspective_id.to_string(),
            property: property.to_string(),
        });
    }
    let changed = match change {
        SelectionChange::Select(value) => match selection_filters::normalize_value(value) {
            Some(value) => selections.select(property, &value),
            None => false,
        },
        SelectionChange::Deselect(value) => selections.deselect(property, value.trim()),
        SelectionChange::Clear => selections.clear(property),
    };
    Ok(changed)
}

/// Snapshot of one facet as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetState {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_range_facet: bool,
    pub selections_set: BTreeSet<String>,
    pub available_values: Vec<FacetValue>,
    pub is_fetching: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsState {
    pub perspective_id: String,
    pub constrain_self: bool,
    pub facets: IndexMap<String, FacetState>,
}

#[derive(Debug, Clone, Default)]
struct FacetValues {
    available: Vec<FacetValue>,
    is_fetching: bool,
    pending: Option<RequestToken>,
}

/// Available values per facet property, under one filter policy.
#[derive(Debug, Clone)]
pub(crate) struct FacetValueTable {
    perspective_id: String,
    constrain_self: bool,
    values: IndexMap<String, FacetValues>,
    tokens: TokenIssuer,
}

impl FacetValueTable {
    fn new(perspective_id: &str, descriptors: &IndexMap<String, FacetSeed>, constrain_self: bool) -> Self {
        Self {
            perspective_id: perspective_id.to_string(),
            constrain_self,
            values: descriptors
                .iter()
                .map(|(property, seed)| {
                    let values = FacetValues {
                        is_fetching: seed.is_fetching,
                        ..FacetValues::default()
                    };
                    (property.clone(), values)
                })
                .collect(),
            tokens: TokenIssuer::default(),
        }
    }

    fn properties(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Mark `property` as fetching and build its intent.
    fn request(&mut self, property: &str, selections: &Selections) -> Result<FetchIntent> {
        let Some(entry) = self.values.get_mut(property) else {
            return Err(StateError::UnknownFacet {
                perspective: self.perspective_id.clone(),
                property: property.to_string(),
            });
        };
        let token = self.tokens.issue();
        entry.is_fetching = true;
        entry.pending = Some(token);
        Ok(FetchIntent {
            perspective_id: self.perspective_id.clone(),
            token,
            target: FetchTarget::FacetValues {
                property: property.to_string(),
                constrain_self: self.constrain_self,
            },
            page_index: 0,
            page_size: 0,
            facet_selections: selection_filters::for_facet(
                selections.as_map(),
                property,
                self.constrain_self,
            ),
            sort: None,
        })
    }

    fn current(&mut self, property: &str, token: RequestToken) -> Option<&mut FacetValues> {
        let entry = self.values.get_mut(property)?;
        if entry.pending == Some(token) {
            Some(entry)
        } else {
            log::debug!(
                "Discarding stale facet values {token} for '{}'.{property} (constrain_self={})",
                self.perspective_id,
                self.constrain_self
            );
            None
        }
    }

    /// Values are stored in the order the backend returned them.
    fn receive(&mut self, property: &str, token: RequestToken, values: Vec<FacetValue>) -> Dispatch {
        match self.current(property, token) {
            Some(entry) => {
                entry.available = values;
                entry.is_fetching = false;
                entry.pending = None;
                Dispatch::applied()
            }
            None => Dispatch::Discarded,
        }
    }

    fn fail(&mut self, property: &str, token: RequestToken) -> Dispatch {
        match self.current(property, token) {
            Some(entry) => {
                entry.is_fetching = false;
                entry.pending = None;
                Dispatch::applied()
            }
            None => Dispatch::Discarded,
        }
    }

    fn state(&self, descriptors: &IndexMap<String, FacetSeed>, selections: &Selections) -> FacetsState {
        let facets = descriptors
            .iter()
            .map(|(property, seed)| {
                let values = self.values.get(property);
                let state = FacetState {
                    label: seed.label.clone(),
                    description: seed.description.clone(),
                    is_range_facet: seed.is_range_facet,
                    selections_set: selections.of(property).clone(),
                    available_values: values.map(|v| v.available.clone()).unwrap_or_default(),
                    is_fetching: values.is_some_and(|v| v.is_fetching),
                };
                (property.clone(), state)
            })
            .collect();
        FacetsState {
            perspective_id: self.perspective_id.clone(),
            constrain_self: self.constrain_self,
            facets,
        }
    }
}

/// Facets of a faceted perspective: owns the selections and the standard
/// value table.
#[derive(Debug, Clone)]
pub struct FacetsSlice {
    perspective_id: String,
    descriptors: IndexMap<String, FacetSeed>,
    selections: Selections,
    values: FacetValueTable,
}

impl FacetsSlice {
    #[must_use]
    pub fn new(seed: FacetsSeed) -> Self {
        let mut selections = Selections::new(seed.facets.keys());
        for (property, facet) in &seed.facets {
            for value in &facet.selections_set {
                selections.select(property, value);
            }
        }
        let values = FacetValueTable::new(&seed.perspective_id, &seed.facets, false);
        Self {
            perspective_id: seed.perspective_id,
            descriptors: seed.facets,
            selections,
            values,
        }
    }

    #[must_use]
    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    #[must_use]
    pub fn properties(&self) -> Vec<String> {
        self.descriptors.keys().cloned().collect()
    }

    pub fn change_selection(&mut self, property: &str, change: &SelectionChange) -> Result<bool> {
        apply_selection(
            &self.perspective_id,
            &self.descriptors,
            &mut self.selections,
            property,
            change,
        )
    }

    pub fn request_values(&mut self, property: &str) -> Result<FetchIntent> {
        self.values.request(property, &self.selections)
    }

    /// Under the standard policy a facet's own selection narrows its values,
    /// so every facet is refetched after any selection change.
    pub fn refetch_all(&mut self) -> Vec<FetchIntent> {
        self.values
            .properties()
            .into_iter()
            .filter_map(|property| self.values.request(&property, &self.selections).ok())
            .collect()
    }

    pub fn values_received(&mut self, property: &str, token: RequestToken, values: Vec<FacetValue>) -> Dispatch {
        self.values.receive(property, token, values)
    }

    pub fn values_failed(&mut self, property: &str, token: RequestToken) -> Dispatch {
        self.values.fail(property, token)
    }

    #[must_use]
    pub fn state(&self) -> FacetsState {
        self.values.state(&self.descriptors, &self.selections)
    }
}

/// Constrain-self value table. Holds no selections of its own: every call
/// that needs them borrows the owning [`FacetsSlice`]'s.
#[derive(Debug, Clone)]
pub struct ConstrainSelfSlice {
    values: FacetValueTable,
}

impl ConstrainSelfSlice {
    #[must_use]
    pub fn new(seed: &FacetsSeed) -> Self {
        Self {
            values: FacetValueTable::new(&seed.perspective_id, &seed.facets, true),
        }
    }

    pub fn request_values(&mut self, property: &str, owner: &FacetsSlice) -> Result<FetchIntent> {
        self.values.request(property, owner.selections())
    }

    /// A facet's own selection is excluded from its constrain-self filter, so
    /// only the other facets change when `changed` does.
    pub fn refetch_others(&mut self, changed: &str, owner: &FacetsSlice) -> Vec<FetchIntent> {
        self.values
            .properties()
            .into_iter()
            .filter(|property| property != changed)
            .filter_map(|property| self.values.request(&property, owner.selections()).ok())
            .collect()
    }

    pub fn values_received(&mut self, property: &str, token: RequestToken, values: Vec<FacetValue>) -> Dispatch {
        self.values.receive(property, token, values)
    }

    pub fn values_failed(&mut self, property: &str, token: RequestToken) -> Dispatch {
        self.values.fail(property, token)
    }

    #[must_use]
    pub fn state(&self, owner: &FacetsSlice) -> FacetsState {
        self.values.state(&owner.descriptors, owner.selections())
    }
}

/// Facet descriptors plus selections for perspectives whose facet values are
/// not fetched separately (federated search).
#[derive(Debug, Clone)]
pub(crate) struct EmbeddedFacets {
    pub(crate) descriptors: IndexMap<String, FacetSeed>,
    pub(crate) selections: Selections,
}

impl EmbeddedFacets {
    pub(crate) fn new(descriptors: IndexMap<String, FacetSeed>) -> Self {
        let selections = Selections::new(descriptors.keys());
        Self {
            descriptors,
            selections,
        }
    }

    pub(crate) fn state(&self) -> IndexMap<String, FacetState> {
        self.descriptors
            .iter()
            .map(|(property, seed)| {
                let state = FacetState {
                    label: seed.label.clone(),
                    description: seed.description.clone(),
                    is_range_facet: seed.is_range_facet,
                    selections_set: self.selections.of(property).clone(),
                    available_values: Vec::new(),
                    is_fetching: seed.is_fetching,
                };
                (property.clone(), state)
            })
            .collect()
    }
}

/// Error info kept for facet failures; the slice itself only clears `isFetching`.
pub(crate) fn facet_failure(property: &str, error: &ErrorInfo) -> ErrorInfo {
    ErrorInfo {
        message: format!("facet '{property}': {}", error.message),
        status: error.status,
        details: error.details.clone(),
    }
}
