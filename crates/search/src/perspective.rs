use crate::action::{Action, Dispatch};
use crate::error::{Result, StateError};
use crate::facets::{ConstrainSelfSlice, FacetsSlice, SelectionChange};
use crate::federated::FederatedSearchSlice;
use crate::full_text::FullTextSearchSlice;
use crate::results::ResultsSlice;
use crate::store::SliceState;
use portal_protocol::FacetSelections;

pub const FACETS_SUFFIX: &str = "Facets";
pub const CONSTRAIN_SELF_SUFFIX: &str = "FacetsConstrainSelf";

#[must_use]
pub fn facets_key(perspective_id: &str) -> String {
    format!("{perspective_id}{FACETS_SUFFIX}")
}

#[must_use]
pub fn constrain_self_key(perspective_id: &str) -> String {
    format!("{perspective_id}{CONSTRAIN_SELF_SUFFIX}")
}

/// The three slices of a faceted-search perspective. Selections live in
/// `facets`; the other two read them.
#[derive(Debug, Clone)]
pub struct FacetedSearch {
    pub results: ResultsSlice,
    pub facets: FacetsSlice,
    pub constrain_self: ConstrainSelfSlice,
}

impl FacetedSearch {
    fn change_selection(&mut self, property: &str, change: &SelectionChange) -> Result<Dispatch> {
        if !self.facets.change_selection(property, change)? {
            log::debug!(
                "Selection on '{}'.{property} unchanged",
                self.results.perspective_id()
            );
            return Ok(Dispatch::Ignored);
        }
        let mut intents = vec![self.results.restart(self.facets.selections().as_map())];
        intents.extend(self.facets.refetch_all());
        intents.extend(self.constrain_self.refetch_others(property, &self.facets));
        Ok(Dispatch::Applied(intents))
    }

    fn reduce(&mut self, action: &Action) -> Result<Dispatch> {
        let dispatch = match action {
            Action::PageChanged { page, .. } => self
                .results
                .change_page(*page, self.facets.selections().as_map())?,
            Action::ResultClassChanged { result_class, .. } => self
                .results
                .change_result_class(result_class, self.facets.selections().as_map())?,
            Action::SortChanged { property, .. } => self
                .results
                .change_sort(property, self.facets.selections().as_map()),
            Action::ResultsRequested { .. } => self
                .results
                .request_current(self.facets.selections().as_map()),
            Action::FacetSelected { property, value, .. } => {
                self.change_selection(property, &SelectionChange::Select(value.clone()))?
            }
            Action::FacetDeselected { property, value, .. } => {
                self.change_selection(property, &SelectionChange::Deselect(value.clone()))?
            }
            Action::FacetCleared { property, .. } => {
                self.change_selection(property, &SelectionChange::Clear)?
            }
            Action::FacetValuesFetching {
                property,
                constrain_self,
                ..
            } => {
                let intent = if *constrain_self {
                    self.constrain_self.request_values(property, &self.facets)?
                } else {
                    self.facets.request_values(property)?
                };
                Dispatch::Applied(vec![intent])
            }
            Action::FacetValuesReceived {
                property,
                constrain_self,
                token,
                values,
                ..
            } => {
                if *constrain_self {
                    self.constrain_self
                        .values_received(property, *token, values.clone())
                } else {
                    self.facets.values_received(property, *token, values.clone())
                }
            }
            Action::FacetValuesFailed {
                property,
                constrain_self,
                token,
                ..
            } => {
                if *constrain_self {
                    self.constrain_self.values_failed(property, *token)
                } else {
                    self.facets.values_failed(property, *token)
                }
            }
            Action::FetchSucceeded {
                token,
                rows,
                total_results,
                ..
            } => self.results.fetch_succeeded(
                *token,
                rows.clone(),
                *total_results,
                self.facets.selections().as_map(),
            ),
            Action::FetchFailed { token, error, .. } => {
                self.results.fetch_failed(*token, error.clone())
            }
            _ => Dispatch::Unhandled,
        };
        Ok(dispatch)
    }
}

/// Every slice belonging to one perspective, by search mode.
#[derive(Debug, Clone)]
pub enum PerspectiveSlices {
    Faceted(FacetedSearch),
    Federated(FederatedSearchSlice),
    FullText(FullTextSearchSlice),
    InstancePage(ResultsSlice),
}

impl PerspectiveSlices {
    #[must_use]
    pub fn perspective_id(&self) -> &str {
        match self {
            Self::Faceted(faceted) => faceted.results.perspective_id(),
            Self::Federated(slice) => slice.perspective_id(),
            Self::FullText(slice) => slice.perspective_id(),
            Self::InstancePage(slice) => slice.perspective_id(),
        }
    }

    /// Root-state keys this perspective occupies.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let id = self.perspective_id();
        match self {
            Self::Faceted(_) => vec![id.to_string(), facets_key(id), constrain_self_key(id)],
            Self::Federated(_) | Self::FullText(_) | Self::InstancePage(_) => vec![id.to_string()],
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<(String, SliceState)> {
        let id = self.perspective_id().to_string();
        match self {
            Self::Faceted(faceted) => vec![
                (id.clone(), SliceState::Results(faceted.results.state())),
                (facets_key(&id), SliceState::Facets(faceted.facets.state())),
                (
                    constrain_self_key(&id),
                    SliceState::Facets(faceted.constrain_self.state(&faceted.facets)),
                ),
            ],
            Self::Federated(slice) => vec![(id, SliceState::Federated(slice.state()))],
            Self::FullText(slice) => vec![(id, SliceState::FullText(slice.state()))],
            Self::InstancePage(slice) => vec![(id, SliceState::Results(slice.state()))],
        }
    }

    /// Actions that load the perspective for the first time.
    pub(crate) fn initial_actions(&self) -> Vec<Action> {
        let perspective_id = self.perspective_id().to_string();
        let mut actions = vec![Action::ResultsRequested {
            perspective_id: perspective_id.clone(),
        }];
        if let Self::Faceted(faceted) = self {
            for property in faceted.facets.properties() {
                for constrain_self in [false, true] {
                    actions.push(Action::FacetValuesFetching {
                        perspective_id: perspective_id.clone(),
                        property: property.clone(),
                        constrain_self,
                    });
                }
            }
        }
        actions
    }

    /// Apply an action already addressed to this perspective.
    pub fn reduce(&mut self, action: &Action) -> Result<Dispatch> {
        match self {
            Self::Faceted(faceted) => faceted.reduce(action),
            Self::Federated(slice) => reduce_federated(slice, action),
            Self::FullText(slice) => reduce_full_text(slice, action),
            Self::InstancePage(slice) => reduce_instance_page(slice, action),
        }
    }
}

fn no_result_classes(perspective_id: &str, result_class: &str) -> StateError {
    StateError::UnknownResultClass {
        perspective: perspective_id.to_string(),
        result_class: result_class.to_string(),
    }
}

fn reduce_federated(slice: &mut FederatedSearchSlice, action: &Action) -> Result<Dispatch> {
    let dispatch = match action {
        Action::PageChanged { page, .. } => slice.change_page(*page)?,
        Action::ResultClassChanged { result_class, .. } => {
            return Err(no_result_classes(slice.perspective_id(), result_class))
        }
        Action::SortChanged { property, .. } => slice.change_sort(property),
        Action::ResultsRequested { .. } => slice.request_current(),
        Action::FacetSelected { property, value, .. } => {
            slice.change_selection(property, &SelectionChange::Select(value.clone()))?
        }
        Action::FacetDeselected { property, value, .. } => {
            slice.change_selection(property, &SelectionChange::Deselect(value.clone()))?
        }
        Action::FacetCleared { property, .. } => {
            slice.change_selection(property, &SelectionChange::Clear)?
        }
        Action::DatasetToggled { dataset_id, .. } => slice.toggle_dataset(dataset_id)?,
        Action::MapToggled { map_id, .. } => slice.toggle_map(map_id)?,
        Action::FetchSucceeded {
            token,
            rows,
            total_results,
            ..
        } => slice.fetch_succeeded(*token, rows.clone(), *total_results),
        Action::FederatedFetchSucceeded { token, datasets, .. } => {
            slice.federated_succeeded(*token, datasets.clone())
        }
        Action::FetchFailed { token, error, .. } => slice.fetch_failed(*token, error.clone()),
        _ => Dispatch::Unhandled,
    };
    Ok(dispatch)
}

fn reduce_full_text(slice: &mut FullTextSearchSlice, action: &Action) -> Result<Dispatch> {
    let dispatch = match action {
        Action::PageChanged { page, .. } => slice.change_page(*page)?,
        Action::ResultClassChanged { result_class, .. } => {
            return Err(no_result_classes(slice.perspective_id(), result_class))
        }
        Action::SortChanged { property, .. } => slice.change_sort(property),
        Action::ResultsRequested { .. } => slice.request_current(),
        Action::FullTextQueryChanged { query, .. } => slice.change_query(query),
        Action::FetchSucceeded {
            token,
            rows,
            total_results,
            ..
        } => slice.fetch_succeeded(*token, rows.clone(), *total_results),
        Action::FetchFailed { token, error, .. } => slice.fetch_failed(*token, error.clone()),
        _ => Dispatch::Unhandled,
    };
    Ok(dispatch)
}

fn reduce_instance_page(slice: &mut ResultsSlice, action: &Action) -> Result<Dispatch> {
    let none = FacetSelections::new();
    let dispatch = match action {
        Action::PageChanged { page, .. } => slice.change_page(*page, &none)?,
        Action::ResultClassChanged { result_class, .. } => {
            slice.change_result_class(result_class, &none)?
        }
        Action::SortChanged { property, .. } => slice.change_sort(property, &none),
        Action::ResultsRequested { .. } => slice.request_current(&none),
        Action::FetchSucceeded {
            token,
            rows,
            total_results,
            ..
        } => slice.fetch_succeeded(*token, rows.clone(), *total_results, &none),
        Action::FetchFailed { token, error, .. } => slice.fetch_failed(*token, error.clone()),
        _ => Dispatch::Unhandled,
    };
    Ok(dispatch)
}
