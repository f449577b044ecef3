use crate::action::{Action, Dispatch};
use crate::error::Result;
use crate::facets::{facet_failure, FacetsState};
use crate::federated::FederatedSearchState;
use crate::full_text::FullTextSearchState;
use crate::globals::{
    AnimationFlags, ErrorRecord, GlobalSlices, MapViewport, ANIMATION_KEY, ERROR_KEY,
    MAP_VIEWPORT_KEY, OPTIONS_KEY,
};
use crate::perspective::PerspectiveSlices;
use crate::results::ResultsState;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of one keyed slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SliceState {
    Results(ResultsState),
    Facets(FacetsState),
    Federated(FederatedSearchState),
    FullText(FullTextSearchState),
    Error(Option<ErrorRecord>),
    Options(BTreeMap<String, serde_json::Value>),
    MapViewport(MapViewport),
    Animation(AnimationFlags),
}

/// Read-only view of the whole store, keyed like the reducer map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RootState {
    slices: IndexMap<String, SliceState>,
}

impl RootState {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SliceState> {
        self.slices.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    #[must_use]
    pub fn results(&self, key: &str) -> Option<&ResultsState> {
        match self.get(key)? {
            SliceState::Results(state) => Some(state),
            SliceState::Federated(state) => Some(&state.results),
            SliceState::FullText(state) => Some(&state.results),
            _ => None,
        }
    }

    #[must_use]
    pub fn facets(&self, key: &str) -> Option<&FacetsState> {
        match self.get(key)? {
            SliceState::Facets(state) => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn federated(&self, key: &str) -> Option<&FederatedSearchState> {
        match self.get(key)? {
            SliceState::Federated(state) => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn full_text(&self, key: &str) -> Option<&FullTextSearchState> {
        match self.get(key)? {
            SliceState::FullText(state) => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&ErrorRecord> {
        match self.get(ERROR_KEY)? {
            SliceState::Error(record) => record.as_ref(),
            _ => None,
        }
    }
}

/// Every slice of a portal plus the global ones. Actions are applied one at
/// a time through [`Store::dispatch`].
#[derive(Debug, Clone)]
pub struct Store {
    perspectives: IndexMap<String, PerspectiveSlices>,
    globals: GlobalSlices,
}

impl Store {
    #[must_use]
    pub fn new(perspectives: Vec<PerspectiveSlices>) -> Self {
        Self {
            perspectives: perspectives
                .into_iter()
                .map(|slices| (slices.perspective_id().to_string(), slices))
                .collect(),
            globals: GlobalSlices::default(),
        }
    }

    #[must_use]
    pub fn perspective(&self, id: &str) -> Option<&PerspectiveSlices> {
        self.perspectives.get(id)
    }

    /// Perspective keys in registration order, then the global keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.perspectives
            .values()
            .flat_map(PerspectiveSlices::keys)
            .chain(
                [ERROR_KEY, OPTIONS_KEY, MAP_VIEWPORT_KEY, ANIMATION_KEY]
                    .into_iter()
                    .map(str::to_string),
            )
            .collect()
    }

    pub fn dispatch(&mut self, action: &Action) -> Result<Dispatch> {
        let Some(perspective_id) = action.perspective_id() else {
            return Ok(self.globals.reduce(action));
        };
        let Some(slices) = self.perspectives.get_mut(perspective_id) else {
            log::warn!("No perspective '{perspective_id}' for action {action:?}");
            return Ok(Dispatch::Unhandled);
        };

        let dispatch = slices.reduce(action)?;
        match &dispatch {
            Dispatch::Applied(intents) => {
                log::trace!("{perspective_id}: applied, {} fetch(es)", intents.len());
                if let Some(record) = failure_record(action) {
                    self.globals.record_error(record);
                }
            }
            Dispatch::Ignored => log::debug!("{perspective_id}: ignored {action:?}"),
            Dispatch::Discarded => log::debug!("{perspective_id}: discarded stale completion"),
            Dispatch::Unhandled => {
                log::debug!("{perspective_id}: action not handled by this perspective")
            }
        }
        Ok(dispatch)
    }

    /// Actions that perform the first load of every perspective.
    #[must_use]
    pub fn initial_actions(&self) -> Vec<Action> {
        self.perspectives
            .values()
            .flat_map(PerspectiveSlices::initial_actions)
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> RootState {
        let mut slices: IndexMap<String, SliceState> = self
            .perspectives
            .values()
            .flat_map(PerspectiveSlices::snapshot)
            .collect();
        slices.insert(ERROR_KEY.to_string(), SliceState::Error(self.globals.error.clone()));
        slices.insert(
            OPTIONS_KEY.to_string(),
            SliceState::Options(self.globals.options.clone()),
        );
        slices.insert(
            MAP_VIEWPORT_KEY.to_string(),
            SliceState::MapViewport(self.globals.map_viewport.clone()),
        );
        slices.insert(
            ANIMATION_KEY.to_string(),
            SliceState::Animation(self.globals.animation.clone()),
        );
        RootState { slices }
    }
}

fn failure_record(action: &Action) -> Option<ErrorRecord> {
    match action {
        Action::FetchFailed {
            perspective_id,
            error,
            ..
        } => Some(ErrorRecord {
            perspective_id: perspective_id.clone(),
            property: None,
            error: error.clone(),
        }),
        Action::FacetValuesFailed {
            perspective_id,
            property,
            error,
            ..
        } => Some(ErrorRecord {
            perspective_id: perspective_id.clone(),
            property: Some(property.clone()),
            error: facet_failure(property, error),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ReducerRegistry;
    use portal_config::{PerspectiveConfig, PerspectiveKind, PortalConfig};
    use portal_protocol::ErrorInfo;
    use serde_json::json;

    fn store() -> Store {
        let manuscripts = PerspectiveConfig::from_value(
            "manuscripts.json",
            json!({
                "id": "manuscripts",
                "searchMode": "faceted-search",
                "resultClasses": { "manuscripts": { "paginatedResultsConfig": { "pagesize": 5 } } },
                "facets": {
                    "author": { "label": "Author" },
                    "language": { "label": "Language" }
                }
            }),
            PerspectiveKind::Search,
        )
        .unwrap();
        let portal = PortalConfig::new("mmm", vec![manuscripts], Vec::new()).unwrap();
        ReducerRegistry::default().build(&portal).unwrap()
    }

    #[test]
    fn snapshot_lists_perspective_then_global_keys() {
        let store = store();
        let snapshot = store.snapshot();
        let keys: Vec<&str> = snapshot.keys().collect();
        assert_eq!(
            keys,
            vec![
                "manuscripts",
                "manuscriptsFacets",
                "manuscriptsFacetsConstrainSelf",
                "error",
                "options",
                "leafletMap",
                "animation"
            ]
        );
        assert_eq!(store.keys(), keys);
    }

    #[test]
    fn unknown_perspective_is_unhandled() {
        let mut store = store();
        let dispatch = store
            .dispatch(&Action::ResultsRequested {
                perspective_id: "people".to_string(),
            })
            .unwrap();
        assert_eq!(dispatch, Dispatch::Unhandled);
    }

    #[test]
    fn committed_failure_is_recorded_globally() {
        let mut store = store();
        let request = store
            .dispatch(&Action::ResultsRequested {
                perspective_id: "manuscripts".to_string(),
            })
            .unwrap();
        let token = request.intents()[0].token;
        store
            .dispatch(&Action::FetchFailed {
                perspective_id: "manuscripts".to_string(),
                token,
                error: ErrorInfo::new("SPARQL endpoint unavailable"),
            })
            .unwrap();

        let snapshot = store.snapshot();
        let error = snapshot.error().unwrap();
        assert_eq!(error.perspective_id, "manuscripts");
        assert_eq!(error.error.message, "SPARQL endpoint unavailable");

        store.dispatch(&Action::ErrorDismissed).unwrap();
        assert!(store.snapshot().error().is_none());
    }

    #[test]
    fn stale_failure_is_not_recorded() {
        let mut store = store();
        store
            .dispatch(&Action::FetchFailed {
                perspective_id: "manuscripts".to_string(),
                token: portal_protocol::RequestToken::new(99),
                error: ErrorInfo::new("late"),
            })
            .unwrap();
        assert!(store.snapshot().error().is_none());
    }

    #[test]
    fn initial_actions_load_results_and_both_facet_tables() {
        let store = store();
        let actions = store.initial_actions();
        assert_eq!(actions.len(), 1 + 2 * 2);
        assert!(matches!(actions[0], Action::ResultsRequested { .. }));
    }
}
