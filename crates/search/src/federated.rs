use crate::action::Dispatch;
use crate::error::{Result, StateError};
use crate::facets::{apply_selection, EmbeddedFacets, FacetState, SelectionChange};
use crate::results::{Commit, ResultsMachine, ResultsState};
use crate::seed::FederatedSeed;
use indexmap::IndexMap;
use portal_config::PropertyConfig;
use portal_protocol::{
    DatasetPage, DatasetSource, ErrorInfo, FetchIntent, FetchTarget, Record, RequestToken,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedSearchState {
    #[serde(flatten)]
    pub results: ResultsState,
    pub dataset_enabled: IndexMap<String, bool>,
    pub map_visible: IndexMap<String, bool>,
    pub facets: IndexMap<String, FacetState>,
}

/// Results merged from several independently queried datasets.
#[derive(Debug, Clone)]
pub struct FederatedSearchSlice {
    machine: ResultsMachine,
    properties: Vec<PropertyConfig>,
    sources: Vec<DatasetSource>,
    dataset_enabled: IndexMap<String, bool>,
    map_visible: IndexMap<String, bool>,
    facets: EmbeddedFacets,
}

impl FederatedSearchSlice {
    #[must_use]
    pub fn new(seed: FederatedSeed) -> Self {
        Self {
            machine: ResultsMachine::new(&seed.results),
            properties: seed.results.properties,
            dataset_enabled: seed
                .datasets
                .iter()
                .map(|source| (source.dataset_id.clone(), true))
                .collect(),
            sources: seed.datasets,
            map_visible: seed.maps,
            facets: EmbeddedFacets::new(seed.facets),
        }
    }

    #[must_use]
    pub fn perspective_id(&self) -> &str {
        self.machine.perspective_id()
    }

    fn enabled(&self) -> Vec<DatasetSource> {
        self.sources
            .iter()
            .filter(|source| self.dataset_enabled.get(&source.dataset_id) == Some(&true))
            .cloned()
            .collect()
    }

    /// Fetch `page` of the merged result from the enabled datasets, or settle
    /// empty when there are none.
    fn fetch(&mut self, page: usize) -> Dispatch {
        let datasets = self.enabled();
        if datasets.is_empty() {
            log::debug!(
                "No dataset enabled for '{}'; settling on an empty result",
                self.perspective_id()
            );
            self.machine.settle_empty();
            return Dispatch::applied();
        }
        let token = self.machine.begin(page);
        let intent = self.intent(token, datasets);
        Dispatch::Applied(vec![intent])
    }

    fn intent(&self, token: RequestToken, datasets: Vec<DatasetSource>) -> FetchIntent {
        self.machine.intent(
            token,
            FetchTarget::Datasets { datasets },
            self.facets.selections.as_map(),
        )
    }

    pub fn change_page(&mut self, page: usize) -> Result<Dispatch> {
        if self.machine.is_duplicate(page) {
            return Ok(Dispatch::Ignored);
        }
        self.machine.check_page(page)?;
        Ok(self.fetch(page))
    }

    pub fn change_sort(&mut self, property: &str) -> Dispatch {
        self.machine.toggle_sort(property);
        self.fetch(0)
    }

    pub fn request_current(&mut self) -> Dispatch {
        let page = self.machine.page();
        if self.machine.is_duplicate(page) {
            return Dispatch::Ignored;
        }
        self.fetch(page)
    }

    pub fn toggle_dataset(&mut self, dataset_id: &str) -> Result<Dispatch> {
        let Some(enabled) = self.dataset_enabled.get_mut(dataset_id) else {
            return Err(StateError::UnknownDataset {
                perspective: self.perspective_id().to_string(),
                dataset: dataset_id.to_string(),
            });
        };
        *enabled = !*enabled;
        Ok(self.fetch(0))
    }

    pub fn toggle_map(&mut self, map_id: &str) -> Result<Dispatch> {
        let Some(visible) = self.map_visible.get_mut(map_id) else {
            return Err(StateError::UnknownMap {
                perspective: self.perspective_id().to_string(),
                map: map_id.to_string(),
            });
        };
        *visible = !*visible;
        Ok(Dispatch::applied())
    }

    pub fn change_selection(&mut self, property: &str, change: &SelectionChange) -> Result<Dispatch> {
        let changed = apply_selection(
            self.machine.perspective_id(),
            &self.facets.descriptors,
            &mut self.facets.selections,
            property,
            change,
        )?;
        if changed {
            Ok(self.fetch(0))
        } else {
            Ok(Dispatch::Ignored)
        }
    }

    /// Merge per-dataset shares of the current page in declaration order.
    /// Pages for disabled or unknown datasets are dropped; duplicates across
    /// datasets are kept.
    pub fn federated_succeeded(&mut self, token: RequestToken, datasets: Vec<DatasetPage>) -> Dispatch {
        let mut by_id: IndexMap<String, DatasetPage> = datasets
            .into_iter()
            .map(|page| (page.dataset_id.clone(), page))
            .collect();
        let mut rows = Vec::new();
        let mut total = 0u64;
        for source in self.enabled() {
            if let Some(page) = by_id.shift_remove(&source.dataset_id) {
                total += page.total_results;
                rows.extend(page.rows);
            }
        }
        if !by_id.is_empty() {
            log::debug!(
                "Dropping {} dataset page(s) not enabled for '{}'",
                by_id.len(),
                self.perspective_id()
            );
        }
        self.fetch_succeeded(token, rows, total)
    }

    pub fn fetch_succeeded(&mut self, token: RequestToken, rows: Vec<Record>, total_results: u64) -> Dispatch {
        match self.machine.commit(token, rows, total_results) {
            Commit::Stale => Dispatch::Discarded,
            Commit::Committed => Dispatch::applied(),
            Commit::Clamped(page) => self.fetch(page),
        }
    }

    pub fn fetch_failed(&mut self, token: RequestToken, error: ErrorInfo) -> Dispatch {
        if self.machine.fail(token, error) {
            Dispatch::applied()
        } else {
            Dispatch::Discarded
        }
    }

    #[must_use]
    pub fn state(&self) -> FederatedSearchState {
        FederatedSearchState {
            results: ResultsState {
                properties: self.properties.clone(),
                maps: self.map_visible.keys().cloned().collect(),
                ..self.machine.state()
            },
            dataset_enabled: self.dataset_enabled.clone(),
            map_visible: self.map_visible.clone(),
            facets: self.facets.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::FetchStatus;
    use crate::seed::{FacetSeed, ResultsSeed};
    use portal_protocol::{dataset_window, DatasetEndpoint};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn slice() -> FederatedSearchSlice {
        FederatedSearchSlice::new(FederatedSeed {
            results: ResultsSeed {
                perspective_id: "clientFSPlaces".to_string(),
                page_size: 5,
                sort: None,
                result_classes: Vec::new(),
                active_result_class: None,
                properties: Vec::new(),
                maps: Vec::new(),
            },
            datasets: ["A", "B"]
                .into_iter()
                .map(|id| DatasetSource {
                    dataset_id: id.to_string(),
                    endpoint: DatasetEndpoint::new(format!("http://{id}.example/sparql")),
                })
                .collect(),
            maps: IndexMap::from([("placesMap".to_string(), false)]),
            facets: IndexMap::from([(
                "datasetSelector".to_string(),
                FacetSeed {
                    label: "Dataset".to_string(),
                    description: None,
                    is_range_facet: false,
                    selections_set: BTreeSet::new(),
                    is_fetching: false,
                },
            )]),
        })
    }

    fn page(id: &str, n: usize, total: u64) -> DatasetPage {
        DatasetPage {
            dataset_id: id.to_string(),
            rows: (0..n).map(|i| json!({ "id": format!("{id}{i}") })).collect(),
            total_results: total,
        }
    }

    #[test]
    fn toggling_a_dataset_refetches_remaining_ones() {
        let mut slice = slice();
        let dispatch = slice.toggle_dataset("B").unwrap();
        let intent = &dispatch.intents()[0];
        assert_eq!(intent.target.dataset_ids(), vec!["A"]);
        let FetchTarget::Datasets { datasets } = &intent.target else {
            panic!("expected a dataset fetch, got {:?}", intent.target);
        };
        assert_eq!(datasets[0].endpoint.url, "http://A.example/sparql");

        let merged = slice.federated_succeeded(intent.token, vec![page("A", 3, 3), page("B", 2, 40)]);
        assert!(merged.is_applied());
        let state = slice.state();
        assert_eq!(state.results.total_results, Some(3));
        assert_eq!(state.results.rows.len(), 3);
        assert!(!state.dataset_enabled["B"]);
    }

    #[test]
    fn merge_follows_declaration_order_and_truncates() {
        let mut slice = slice();
        let dispatch = slice.request_current();
        let token = dispatch.intents()[0].token;
        slice.federated_succeeded(token, vec![page("B", 4, 4), page("A", 4, 9)]);
        let state = slice.state();
        assert_eq!(state.results.total_results, Some(13));
        assert_eq!(state.results.rows.len(), 5);
        assert_eq!(state.results.rows[0]["id"], "A0");
        assert_eq!(state.results.rows[4]["id"], "B0");
    }

    /// Answer `intent` the way a backend holding `totals` rows per dataset would.
    fn answer(intent: &FetchIntent, totals: &[(&str, u64)]) -> Vec<DatasetPage> {
        let counts: Vec<u64> = totals.iter().map(|(_, n)| *n).collect();
        let shares = dataset_window::shares(&counts, intent.page_index, intent.page_size);
        totals
            .iter()
            .zip(shares)
            .map(|((id, total), share)| DatasetPage {
                dataset_id: (*id).to_string(),
                rows: share.map(|i| json!({ "id": format!("{id}{i}") })).collect(),
                total_results: *total,
            })
            .collect()
    }

    #[test]
    fn paging_reaches_rows_of_every_dataset() {
        let mut slice = slice();
        let totals = [("A", 6), ("B", 4)];
        let mut seen = Vec::new();

        let first = slice.request_current().intents()[0].clone();
        slice.federated_succeeded(first.token, answer(&first, &totals));
        seen.extend(slice.state().results.rows);
        assert_eq!(slice.state().results.page_count(), 2);

        let second = slice.change_page(1).unwrap().intents()[0].clone();
        assert_eq!(second.page_index, 1);
        slice.federated_succeeded(second.token, answer(&second, &totals));
        let page = slice.state().results;
        assert_eq!(page.current_page, 1);
        assert_eq!(page.rows[0]["id"], "A5");
        seen.extend(page.rows);

        let ids: Vec<&str> = seen.iter().filter_map(|row| row["id"].as_str()).collect();
        assert_eq!(
            ids,
            vec!["A0", "A1", "A2", "A3", "A4", "A5", "B0", "B1", "B2", "B3"]
        );
    }

    #[test]
    fn disabling_every_dataset_settles_empty_without_fetch() {
        let mut slice = slice();
        let in_flight = slice.request_current().intents()[0].token;
        slice.toggle_dataset("A").unwrap();
        let dispatch = slice.toggle_dataset("B").unwrap();
        assert!(dispatch.intents().is_empty());

        let state = slice.state();
        assert_eq!(state.results.fetch_status, FetchStatus::Success);
        assert_eq!(state.results.total_results, Some(0));
        assert_eq!(
            slice.federated_succeeded(in_flight, vec![page("A", 1, 1)]),
            Dispatch::Discarded
        );
    }

    #[test]
    fn map_toggle_never_fetches() {
        let mut slice = slice();
        let dispatch = slice.toggle_map("placesMap").unwrap();
        assert!(dispatch.intents().is_empty());
        assert!(slice.state().map_visible["placesMap"]);
        assert!(matches!(
            slice.toggle_map("nope"),
            Err(StateError::UnknownMap { .. })
        ));
    }

    #[test]
    fn facet_selection_restarts_at_first_page() {
        let mut slice = slice();
        let dispatch = slice
            .change_selection("datasetSelector", &SelectionChange::Select("A".to_string()))
            .unwrap();
        let intent = &dispatch.intents()[0];
        assert_eq!(intent.page_index, 0);
        assert!(intent.facet_selections["datasetSelector"].contains("A"));
        assert!(slice.state().facets["datasetSelector"]
            .selections_set
            .contains("A"));
    }
}
