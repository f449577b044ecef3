use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use portal_protocol::{
    dataset_window, DatasetPage, ErrorInfo, FacetValue, FetchIntent, FetchOutcome, FetchTarget,
    Record,
};
use portal_search::Fetcher;
use serde::Deserialize;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

/// Canned backend data for one perspective.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveFixture {
    #[serde(default)]
    pub rows: Vec<Record>,
    /// Defaults to the number of rows.
    #[serde(default)]
    pub total_results: Option<u64>,
    /// Every row of each dataset; pages are cut from these.
    #[serde(default)]
    pub datasets: Vec<DatasetPage>,
    #[serde(default)]
    pub facet_values: HashMap<String, Vec<FacetValue>>,
}

/// Answers fetch intents from a JSON file keyed by perspective id.
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    perspectives: HashMap<String, PerspectiveFixture>,
}

impl FixtureFetcher {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures {}", path.display()))?;
        let perspectives = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid fixtures in {}", path.display()))?;
        Ok(Self { perspectives })
    }

    /// The requested page. A page past the end is empty but still reports the
    /// full total, so the store can clamp back onto the last page.
    fn page(fixture: &PerspectiveFixture, intent: &FetchIntent) -> FetchOutcome {
        let total_results = fixture
            .total_results
            .unwrap_or(fixture.rows.len() as u64);
        let rows = dataset_window::shares(&[total_results], intent.page_index, intent.page_size)
            .pop()
            .map(|share| window(&fixture.rows, share))
            .unwrap_or_default();
        FetchOutcome::Page {
            rows,
            total_results,
        }
    }

    /// Each requested dataset's share of the merged page, in request order.
    /// Datasets without a fixture are left out.
    fn federated(fixture: &PerspectiveFixture, intent: &FetchIntent) -> FetchOutcome {
        let pages: Vec<&DatasetPage> = intent
            .target
            .dataset_ids()
            .into_iter()
            .filter_map(|id| fixture.datasets.iter().find(|page| page.dataset_id == id))
            .collect();
        let totals: Vec<u64> = pages.iter().map(|page| page.total_results).collect();
        let shares = dataset_window::shares(&totals, intent.page_index, intent.page_size);
        FetchOutcome::Federated {
            datasets: pages
                .into_iter()
                .zip(shares)
                .map(|(page, share)| DatasetPage {
                    dataset_id: page.dataset_id.clone(),
                    rows: window(&page.rows, share),
                    total_results: page.total_results,
                })
                .collect(),
        }
    }
}

fn window(rows: &[Record], share: Range<u64>) -> Vec<Record> {
    rows.iter()
        .skip(share.start as usize)
        .take((share.end - share.start) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, intent: &FetchIntent) -> FetchOutcome {
        let Some(fixture) = self.perspectives.get(&intent.perspective_id) else {
            return FetchOutcome::Failed {
                error: ErrorInfo {
                    message: format!("no fixture for perspective '{}'", intent.perspective_id),
                    status: Some(404),
                    details: None,
                },
            };
        };
        log::debug!("Fixture fetch {} for '{}'", intent.token, intent.perspective_id);

        match &intent.target {
            FetchTarget::FacetValues { property, .. } => FetchOutcome::FacetValues {
                values: fixture.facet_values.get(property).cloned().unwrap_or_default(),
            },
            FetchTarget::Datasets { .. } => Self::federated(fixture, intent),
            FetchTarget::ResultClass { .. } | FetchTarget::FullText { .. } => {
                Self::page(fixture, intent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_protocol::{DatasetEndpoint, DatasetSource, FacetSelections, RequestToken};
    use serde_json::json;

    fn dataset(id: &str, n: usize) -> DatasetPage {
        DatasetPage {
            dataset_id: id.to_string(),
            rows: (0..n).map(|i| json!({ "id": format!("{id}{i}") })).collect(),
            total_results: n as u64,
        }
    }

    fn fetcher() -> FixtureFetcher {
        let fixture = PerspectiveFixture {
            rows: (0..12).map(|i| json!({ "id": format!("r{i}") })).collect(),
            datasets: vec![dataset("A", 6), dataset("B", 4)],
            ..PerspectiveFixture::default()
        };
        FixtureFetcher {
            perspectives: HashMap::from([("fs".to_string(), fixture)]),
        }
    }

    fn intent(target: FetchTarget, page_index: usize) -> FetchIntent {
        FetchIntent {
            perspective_id: "fs".to_string(),
            token: RequestToken::new(1),
            target,
            page_index,
            page_size: 5,
            facet_selections: FacetSelections::new(),
            sort: None,
        }
    }

    fn datasets(ids: &[&str]) -> FetchTarget {
        FetchTarget::Datasets {
            datasets: ids
                .iter()
                .map(|id| DatasetSource {
                    dataset_id: (*id).to_string(),
                    endpoint: DatasetEndpoint::new(format!("http://{id}")),
                })
                .collect(),
        }
    }

    fn ids(outcome: &FetchOutcome) -> Vec<String> {
        let rows: Vec<&Record> = match outcome {
            FetchOutcome::Page { rows, .. } => rows.iter().collect(),
            FetchOutcome::Federated { datasets } => {
                datasets.iter().flat_map(|page| page.rows.iter()).collect()
            }
            other => panic!("unexpected outcome {other:?}"),
        };
        rows.iter()
            .filter_map(|row| row["id"].as_str().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn federated_pages_cover_every_dataset_row_once() {
        let fetcher = fetcher();
        let mut seen = Vec::new();
        for page in 0..2 {
            let outcome = fetcher.fetch(&intent(datasets(&["A", "B"]), page)).await;
            seen.extend(ids(&outcome));
        }
        assert_eq!(
            seen,
            vec!["A0", "A1", "A2", "A3", "A4", "A5", "B0", "B1", "B2", "B3"]
        );
    }

    #[tokio::test]
    async fn disabled_dataset_shifts_the_window() {
        let outcome = fetcher().fetch(&intent(datasets(&["B"]), 0)).await;
        assert_eq!(ids(&outcome), vec!["B0", "B1", "B2", "B3"]);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_with_full_total() {
        let target = FetchTarget::ResultClass {
            result_class: "fs".to_string(),
        };
        let last = fetcher().fetch(&intent(target.clone(), 2)).await;
        assert_eq!(ids(&last), vec!["r10", "r11"]);

        let beyond = fetcher().fetch(&intent(target, 3)).await;
        assert_eq!(
            beyond,
            FetchOutcome::Page {
                rows: Vec::new(),
                total_results: 12,
            }
        );
    }
}
