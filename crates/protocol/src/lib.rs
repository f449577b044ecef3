use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub mod dataset_window;
pub mod selection_filters;

/// One result record as returned by a backend. The engine never looks inside.
pub type Record = serde_json::Value;

/// Facet property -> selected value identifiers.
pub type FacetSelections = BTreeMap<String, BTreeSet<String>>;

/// Stamp carried by a fetch-intent and echoed back by its completion.
///
/// Tokens are issued per slice and only ever grow, so "latest" is a plain
/// comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct SortOrder {
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// What a fetch is for. Echoed back in the completion so the store can route it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FetchTarget {
    ResultClass {
        #[serde(rename = "resultClass")]
        result_class: String,
    },
    /// Enabled datasets in declaration order. The answer holds one
    /// [`DatasetPage`] per dataset with its full count and its share of the
    /// merged page, as laid out by [`dataset_window::shares`].
    Datasets { datasets: Vec<DatasetSource> },
    FullText {
        query: String,
        properties: Vec<String>,
    },
    FacetValues {
        property: String,
        #[serde(rename = "constrainSelf")]
        constrain_self: bool,
    },
}

impl FetchTarget {
    /// Dataset ids of a federated fetch; empty for every other target.
    #[must_use]
    pub fn dataset_ids(&self) -> Vec<&str> {
        match self {
            Self::Datasets { datasets } => datasets.iter().map(|d| d.dataset_id.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Where a federated dataset is queried.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEndpoint {
    pub url: String,
    #[serde(default)]
    pub use_auth: bool,
}

impl DatasetEndpoint {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            use_auth: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSource {
    pub dataset_id: String,
    pub endpoint: DatasetEndpoint,
}

/// Transport-independent description of data the engine wants retrieved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchIntent {
    pub perspective_id: String,
    pub token: RequestToken,
    pub target: FetchTarget,
    /// Zero-based page. Always 0 for facet values.
    pub page_index: usize,
    /// Rows per page. 0 for facet values, which are not paginated.
    pub page_size: usize,
    #[serde(default)]
    pub facet_selections: FacetSelections,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

impl FetchIntent {
    /// Build the completion that answers this intent.
    #[must_use]
    pub fn complete(&self, outcome: FetchOutcome) -> FetchCompletion {
        FetchCompletion {
            perspective_id: self.perspective_id.clone(),
            token: self.token,
            target: self.target.clone(),
            outcome,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacetValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub count: u64,
}

impl FacetValue {
    #[must_use]
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            label: None,
            count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPage {
    pub dataset_id: String,
    #[serde(default)]
    pub rows: Vec<Record>,
    pub total_results: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            details: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FetchOutcome {
    Page {
        #[serde(default)]
        rows: Vec<Record>,
        #[serde(rename = "totalResults")]
        total_results: u64,
    },
    Federated {
        datasets: Vec<DatasetPage>,
    },
    FacetValues {
        values: Vec<FacetValue>,
    },
    Failed {
        error: ErrorInfo,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchCompletion {
    pub perspective_id: String,
    pub token: RequestToken,
    pub target: FetchTarget,
    pub outcome: FetchOutcome,
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn intent_uses_camel_case_wire_names() {
        let intent = FetchIntent {
            perspective_id: "manuscripts".to_string(),
            token: RequestToken::new(3),
            target: FetchTarget::ResultClass {
                result_class: "manuscripts".to_string(),
            },
            page_index: 2,
            page_size: 5,
            facet_selections: FacetSelections::new(),
            sort: None,
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            value,
            json!({
                "perspectiveId": "manuscripts",
                "token": 3,
                "target": { "kind": "resultClass", "resultClass": "manuscripts" },
                "pageIndex": 2,
                "pageSize": 5,
                "facetSelections": {}
            })
        );
    }

    #[test]
    fn completion_echoes_intent_header() {
        let intent = FetchIntent {
            perspective_id: "letters".to_string(),
            token: RequestToken::new(9),
            target: FetchTarget::FacetValues {
                property: "creationPlace".to_string(),
                constrain_self: true,
            },
            page_index: 0,
            page_size: 0,
            facet_selections: FacetSelections::new(),
            sort: None,
        };
        let completion = intent.complete(FetchOutcome::FacetValues {
            values: vec![FacetValue::new("paris", 4)],
        });
        assert_eq!(completion.token, intent.token);
        assert_eq!(completion.target, intent.target);
        assert_eq!(completion.perspective_id, "letters");
    }

    #[test]
    fn failed_outcome_parses_from_wire() {
        let raw = r#"{"status":"failed","error":{"message":"endpoint down","status":503}}"#;
        let outcome: FetchOutcome = serde_json::from_str(raw).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Failed {
                error: ErrorInfo {
                    message: "endpoint down".to_string(),
                    status: Some(503),
                    details: None,
                }
            }
        );
    }

    #[test]
    fn dataset_target_carries_endpoints() {
        let target = FetchTarget::Datasets {
            datasets: vec![
                DatasetSource {
                    dataset_id: "tgn".to_string(),
                    endpoint: DatasetEndpoint {
                        url: "http://tgn".to_string(),
                        use_auth: true,
                    },
                },
                DatasetSource {
                    dataset_id: "pnr".to_string(),
                    endpoint: DatasetEndpoint::new("http://pnr"),
                },
            ],
        };
        assert_eq!(target.dataset_ids(), vec!["tgn", "pnr"]);
        assert_eq!(
            serde_json::to_value(&target).unwrap()["datasets"][0],
            json!({ "datasetId": "tgn", "endpoint": { "url": "http://tgn", "useAuth": true } })
        );
        assert!(FetchTarget::FullText {
            query: "paris".to_string(),
            properties: Vec::new(),
        }
        .dataset_ids()
        .is_empty());
    }

    #[test]
    fn sort_direction_toggles() {
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.toggled(), SortDirection::Asc);
    }
}
