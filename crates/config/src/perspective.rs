use crate::error::{ConfigError, Result};
use crate::parse::{from_value, parse_document};
use indexmap::IndexMap;
use portal_protocol::{DatasetEndpoint, SortDirection, SortOrder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a search perspective behaves. Closed set: adding a mode is a
/// compile-time-checked change everywhere the mode is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    FacetedSearch,
    FederatedSearch,
    FullTextSearch,
}

impl SearchMode {
    pub const ALL: [Self; 3] = [Self::FacetedSearch, Self::FederatedSearch, Self::FullTextSearch];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FacetedSearch => "faceted-search",
            Self::FederatedSearch => "federated-search",
            Self::FullTextSearch => "full-text-search",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|mode| mode.as_str() == raw)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a perspective was declared in the portal config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerspectiveKind {
    /// Listed under `searchPerspectives`; must declare a `searchMode`.
    Search,
    /// Listed under `onlyInstancePages`; detail pages with no interactive facets.
    InstancePage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaginationConfig {
    pub page_size: Option<usize>,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultClassConfig {
    pub paginated_results_config: Option<PaginationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetConfig {
    pub label: String,
    pub description: Option<String>,
    pub is_range_facet: bool,
}

/// Display keys such as `label` are accepted and left to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub endpoint: DatasetEndpoint,
}

/// Only visibility matters here; `layer`, `center` and friends are renderer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Initial visibility of the layer; hidden unless configured.
    pub visible: bool,
}

/// One search perspective, validated for its declared mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveConfig {
    pub id: String,
    pub kind: PerspectiveKind,
    pub search_mode: Option<SearchMode>,
    pub result_classes: IndexMap<String, ResultClassConfig>,
    pub properties: Vec<PropertyConfig>,
    pub facets: IndexMap<String, FacetConfig>,
    pub datasets: IndexMap<String, DatasetConfig>,
    pub maps: IndexMap<String, MapConfig>,
    pub federated_results_config: Option<PaginationConfig>,
}

impl PerspectiveConfig {
    pub fn from_bytes(origin: &str, bytes: &[u8], kind: PerspectiveKind) -> Result<Self> {
        let value = parse_document(origin, bytes)?;
        Self::from_value(origin, value, kind)
    }

    pub fn from_value(origin: &str, value: serde_json::Value, kind: PerspectiveKind) -> Result<Self> {
        let raw: RawPerspective = from_value(origin, value)?;
        Self::from_raw(origin, raw, kind)
    }

    /// Pagination of the perspective's own result class, the one faceted
    /// search pages through.
    #[must_use]
    pub fn active_pagination(&self) -> Option<&PaginationConfig> {
        self.result_classes
            .get(&self.id)
            .and_then(|class| class.paginated_results_config.as_ref())
    }

    fn from_raw(origin: &str, raw: RawPerspective, kind: PerspectiveKind) -> Result<Self> {
        let id = raw
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                perspective: origin.to_string(),
                field: "id".to_string(),
            })?;

        let search_mode = match kind {
            PerspectiveKind::InstancePage => None,
            PerspectiveKind::Search => {
                let Some(mode) = raw.search_mode.as_deref() else {
                    return Err(ConfigError::MissingSearchMode { perspective: id });
                };
                let parsed = SearchMode::parse(mode).ok_or_else(|| ConfigError::UnknownSearchMode {
                    perspective: id.clone(),
                    mode: mode.to_string(),
                })?;
                Some(parsed)
            }
        };

        let has_facets = raw.facets.is_some();
        let result_classes = raw
            .result_classes
            .unwrap_or_default()
            .into_iter()
            .map(|(class_id, class)| {
                let field = format!("resultClasses.{class_id}.paginatedResultsConfig.pagesize");
                let paginated = class
                    .paginated_results_config
                    .map(|p| p.into_config(&id, &field))
                    .transpose()?;
                Ok((
                    class_id,
                    ResultClassConfig {
                        paginated_results_config: paginated,
                    },
                ))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let federated_results_config = raw
            .federated_results_config
            .map(|p| p.into_config(&id, "federatedResultsConfig.pagesize"))
            .transpose()?;

        let properties: Vec<PropertyConfig> = raw
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(RawProperty::into_config)
            .collect();

        let facets = raw
            .facets
            .unwrap_or_default()
            .into_iter()
            .map(|(property, facet)| {
                let config = FacetConfig {
                    label: facet
                        .label
                        .filter(|l| !l.trim().is_empty())
                        .unwrap_or_else(|| property.clone()),
                    description: facet.description,
                    is_range_facet: facet.is_range_facet.unwrap_or(false),
                };
                (property, config)
            })
            .collect();

        let datasets = raw
            .datasets
            .unwrap_or_default()
            .into_iter()
            .map(|(dataset_id, dataset)| {
                let endpoint = dataset
                    .endpoint
                    .ok_or_else(|| ConfigError::MissingField {
                        perspective: id.clone(),
                        field: format!("datasets.{dataset_id}.endpoint"),
                    })?
                    .into_endpoint();
                Ok((
                    dataset_id,
                    DatasetConfig { endpoint },
                ))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let maps = raw
            .maps
            .unwrap_or_default()
            .into_iter()
            .map(|(map_id, map)| {
                let config = MapConfig {
                    visible: map.visible.unwrap_or(false),
                };
                (map_id, config)
            })
            .collect();

        let config = Self {
            id,
            kind,
            search_mode,
            result_classes,
            properties,
            facets,
            datasets,
            maps,
            federated_results_config,
        };
        config.require_mode_fields(has_facets)?;
        Ok(config)
    }

    fn require_mode_fields(&self, has_facets: bool) -> Result<()> {
        let missing = |field: &str| ConfigError::MissingField {
            perspective: self.id.clone(),
            field: field.to_string(),
        };

        match (self.kind, self.search_mode) {
            (PerspectiveKind::InstancePage, _) => {
                if self.result_classes.is_empty() {
                    return Err(missing("resultClasses"));
                }
            }
            (PerspectiveKind::Search, Some(SearchMode::FacetedSearch)) => {
                if self.active_pagination().is_none() {
                    return Err(missing(&format!(
                        "resultClasses.{}.paginatedResultsConfig",
                        self.id
                    )));
                }
                if !has_facets {
                    return Err(missing("facets"));
                }
            }
            (PerspectiveKind::Search, Some(SearchMode::FederatedSearch)) => {
                if self.datasets.is_empty() {
                    return Err(missing("datasets"));
                }
            }
            (PerspectiveKind::Search, Some(SearchMode::FullTextSearch)) => {
                if self.properties.is_empty() {
                    return Err(missing("properties"));
                }
            }
            (PerspectiveKind::Search, None) => {
                return Err(ConfigError::MissingSearchMode {
                    perspective: self.id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPerspective {
    id: Option<String>,
    search_mode: Option<String>,
    result_classes: Option<IndexMap<String, RawResultClass>>,
    properties: Option<Vec<RawProperty>>,
    facets: Option<IndexMap<String, RawFacet>>,
    datasets: Option<IndexMap<String, RawDataset>>,
    maps: Option<IndexMap<String, RawMap>>,
    #[serde(alias = "feredatedResultsConfig")]
    federated_results_config: Option<RawPagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResultClass {
    paginated_results_config: Option<RawPagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPagination {
    #[serde(alias = "pageSize")]
    pagesize: Option<usize>,
    sort_by: Option<String>,
    sort_direction: Option<SortDirection>,
}

impl RawPagination {
    fn into_config(self, perspective: &str, field: &str) -> Result<PaginationConfig> {
        if self.pagesize == Some(0) {
            return Err(ConfigError::InvalidPageSize {
                perspective: perspective.to_string(),
                field: field.to_string(),
            });
        }
        let sort = self
            .sort_by
            .filter(|property| !property.trim().is_empty())
            .map(|property| SortOrder {
                property,
                direction: self.sort_direction.unwrap_or_default(),
            });
        Ok(PaginationConfig {
            page_size: self.pagesize,
            sort,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProperty {
    Id(String),
    Full {
        id: String,
        label: Option<String>,
        description: Option<String>,
        #[serde(rename = "valueType")]
        value_type: Option<String>,
    },
}

impl RawProperty {
    fn into_config(self) -> PropertyConfig {
        match self {
            Self::Id(id) => PropertyConfig {
                id,
                label: None,
                description: None,
                value_type: None,
            },
            Self::Full {
                id,
                label,
                description,
                value_type,
            } => PropertyConfig {
                id,
                label,
                description,
                value_type,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFacet {
    label: Option<String>,
    description: Option<String>,
    is_range_facet: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDataset {
    endpoint: Option<RawEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEndpoint {
    Url(String),
    Full {
        url: String,
        #[serde(default, rename = "useAuth")]
        use_auth: bool,
    },
}

impl RawEndpoint {
    fn into_endpoint(self) -> DatasetEndpoint {
        match self {
            Self::Url(url) => DatasetEndpoint::new(url),
            Self::Full { url, use_auth } => DatasetEndpoint { url, use_auth },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawMap {
    visible: Option<bool>,
}
