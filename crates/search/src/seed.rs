//! Typed initial states.
//!
//! Each seed is built from a perspective's configuration merged over the
//! process-wide [`SliceDefaults`]: perspective values win, defaults fill the
//! gaps. The configuration itself is only read.

use crate::error::Result;
use indexmap::IndexMap;
use portal_config::{
    ConfigError, FacetConfig, PaginationConfig, PerspectiveConfig, PropertyConfig,
    ResultsDefaults, SliceDefaults,
};
use portal_protocol::{DatasetSource, SortOrder};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsSeed {
    pub perspective_id: String,
    pub page_size: usize,
    pub sort: Option<SortOrder>,
    pub result_classes: Vec<String>,
    pub active_result_class: Option<String>,
    pub properties: Vec<PropertyConfig>,
    pub maps: Vec<String>,
}

impl ResultsSeed {
    fn merged(
        perspective_id: &str,
        defaults: &ResultsDefaults,
        pagination: Option<&PaginationConfig>,
    ) -> Self {
        let page_size = pagination
            .and_then(|p| p.page_size)
            .unwrap_or(defaults.page_size)
            .max(1);
        let sort = pagination
            .and_then(|p| p.sort.clone())
            .or_else(|| defaults.sort.clone());
        Self {
            perspective_id: perspective_id.to_string(),
            page_size,
            sort,
            result_classes: Vec::new(),
            active_result_class: None,
            properties: Vec::new(),
            maps: Vec::new(),
        }
    }

    /// Faceted search pages through the perspective's own result class.
    pub fn faceted(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Result<Self> {
        let pagination = config
            .active_pagination()
            .ok_or_else(|| ConfigError::MissingField {
                perspective: config.id.clone(),
                field: format!("resultClasses.{}.paginatedResultsConfig", config.id),
            })?;
        let mut seed = Self::merged(&config.id, &defaults.results, Some(pagination));
        seed.result_classes = config.result_classes.keys().cloned().collect();
        seed.active_result_class = Some(config.id.clone());
        seed.properties = config.properties.clone();
        seed.maps = config.maps.keys().cloned().collect();
        Ok(seed)
    }

    /// Instance pages take pagination from the defaults only.
    #[must_use]
    pub fn instance_page(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Self {
        let mut seed = Self::merged(&config.id, &defaults.results, None);
        seed.result_classes = config.result_classes.keys().cloned().collect();
        seed.active_result_class = if config.result_classes.contains_key(&config.id) {
            Some(config.id.clone())
        } else {
            seed.result_classes.first().cloned()
        };
        seed.properties = config.properties.clone();
        seed
    }
}

/// A facet descriptor with its runtime fields filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSeed {
    pub label: String,
    pub description: Option<String>,
    pub is_range_facet: bool,
    pub selections_set: BTreeSet<String>,
    pub is_fetching: bool,
}

impl From<&FacetConfig> for FacetSeed {
    fn from(config: &FacetConfig) -> Self {
        Self {
            label: config.label.clone(),
            description: config.description.clone(),
            is_range_facet: config.is_range_facet,
            selections_set: BTreeSet::new(),
            is_fetching: false,
        }
    }
}

fn facet_seeds(config: &PerspectiveConfig) -> IndexMap<String, FacetSeed> {
    config
        .facets
        .iter()
        .map(|(property, facet)| (property.clone(), FacetSeed::from(facet)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetsSeed {
    pub perspective_id: String,
    pub facets: IndexMap<String, FacetSeed>,
}

impl FacetsSeed {
    #[must_use]
    pub fn new(config: &PerspectiveConfig) -> Self {
        Self {
            perspective_id: config.id.clone(),
            facets: facet_seeds(config),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedSeed {
    pub results: ResultsSeed,
    /// Datasets in declaration order; all start enabled.
    pub datasets: Vec<DatasetSource>,
    pub maps: IndexMap<String, bool>,
    pub facets: IndexMap<String, FacetSeed>,
}

impl FederatedSeed {
    #[must_use]
    pub fn new(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Self {
        let mut results = ResultsSeed::merged(
            &config.id,
            &defaults.federated,
            config.federated_results_config.as_ref(),
        );
        results.properties = config.properties.clone();
        results.maps = config.maps.keys().cloned().collect();
        Self {
            results,
            datasets: config
                .datasets
                .iter()
                .map(|(id, dataset)| DatasetSource {
                    dataset_id: id.clone(),
                    endpoint: dataset.endpoint.clone(),
                })
                .collect(),
            maps: config
                .maps
                .iter()
                .map(|(id, map)| (id.clone(), map.visible))
                .collect(),
            facets: facet_seeds(config),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullTextSeed {
    pub results: ResultsSeed,
}

impl FullTextSeed {
    #[must_use]
    pub fn new(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Self {
        let mut results = ResultsSeed::merged(&config.id, &defaults.full_text, None);
        results.properties = config.properties.clone();
        Self { results }
    }
}
