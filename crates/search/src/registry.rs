use crate::error::{Result, StateError};
use crate::facets::{ConstrainSelfSlice, FacetsSlice};
use crate::federated::FederatedSearchSlice;
use crate::full_text::FullTextSearchSlice;
use crate::globals::GLOBAL_KEYS;
use crate::perspective::{FacetedSearch, PerspectiveSlices};
use crate::results::ResultsSlice;
use crate::seed::{FacetsSeed, FederatedSeed, FullTextSeed, ResultsSeed};
use crate::store::Store;
use portal_config::{ConfigError, PerspectiveConfig, PerspectiveKind, PortalConfig, SearchMode, SliceDefaults};
use std::collections::HashSet;

type Factory = fn(&PerspectiveConfig, &SliceDefaults) -> Result<PerspectiveSlices>;

fn faceted(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Result<PerspectiveSlices> {
    let results = ResultsSlice::new(ResultsSeed::faceted(config, defaults)?);
    let seed = FacetsSeed::new(config);
    let constrain_self = ConstrainSelfSlice::new(&seed);
    Ok(PerspectiveSlices::Faceted(FacetedSearch {
        results,
        facets: FacetsSlice::new(seed),
        constrain_self,
    }))
}

fn federated(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Result<PerspectiveSlices> {
    Ok(PerspectiveSlices::Federated(FederatedSearchSlice::new(
        FederatedSeed::new(config, defaults),
    )))
}

fn full_text(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Result<PerspectiveSlices> {
    Ok(PerspectiveSlices::FullText(FullTextSearchSlice::new(
        FullTextSeed::new(config, defaults),
    )))
}

fn instance_page(config: &PerspectiveConfig, defaults: &SliceDefaults) -> Result<PerspectiveSlices> {
    Ok(PerspectiveSlices::InstancePage(ResultsSlice::new(
        ResultsSeed::instance_page(config, defaults),
    )))
}

fn factory_for(mode: SearchMode) -> Factory {
    match mode {
        SearchMode::FacetedSearch => faceted,
        SearchMode::FederatedSearch => federated,
        SearchMode::FullTextSearch => full_text,
    }
}

/// Builds the store's slices from a loaded portal configuration.
#[derive(Debug, Clone, Default)]
pub struct ReducerRegistry {
    defaults: SliceDefaults,
}

impl ReducerRegistry {
    #[must_use]
    pub const fn new(defaults: SliceDefaults) -> Self {
        Self { defaults }
    }

    /// Slices for a single perspective.
    pub fn slices_for(&self, config: &PerspectiveConfig) -> Result<PerspectiveSlices> {
        let factory: Factory = match config.kind {
            PerspectiveKind::InstancePage => instance_page,
            PerspectiveKind::Search => {
                let mode = config.search_mode.ok_or_else(|| ConfigError::MissingSearchMode {
                    perspective: config.id.clone(),
                })?;
                factory_for(mode)
            }
        };
        factory(config, &self.defaults)
    }

    pub fn build(&self, portal: &PortalConfig) -> Result<Store> {
        let mut taken: HashSet<String> = GLOBAL_KEYS.iter().map(|k| (*k).to_string()).collect();
        let mut perspectives = Vec::new();

        for config in portal.perspectives() {
            let slices = self.slices_for(config)?;
            for key in slices.keys() {
                if !taken.insert(key.clone()) {
                    return Err(StateError::DuplicateKey(key));
                }
            }
            log::debug!(
                "Registered '{}' as {}",
                config.id,
                match config.kind {
                    PerspectiveKind::InstancePage => "instance page",
                    PerspectiveKind::Search => config.search_mode.map_or("search", SearchMode::as_str),
                }
            );
            perspectives.push(slices);
        }

        log::info!(
            "Assembled store for portal '{}': {} perspectives, {} keys",
            portal.portal_id,
            perspectives.len(),
            taken.len()
        );
        Ok(Store::new(perspectives))
    }
}
