//! # Portal Search
//!
//! Client-side state engine for a faceted search portal. A loaded
//! [`portal_config::PortalConfig`] is turned into keyed slices; actions move
//! them through their fetch lifecycles and emit transport-independent
//! [`portal_protocol::FetchIntent`]s.
//!
//! ## Layout
//!
//! ```text
//! PortalConfig
//!     │
//!     └──> ReducerRegistry (one factory per search mode)
//!            │
//!            ├─> faceted-search   <id>, <id>Facets, <id>FacetsConstrainSelf
//!            ├─> federated-search <id>
//!            ├─> full-text-search <id>
//!            └─> instance page    <id>
//!                   │
//!                   └─> Store  (+ error, options, leafletMap, animation)
//!                          │
//!                          └─> StoreDriver ──> Fetcher ──> completions
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use portal_config::{PortalConfig, SliceDefaults};
//! use portal_search::{Action, ReducerRegistry};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let portal = PortalConfig::load_dir(Path::new("configs"))?;
//!     let mut store = ReducerRegistry::new(SliceDefaults::default()).build(&portal)?;
//!
//!     let dispatch = store.dispatch(&Action::PageChanged {
//!         perspective_id: "manuscripts".to_string(),
//!         page: 1,
//!     })?;
//!     for intent in dispatch.intents() {
//!         println!("fetch {} page {}", intent.perspective_id, intent.page_index);
//!     }
//!     Ok(())
//! }
//! ```

mod action;
mod driver;
mod error;
mod facets;
mod federated;
mod full_text;
mod globals;
mod perspective;
mod registry;
mod results;
mod seed;
mod store;
mod timecode;
mod token;

pub use action::{Action, Dispatch};
pub use driver::{DriverSnapshot, Fetcher, StoreDriver};
pub use error::{Result, StateError};
pub use facets::{ConstrainSelfSlice, FacetState, FacetsSlice, FacetsState, SelectionChange, Selections};
pub use federated::{FederatedSearchSlice, FederatedSearchState};
pub use full_text::{FullTextSearchSlice, FullTextSearchState};
pub use globals::{
    AnimationFlags, ErrorRecord, GlobalSlices, MapViewport, ANIMATION_KEY, ERROR_KEY, GLOBAL_KEYS,
    MAP_VIEWPORT_KEY, OPTIONS_KEY,
};
pub use perspective::{
    constrain_self_key, facets_key, FacetedSearch, PerspectiveSlices, CONSTRAIN_SELF_SUFFIX,
    FACETS_SUFFIX,
};
pub use registry::ReducerRegistry;
pub use results::{FetchStatus, ResultsSlice, ResultsState};
pub use seed::{FacetSeed, FacetsSeed, FederatedSeed, FullTextSeed, ResultsSeed};
pub use store::{RootState, SliceState, Store};
pub use timecode::{TableOfContents, TocPart};
