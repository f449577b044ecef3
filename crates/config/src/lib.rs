//! # Portal Config
//!
//! Declarative description of a search portal: which perspectives exist, how
//! each one searches, and the facets, result classes, datasets and maps it
//! exposes.
//!
//! ## Layout on disk
//!
//! ```text
//! configs/
//!     ├── portalConfig.json            { portalID, perspectives: { searchPerspectives, onlyInstancePages } }
//!     └── <portalID>/perspective_configs/
//!          ├── search_perspectives/<id>.json|toml
//!          └── only_instance_pages/<id>.json|toml
//! ```
//!
//! Every document is parsed as JSON first and TOML second, then validated for
//! the perspective's declared `searchMode`. Any failure is fatal.

mod defaults;
mod error;
mod parse;
mod perspective;
mod portal;

pub use defaults::{ResultsDefaults, SliceDefaults, DEFAULT_PAGE_SIZE};
pub use error::{ConfigError, Result};
pub use perspective::{
    DatasetConfig, FacetConfig, MapConfig, PaginationConfig, PerspectiveConfig,
    PerspectiveKind, PropertyConfig, ResultClassConfig, SearchMode,
};
pub use portal::{PortalConfig, PORTAL_CONFIG_FILE};
