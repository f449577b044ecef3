use thiserror::Error;

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Configuration error: {0}")]
    Config(#[from] portal_config::ConfigError),

    #[error("Reducer key '{0}' is registered more than once")]
    DuplicateKey(String),

    #[error("Perspective '{perspective}' has no result class '{result_class}'")]
    UnknownResultClass {
        perspective: String,
        result_class: String,
    },

    #[error("Perspective '{perspective}' has no facet '{property}'")]
    UnknownFacet { perspective: String, property: String },

    #[error("Perspective '{perspective}' has no dataset '{dataset}'")]
    UnknownDataset { perspective: String, dataset: String },

    #[error("Perspective '{perspective}' has no map '{map}'")]
    UnknownMap { perspective: String, map: String },

    #[error(
        "Page {page} is out of range for perspective '{perspective}' \
         ({total_results} results, {page_size} per page)"
    )]
    PageOutOfRange {
        perspective: String,
        page: usize,
        page_size: usize,
        total_results: u64,
    },

    #[error("Store driver has shut down")]
    DriverClosed,
}
