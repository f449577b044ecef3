use portal_protocol::SortOrder;

/// Rows per page when neither the perspective nor the caller says otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Defaults merged under a perspective's own configuration when seeding a slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsDefaults {
    pub page_size: usize,
    pub sort: Option<SortOrder>,
}

impl Default for ResultsDefaults {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

/// Process-wide defaults, one entry per slice family.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SliceDefaults {
    pub results: ResultsDefaults,
    pub federated: ResultsDefaults,
    pub full_text: ResultsDefaults,
}

impl SliceDefaults {
    /// Same page size for every slice family.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        let results = ResultsDefaults {
            page_size: page_size.max(1),
            sort: None,
        };
        Self {
            results: results.clone(),
            federated: results.clone(),
            full_text: results,
        }
    }
}
