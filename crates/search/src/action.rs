use portal_protocol::{
    DatasetPage, ErrorInfo, FacetValue, FetchCompletion, FetchIntent, FetchOutcome, FetchTarget,
    Record, RequestToken,
};
use serde::{Deserialize, Serialize};

/// Everything that can transition the store: user intents, fetch lifecycle
/// events and the few perspective-independent UI events.
///
/// Serialized as `{"type": "PAGE_CHANGED", "perspectiveId": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    PageChanged {
        perspective_id: String,
        page: usize,
    },
    ResultClassChanged {
        perspective_id: String,
        result_class: String,
    },
    SortChanged {
        perspective_id: String,
        property: String,
    },
    /// Fetch the current page again: initial load, or retry after an error.
    ResultsRequested {
        perspective_id: String,
    },
    FullTextQueryChanged {
        perspective_id: String,
        query: String,
    },
    FacetSelected {
        perspective_id: String,
        property: String,
        value: String,
    },
    FacetDeselected {
        perspective_id: String,
        property: String,
        value: String,
    },
    FacetCleared {
        perspective_id: String,
        property: String,
    },
    FacetValuesFetching {
        perspective_id: String,
        property: String,
        #[serde(default)]
        constrain_self: bool,
    },
    DatasetToggled {
        perspective_id: String,
        dataset_id: String,
    },
    MapToggled {
        perspective_id: String,
        map_id: String,
    },
    FetchSucceeded {
        perspective_id: String,
        token: RequestToken,
        #[serde(default)]
        rows: Vec<Record>,
        total_results: u64,
    },
    FederatedFetchSucceeded {
        perspective_id: String,
        token: RequestToken,
        datasets: Vec<DatasetPage>,
    },
    FetchFailed {
        perspective_id: String,
        token: RequestToken,
        error: ErrorInfo,
    },
    FacetValuesReceived {
        perspective_id: String,
        property: String,
        #[serde(default)]
        constrain_self: bool,
        token: RequestToken,
        values: Vec<FacetValue>,
    },
    FacetValuesFailed {
        perspective_id: String,
        property: String,
        #[serde(default)]
        constrain_self: bool,
        token: RequestToken,
        error: ErrorInfo,
    },
    ErrorDismissed,
    OptionChanged {
        option: String,
        value: serde_json::Value,
    },
    MapViewportChanged {
        center: [f64; 2],
        zoom: u8,
    },
    AnimationToggled,
    AnimationValueSet {
        value: i64,
    },
}

impl Action {
    /// Perspective the action is addressed to; `None` for global UI events.
    #[must_use]
    pub fn perspective_id(&self) -> Option<&str> {
        match self {
            Self::PageChanged { perspective_id, .. }
            | Self::ResultClassChanged { perspective_id, .. }
            | Self::SortChanged { perspective_id, .. }
            | Self::ResultsRequested { perspective_id }
            | Self::FullTextQueryChanged { perspective_id, .. }
            | Self::FacetSelected { perspective_id, .. }
            | Self::FacetDeselected { perspective_id, .. }
            | Self::FacetCleared { perspective_id, .. }
            | Self::FacetValuesFetching { perspective_id, .. }
            | Self::DatasetToggled { perspective_id, .. }
            | Self::MapToggled { perspective_id, .. }
            | Self::FetchSucceeded { perspective_id, .. }
            | Self::FederatedFetchSucceeded { perspective_id, .. }
            | Self::FetchFailed { perspective_id, .. }
            | Self::FacetValuesReceived { perspective_id, .. }
            | Self::FacetValuesFailed { perspective_id, .. } => Some(perspective_id),
            Self::ErrorDismissed
            | Self::OptionChanged { .. }
            | Self::MapViewportChanged { .. }
            | Self::AnimationToggled
            | Self::AnimationValueSet { .. } => None,
        }
    }

    /// Turn a network completion into the lifecycle action it stands for.
    ///
    /// A payload that doesn't fit its target (say, facet values answering a
    /// results fetch) is reported as a failure of that fetch.
    #[must_use]
    pub fn from_completion(completion: FetchCompletion) -> Self {
        let FetchCompletion {
            perspective_id,
            token,
            target,
            outcome,
        } = completion;

        match target {
            FetchTarget::FacetValues {
                property,
                constrain_self,
            } => match outcome {
                FetchOutcome::FacetValues { values } => Self::FacetValuesReceived {
                    perspective_id,
                    property,
                    constrain_self,
                    token,
                    values,
                },
                FetchOutcome::Failed { error } => Self::FacetValuesFailed {
                    perspective_id,
                    property,
                    constrain_self,
                    token,
                    error,
                },
                other => Self::FacetValuesFailed {
                    perspective_id,
                    property,
                    constrain_self,
                    token,
                    error: unexpected_payload(&other),
                },
            },
            FetchTarget::ResultClass { .. }
            | FetchTarget::Datasets { .. }
            | FetchTarget::FullText { .. } => match outcome {
                FetchOutcome::Page {
                    rows,
                    total_results,
                } => Self::FetchSucceeded {
                    perspective_id,
                    token,
                    rows,
                    total_results,
                },
                FetchOutcome::Federated { datasets } => Self::FederatedFetchSucceeded {
                    perspective_id,
                    token,
                    datasets,
                },
                FetchOutcome::Failed { error } => Self::FetchFailed {
                    perspective_id,
                    token,
                    error,
                },
                other @ FetchOutcome::FacetValues { .. } => Self::FetchFailed {
                    perspective_id,
                    token,
                    error: unexpected_payload(&other),
                },
            },
        }
    }
}

fn unexpected_payload(outcome: &FetchOutcome) -> ErrorInfo {
    let kind = match outcome {
        FetchOutcome::Page { .. } => "page",
        FetchOutcome::Federated { .. } => "federated",
        FetchOutcome::FacetValues { .. } => "facet values",
        FetchOutcome::Failed { .. } => "failure",
    };
    log::warn!("Completion carried an unexpected {kind} payload");
    ErrorInfo::new(format!("unexpected {kind} payload for this request"))
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// State changed; the returned fetches should be issued.
    Applied(Vec<FetchIntent>),
    /// Recognized, but nothing changed (duplicate request, no-op selection).
    Ignored,
    /// A completion for a superseded request; dropped.
    Discarded,
    /// No slice handles this action.
    Unhandled,
}

impl Dispatch {
    #[must_use]
    pub fn applied() -> Self {
        Self::Applied(Vec::new())
    }

    #[must_use]
    pub fn intents(&self) -> &[FetchIntent] {
        match self {
            Self::Applied(intents) => intents,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
