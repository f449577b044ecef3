use crate::action::Dispatch;
use crate::error::{Result, StateError};
use crate::seed::ResultsSeed;
use crate::token::TokenIssuer;
use portal_config::PropertyConfig;
use portal_protocol::selection_filters;
use portal_protocol::{
    ErrorInfo, FacetSelections, FetchIntent, FetchTarget, Record, RequestToken, SortDirection,
    SortOrder,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Success,
    Error,
}

/// Read-only view of a results-like slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsState {
    pub perspective_id: String,
    pub current_page: usize,
    pub page_size: usize,
    /// `None` until the first fetch completes.
    pub total_results: Option<u64>,
    pub rows: Vec<Record>,
    pub active_result_class: Option<String>,
    pub result_classes: Vec<String>,
    pub properties: Vec<PropertyConfig>,
    pub maps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
    pub fetch_status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
}

impl ResultsState {
    /// Number of pages implied by the known total; 0 before the first fetch.
    #[must_use]
    pub fn page_count(&self) -> usize {
        match self.total_results {
            Some(total) if total > 0 => (total as usize).div_ceil(self.page_size),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    token: RequestToken,
    page: usize,
}

/// What committing a page did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Commit {
    Stale,
    Committed,
    /// The total shrank under the current page; refetch the last valid one.
    Clamped(usize),
}

/// Pagination/fetch state machine shared by every results-like slice:
/// `idle -> fetching -> {success, error} -> fetching -> ...`.
#[derive(Debug, Clone)]
pub(crate) struct ResultsMachine {
    perspective_id: String,
    page: usize,
    page_size: usize,
    total_results: Option<u64>,
    rows: Vec<Record>,
    status: FetchStatus,
    sort: Option<SortOrder>,
    last_error: Option<ErrorInfo>,
    tokens: TokenIssuer,
    pending: Option<Pending>,
}

impl ResultsMachine {
    pub(crate) fn new(seed: &ResultsSeed) -> Self {
        Self {
            perspective_id: seed.perspective_id.clone(),
            page: 0,
            page_size: seed.page_size.max(1),
            total_results: None,
            rows: Vec::new(),
            status: FetchStatus::Idle,
            sort: seed.sort.clone(),
            last_error: None,
            tokens: TokenIssuer::default(),
            pending: None,
        }
    }

    pub(crate) fn perspective_id(&self) -> &str {
        &self.perspective_id
    }

    pub(crate) const fn page(&self) -> usize {
        self.page
    }

    pub(crate) const fn status(&self) -> FetchStatus {
        self.status
    }

    /// A page request repeating the one already in flight.
    pub(crate) fn is_duplicate(&self, page: usize) -> bool {
        self.status == FetchStatus::Fetching && self.pending.is_some_and(|p| p.page == page)
    }

    pub(crate) fn check_page(&self, page: usize) -> Result<()> {
        let Some(total) = self.total_results else {
            return Ok(());
        };
        let in_range = if total == 0 {
            page == 0
        } else {
            (page as u64).saturating_mul(self.page_size as u64) < total
        };
        if in_range {
            Ok(())
        } else {
            Err(StateError::PageOutOfRange {
                perspective: self.perspective_id.clone(),
                page,
                page_size: self.page_size,
                total_results: total,
            })
        }
    }

    /// Move to `page` and start fetching it. `total_results` is kept so
    /// pagination controls stay stable while the page loads.
    pub(crate) fn begin(&mut self, page: usize) -> RequestToken {
        let token = self.tokens.issue();
        self.page = page;
        self.status = FetchStatus::Fetching;
        self.pending = Some(Pending { token, page });
        token
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.status == FetchStatus::Fetching && self.pending.is_some_and(|p| p.token == token)
    }

    pub(crate) fn commit(&mut self, token: RequestToken, mut rows: Vec<Record>, total: u64) -> Commit {
        if !self.is_current(token) {
            log::debug!(
                "Discarding stale results {token} for '{}'",
                self.perspective_id
            );
            return Commit::Stale;
        }
        rows.truncate(self.page_size);
        self.rows = rows;
        self.total_results = Some(total);
        self.status = FetchStatus::Success;
        self.pending = None;
        self.last_error = None;

        if total == 0 {
            self.page = 0;
            return Commit::Committed;
        }
        let last_page = ((total - 1) / self.page_size as u64) as usize;
        if self.page > last_page {
            log::debug!(
                "Page {} no longer exists for '{}' ({total} results); moving to {last_page}",
                self.page,
                self.perspective_id
            );
            return Commit::Clamped(last_page);
        }
        Commit::Committed
    }

    /// Record a failure. Rows are cleared, the known total is kept.
    pub(crate) fn fail(&mut self, token: RequestToken, error: ErrorInfo) -> bool {
        if !self.is_current(token) {
            log::debug!(
                "Discarding stale failure {token} for '{}'",
                self.perspective_id
            );
            return false;
        }
        self.rows.clear();
        self.status = FetchStatus::Error;
        self.pending = None;
        self.last_error = Some(error);
        true
    }

    /// Settle on an empty result set without fetching. Anything in flight
    /// becomes stale.
    pub(crate) fn settle_empty(&mut self) {
        self.tokens.invalidate();
        self.pending = None;
        self.rows.clear();
        self.total_results = Some(0);
        self.page = 0;
        self.status = FetchStatus::Success;
        self.last_error = None;
    }

    /// Same property flips direction; a new property starts ascending.
    pub(crate) fn toggle_sort(&mut self, property: &str) {
        let direction = match &self.sort {
            Some(current) if current.property == property => current.direction.toggled(),
            _ => SortDirection::Asc,
        };
        self.sort = Some(SortOrder {
            property: property.to_string(),
            direction,
        });
    }

    pub(crate) fn intent(
        &self,
        token: RequestToken,
        target: FetchTarget,
        selections: &FacetSelections,
    ) -> FetchIntent {
        FetchIntent {
            perspective_id: self.perspective_id.clone(),
            token,
            target,
            page_index: self.page,
            page_size: self.page_size,
            facet_selections: selection_filters::normalized(selections),
            sort: self.sort.clone(),
        }
    }

    pub(crate) fn state(&self) -> ResultsState {
        ResultsState {
            perspective_id: self.perspective_id.clone(),
            current_page: self.page,
            page_size: self.page_size,
            total_results: self.total_results,
            rows: self.rows.clone(),
            active_result_class: None,
            result_classes: Vec::new(),
            properties: Vec::new(),
            maps: Vec::new(),
            sort: self.sort.clone(),
            fetch_status: self.status,
            last_error: self.last_error.clone(),
        }
    }
}

/// Paginated results of one perspective, switchable between its configured
/// result classes.
#[derive(Debug, Clone)]
pub struct ResultsSlice {
    machine: ResultsMachine,
    result_classes: Vec<String>,
    active_result_class: Option<String>,
    properties: Vec<PropertyConfig>,
    maps: Vec<String>,
}

impl ResultsSlice {
    #[must_use]
    pub fn new(seed: ResultsSeed) -> Self {
        Self {
            machine: ResultsMachine::new(&seed),
            result_classes: seed.result_classes,
            active_result_class: seed.active_result_class,
            properties: seed.properties,
            maps: seed.maps,
        }
    }

    #[must_use]
    pub fn perspective_id(&self) -> &str {
        self.machine.perspective_id()
    }

    fn target(&self) -> FetchTarget {
        FetchTarget::ResultClass {
            result_class: self
                .active_result_class
                .clone()
                .unwrap_or_else(|| self.machine.perspective_id().to_string()),
        }
    }

    fn fetch(&mut self, page: usize, selections: &FacetSelections) -> FetchIntent {
        let token = self.machine.begin(page);
        self.machine.intent(token, self.target(), selections)
    }

    pub fn change_page(&mut self, page: usize, selections: &FacetSelections) -> Result<Dispatch> {
        if self.machine.is_duplicate(page) {
            return Ok(Dispatch::Ignored);
        }
        self.machine.check_page(page)?;
        Ok(Dispatch::Applied(vec![self.fetch(page, selections)]))
    }

    /// Always restarts at page 0, even while a fetch is in flight.
    pub fn change_result_class(
        &mut self,
        result_class: &str,
        selections: &FacetSelections,
    ) -> Result<Dispatch> {
        if !self.result_classes.iter().any(|c| c == result_class) {
            return Err(StateError::UnknownResultClass {
                perspective: self.perspective_id().to_string(),
                result_class: result_class.to_string(),
            });
        }
        self.active_result_class = Some(result_class.to_string());
        Ok(Dispatch::Applied(vec![self.fetch(0, selections)]))
    }

    pub fn change_sort(&mut self, property: &str, selections: &FacetSelections) -> Dispatch {
        self.machine.toggle_sort(property);
        Dispatch::Applied(vec![self.fetch(0, selections)])
    }

    /// Refetch the current page.
    pub fn request_current(&mut self, selections: &FacetSelections) -> Dispatch {
        let page = self.machine.page();
        if self.machine.is_duplicate(page) {
            return Dispatch::Ignored;
        }
        Dispatch::Applied(vec![self.fetch(page, selections)])
    }

    /// Back to page 0 under new filters.
    pub fn restart(&mut self, selections: &FacetSelections) -> FetchIntent {
        self.fetch(0, selections)
    }

    pub fn fetch_succeeded(
        &mut self,
        token: RequestToken,
        rows: Vec<Record>,
        total_results: u64,
        selections: &FacetSelections,
    ) -> Dispatch {
        match self.machine.commit(token, rows, total_results) {
            Commit::Stale => Dispatch::Discarded,
            Commit::Committed => Dispatch::applied(),
            Commit::Clamped(page) => Dispatch::Applied(vec![self.fetch(page, selections)]),
        }
    }

    pub fn fetch_failed(&mut self, token: RequestToken, error: ErrorInfo) -> Dispatch {
        if self.machine.fail(token, error) {
            Dispatch::applied()
        } else {
            Dispatch::Discarded
        }
    }

    #[must_use]
    pub fn state(&self) -> ResultsState {
        ResultsState {
            active_result_class: self.active_result_class.clone(),
            result_classes: self.result_classes.clone(),
            properties: self.properties.clone(),
            maps: self.maps.clone(),
            ..self.machine.state()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slice(page_size: usize) -> ResultsSlice {
        ResultsSlice::new(ResultsSeed {
            perspective_id: "manuscripts".to_string(),
            page_size,
            sort: None,
            result_classes: vec!["manuscripts".to_string(), "placesMsProduced".to_string()],
            active_result_class: Some("manuscripts".to_string()),
            properties: Vec::new(),
            maps: Vec::new(),
        })
    }

    fn rows(n: usize) -> Vec<Record> {
        (0..n).map(|i| json!({ "id": format!("r{i}") })).collect()
    }

    fn token_of(dispatch: &Dispatch) -> RequestToken {
        dispatch.intents()[0].token
    }

    #[test]
    fn page_change_keeps_total_while_fetching() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let first = slice.request_current(&none);
        slice.fetch_succeeded(token_of(&first), rows(5), 12, &none);

        let dispatch = slice.change_page(2, &none).unwrap();
        let state = slice.state();
        assert_eq!(state.fetch_status, FetchStatus::Fetching);
        assert_eq!(state.current_page, 2);
        assert_eq!(state.total_results, Some(12));
        assert_eq!(dispatch.intents()[0].page_index, 2);
        assert_eq!(dispatch.intents()[0].page_size, 5);
    }

    #[test]
    fn page_beyond_known_total_is_rejected() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let first = slice.request_current(&none);
        slice.fetch_succeeded(token_of(&first), rows(5), 10, &none);

        let err = slice.change_page(2, &none).unwrap_err();
        assert!(matches!(err, StateError::PageOutOfRange { page: 2, .. }));
        assert_eq!(slice.state().fetch_status, FetchStatus::Success);
    }

    #[test]
    fn repeated_page_request_is_ignored() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        assert!(slice.change_page(0, &none).unwrap().is_applied());
        assert_eq!(slice.change_page(0, &none).unwrap(), Dispatch::Ignored);
    }

    #[test]
    fn failure_clears_rows_but_keeps_total() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let first = slice.request_current(&none);
        slice.fetch_succeeded(token_of(&first), rows(5), 12, &none);
        let second = slice.change_page(1, &none).unwrap();

        let dispatch = slice.fetch_failed(token_of(&second), ErrorInfo::new("timeout"));
        assert!(dispatch.is_applied());
        let state = slice.state();
        assert_eq!(state.fetch_status, FetchStatus::Error);
        assert!(state.rows.is_empty());
        assert_eq!(state.total_results, Some(12));
        assert_eq!(state.last_error.unwrap().message, "timeout");
    }

    #[test]
    fn empty_total_pins_page_zero() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let first = slice.request_current(&none);
        slice.fetch_succeeded(token_of(&first), Vec::new(), 0, &none);
        let state = slice.state();
        assert_eq!(state.current_page, 0);
        assert_eq!(state.total_results, Some(0));
        assert_eq!(state.page_count(), 0);
        assert!(slice.change_page(1, &none).is_err());
    }

    #[test]
    fn shrinking_total_clamps_to_last_page() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let first = slice.request_current(&none);
        slice.fetch_succeeded(token_of(&first), rows(5), 30, &none);
        let later = slice.change_page(4, &none).unwrap();

        let dispatch = slice.fetch_succeeded(token_of(&later), Vec::new(), 11, &none);
        let intents = dispatch.intents();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].page_index, 2);
        assert_eq!(slice.state().current_page, 2);
        assert_eq!(slice.state().fetch_status, FetchStatus::Fetching);
    }

    #[test]
    fn result_class_change_resets_page_even_mid_fetch() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let first = slice.request_current(&none);
        slice.fetch_succeeded(token_of(&first), rows(5), 40, &none);
        slice.change_page(3, &none).unwrap();

        let dispatch = slice.change_result_class("placesMsProduced", &none).unwrap();
        let state = slice.state();
        assert_eq!(state.current_page, 0);
        assert_eq!(state.active_result_class.as_deref(), Some("placesMsProduced"));
        assert_eq!(
            dispatch.intents()[0].target,
            FetchTarget::ResultClass {
                result_class: "placesMsProduced".to_string()
            }
        );
    }

    #[test]
    fn unknown_result_class_leaves_state_untouched() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let before = slice.state();
        assert!(slice.change_result_class("nope", &none).is_err());
        assert_eq!(slice.state(), before);
    }

    #[test]
    fn sort_toggles_direction_on_same_property() {
        let none = FacetSelections::new();
        let mut slice = slice(5);
        let asc = slice.change_sort("prefLabel", &none);
        assert_eq!(
            asc.intents()[0].sort.as_ref().unwrap().direction,
            SortDirection::Asc
        );
        let desc = slice.change_sort("prefLabel", &none);
        assert_eq!(
            desc.intents()[0].sort.as_ref().unwrap().direction,
            SortDirection::Desc
        );
    }
}
