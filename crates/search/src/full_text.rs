use crate::action::Dispatch;
use crate::error::Result;
use crate::results::{Commit, FetchStatus, ResultsMachine, ResultsState};
use crate::seed::FullTextSeed;
use portal_config::PropertyConfig;
use portal_protocol::{ErrorInfo, FacetSelections, FetchTarget, Record, RequestToken};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextSearchState {
    #[serde(flatten)]
    pub results: ResultsState,
    pub query: String,
}

/// Paginated results of a free-text query over the perspective's properties.
#[derive(Debug, Clone)]
pub struct FullTextSearchSlice {
    machine: ResultsMachine,
    properties: Vec<PropertyConfig>,
    query: String,
}

impl FullTextSearchSlice {
    #[must_use]
    pub fn new(seed: FullTextSeed) -> Self {
        Self {
            machine: ResultsMachine::new(&seed.results),
            properties: seed.results.properties,
            query: String::new(),
        }
    }

    #[must_use]
    pub fn perspective_id(&self) -> &str {
        self.machine.perspective_id()
    }

    fn fetch(&mut self, page: usize) -> Dispatch {
        let token = self.machine.begin(page);
        let target = FetchTarget::FullText {
            query: self.query.clone(),
            properties: self.properties.iter().map(|p| p.id.clone()).collect(),
        };
        let intent = self.machine.intent(token, target, &FacetSelections::new());
        Dispatch::Applied(vec![intent])
    }

    pub fn change_query(&mut self, query: &str) -> Dispatch {
        let query = query.trim();
        if query == self.query && self.machine.status() != FetchStatus::Idle {
            return Dispatch::Ignored;
        }
        self.query = query.to_string();
        if self.query.is_empty() {
            self.machine.settle_empty();
            return Dispatch::applied();
        }
        self.fetch(0)
    }

    pub fn change_page(&mut self, page: usize) -> Result<Dispatch> {
        if self.query.is_empty() {
            log::debug!("No query for '{}'; page change ignored", self.perspective_id());
            return Ok(Dispatch::Ignored);
        }
        if self.machine.is_duplicate(page) {
            return Ok(Dispatch::Ignored);
        }
        self.machine.check_page(page)?;
        Ok(self.fetch(page))
    }

    pub fn change_sort(&mut self, property: &str) -> Dispatch {
        self.machine.toggle_sort(property);
        if self.query.is_empty() {
            return Dispatch::applied();
        }
        self.fetch(0)
    }

    pub fn request_current(&mut self) -> Dispatch {
        let page = self.machine.page();
        if self.query.is_empty() || self.machine.is_duplicate(page) {
            return Dispatch::Ignored;
        }
        self.fetch(page)
    }

    pub fn fetch_succeeded(&mut self, token: RequestToken, rows: Vec<Record>, total_results: u64) -> Dispatch {
        match self.machine.commit(token, rows, total_results) {
            Commit::Stale => Dispatch::Discarded,
            Commit::Committed => Dispatch::applied(),
            Commit::Clamped(page) => self.fetch(page),
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
    pub fn state(&self) -> FullTextSearchState {
        FullTextSearchState {
            results: ResultsState {
                properties: self.properties.clone(),
                ..self.machine.state()
            },
            query: self.query.clone(),
        }
    }
}
