use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::loader::LoadFailure;
use crate::model::{Dataset, Item, FINGERPRINT_PLACEHOLDER};
use crate::output::{self, report, ViewRecord};
use crate::pipeline::{self, SortKey, StatusSet, ViewQuery};

pub const DEFAULT_SOURCE: &str = "/sitemap.json";
pub const DEFAULT_TITLE: &str = "Planetary Restoration Archive — Grandmaster Board";
pub const DEFAULT_CTA: &str = "If this moved you, let it move through you.";
pub const DEFAULT_FILTER: &str = "status:master,grand";
pub const DEFAULT_SORT: &str = "rep";

/// Raw, attribute-style settings as the host supplies them. Every field is
/// optional and textual; [`BoardConfig::from_settings`] applies defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BoardSettings {
    pub src: Option<String>,
    pub title: Option<String>,
    pub cta: Option<String>,
    pub xmr: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
}

/// Immutable view configuration, fixed for the lifetime of a mounted board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub source: String,
    pub title: String,
    pub call_to_action: String,
    pub contribution_address: Option<String>,
    pub status_filter: StatusSet,
    pub sort: SortKey,
    pub limit: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::from_settings(&BoardSettings::default())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl BoardConfig {
    pub fn from_settings(settings: &BoardSettings) -> Self {
        let filter = non_blank(settings.filter.as_deref()).unwrap_or(DEFAULT_FILTER);
        let status_filter = StatusSet::parse_filter_spec(filter).unwrap_or_else(|| {
            debug!(filter, "filter spec without status marker, using default statuses");
            StatusSet::default()
        });

        let sort_token = non_blank(settings.sort.as_deref())
            .unwrap_or(DEFAULT_SORT)
            .trim();
        let sort = SortKey::parse(sort_token).unwrap_or_else(|| {
            warn!(token = sort_token, "unknown sort token, sorting by recency");
            SortKey::ByRecency
        });

        Self {
            source: non_blank(settings.src.as_deref())
                .unwrap_or(DEFAULT_SOURCE)
                .to_string(),
            title: non_blank(settings.title.as_deref())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            call_to_action: non_blank(settings.cta.as_deref())
                .unwrap_or(DEFAULT_CTA)
                .to_string(),
            contribution_address: non_blank(settings.xmr.as_deref()).map(str::to_string),
            status_filter,
            sort,
            limit: parse_limit(settings.limit.as_deref().unwrap_or("0")),
        }
    }
}

fn limit_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").ok()).as_ref()
}

/// Leading-integer parse: `"12abc"` is 12, `"abc"` is 0, overflow clamps.
pub fn parse_limit(raw: &str) -> i64 {
    let Some(caps) = limit_re().and_then(|re| re.captures(raw)) else {
        return 0;
    };
    let digits = &caps[1];
    digits.parse::<i64>().unwrap_or_else(|_| {
        if digits.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    Search(String),
    Sort(SortKey),
    Status(StatusSet),
}

/// Live control values. Only user events change it; a new dataset does not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub sort: SortKey,
    pub statuses: StatusSet,
}

impl ViewState {
    pub fn from_config(config: &BoardConfig) -> Self {
        Self {
            query: String::new(),
            sort: config.sort,
            statuses: config.status_filter.clone(),
        }
    }

    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Search(text) => self.query = text.trim().to_lowercase(),
            ViewEvent::Sort(key) => self.sort = key,
            ViewEvent::Status(set) => self.statuses = set,
        }
    }

    pub fn view_query(&self, limit: i64) -> ViewQuery<'_> {
        ViewQuery {
            statuses: &self.statuses,
            query: &self.query,
            sort: self.sort,
            limit,
        }
    }
}

#[derive(Debug)]
pub enum LoadState {
    Pending,
    Loaded(Dataset),
    Failed(LoadFailure),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug)]
pub struct Board {
    config: BoardConfig,
    state: ViewState,
    load: LoadState,
    issued: u64,
    applied: Option<LoadTicket>,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        let state = ViewState::from_config(&config);
        Self {
            config,
            state,
            load: LoadState::Pending,
            issued: 0,
            applied: None,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Applies a finished load unless a newer one has already landed.
    /// Returns whether the outcome replaced the current dataset.
    pub fn finish_load(&mut self, ticket: LoadTicket, outcome: Result<Dataset, LoadFailure>) -> bool {
        if self.applied.is_some_and(|applied| applied > ticket) {
            warn!(ticket = ticket.0, "discarding stale load result");
            return false;
        }
        self.applied = Some(ticket);
        self.load = match outcome {
            Ok(dataset) => LoadState::Loaded(dataset),
            Err(failure) => {
                warn!(error = %failure, "load failed");
                LoadState::Failed(failure)
            }
        };
        true
    }

    pub fn fingerprint(&self) -> &str {
        match &self.load {
            LoadState::Loaded(dataset) => &dataset.bank_fingerprint,
            _ => FINGERPRINT_PLACEHOLDER,
        }
    }

    fn items(&self) -> &[Item] {
        match &self.load {
            LoadState::Loaded(dataset) => &dataset.items,
            _ => &[],
        }
    }

    /// The visible list. Before any event the view state equals the
    /// configuration (empty query), so this is also the initial derivation.
    pub fn view(&self) -> Vec<&Item> {
        pipeline::derive(self.items(), self.state.view_query(self.config.limit))
    }

    /// Handles one control event and returns the re-rendered list region.
    /// The dataset is never re-fetched.
    pub fn dispatch(&mut self, event: ViewEvent) -> String {
        debug!(?event, "view event");
        self.state.apply(event);
        self.render_list()
    }

    pub fn records(&self) -> Vec<ViewRecord> {
        output::build_records(&self.view())
    }

    pub fn render_list(&self) -> String {
        match &self.load {
            LoadState::Failed(_) => report::render_failure(&self.config.source),
            _ => report::render_list(
                &self.view(),
                &self.config.call_to_action,
                self.config.contribution_address.as_deref(),
            ),
        }
    }

    /// The whole board. A failed load replaces everything with one notice.
    pub fn render(&self) -> String {
        match &self.load {
            LoadState::Failed(_) => report::render_failure(&self.config.source),
            _ => report::render_board(
                &self.config,
                &self.state,
                self.fingerprint(),
                &self.render_list(),
            ),
        }
    }

    pub fn render_page(&self) -> String {
        report::render_page(&self.config.title, &self.render())
    }
}
