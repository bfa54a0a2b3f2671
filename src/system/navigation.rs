//! Hierarchical navigation over system introspection functions.
//!
//! The controller owns a stack of frames. Each frame only remembers how to
//! re-fetch its level; the rows of the level currently shown live in a
//! separate `LevelView` that is replaced whenever a fetch for the top frame
//! resolves. Stack changes are committed before the fetch result is known and
//! are never rolled back on failure.

use super::fetcher::DataFetcher;
use super::row::{cell_text, Row};
use super::schema::{can_drill_down, infer_schema, Schema};
use crate::error::ApiError;
use tracing::{debug, error, warn};

/// One level of the browsing stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationFrame {
    pub function_name: String,
    /// `/`-joined drill values; `None` at the root level.
    pub nested_path: Option<String>,
}

impl NavigationFrame {
    pub fn root(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            nested_path: None,
        }
    }

    pub fn child(&self, segment: &str) -> Self {
        let nested_path = match &self.nested_path {
            Some(path) => format!("{}/{}", path, segment),
            None => segment.to_string(),
        };
        Self {
            function_name: self.function_name.clone(),
            nested_path: Some(nested_path),
        }
    }

    /// Nesting depth, 1 at the root.
    pub fn depth(&self) -> usize {
        1 + self
            .nested_path
            .as_deref()
            .map(|p| p.split('/').count())
            .unwrap_or(0)
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        let mut crumbs = vec![self.function_name.clone()];
        if let Some(path) = &self.nested_path {
            crumbs.extend(path.split('/').map(str::to_string));
        }
        crumbs
    }

    /// Backend proc path, e.g. `/transactions/5001/running`.
    pub fn full_path(&self) -> String {
        match &self.nested_path {
            Some(path) => format!("/{}/{}", self.function_name, path),
            None => format!("/{}", self.function_name),
        }
    }
}

/// A fetch issued by the controller, tagged with the frame it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: u64,
    pub frame: NavigationFrame,
}

/// A completed fetch delivered back to the controller.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub request: FetchRequest,
    pub result: Result<Vec<Row>, ApiError>,
}

/// Data for the level currently on display.
#[derive(Debug, Clone, Default)]
pub struct LevelView {
    pub frame: Option<NavigationFrame>,
    pub rows: Vec<Row>,
    pub schema: Schema,
    pub error: Option<ApiError>,
}

impl LevelView {
    fn loaded(frame: NavigationFrame, rows: Vec<Row>, schema: Schema) -> Self {
        Self {
            frame: Some(frame),
            rows,
            schema,
            error: None,
        }
    }

    fn failed(frame: NavigationFrame, error: ApiError) -> Self {
        Self {
            frame: Some(frame),
            rows: Vec::new(),
            schema: Schema::default(),
            error: Some(error),
        }
    }

    pub fn is_navigable(&self) -> bool {
        self.schema.navigable_column.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    Browsing { depth: usize },
}

/// What happened to a delivered fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The rows now back the current level.
    Applied { rows: usize },
    /// The fetch failed; the stack is left as it was.
    Failed(ApiError),
    /// The response no longer matches the current level and was dropped.
    Discarded,
}

pub struct NavigationController<F> {
    history: Vec<NavigationFrame>,
    view: LevelView,
    pending: Option<FetchRequest>,
    next_ticket: u64,
    max_depth: Option<usize>,
    fetcher: F,
}

impl<F: DataFetcher> NavigationController<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            history: Vec::new(),
            view: LevelView::default(),
            pending: None,
            next_ticket: 1,
            max_depth: None,
            fetcher,
        }
    }

    /// Cap drill-down depth; frames at `max_depth` expose no navigable column.
    /// Zero means unlimited.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = (max_depth > 0).then_some(max_depth);
        self
    }

    pub fn state(&self) -> NavigationState {
        match self.history.len() {
            0 => NavigationState::Idle,
            depth => NavigationState::Browsing { depth },
        }
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }

    pub fn is_idle(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history(&self) -> &[NavigationFrame] {
        &self.history
    }

    pub fn current_frame(&self) -> Option<&NavigationFrame> {
        self.history.last()
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        self.current_frame()
            .map(NavigationFrame::breadcrumbs)
            .unwrap_or_default()
    }

    /// The current level's data, if the latest fetch for it has resolved.
    pub fn view(&self) -> Option<&LevelView> {
        let top = self.current_frame()?;
        (self.view.frame.as_ref() == Some(top)).then_some(&self.view)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    /// Start browsing a function from its root level.
    pub fn select_root(&mut self, function_name: &str) -> FetchRequest {
        debug!(target: "navigation", "select root {}", function_name);
        let frame = NavigationFrame::root(function_name);
        self.history.clear();
        self.history.push(frame.clone());
        self.issue_fetch(frame)
    }

    /// Drill into the level identified by `row[column_key]`.
    ///
    /// Does nothing unless `column_key` is the current level's navigable
    /// column and the cell holds a non-empty value.
    pub fn drill_into(&mut self, row: &Row, column_key: &str) -> Option<FetchRequest> {
        let top = self.current_frame()?.clone();
        let view = self.view()?;

        if !view.schema.is_navigable(column_key) {
            debug!(target: "navigation", "column {} is not navigable", column_key);
            return None;
        }

        let value = cell_text(row, column_key);
        if value.is_empty() {
            debug!(target: "navigation", "empty drill value in {}", column_key);
            return None;
        }

        let child = top.child(&value);
        debug!(target: "navigation", "drill into {}", child.full_path());
        self.history.push(child.clone());
        Some(self.issue_fetch(child))
    }

    /// Pop one level. From the root level this returns to idle without fetching.
    pub fn go_back(&mut self) -> Option<FetchRequest> {
        match self.history.len() {
            0 => None,
            1 => {
                debug!(target: "navigation", "back to function list");
                self.clear();
                None
            }
            _ => {
                self.history.pop();
                let parent = self.history.last()?.clone();
                debug!(target: "navigation", "back to {}", parent.full_path());
                Some(self.issue_fetch(parent))
            }
        }
    }

    /// Re-fetch the current level without touching the stack.
    pub fn refresh_current(&mut self) -> Option<FetchRequest> {
        let top = self.current_frame()?.clone();
        debug!(target: "navigation", "refresh {}", top.full_path());
        Some(self.issue_fetch(top))
    }

    /// Leave browsing; any fetch still in flight will be discarded.
    pub fn close(&mut self) {
        self.clear();
    }

    /// Drop all navigation state. Called whenever the active cluster changes.
    pub fn reset_on_context_change(&mut self) {
        debug!(target: "navigation", "context changed, resetting navigation");
        self.clear();
    }

    /// Deliver a completed fetch.
    pub fn resolve(&mut self, outcome: FetchOutcome) -> Resolution {
        let FetchOutcome { request, result } = outcome;

        if !self.is_current(&request) {
            warn!(
                target: "navigation",
                "discarding stale response #{} for {}",
                request.ticket,
                request.frame.full_path()
            );
            return Resolution::Discarded;
        }
        self.pending = None;

        match result {
            Ok(rows) => {
                let drill_allowed = self
                    .max_depth
                    .map_or(true, |max| request.frame.depth() < max);
                let schema = infer_schema(
                    &rows,
                    can_drill_down(&request.frame.function_name),
                    drill_allowed,
                );
                let count = rows.len();
                debug!(
                    target: "navigation",
                    "loaded {} rows for {} (navigable: {:?})",
                    count,
                    request.frame.full_path(),
                    schema.navigable_column
                );
                self.view = LevelView::loaded(request.frame, rows, schema);
                Resolution::Applied { rows: count }
            }
            Err(err) => {
                error!(
                    target: "navigation",
                    "failed to load {}: {}",
                    request.frame.full_path(),
                    err
                );
                self.view = LevelView::failed(request.frame, err.clone());
                Resolution::Failed(err)
            }
        }
    }

    fn is_current(&self, request: &FetchRequest) -> bool {
        self.pending.as_ref() == Some(request) && self.current_frame() == Some(&request.frame)
    }

    fn issue_fetch(&mut self, frame: NavigationFrame) -> FetchRequest {
        let request = FetchRequest {
            ticket: self.next_ticket,
            frame,
        };
        self.next_ticket += 1;
        self.pending = Some(request.clone());
        self.fetcher.submit(request.clone());
        request
    }

    fn clear(&mut self) {
        self.history.clear();
        self.view = LevelView::default();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        submitted: Vec<FetchRequest>,
    }

    impl DataFetcher for Recorder {
        fn submit(&mut self, request: FetchRequest) {
            self.submitted.push(request);
        }
    }

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn ok(request: FetchRequest, value: serde_json::Value) -> FetchOutcome {
        FetchOutcome {
            request,
            result: Ok(rows(value)),
        }
    }

    #[test]
    fn test_frame_paths() {
        let root = NavigationFrame::root("transactions");
        assert_eq!(root.depth(), 1);
        assert_eq!(root.full_path(), "/transactions");

        let child = root.child("5001").child("running");
        assert_eq!(child.nested_path.as_deref(), Some("5001/running"));
        assert_eq!(child.depth(), 3);
        assert_eq!(child.breadcrumbs(), vec!["transactions", "5001", "running"]);
        assert_eq!(child.full_path(), "/transactions/5001/running");
    }

    #[test]
    fn test_select_root_from_any_state() {
        let mut nav = NavigationController::new(Recorder::default());
        assert_eq!(nav.state(), NavigationState::Idle);

        let req = nav.select_root("transactions");
        assert_eq!(nav.state(), NavigationState::Browsing { depth: 1 });
        assert_eq!(req.frame, NavigationFrame::root("transactions"));
        assert!(nav.is_loading());

        nav.resolve(ok(req, json!([{"TransactionId": "5001"}])));
        let first = nav.view().unwrap().rows[0].clone();
        nav.drill_into(&first, "TransactionId");
        assert_eq!(nav.depth(), 2);

        nav.select_root("dbs");
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.current_frame(), Some(&NavigationFrame::root("dbs")));
        assert!(nav.view().is_none());
    }

    #[test]
    fn test_drill_requires_loaded_view() {
        let mut nav = NavigationController::new(Recorder::default());
        nav.select_root("transactions");
        let row = rows(json!([{"TransactionId": "5001"}])).remove(0);

        assert!(nav.drill_into(&row, "TransactionId").is_none());
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.fetcher().submitted.len(), 1);
    }

    #[test]
    fn test_refresh_keeps_stack() {
        let mut nav = NavigationController::new(Recorder::default());
        assert!(nav.refresh_current().is_none());

        let first = nav.select_root("jobs");
        let second = nav.refresh_current().unwrap();
        assert_eq!(nav.depth(), 1);
        assert_eq!(second.frame, first.frame);
        assert!(second.ticket > first.ticket);

        // The superseded fetch for the same frame is dropped.
        assert_eq!(nav.resolve(ok(first, json!([]))), Resolution::Discarded);
        assert_eq!(
            nav.resolve(ok(second, json!([{"JobId": "1"}]))),
            Resolution::Applied { rows: 1 }
        );
    }

    #[test]
    fn test_failed_fetch_keeps_stack() {
        let mut nav = NavigationController::new(Recorder::default());
        let req = nav.select_root("transactions");
        nav.resolve(ok(req, json!([{"TransactionId": "5001"}])));
        let row = nav.view().unwrap().rows[0].clone();

        let child = nav.drill_into(&row, "TransactionId").unwrap();
        let err = ApiError::Transport("connection refused".to_string());
        let resolution = nav.resolve(FetchOutcome {
            request: child,
            result: Err(err.clone()),
        });

        assert_eq!(resolution, Resolution::Failed(err.clone()));
        assert_eq!(nav.depth(), 2);
        let view = nav.view().unwrap();
        assert!(view.rows.is_empty());
        assert_eq!(view.error, Some(err));
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_max_depth_stops_navigation() {
        let mut nav = NavigationController::new(Recorder::default()).with_max_depth(2);
        let req = nav.select_root("dbs");
        nav.resolve(ok(req, json!([{"DbId": "10"}])));
        let row = nav.view().unwrap().rows[0].clone();

        let child = nav.drill_into(&row, "DbId").unwrap();
        nav.resolve(ok(child, json!([{"TableId": "20"}])));
        assert!(!nav.view().unwrap().is_navigable());

        let row = nav.view().unwrap().rows[0].clone();
        assert!(nav.drill_into(&row, "TableId").is_none());
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn test_response_after_reset_is_discarded() {
        let mut nav = NavigationController::new(Recorder::default());
        let req = nav.select_root("transactions");
        nav.reset_on_context_change();

        assert_eq!(nav.resolve(ok(req, json!([{"a": 1}]))), Resolution::Discarded);
        assert!(nav.is_idle());
        assert!(nav.view().is_none());
    }
}
