use crate::api_client::ApiClient;
use crate::cluster_context::ClusterContext;
use crate::config::config::Config;
use crate::help_text::HelpText;
use crate::system::catalog::{CategoryGroup, FunctionCatalog, FunctionDescriptor, FunctionKey};
use crate::system::catalog_store::ConsoleCatalogStore;
use crate::system::dispatch::{dispatch, Dispatch, FlatResult};
use crate::system::fetcher::{FetchInbox, HttpFetcher};
use crate::system::navigation::{FetchRequest, NavigationController, Resolution};
use crate::system::render_spec::TableRenderSpec;
use crate::system::row::Row;
use crate::table_display::export_to_csv;
use crate::ui::table_renderer::build_table;
use crate::utils::app_paths::AppPaths;
use crate::utils::logging::LogRingBuffer;
use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tui_input::{backend::crossterm::EventHandler, Input};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppMode {
    Catalog,
    Search,
    Level,
    Flat,
}

/// One line of the function list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Category {
        name: String,
        shown: usize,
        total: usize,
    },
    Function(FunctionKey),
}

/// Flatten groups into list lines: a header per category followed by its functions.
pub fn catalog_entries(groups: &[CategoryGroup]) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    for group in groups {
        entries.push(CatalogEntry::Category {
            name: group.name.clone(),
            shown: group.functions.len(),
            total: group.total,
        });
        entries.extend(
            group
                .functions
                .iter()
                .map(|f| CatalogEntry::Function(f.key.clone())),
        );
    }
    entries
}

/// Step a selection by `delta`, wrapping at both ends.
pub fn step_selection(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).rem_euclid(len as isize) as usize
}

struct DrillTarget {
    row: Row,
    column: String,
}

pub struct ConsoleApp {
    config: Config,
    api: ApiClient,
    store: ConsoleCatalogStore,
    catalog: FunctionCatalog,
    navigation: NavigationController<HttpFetcher>,
    inbox: FetchInbox,
    context: ClusterContext,
    mode: AppMode,
    flat: Option<FlatResult>,
    entries: Vec<CatalogEntry>,
    list_state: ListState,
    show_all: bool,
    search: Input,
    table_state: TableState,
    selected_column: usize,
    show_help: bool,
    show_logs: bool,
    log_buffer: LogRingBuffer,
    status_message: String,
}

impl ConsoleApp {
    pub fn new(config: Config, log_buffer: LogRingBuffer) -> Result<Self> {
        let api = ApiClient::new(&config.server)?;
        let store = ConsoleCatalogStore::new(api.clone(), AppPaths::catalog_prefs_file()?)?;
        let (fetcher, inbox) = HttpFetcher::new(&config.server)?;
        let navigation = NavigationController::new(fetcher).with_max_depth(config.browser.max_depth);

        let mut context = ClusterContext::new();
        let mut status_message = "Ready - Enter opens a function, F1 for help".to_string();
        if let Err(e) = context.sync(&api) {
            warn!(target: "cluster", "could not determine active cluster: {}", e);
            status_message = format!("Error: {}", e);
        }

        let (catalog, error) = store.load_catalog(config.browser.compact_category_limit);
        if let Some(e) = error {
            status_message = format!("Showing built-in functions only: {}", e);
        }

        let mut app = Self {
            config,
            api,
            store,
            catalog,
            navigation,
            inbox,
            context,
            mode: AppMode::Catalog,
            flat: None,
            entries: Vec::new(),
            list_state: ListState::default(),
            show_all: false,
            search: Input::default(),
            table_state: TableState::default(),
            selected_column: 0,
            show_help: false,
            show_logs: false,
            log_buffer,
            status_message,
        };
        app.rebuild_entries(None);
        Ok(app)
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let poll_interval = Duration::from_millis(self.config.browser.poll_interval_ms.max(10));

        loop {
            self.drain_fetches();
            terminal.draw(|f| self.ui(f))?;

            if !event::poll(poll_interval)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && self.handle_key(key)? {
                    break;
                }
            }
        }
        Ok(())
    }

    fn drain_fetches(&mut self) {
        for outcome in self.inbox.drain() {
            match self.navigation.resolve(outcome) {
                Resolution::Applied { rows } => {
                    self.table_state.select((rows > 0).then_some(0));
                    self.selected_column = self
                        .navigation
                        .view()
                        .and_then(|v| {
                            let link = v.schema.navigable_column.as_deref()?;
                            v.schema.columns.iter().position(|c| c == link)
                        })
                        .unwrap_or(0);
                    self.status_message = format!(
                        "{} - {} rows",
                        self.breadcrumb_text(),
                        rows
                    );
                }
                Resolution::Failed(e) => {
                    self.table_state.select(None);
                    self.status_message = format!("Error: {}", e);
                }
                Resolution::Discarded => {}
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        match key.code {
            KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return Ok(false);
            }
            KeyCode::F(5) => {
                self.show_logs = !self.show_logs;
                return Ok(false);
            }
            _ => {}
        }

        if self.show_help || self.show_logs {
            if key.code == KeyCode::Esc {
                self.show_help = false;
                self.show_logs = false;
            }
            return Ok(false);
        }

        match self.mode {
            AppMode::Catalog => return self.handle_catalog_key(key),
            AppMode::Search => self.handle_search_key(key),
            AppMode::Level => self.handle_level_key(key),
            AppMode::Flat => self.handle_flat_key(key),
        }
        Ok(false)
    }

    fn handle_catalog_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('/') => {
                self.mode = AppMode::Search;
                self.search = Input::default();
                self.rebuild_entries(None);
                self.status_message = "Search: type to filter, Enter opens, Esc cancels".to_string();
            }
            KeyCode::Char('a') => {
                self.show_all = !self.show_all;
                let keep = self.selected_key();
                self.rebuild_entries(keep);
            }
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Char('J') => self.move_function(1),
            KeyCode::Char('K') => self.move_function(-1),
            KeyCode::Char('[') => self.move_category(-1),
            KeyCode::Char(']') => self.move_category(1),
            KeyCode::Char('<') => self.transfer_function(-1),
            KeyCode::Char('>') => self.transfer_function(1),
            KeyCode::Char('D') => self.delete_selected(),
            KeyCode::Char('r') => self.reload_catalog(),
            KeyCode::Char('c') => self.cycle_cluster(),
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = AppMode::Catalog;
                self.search = Input::default();
                self.rebuild_entries(None);
                self.status_message = "Search cancelled".to_string();
            }
            KeyCode::Enter => self.open_selected(),
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            _ => {
                self.search.handle_event(&Event::Key(key));
                self.rebuild_entries(None);
            }
        }
    }

    fn handle_level_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_row(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_row(1),
            KeyCode::PageUp => self.move_row(-10),
            KeyCode::PageDown => self.move_row(10),
            KeyCode::Left | KeyCode::Char('h') => self.move_column(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_column(1),
            KeyCode::Enter => self.drill_selected(),
            KeyCode::Backspace | KeyCode::Esc => self.go_back(),
            KeyCode::Char('r') => {
                if self.sync_context() {
                    return;
                }
                if let Some(request) = self.navigation.refresh_current() {
                    self.loading(&request);
                }
            }
            KeyCode::Char('e') => self.export_current(),
            KeyCode::Char('c') => self.cycle_cluster(),
            _ => {}
        }
    }

    fn handle_flat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_row(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_row(1),
            KeyCode::PageUp => self.move_row(-10),
            KeyCode::PageDown => self.move_row(10),
            KeyCode::Left | KeyCode::Char('h') => self.move_column(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_column(1),
            KeyCode::Backspace | KeyCode::Esc => self.back_to_catalog(),
            KeyCode::Char('e') => self.export_current(),
            KeyCode::Char('c') => self.cycle_cluster(),
            _ => {}
        }
    }

    fn rebuild_entries(&mut self, keep: Option<FunctionKey>) {
        self.entries = if self.mode == AppMode::Search {
            self.catalog
                .search(self.search.value())
                .into_iter()
                .map(|f| CatalogEntry::Function(f.key.clone()))
                .collect()
        } else if self.show_all {
            catalog_entries(&self.catalog.groups())
        } else {
            catalog_entries(&self.catalog.compact_groups())
        };

        let position = keep
            .and_then(|key| {
                self.entries
                    .iter()
                    .position(|e| matches!(e, CatalogEntry::Function(k) if *k == key))
            })
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|e| matches!(e, CatalogEntry::Function(_)))
            });
        self.list_state.select(position);
    }

    fn move_selection(&mut self, delta: isize) {
        let current = self.list_state.selected().unwrap_or(0);
        self.list_state
            .select(Some(step_selection(current, delta, self.entries.len())));
    }

    fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.entries.get(self.list_state.selected()?)
    }

    fn selected_key(&self) -> Option<FunctionKey> {
        match self.selected_entry()? {
            CatalogEntry::Function(key) => Some(key.clone()),
            CatalogEntry::Category { .. } => None,
        }
    }

    fn selected_function(&self) -> Option<FunctionDescriptor> {
        let key = self.selected_key()?;
        self.catalog.get(&key).cloned()
    }

    /// Category of the selected line, header or function.
    fn selected_category(&self) -> Option<String> {
        match self.selected_entry()? {
            CatalogEntry::Category { name, .. } => Some(name.clone()),
            CatalogEntry::Function(key) => self.catalog.get(key).map(|f| f.category.clone()),
        }
    }

    /// Position of the selected function inside its category, in persisted order.
    fn selected_position(&self) -> Option<(usize, String, usize)> {
        let key = self.selected_key()?;
        self.catalog
            .ordered_groups()
            .iter()
            .enumerate()
            .find_map(|(group_index, group)| {
                group
                    .functions
                    .iter()
                    .position(|f| f.key == key)
                    .map(|i| (group_index, group.name.clone(), i))
            })
    }

    fn open_selected(&mut self) {
        let Some(function) = self.selected_function() else {
            return;
        };
        if self.sync_context() {
            return;
        }
        info!(target: "console", "opening {}", function.name);

        match dispatch(&function, &mut self.navigation, &self.api) {
            Dispatch::Browse(request) => {
                self.mode = AppMode::Level;
                self.loading(&request);
            }
            Dispatch::Flat(result) => {
                self.status_message = match &result.error {
                    Some(e) => format!("Error: {}", e),
                    None => format!("{} - {} rows", result.function_name, result.rows.len()),
                };
                self.table_state.select((!result.rows.is_empty()).then_some(0));
                self.selected_column = 0;
                self.flat = Some(result);
                self.mode = AppMode::Flat;
            }
        }
    }

    fn loading(&mut self, request: &FetchRequest) {
        self.table_state.select(None);
        self.status_message = format!("Loading {}...", request.frame.full_path());
    }

    fn toggle_favorite(&mut self) {
        let Some(key) = self.selected_key() else {
            return;
        };
        match self.catalog.toggle_favorite(&key, &mut self.store) {
            Ok(true) => self.status_message = "Added to favorites".to_string(),
            Ok(false) => self.status_message = "Removed from favorites".to_string(),
            Err(e) => self.status_message = format!("Error: {}", e),
        }
        self.rebuild_entries(Some(key));
    }

    fn move_function(&mut self, delta: isize) {
        let Some((_, category, index)) = self.selected_position() else {
            return;
        };
        let Some(target) = index.checked_add_signed(delta) else {
            return;
        };
        let key = self.selected_key();
        if let Err(e) = self
            .catalog
            .move_function(&category, index, target, &mut self.store)
        {
            self.status_message = format!("Cannot move: {}", e);
        }
        self.rebuild_entries(key);
    }

    fn move_category(&mut self, delta: isize) {
        let Some(category) = self.selected_category() else {
            return;
        };
        let groups = self.catalog.ordered_groups();
        let Some(index) = groups.iter().position(|g| g.name == category) else {
            return;
        };
        let Some(target) = index.checked_add_signed(delta) else {
            return;
        };
        let key = self.selected_key();
        if let Err(e) = self.catalog.move_category(index, target, &mut self.store) {
            self.status_message = format!("Cannot move: {}", e);
        }
        self.rebuild_entries(key);
    }

    fn transfer_function(&mut self, delta: isize) {
        let Some((group_index, category, index)) = self.selected_position() else {
            return;
        };
        let groups = self.catalog.ordered_groups();
        let Some(target) = group_index
            .checked_add_signed(delta)
            .and_then(|i| groups.get(i))
        else {
            return;
        };
        let key = self.selected_key();
        match self.catalog.transfer_function(
            &category,
            index,
            &target.name,
            target.functions.len(),
            &mut self.store,
        ) {
            Ok(()) => self.status_message = format!("Moved to {}", target.name),
            Err(e) => self.status_message = format!("Cannot move: {}", e),
        }
        self.rebuild_entries(key);
    }

    fn delete_selected(&mut self) {
        let result = match self.selected_entry().cloned() {
            Some(CatalogEntry::Function(key)) => self
                .catalog
                .remove(&key, &mut self.store)
                .map(|f| format!("Deleted {}", f.name)),
            Some(CatalogEntry::Category { name, .. }) => self
                .catalog
                .remove_category(&name, &mut self.store)
                .map(|n| format!("Deleted category {} ({} functions)", name, n)),
            None => return,
        };
        self.status_message = match result {
            Ok(message) => message,
            Err(e) => format!("Cannot delete: {}", e),
        };
        self.rebuild_entries(None);
    }

    fn reload_catalog(&mut self) {
        if !self.sync_context() {
            self.load_catalog();
        }
    }

    fn load_catalog(&mut self) {
        let (catalog, error) = self
            .store
            .load_catalog(self.config.browser.compact_category_limit);
        self.catalog = catalog;
        self.status_message = match error {
            Some(e) => format!("Showing built-in functions only: {}", e),
            None => format!("Loaded {} functions", self.catalog.len()),
        };
        let keep = self.selected_key();
        self.rebuild_entries(keep);
    }

    /// Re-read the active cluster from the backend. Returns true when it had
    /// changed, in which case browsing was reset to the function list.
    fn sync_context(&mut self) -> bool {
        match self.context.sync(&self.api) {
            Ok(change) if change.apply_to(&mut self.navigation) => {
                self.context_switched();
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(target: "cluster", "could not check active cluster: {}", e);
                false
            }
        }
    }

    fn cycle_cluster(&mut self) {
        match self.context.cycle(&self.api) {
            Ok(change) if change.apply_to(&mut self.navigation) => self.context_switched(),
            Ok(_) => self.status_message = "Only one cluster available".to_string(),
            Err(e) => self.status_message = format!("Error: {}", e),
        }
    }

    fn context_switched(&mut self) {
        self.flat = None;
        self.mode = AppMode::Catalog;
        self.search = Input::default();
        self.load_catalog();
        self.status_message = format!("Switched to {}", self.context.label());
    }

    fn go_back(&mut self) {
        match self.navigation.go_back() {
            Some(request) => self.loading(&request),
            None => self.back_to_catalog(),
        }
    }

    fn back_to_catalog(&mut self) {
        self.flat = None;
        self.mode = AppMode::Catalog;
        self.search = Input::default();
        let keep = self.selected_key();
        self.rebuild_entries(keep);
        self.status_message = "Back to functions".to_string();
    }

    fn drill_selected(&mut self) {
        let Some(view) = self.navigation.view() else {
            return;
        };
        let Some(row) = self
            .table_state
            .selected()
            .and_then(|i| view.rows.get(i))
            .cloned()
        else {
            return;
        };

        let spec = TableRenderSpec::from_schema(&view.schema, |row: &Row, column: &str| {
            DrillTarget {
                row: row.clone(),
                column: column.to_string(),
            }
        });
        let Some(target) = spec.click_link(&row) else {
            self.status_message = "This level has no drill-down".to_string();
            return;
        };

        match self.navigation.drill_into(&target.row, &target.column) {
            Some(request) => self.loading(&request),
            None => self.status_message = format!("Nothing to open in {}", target.column),
        }
    }

    /// Rows and columns currently on screen.
    fn current_table(&self) -> Option<(&[Row], &[String])> {
        match self.mode {
            AppMode::Level => self
                .navigation
                .view()
                .map(|v| (v.rows.as_slice(), v.schema.columns.as_slice())),
            AppMode::Flat => self
                .flat
                .as_ref()
                .map(|f| (f.rows.as_slice(), f.schema.columns.as_slice())),
            _ => None,
        }
    }

    fn move_row(&mut self, delta: isize) {
        let len = self.current_table().map(|(rows, _)| rows.len()).unwrap_or(0);
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.table_state.select(Some(next));
    }

    fn move_column(&mut self, delta: isize) {
        let len = self.current_table().map(|(_, c)| c.len()).unwrap_or(0);
        self.selected_column = step_selection(self.selected_column, delta, len);
    }

    fn export_current(&mut self) {
        let name = match self.mode {
            AppMode::Level => self
                .navigation
                .current_frame()
                .map(|f| f.breadcrumbs().join("_")),
            AppMode::Flat => self.flat.as_ref().map(|f| f.function_name.clone()),
            _ => None,
        };
        let (Some(name), Some((rows, columns))) = (name, self.current_table()) else {
            return;
        };

        let path = PathBuf::from(format!(
            "{}_{}.csv",
            name.replace(['/', ' '], "_"),
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let message = match export_to_csv(rows, columns, &path) {
            Ok(()) => format!("Exported {} rows to {}", rows.len(), path.display()),
            Err(e) => format!("Export failed: {}", e),
        };
        self.status_message = message;
    }

    fn breadcrumb_text(&self) -> String {
        self.navigation
            .breadcrumbs()
            .join(self.config.display.breadcrumb_separator())
    }

    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        match self.mode {
            AppMode::Catalog | AppMode::Search => self.render_catalog(f, chunks[1]),
            AppMode::Level => self.render_level(f, chunks[1]),
            AppMode::Flat => self.render_flat(f, chunks[1]),
        }

        let mode = match self.mode {
            AppMode::Catalog => "FUNCTIONS",
            AppMode::Search => "SEARCH",
            AppMode::Level => "LEVEL",
            AppMode::Flat => "RESULT",
        };
        let status = Paragraph::new(Line::from(vec![
            Span::styled(&self.status_message, Style::default().fg(Color::White)),
            Span::raw(" | "),
            Span::styled(mode, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" | F1=Help F5=Logs"),
        ]))
        .style(Style::default().bg(Color::DarkGray));
        f.render_widget(status, chunks[2]);

        if self.show_help {
            self.render_help(f);
        } else if self.show_logs {
            self.render_logs(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            format!(" {} ", self.context.label()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        )];
        if !self.navigation.is_idle() && self.mode == AppMode::Level {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                self.breadcrumb_text(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        if self.navigation.is_loading() {
            spans.push(Span::styled(" loading...", Style::default().fg(Color::Yellow)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_catalog(&mut self, f: &mut Frame, area: Rect) {
        let area = if self.mode == AppMode::Search {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(3)])
                .split(area);
            let input = Paragraph::new(self.search.value())
                .block(Block::default().borders(Borders::ALL).title("Search"))
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(input, parts[0]);
            f.set_cursor_position((
                parts[0].x + self.search.visual_cursor() as u16 + 1,
                parts[0].y + 1,
            ));
            parts[1]
        } else {
            area
        };

        let display = &self.config.display;
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| match entry {
                CatalogEntry::Category { name, shown, total } => {
                    let mut text = name.clone();
                    if shown < total {
                        text.push_str(&format!("  ({} of {}, 'a' shows all)", shown, total));
                    }
                    ListItem::new(Line::from(Span::styled(
                        text,
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )))
                }
                CatalogEntry::Function(key) => match self.catalog.get(key) {
                    Some(function) => {
                        let marker = if function.is_favorited {
                            display.favorite_marker()
                        } else {
                            " "
                        };
                        let mut spans = vec![
                            Span::styled(format!("  {} ", marker), Style::default().fg(Color::Yellow)),
                            Span::styled(format!("{:<24}", function.name), Style::default().fg(Color::Cyan)),
                            Span::raw(function.description.clone()),
                        ];
                        if function.is_user_defined() {
                            spans.push(Span::styled(" (custom)", Style::default().fg(Color::DarkGray)));
                        }
                        ListItem::new(Line::from(spans))
                    }
                    None => ListItem::new(""),
                },
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Functions ({})", self.catalog.len())),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_level(&mut self, f: &mut Frame, area: Rect) {
        let title = self.breadcrumb_text();
        let Some(view) = self.navigation.view() else {
            let loading = Paragraph::new("Loading...")
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(loading, area);
            return;
        };

        if let Some(error) = &view.error {
            let message = Paragraph::new(vec![
                Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))),
                Line::from(""),
                Line::from("r retries, Backspace goes back"),
            ])
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
            f.render_widget(message, area);
            return;
        }

        if view.rows.is_empty() {
            let empty = Paragraph::new("No data")
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(empty, area);
            return;
        }

        let spec = TableRenderSpec::from_schema(&view.schema, |_: &Row, _: &str| ());
        let title = format!("{} ({} rows)", title, view.rows.len());
        let table = build_table(
            &view.rows,
            spec.columns(),
            &self.config.display,
            Some(self.selected_column),
            title,
        );
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_flat(&mut self, f: &mut Frame, area: Rect) {
        let Some(result) = &self.flat else {
            return;
        };

        if let Some(error) = &result.error {
            let message = Paragraph::new(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red),
            ))
            .block(Block::default().borders(Borders::ALL).title(result.function_name.clone()))
            .wrap(Wrap { trim: true });
            f.render_widget(message, area);
            return;
        }

        let spec = TableRenderSpec::from_schema(&result.schema, |_: &Row, _: &str| ());
        let title = format!("{} ({} rows)", result.function_name, result.rows.len());
        let table = build_table(
            &result.rows,
            spec.columns(),
            &self.config.display,
            Some(self.selected_column),
            title,
        );
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_help(&self, f: &mut Frame) {
        let area = centered_rect(80, 70, f.area());
        f.render_widget(Clear, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        f.render_widget(
            Paragraph::new(HelpText::left_column())
                .block(Block::default().borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM).title("Help")),
            columns[0],
        );
        f.render_widget(
            Paragraph::new(HelpText::right_column())
                .block(Block::default().borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)),
            columns[1],
        );
    }

    fn render_logs(&self, f: &mut Frame) {
        let area = centered_rect(90, 80, f.area());
        f.render_widget(Clear, area);

        let height = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = self
            .log_buffer
            .get_recent(height)
            .into_iter()
            .map(|entry| {
                let color = match entry.level.as_str() {
                    "ERROR" => Color::Red,
                    "WARN" => Color::Yellow,
                    "DEBUG" | "TRACE" => Color::DarkGray,
                    _ => Color::White,
                };
                Line::from(Span::styled(
                    entry.format_for_display(),
                    Style::default().fg(color),
                ))
            })
            .collect();

        let logs = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Logs ({} entries) - F5 to close", self.log_buffer.len())),
        );
        f.render_widget(logs, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn run_console_app(config: Config, log_buffer: LogRingBuffer) -> Result<()> {
    let mut app = ConsoleApp::new(config, log_buffer)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
