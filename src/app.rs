//! TUI application state and logic
//!
//! This module holds the TUI-specific state and sits between the object pool
//! (`PackageDb`), the status strategies and the ratatui UI.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use crossterm::event::KeyCode;
use ratatui::widgets::{ListState, TableState};
use tracing::info;

use zypsel::config::Settings;
use zypsel::history::{HISTORY_FILE, ReaderOptions};
use zypsel::history_view::HistoryView;
use zypsel::model::{ObjectModel, PackageDb, edition_cmp};
use zypsel::search::SearchIndex;
use zypsel::strategy::{StatusChange, StrategyKind, apply_key, apply_toggle};
use zypsel::types::*;

/// UI widget state for the main views
pub struct UiState {
    pub table_state: TableState,
    pub filter_state: ListState,
    pub focused_pane: FocusedPane,
}

/// Details pane state
pub struct DetailsState {
    pub scroll: u16,
    pub tab: DetailsTab,
    /// Status-carrying rows of the current tab (empty on Info)
    pub rows: Vec<DetailRow>,
    pub row_state: ListState,
}

impl Default for DetailsState {
    fn default() -> Self {
        Self {
            scroll: 0,
            tab: DetailsTab::Info,
            rows: Vec::new(),
            row_state: ListState::default(),
        }
    }
}

/// Active search: the query being typed and the matching objects
#[derive(Default)]
pub struct SearchState {
    pub index: Option<SearchIndex>,
    pub query: String,
    pub results: Option<HashSet<ObjectId>>,
}

pub struct App {
    pub db: PackageDb,
    pub list: Vec<ObjectInfo>,
    pub search: SearchState,
    pub history: Option<HistoryView>,
    snapshot_path: PathBuf,
    /// Status changes not yet written back to the snapshot
    dirty: bool,

    pub ui: UiState,
    pub details: DetailsState,
    pub state: AppState,
    pub settings: Settings,
    pub col_widths: ColumnWidths,
    pub status_message: String,
}

impl App {
    pub fn new(snapshot: &Path, settings: Settings) -> Result<Self> {
        let db = PackageDb::load(snapshot)?;
        let mut filter_state = ListState::default();
        filter_state.select(Some(0));

        let mut app = Self {
            db,
            list: Vec::new(),
            search: SearchState::default(),
            history: None,
            snapshot_path: snapshot.to_path_buf(),
            dirty: false,
            ui: UiState {
                table_state: TableState::default(),
                filter_state,
                focused_pane: FocusedPane::Objects,
            },
            details: DetailsState::default(),
            state: AppState::Listing,
            settings,
            col_widths: ColumnWidths::new(),
            status_message: String::new(),
        };

        app.refresh_ui_state();
        app.update_status_message();
        Ok(app)
    }

    /// Rebuild the table after pool changes, keeping the selected object
    fn refresh_ui_state(&mut self) {
        let selected = self.selected_object().map(|o| o.id);
        self.rebuild_list();
        self.restore_selection(selected);
        self.rebuild_detail_rows();
    }

    fn rebuild_list(&mut self) {
        let filter = self.selected_filter();
        let mut list: Vec<ObjectInfo> = self
            .db
            .ids()
            .filter(|&id| self.db.matches_filter(id, filter))
            .filter(|id| self.search.results.as_ref().is_none_or(|r| r.contains(id)))
            .filter_map(|id| self.db.object_info(id))
            .collect();

        list.sort_by(|a, b| edition_cmp(&a.name, &b.name).then_with(|| a.name.cmp(&b.name)));
        if !self.settings.sort_ascending {
            list.reverse();
        }

        self.col_widths = ColumnWidths::fit(&list);
        self.list = list;
    }

    fn restore_selection(&mut self, id: Option<ObjectId>) {
        let new_idx = id
            .and_then(|id| self.list.iter().position(|o| o.id == id))
            .unwrap_or(0);

        self.ui.table_state.select(if self.list.is_empty() { None } else { Some(new_idx) });
    }

    /// Recompute the rows of the current details tab
    fn rebuild_detail_rows(&mut self) {
        let rows = self.detail_rows();
        let selected = self
            .details
            .row_state
            .selected()
            .filter(|&i| i < rows.len())
            .or(if rows.is_empty() { None } else { Some(0) });
        self.details.row_state.select(selected);
        self.details.rows = rows;
    }

    fn detail_rows(&self) -> Vec<DetailRow> {
        let Some(obj) = self.selected_object() else {
            return Vec::new();
        };
        let Some(sel) = self.db.get(obj.id) else {
            return Vec::new();
        };
        let Some(kind) = self.details_strategy() else {
            return Vec::new();
        };
        let strategy = kind.strategy();

        let row = |target: ObjectRef, label: String, extra: String| DetailRow {
            target,
            label,
            extra,
            status: strategy.status(&self.db, target),
        };
        let named = |id: ObjectId| {
            let dep = self.db.get(id);
            row(
                ObjectRef::selectable(id),
                dep.map(|d| d.name().to_string()).unwrap_or_default(),
                dep.map(|d| d.summary().to_string()).unwrap_or_default(),
            )
        };

        match self.details.tab {
            DetailsTab::Info => Vec::new(),
            DetailsTab::Versions => sel
                .available()
                .iter()
                .enumerate()
                .map(|(i, v)| row(ObjectRef::version(obj.id, i), v.version.clone(), format!("{} {}", v.arch, v.repo)))
                .collect(),
            DetailsTab::Dependencies => sel.requires().iter().map(|&id| named(id)).collect(),
            DetailsTab::Contents => self
                .db
                .patch_members(obj.id)
                .unwrap_or_default()
                .iter()
                .map(|&id| named(id))
                .collect(),
        }
    }

    // === Accessors ===

    pub fn selected_object(&self) -> Option<&ObjectInfo> {
        self.ui.table_state.selected().and_then(|i| self.list.get(i))
    }

    pub fn selected_filter(&self) -> FilterCategory {
        let filters = FilterCategory::all();
        filters[self.ui.filter_state.selected().unwrap_or(0).min(filters.len() - 1)]
    }

    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.dirty
    }

    /// Strategy for rows of the objects table under the current filter
    pub fn list_strategy(&self) -> StrategyKind {
        match self.selected_filter() {
            FilterCategory::All | FilterCategory::Installed | FilterCategory::MarkedChanges => {
                StrategyKind::Package
            }
            FilterCategory::Updates => StrategyKind::Update,
            FilterCategory::Patches => StrategyKind::Patch,
        }
    }

    /// Strategy for rows of the current details tab
    pub fn details_strategy(&self) -> Option<StrategyKind> {
        match self.details.tab {
            DetailsTab::Info => None,
            DetailsTab::Versions => Some(StrategyKind::Available),
            DetailsTab::Dependencies => Some(StrategyKind::Dependency),
            DetailsTab::Contents => Some(StrategyKind::PatchPackage),
        }
    }

    /// Row the status keys act on: a details row when that pane has focus
    fn status_target(&self) -> Option<(StrategyKind, ObjectRef, String)> {
        if self.ui.focused_pane == FocusedPane::Details
            && let Some(kind) = self.details_strategy()
        {
            let row = self.details.row_state.selected().and_then(|i| self.details.rows.get(i))?;
            return Some((kind, row.target, row.label.clone()));
        }
        let obj = self.selected_object()?;
        Some((self.list_strategy(), ObjectRef::selectable(obj.id), obj.name.clone()))
    }

    // === Status changes ===

    pub fn apply_status_key(&mut self, key: KeyCode) {
        let Some((kind, target, name)) = self.status_target() else {
            return;
        };
        let change = apply_key(kind.strategy(), key, &mut self.db, target);
        self.after_status_change(change, &name);
    }

    pub fn toggle_current(&mut self) {
        let Some((kind, target, name)) = self.status_target() else {
            return;
        };
        let change = apply_toggle(kind.strategy(), &mut self.db, target);
        self.after_status_change(change, &name);
    }

    fn after_status_change(&mut self, change: StatusChange, name: &str) {
        match change {
            StatusChange::Unmapped => {}
            StatusChange::Rejected { .. } => {
                self.status_message = format!("cannot change status of {name}");
            }
            StatusChange::Changed { to, .. } => {
                self.dirty = true;
                self.refresh_ui_state();
                self.update_status_message();
                self.status_message = format!("{name}: {} | {}", to.label(), self.status_message);
            }
        }
    }

    pub fn unmark_all(&mut self) {
        self.db.reset();
        self.dirty = true;
        self.refresh_ui_state();
        self.update_status_message();
    }

    /// Write the selection back to the snapshot file
    pub fn save_snapshot(&mut self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.db.to_snapshot())?;
        fs::write(&self.snapshot_path, json)?;
        info!(path = %self.snapshot_path.display(), "snapshot saved");
        self.dirty = false;
        self.status_message = format!("Saved {}", self.snapshot_path.display());
        Ok(())
    }

    // === Search ===

    pub fn start_search(&mut self) {
        if self.search.index.is_none() {
            let built = SearchIndex::new().and_then(|mut index| {
                let (count, duration) = index.build(&self.db)?;
                info!(count, ?duration, "search index built");
                Ok(index)
            });
            match built {
                Ok(index) => self.search.index = Some(index),
                Err(e) => {
                    self.status_message = format!("Failed to build search index: {e}");
                    return;
                }
            }
        }
        self.state = AppState::Searching;
    }

    pub fn search_push(&mut self, c: char) {
        self.search.query.push(c);
        self.execute_search();
    }

    pub fn search_pop(&mut self) {
        self.search.query.pop();
        self.execute_search();
    }

    fn execute_search(&mut self) {
        let Some(index) = &self.search.index else {
            return;
        };
        if self.search.query.trim().is_empty() {
            self.search.results = None;
        } else {
            match index.search(&self.search.query) {
                Ok(results) => self.search.results = Some(results),
                Err(e) => self.status_message = format!("Search error: {e}"),
            }
        }
        self.refresh_ui_state();
    }

    pub fn cancel_search(&mut self) {
        self.clear_search();
        self.state = AppState::Listing;
    }

    pub fn clear_search(&mut self) {
        self.search.query.clear();
        self.search.results = None;
        self.refresh_ui_state();
        self.update_status_message();
    }

    pub fn confirm_search(&mut self) {
        self.state = AppState::Listing;
        if let Some(results) = &self.search.results {
            self.status_message = format!("Found {} objects matching '{}'", results.len(), self.search.query);
        }
    }

    // === History ===

    /// Show the history view. It is filled by `load_history` after the
    /// empty view has been drawn once.
    pub fn open_history(&mut self) {
        self.history = Some(HistoryView::new(&self.settings.history_date_format));
        self.state = AppState::ShowingHistory;
    }

    pub fn history_needs_load(&self) -> bool {
        self.history.as_ref().is_some_and(|h| !h.is_loaded())
    }

    pub fn load_history(&mut self) {
        let Some(view) = self.history.as_mut() else {
            return;
        };
        view.load(Path::new(HISTORY_FILE), ReaderOptions::default());
        if !view.dates().is_empty() {
            view.select_date(0);
        }
    }

    pub fn close_history(&mut self) {
        self.history = None;
        self.state = AppState::Listing;
    }

    // === Navigation ===

    pub fn move_filter_selection(&mut self, delta: i32) {
        let filters = FilterCategory::all();
        let current = self.ui.filter_state.selected().unwrap_or(0) as i32;
        let new_idx = (current + delta).clamp(0, filters.len() as i32 - 1) as usize;
        self.ui.filter_state.select(Some(new_idx));
        self.rebuild_list();
        self.restore_selection(None);
        self.rebuild_detail_rows();
    }

    pub fn move_object_selection(&mut self, delta: i32) {
        if self.list.is_empty() {
            return;
        }
        let current = self.ui.table_state.selected().unwrap_or(0) as i64;
        let new_idx = (current + delta as i64).clamp(0, self.list.len() as i64 - 1) as usize;
        self.ui.table_state.select(Some(new_idx));
        self.details.scroll = 0;
        self.details.row_state.select(None);
        self.rebuild_detail_rows();
    }

    pub fn move_details_selection(&mut self, delta: i32) {
        if self.details.rows.is_empty() {
            self.details.scroll = if delta < 0 {
                self.details.scroll.saturating_sub(1)
            } else {
                self.details.scroll.saturating_add(1)
            };
            return;
        }
        let current = self.details.row_state.selected().unwrap_or(0) as i32;
        let new_idx = (current + delta).clamp(0, self.details.rows.len() as i32 - 1) as usize;
        self.details.row_state.select(Some(new_idx));
    }

    pub fn next_details_tab(&mut self) {
        self.details.tab = match self.details.tab {
            DetailsTab::Info => DetailsTab::Versions,
            DetailsTab::Versions => DetailsTab::Dependencies,
            DetailsTab::Dependencies => DetailsTab::Contents,
            DetailsTab::Contents => DetailsTab::Info,
        };
        self.reset_details();
    }

    pub fn prev_details_tab(&mut self) {
        self.details.tab = match self.details.tab {
            DetailsTab::Info => DetailsTab::Contents,
            DetailsTab::Versions => DetailsTab::Info,
            DetailsTab::Dependencies => DetailsTab::Versions,
            DetailsTab::Contents => DetailsTab::Dependencies,
        };
        self.reset_details();
    }

    fn reset_details(&mut self) {
        self.details.scroll = 0;
        self.details.row_state.select(None);
        self.rebuild_detail_rows();
    }

    pub fn cycle_focus(&mut self) {
        self.ui.focused_pane = match self.ui.focused_pane {
            FocusedPane::Filters => FocusedPane::Objects,
            FocusedPane::Objects => FocusedPane::Details,
            FocusedPane::Details => FocusedPane::Filters,
        };
    }

    pub fn cycle_focus_back(&mut self) {
        self.ui.focused_pane = match self.ui.focused_pane {
            FocusedPane::Filters => FocusedPane::Details,
            FocusedPane::Objects => FocusedPane::Filters,
            FocusedPane::Details => FocusedPane::Objects,
        };
    }

    // === Status message ===

    pub fn update_status_message(&mut self) {
        let changed = self.db.changed().len();
        let updates = self.db.filter_count(FilterCategory::Updates);
        self.status_message = if changed > 0 {
            format!("{changed} changes marked | {updates} updates available")
        } else {
            format!("{updates} updates available")
        };
    }
}
