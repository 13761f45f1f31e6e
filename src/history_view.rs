//! History view: a dates list next to an actions tree
//!
//! Entries are grouped by their formatted date. Each date gets one row in
//! the dates list and one expanded group in the actions tree, holding the
//! actions of that date. Selecting on either side selects the matching row
//! on the other side.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::history::{HistoryEntry, HistoryError, HistoryReader, HistoryRecord, ReaderOptions};
use crate::model::edition_version;

/// Blocks selection notifications while alive and restores the previous
/// state on drop, so nested blockers and early returns are both fine.
pub struct SignalBlocker {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl SignalBlocker {
    pub fn new(flag: &Rc<Cell<bool>>) -> Self {
        let previous = flag.replace(true);
        Self {
            flag: Rc::clone(flag),
            previous,
        }
    }
}

impl Drop for SignalBlocker {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionIcon {
    Install,
    Remove,
    RepoAdd,
    RepoRemove,
    None,
}

impl ActionIcon {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Install => "+",
            Self::Remove => "-",
            Self::RepoAdd => "⊞",
            Self::RepoRemove => "⊟",
            Self::None => " ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRow {
    pub icon: ActionIcon,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGroup {
    pub date: String,
    pub expanded: bool,
    pub actions: Vec<ActionRow>,
}

/// A row in the actions tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreePos {
    Group(usize),
    Action { group: usize, index: usize },
}

impl TreePos {
    /// Index of the top-level group this row belongs to
    pub fn group(self) -> usize {
        match self {
            Self::Group(group) | Self::Action { group, .. } => group,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPane {
    Dates,
    Actions,
}

/// Display columns for an action, `None` if the action is not shown
pub fn action_columns(record: &HistoryRecord) -> Option<Vec<String>> {
    let columns = match record {
        HistoryRecord::Install { name, edition, .. } | HistoryRecord::Remove { name, edition, .. } => {
            vec![name.clone(), edition_version(edition).to_string()]
        }
        HistoryRecord::RepoAdd { alias, url } => vec![alias.clone(), url.clone()],
        HistoryRecord::RepoRemove { alias } => vec![alias.clone()],
        HistoryRecord::RepoAliasChange { old_alias, new_alias } => {
            vec![format!("{old_alias} -> {new_alias}")]
        }
        HistoryRecord::RepoUrlChange { alias, new_url } => vec![alias.clone(), new_url.clone()],
        // Commands, patches and unknown actions get no row. Their date still
        // shows up. Unclear if hiding them is wanted or just never done.
        HistoryRecord::Command { .. } | HistoryRecord::Patch { .. } | HistoryRecord::Other { .. } => {
            return None;
        }
    };
    Some(columns)
}

pub fn action_icon(record: &HistoryRecord) -> ActionIcon {
    match record {
        HistoryRecord::Install { .. } => ActionIcon::Install,
        HistoryRecord::Remove { .. } => ActionIcon::Remove,
        HistoryRecord::RepoAdd { .. } => ActionIcon::RepoAdd,
        HistoryRecord::RepoRemove { .. } => ActionIcon::RepoRemove,
        _ => ActionIcon::None,
    }
}

pub struct HistoryView {
    date_format: String,
    dates: Vec<String>,
    groups: Vec<ActionGroup>,
    selected_date: Option<usize>,
    current_action: Option<TreePos>,
    /// First visible row of the actions tree
    action_offset: usize,
    focus: HistoryPane,
    warning: Option<String>,
    loaded: bool,
    blocked: Rc<Cell<bool>>,
}

impl HistoryView {
    pub fn new(date_format: &str) -> Self {
        Self {
            date_format: date_format.to_string(),
            dates: Vec::new(),
            groups: Vec::new(),
            selected_date: None,
            current_action: None,
            action_offset: 0,
            focus: HistoryPane::Dates,
            warning: None,
            loaded: false,
            blocked: Rc::new(Cell::new(false)),
        }
    }

    // === Population ===

    /// Add one entry, opening a new date group when the date changes
    pub fn add_entry(&mut self, entry: &HistoryEntry) {
        let date = match jiff::fmt::strtime::format(&self.date_format, entry.date) {
            Ok(formatted) if !formatted.is_empty() => formatted,
            _ => entry.date.date().to_string(),
        };

        if self.groups.last().is_none_or(|g| g.date != date) {
            self.dates.push(date.clone());
            self.groups.push(ActionGroup {
                date,
                expanded: true,
                actions: Vec::new(),
            });
        }

        let Some(columns) = action_columns(&entry.record) else {
            debug!(action = entry.record.action(), "no row for history action");
            return;
        };
        if let Some(group) = self.groups.last_mut() {
            group.actions.push(ActionRow {
                icon: action_icon(&entry.record),
                columns,
            });
        }
    }

    /// Consume entries until the first error. Rows added before the error
    /// stay; the error becomes the view's warning.
    pub fn populate<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = Result<HistoryEntry, HistoryError>>,
    {
        for entry in entries {
            match entry {
                Ok(entry) => self.add_entry(&entry),
                Err(e) => {
                    self.report_failure(&e);
                    break;
                }
            }
        }
        self.loaded = true;
        info!(dates = self.dates.len(), "history loaded");
    }

    /// Read a history file into the view
    pub fn load(&mut self, path: &Path, options: ReaderOptions) {
        match HistoryReader::open(path, options) {
            Ok(reader) => self.populate(reader),
            Err(e) => {
                self.report_failure(&e);
                self.loaded = true;
            }
        }
    }

    fn report_failure(&mut self, error: &HistoryError) {
        warn!("unable to read history: {error}");
        self.warning = Some(error.to_string());
    }

    // === Accessors ===

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn groups(&self) -> &[ActionGroup] {
        &self.groups
    }

    pub fn selected_date(&self) -> Option<usize> {
        self.selected_date
    }

    pub fn current_action(&self) -> Option<TreePos> {
        self.current_action
    }

    pub fn action_offset(&self) -> usize {
        self.action_offset
    }

    pub fn focus(&self) -> HistoryPane {
        self.focus
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn dismiss_warning(&mut self) {
        self.warning = None;
    }

    /// False until a load attempt finished
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn notifications_blocked(&self) -> bool {
        self.blocked.get()
    }

    /// Rows of the actions tree as currently expanded
    pub fn visible_rows(&self) -> Vec<TreePos> {
        let mut rows = Vec::new();
        for (group, g) in self.groups.iter().enumerate() {
            rows.push(TreePos::Group(group));
            if g.expanded {
                rows.extend((0..g.actions.len()).map(|index| TreePos::Action { group, index }));
            }
        }
        rows
    }

    /// Visible index of the current action row
    pub fn current_action_row(&self) -> Option<usize> {
        let current = self.current_action?;
        self.visible_rows().iter().position(|&p| p == current)
    }

    // === Selection ===

    pub fn select_date(&mut self, index: usize) {
        if index < self.dates.len() {
            self.set_selected_date(Some(index));
        }
    }

    pub fn select_action(&mut self, pos: TreePos) {
        let exists = match pos {
            TreePos::Group(group) => group < self.groups.len(),
            TreePos::Action { group, index } => self.groups.get(group).is_some_and(|g| index < g.actions.len()),
        };
        if exists {
            self.set_current_action(Some(pos));
        }
    }

    pub fn move_date(&mut self, delta: i32) {
        if self.dates.is_empty() {
            return;
        }
        let current = self.selected_date.map_or(-1, |i| i as i64);
        let new_idx = (current + delta as i64).clamp(0, self.dates.len() as i64 - 1) as usize;
        self.select_date(new_idx);
    }

    pub fn move_action(&mut self, delta: i32) {
        let rows = self.visible_rows();
        if rows.is_empty() {
            return;
        }
        let current = self.current_action_row().map_or(-1, |i| i as i64);
        let new_idx = (current + delta as i64).clamp(0, rows.len() as i64 - 1) as usize;
        self.select_action(rows[new_idx]);
    }

    /// Expand or collapse the group of the current action row. Collapsing
    /// moves the current row up to the group header.
    pub fn toggle_group_expanded(&mut self) {
        let Some(pos) = self.current_action else {
            return;
        };
        let group = pos.group();
        self.groups[group].expanded = !self.groups[group].expanded;
        if !self.groups[group].expanded {
            self.set_current_action(Some(TreePos::Group(group)));
        }
    }

    pub fn switch_focus(&mut self) {
        self.focus = match self.focus {
            HistoryPane::Dates => HistoryPane::Actions,
            HistoryPane::Actions => HistoryPane::Dates,
        };
    }

    fn set_selected_date(&mut self, index: Option<usize>) {
        if self.selected_date == index {
            return;
        }
        self.selected_date = index;
        if !self.blocked.get() {
            self.on_date_selection_changed();
        }
    }

    fn set_current_action(&mut self, pos: Option<TreePos>) {
        if self.current_action == pos {
            return;
        }
        self.current_action = pos;
        if !self.blocked.get() {
            self.on_action_selection_changed();
        }
    }

    /// Bring the group with the selected date to the top of the actions tree
    fn on_date_selection_changed(&mut self) {
        let Some(date) = self.selected_date.and_then(|i| self.dates.get(i)) else {
            return;
        };
        let Some(group) = self.groups.iter().position(|g| g.date == *date) else {
            return;
        };

        let _blocker = SignalBlocker::new(&self.blocked);
        self.groups[group].expanded = true;
        self.set_current_action(Some(TreePos::Group(group)));
        if let Some(row) = self.visible_rows().iter().position(|&p| p == TreePos::Group(group)) {
            self.action_offset = row;
        }
    }

    /// Highlight the date of the current action (or group header)
    fn on_action_selection_changed(&mut self) {
        let Some(pos) = self.current_action else {
            return;
        };
        let Some(group) = self.groups.get(pos.group()) else {
            return;
        };
        let Some(index) = self.dates.iter().position(|d| *d == group.date) else {
            return;
        };

        let _blocker = SignalBlocker::new(&self.blocked);
        self.set_selected_date(Some(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn entry(day: i8, record: HistoryRecord) -> HistoryEntry {
        HistoryEntry {
            date: date(2020, 1, day).at(12, 0, 0, 0),
            record,
        }
    }

    #[test]
    fn signal_blocker_restores_previous_state() {
        let flag = Rc::new(Cell::new(false));
        {
            let _outer = SignalBlocker::new(&flag);
            assert!(flag.get());
            {
                let _inner = SignalBlocker::new(&flag);
                assert!(flag.get());
            }
            assert!(flag.get());
        }
        assert!(!flag.get());
    }

    #[test]
    fn columns_per_action_kind() {
        let install = HistoryRecord::Install {
            name: "foo".into(),
            edition: "1.0-3.2".into(),
            arch: "x86_64".into(),
            requested_by: String::new(),
            repo: String::new(),
        };
        assert_eq!(action_columns(&install), Some(vec!["foo".to_string(), "1.0".to_string()]));
        assert_eq!(action_icon(&install), ActionIcon::Install);

        let alias = HistoryRecord::RepoAliasChange {
            old_alias: "a".into(),
            new_alias: "b".into(),
        };
        assert_eq!(action_columns(&alias), Some(vec!["a -> b".to_string()]));
        assert_eq!(action_icon(&alias), ActionIcon::None);

        let url = HistoryRecord::RepoUrlChange {
            alias: "oss".into(),
            new_url: "http://y".into(),
        };
        assert_eq!(action_columns(&url), Some(vec!["oss".to_string(), "http://y".to_string()]));
        assert_eq!(action_columns(&HistoryRecord::Other { action: "stamp".into() }), None);
    }

    #[test]
    fn skipped_actions_still_open_their_date() {
        let mut view = HistoryView::new("%Y-%m-%d");
        view.add_entry(&entry(
            1,
            HistoryRecord::Command {
                user: "root".into(),
                command: "zypper up".into(),
            },
        ));
        assert_eq!(view.dates(), ["2020-01-01"]);
        assert!(view.groups()[0].actions.is_empty());
    }

    #[test]
    fn failure_keeps_collected_rows() {
        let mut view = HistoryView::new("%Y-%m-%d");
        view.populate(vec![
            Ok(entry(1, HistoryRecord::RepoRemove { alias: "a".into() })),
            Err(HistoryError::Parse {
                line: 2,
                message: "bad".into(),
            }),
            Ok(entry(2, HistoryRecord::RepoRemove { alias: "b".into() })),
        ]);

        assert_eq!(view.dates().len(), 1);
        assert!(view.warning().unwrap().contains("line 2"));
        assert!(view.is_loaded());
        view.dismiss_warning();
        assert_eq!(view.warning(), None);
    }

    #[test]
    fn collapsing_moves_current_row_to_header() {
        let mut view = HistoryView::new("%Y-%m-%d");
        view.add_entry(&entry(1, HistoryRecord::RepoRemove { alias: "a".into() }));
        view.add_entry(&entry(1, HistoryRecord::RepoRemove { alias: "b".into() }));

        view.select_action(TreePos::Action { group: 0, index: 1 });
        view.toggle_group_expanded();
        assert_eq!(view.current_action(), Some(TreePos::Group(0)));
        assert_eq!(view.visible_rows(), vec![TreePos::Group(0)]);

        view.toggle_group_expanded();
        assert_eq!(view.visible_rows().len(), 3);
    }
}
