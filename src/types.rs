//! Common types used throughout the application

use ratatui::prelude::*;
use serde::{Deserialize, Serialize};

/// Desired action for a package or patch, as tracked by the object pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NoInst,        //   Not installed, no change
    Install,       // + Marked for install by the user
    AutoInstall,   // + Installed as a dependency
    KeepInstalled, // · Installed, no change
    Update,        // ↑ Marked for update by the user
    AutoUpdate,    // ↑ Updated as a dependency
    Del,           // - Marked for deletion by the user
    AutoDel,       // - Deleted as a dependency
    Taboo,         // ✗ Never install
    Protected,     // = Never touch
}

impl Status {
    pub const ALL: [Status; 10] = [
        Self::NoInst,
        Self::Install,
        Self::AutoInstall,
        Self::KeepInstalled,
        Self::Update,
        Self::AutoUpdate,
        Self::Del,
        Self::AutoDel,
        Self::Taboo,
        Self::Protected,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoInst => "",
            Self::Install | Self::AutoInstall => "+",
            Self::KeepInstalled => "·",
            Self::Update | Self::AutoUpdate => "↑",
            Self::Del | Self::AutoDel => "-",
            Self::Taboo => "✗",
            Self::Protected => "=",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::NoInst => Color::Gray,
            Self::Install | Self::Update => Color::Green,
            Self::AutoInstall | Self::AutoUpdate | Self::AutoDel => Color::Cyan,
            Self::KeepInstalled => Color::DarkGray,
            Self::Del => Color::Red,
            Self::Taboo => Color::LightRed,
            Self::Protected => Color::Blue,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoInst => "not installed",
            Self::Install => "install",
            Self::AutoInstall => "install (auto)",
            Self::KeepInstalled => "keep",
            Self::Update => "update",
            Self::AutoUpdate => "update (auto)",
            Self::Del => "delete",
            Self::AutoDel => "delete (auto)",
            Self::Taboo => "taboo",
            Self::Protected => "protected",
        }
    }

    /// True for statuses that only make sense for an installed object
    pub fn is_installed_state(&self) -> bool {
        matches!(
            self,
            Self::KeepInstalled
                | Self::Update
                | Self::AutoUpdate
                | Self::Del
                | Self::AutoDel
                | Self::Protected
        )
    }

    /// True if the status requests a change to the system
    pub fn is_modified(&self) -> bool {
        matches!(
            self,
            Self::Install
                | Self::AutoInstall
                | Self::Update
                | Self::AutoUpdate
                | Self::Del
                | Self::AutoDel
        )
    }

    pub fn is_lock(&self) -> bool {
        matches!(self, Self::Taboo | Self::Protected)
    }
}

/// Stable handle for a selectable (package or patch) in the object pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a strategy operates on: a selectable, optionally narrowed to one
/// available version row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub version: Option<usize>,
}

impl ObjectRef {
    pub fn selectable(id: ObjectId) -> Self {
        Self { id, version: None }
    }

    pub fn version(id: ObjectId, version: usize) -> Self {
        Self { id, version: Some(version) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Package,
    Patch,
}

/// Filter categories (left panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCategory {
    All,
    Installed,
    Updates,
    Patches,
    MarkedChanges,
}

impl FilterCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All Packages",
            Self::Installed => "Installed",
            Self::Updates => "Updates",
            Self::Patches => "Patches",
            Self::MarkedChanges => "Marked Changes",
        }
    }

    pub fn all() -> &'static [FilterCategory] {
        &[
            Self::All,
            Self::Installed,
            Self::Updates,
            Self::Patches,
            Self::MarkedChanges,
        ]
    }
}

/// One row of the objects table (extracted from the object pool)
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
    pub status: Status,
    pub summary: String,
    pub installed_version: String,
    pub candidate_version: String,
}

/// One row of the details pane that can itself carry a status
#[derive(Debug, Clone)]
pub struct DetailRow {
    pub target: ObjectRef,
    pub label: String,
    pub extra: String,
    pub status: Status,
}

/// Which pane has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Filters,
    Objects,
    Details,
}

/// Which tab is shown in details pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsTab {
    Info,
    Versions,
    Dependencies,
    Contents,
}

impl DetailsTab {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Versions => "Versions",
            Self::Dependencies => "Deps",
            Self::Contents => "Contents",
        }
    }
}

/// Application state machine
#[derive(Debug, PartialEq, Eq)]
pub enum AppState {
    Listing,
    Searching,      // User is typing a search query
    ShowingHistory, // Package history view
    ShowingLegend,  // Status key reference
    ConfirmExit,
}

/// Column configuration for the objects table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Status,
    Name,
    InstalledVersion,
    CandidateVersion,
    Summary,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Status => "S",
            Self::Name => "Name",
            Self::InstalledVersion => "Installed",
            Self::CandidateVersion => "Available",
            Self::Summary => "Summary",
        }
    }

    pub fn width(&self, col_widths: &ColumnWidths) -> Constraint {
        match self {
            Self::Status => Constraint::Length(3),
            Self::Name => Constraint::Length(col_widths.name),
            Self::InstalledVersion => Constraint::Length(col_widths.installed),
            Self::CandidateVersion => Constraint::Length(col_widths.candidate),
            Self::Summary => Constraint::Min(10),
        }
    }

    pub fn visible_columns(columns: &crate::config::ColumnSettings) -> Vec<Column> {
        let mut cols = vec![Self::Status, Self::Name];
        if columns.installed_version {
            cols.push(Self::InstalledVersion);
        }
        if columns.candidate_version {
            cols.push(Self::CandidateVersion);
        }
        if columns.summary {
            cols.push(Self::Summary);
        }
        cols
    }
}

/// Column width storage
#[derive(Debug, Clone, Default)]
pub struct ColumnWidths {
    pub name: u16,
    pub installed: u16,
    pub candidate: u16,
}

impl ColumnWidths {
    pub fn new() -> Self {
        Self {
            name: 4,
            installed: 9,
            candidate: 9,
        }
    }

    /// Grow widths to fit the given rows, never below the header widths
    pub fn fit(rows: &[ObjectInfo]) -> Self {
        let mut widths = Self::new();
        for row in rows {
            widths.name = widths.name.max(row.name.len() as u16);
            widths.installed = widths.installed.max(row.installed_version.len() as u16);
            widths.candidate = widths.candidate.max(row.candidate_version.len() as u16);
        }
        widths.name = widths.name.min(40);
        widths
    }
}
