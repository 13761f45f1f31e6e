//! Object pool and the capability the status strategies talk to
//!
//! Strategies never see `PackageDb` directly; they go through `ObjectModel`,
//! which is all they need to read and write desired statuses. `PackageDb` is
//! the in-memory pool the TUI and debug CLI use, loaded from a JSON snapshot.
//! It owns the policy decisions a package library would make: which statuses
//! are valid for an object, which version is the candidate, and which patch
//! members resist a cascade.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::*;

/// Read/write access to desired statuses of managed objects.
pub trait ObjectModel {
    /// Stored desired status, `None` for unknown objects
    fn status(&self, id: ObjectId) -> Option<Status>;

    /// Ask the model to accept a new status. Returns whether it did.
    fn set_status(&mut self, id: ObjectId, status: Status) -> bool;

    fn is_installed(&self, id: ObjectId) -> bool;

    /// True if the candidate version is newer than the installed one
    fn has_newer_candidate(&self, id: ObjectId) -> bool;

    /// Index of the available version chosen for installation
    fn candidate(&self, id: ObjectId) -> Option<usize>;

    fn set_candidate(&mut self, id: ObjectId, version: usize) -> bool;

    /// True if available version `version` is the one currently installed
    fn is_installed_version(&self, id: ObjectId, version: usize) -> bool;

    /// Packages bundled by a patch. `None` if `id` is not a patch.
    fn patch_members(&self, id: ObjectId) -> Option<&[ObjectId]>;

    /// Propagate a patch status to one of its members. Which members keep
    /// their own status is up to the model; the default always cascades.
    fn cascade_status(&mut self, member: ObjectId, status: Status) -> bool {
        self.set_status(member, status)
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("patch {patch} references unknown package {member}")]
    UnknownMember { patch: String, member: String },
    #[error("duplicate object name {0}")]
    DuplicateName(String),
}

// ============================================================================
// Snapshot format
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub packages: Vec<PackageRecord>,
    #[serde(default)]
    pub patches: Vec<PatchRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<String>,
    #[serde(default)]
    pub available: Vec<AvailableVersion>,
    #[serde(default)]
    pub requires: Vec<String>,
    /// Pinned candidate version; the highest available one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableVersion {
    pub version: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub repo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRecord {
    pub name: String,
    #[serde(default = "default_patch_version")]
    pub version: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

fn default_patch_version() -> String {
    String::from("1")
}

// ============================================================================
// Object pool
// ============================================================================

/// A package or patch with all its versions
#[derive(Debug, Clone)]
pub struct Selectable {
    kind: ObjectKind,
    name: String,
    summary: String,
    category: String,
    installed: Option<String>,
    available: Vec<AvailableVersion>,
    requires: Vec<ObjectId>,
    members: Vec<ObjectId>,
    candidate: Option<usize>,
    status: Status,
}

impl Selectable {
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn installed(&self) -> Option<&str> {
        self.installed.as_deref()
    }

    pub fn available(&self) -> &[AvailableVersion] {
        &self.available
    }

    pub fn requires(&self) -> &[ObjectId] {
        &self.requires
    }

    pub fn candidate_version(&self) -> Option<&AvailableVersion> {
        self.candidate.and_then(|i| self.available.get(i))
    }

    pub fn status(&self) -> Status {
        self.status
    }

    fn initial_status(&self) -> Status {
        if self.installed.is_some() {
            Status::KeepInstalled
        } else {
            Status::NoInst
        }
    }

    /// Whether the library would accept `status` for this object
    fn accepts(&self, status: Status) -> bool {
        let installed = self.installed.is_some();
        match status {
            Status::NoInst | Status::Taboo => !installed,
            Status::Install | Status::AutoInstall => !installed && self.candidate.is_some(),
            Status::KeepInstalled | Status::Del | Status::AutoDel | Status::Protected => installed,
            Status::Update | Status::AutoUpdate => match (&self.installed, self.candidate_version()) {
                (Some(inst), Some(cand)) => *inst != cand.version,
                _ => false,
            },
        }
    }

    fn has_newer_candidate(&self) -> bool {
        match (&self.installed, self.candidate_version()) {
            (Some(inst), Some(cand)) => edition_cmp(&cand.version, inst) == Ordering::Greater,
            _ => false,
        }
    }
}

/// In-memory object pool with stable ObjectIds
#[derive(Debug, Default)]
pub struct PackageDb {
    objects: Vec<Selectable>,
    name_to_id: HashMap<String, ObjectId>,
}

impl PackageDb {
    /// Load a pool from a JSON snapshot on disk
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::from_json(&content)?;
        info!(path = %path.display(), objects = db.len(), "loaded package snapshot");
        Ok(db)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    /// Build the pool. Packages come first so patch members can be resolved.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, ModelError> {
        let mut db = Self::default();

        for pkg in &snapshot.packages {
            let id = ObjectId(db.objects.len() as u32);
            if db.name_to_id.insert(pkg.name.clone(), id).is_some() {
                return Err(ModelError::DuplicateName(pkg.name.clone()));
            }
            let mut sel = Selectable {
                kind: ObjectKind::Package,
                name: pkg.name.clone(),
                summary: pkg.summary.clone(),
                category: String::new(),
                installed: pkg.installed.clone(),
                available: pkg.available.clone(),
                requires: Vec::new(),
                members: Vec::new(),
                candidate: pkg
                    .candidate
                    .as_ref()
                    .and_then(|pinned| pkg.available.iter().position(|v| v.version == *pinned))
                    .or_else(|| best_version(&pkg.available)),
                status: Status::NoInst,
            };
            sel.status = sel.initial_status();
            db.objects.push(sel);
        }

        // Requirements may point forward, so resolve them once all names exist
        for (idx, pkg) in snapshot.packages.iter().enumerate() {
            let requires = pkg
                .requires
                .iter()
                .filter_map(|name| {
                    let id = db.name_to_id.get(name).copied();
                    if id.is_none() {
                        debug!(package = %pkg.name, requires = %name, "unresolved requirement");
                    }
                    id
                })
                .collect();
            db.objects[idx].requires = requires;
        }

        for patch in &snapshot.patches {
            let members = patch
                .packages
                .iter()
                .map(|member| {
                    db.name_to_id.get(member).copied().ok_or_else(|| ModelError::UnknownMember {
                        patch: patch.name.clone(),
                        member: member.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let id = ObjectId(db.objects.len() as u32);
            if db.name_to_id.insert(patch.name.clone(), id).is_some() {
                return Err(ModelError::DuplicateName(patch.name.clone()));
            }
            let mut sel = Selectable {
                kind: ObjectKind::Patch,
                name: patch.name.clone(),
                summary: patch.summary.clone(),
                category: patch.category.clone(),
                installed: patch.installed.then(|| patch.version.clone()),
                available: vec![AvailableVersion {
                    version: patch.version.clone(),
                    arch: String::from("noarch"),
                    repo: String::new(),
                }],
                requires: Vec::new(),
                members,
                candidate: Some(0),
                status: Status::NoInst,
            };
            sel.status = sel.initial_status();
            db.objects.push(sel);
        }

        // Plain setter: a recorded patch status must not cascade over the
        // member statuses recorded next to it.
        let recorded = snapshot
            .packages
            .iter()
            .map(|p| (&p.name, p.status))
            .chain(snapshot.patches.iter().map(|p| (&p.name, p.status)));
        for (name, status) in recorded {
            let (Some(status), Some(id)) = (status, db.find(name)) else {
                continue;
            };
            if !db.set_status(id, status) {
                debug!(%name, ?status, "ignoring invalid recorded status");
            }
        }

        Ok(db)
    }

    /// Export the pool, including changed statuses and pinned candidates
    pub fn to_snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for sel in &self.objects {
            let status = (sel.status != sel.initial_status()).then_some(sel.status);
            let candidate = sel
                .candidate
                .filter(|&c| Some(c) != best_version(&sel.available))
                .map(|c| sel.available[c].version.clone());
            match sel.kind {
                ObjectKind::Package => snapshot.packages.push(PackageRecord {
                    name: sel.name.clone(),
                    summary: sel.summary.clone(),
                    installed: sel.installed.clone(),
                    available: sel.available.clone(),
                    requires: sel.requires.iter().map(|&id| self.objects[id.index()].name.clone()).collect(),
                    candidate,
                    status,
                }),
                ObjectKind::Patch => snapshot.patches.push(PatchRecord {
                    name: sel.name.clone(),
                    version: sel.available.first().map(|v| v.version.clone()).unwrap_or_else(default_patch_version),
                    summary: sel.summary.clone(),
                    category: sel.category.clone(),
                    installed: sel.installed.is_some(),
                    packages: sel.members.iter().map(|&id| self.objects[id.index()].name.clone()).collect(),
                    status,
                }),
            }
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        (0..self.objects.len()).map(|i| ObjectId(i as u32))
    }

    pub fn get(&self, id: ObjectId) -> Option<&Selectable> {
        self.objects.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.name_to_id.get(name).copied()
    }

    /// Table row for an object
    pub fn object_info(&self, id: ObjectId) -> Option<ObjectInfo> {
        let sel = self.get(id)?;
        Some(ObjectInfo {
            id,
            kind: sel.kind,
            name: sel.name.clone(),
            status: sel.status,
            summary: sel.summary.clone(),
            installed_version: sel.installed.clone().unwrap_or_default(),
            candidate_version: sel.candidate_version().map(|v| v.version.clone()).unwrap_or_default(),
        })
    }

    /// Does the object belong in the given filter category?
    pub fn matches_filter(&self, id: ObjectId, filter: FilterCategory) -> bool {
        let Some(sel) = self.get(id) else {
            return false;
        };
        match filter {
            FilterCategory::All => sel.kind == ObjectKind::Package,
            FilterCategory::Installed => sel.kind == ObjectKind::Package && sel.installed.is_some(),
            FilterCategory::Updates => sel.kind == ObjectKind::Package && sel.has_newer_candidate(),
            FilterCategory::Patches => sel.kind == ObjectKind::Patch,
            FilterCategory::MarkedChanges => sel.kind == ObjectKind::Package && sel.status.is_modified(),
        }
    }

    pub fn filter_count(&self, filter: FilterCategory) -> usize {
        self.ids().filter(|&id| self.matches_filter(id, filter)).count()
    }

    /// Objects with a pending change, packages and patches alike
    pub fn changed(&self) -> Vec<ObjectId> {
        self.ids().filter(|&id| self.objects[id.index()].status.is_modified()).collect()
    }

    /// Drop all pending changes and restore the best candidates
    pub fn reset(&mut self) {
        for sel in &mut self.objects {
            sel.candidate = best_version(&sel.available);
            sel.status = sel.initial_status();
        }
    }
}

impl ObjectModel for PackageDb {
    fn status(&self, id: ObjectId) -> Option<Status> {
        self.get(id).map(Selectable::status)
    }

    fn set_status(&mut self, id: ObjectId, status: Status) -> bool {
        let Some(sel) = self.objects.get_mut(id.index()) else {
            return false;
        };
        if !sel.accepts(status) {
            debug!(name = %sel.name, from = ?sel.status, to = ?status, "status rejected");
            return false;
        }
        sel.status = status;
        true
    }

    fn is_installed(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(|s| s.installed.is_some())
    }

    fn has_newer_candidate(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(Selectable::has_newer_candidate)
    }

    fn candidate(&self, id: ObjectId) -> Option<usize> {
        self.get(id).and_then(|s| s.candidate)
    }

    fn set_candidate(&mut self, id: ObjectId, version: usize) -> bool {
        match self.objects.get_mut(id.index()) {
            Some(sel) if version < sel.available.len() => {
                sel.candidate = Some(version);
                true
            }
            _ => false,
        }
    }

    fn is_installed_version(&self, id: ObjectId, version: usize) -> bool {
        self.get(id).is_some_and(|s| match (&s.installed, s.available.get(version)) {
            (Some(inst), Some(v)) => *inst == v.version,
            _ => false,
        })
    }

    fn patch_members(&self, id: ObjectId) -> Option<&[ObjectId]> {
        self.get(id)
            .filter(|s| s.kind == ObjectKind::Patch)
            .map(|s| s.members.as_slice())
    }

    /// Locked members keep their status. Installed and not-installed members
    /// get the equivalent status for their own state.
    fn cascade_status(&mut self, member: ObjectId, status: Status) -> bool {
        let Some(current) = self.status(member) else {
            return false;
        };
        if current.is_lock() {
            debug!(?member, ?current, "locked member keeps its status");
            return false;
        }
        let installed = self.is_installed(member);
        let status = match (installed, status) {
            (true, Status::Install | Status::AutoInstall) => {
                if self.has_newer_candidate(member) {
                    Status::Update
                } else {
                    Status::KeepInstalled
                }
            }
            (true, Status::NoInst) => Status::KeepInstalled,
            (false, Status::Update | Status::AutoUpdate) => Status::Install,
            (false, Status::KeepInstalled) => Status::NoInst,
            (_, status) => status,
        };
        self.set_status(member, status)
    }
}

/// Index of the highest edition in the list
fn best_version(available: &[AvailableVersion]) -> Option<usize> {
    available
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| edition_cmp(&a.version, &b.version))
        .map(|(i, _)| i)
}

/// Strip the release from an edition: "1.2.3-4.1" -> "1.2.3"
pub fn edition_version(edition: &str) -> &str {
    edition.rsplit_once('-').map_or(edition, |(version, _)| version)
}

/// Compare editions piecewise, numbers numerically, so "1.10" > "1.9"
pub fn edition_cmp(a: &str, b: &str) -> Ordering {
    let tokens_a = tokens(a);
    let tokens_b = tokens(b);

    for (a, b) in tokens_a.iter().zip(tokens_b.iter()) {
        let or = match (a, b) {
            (Token::Number(a), Token::Number(b)) => a.cmp(b),
            (Token::Number(_), Token::Text(_)) => Ordering::Greater,
            (Token::Text(_), Token::Number(_)) => Ordering::Less,
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
        };
        if or != Ordering::Equal {
            return or;
        }
    }
    tokens_a.len().cmp(&tokens_b.len())
}

enum Token<'a> {
    Number(u64),
    Text(&'a str),
}

/// Split on separators into runs of digits and runs of letters
fn tokens(s: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut start = None;
    let mut numeric = false;

    for (i, c) in s.char_indices() {
        let is_sep = !c.is_ascii_alphanumeric();
        let is_digit = c.is_ascii_digit();
        if let Some(st) = start
            && (is_sep || is_digit != numeric)
        {
            out.push(token(&s[st..i], numeric));
            start = None;
        }
        if !is_sep && start.is_none() {
            start = Some(i);
            numeric = is_digit;
        }
    }
    if let Some(st) = start {
        out.push(token(&s[st..], numeric));
    }
    out
}

fn token(s: &str, numeric: bool) -> Token<'_> {
    if numeric {
        s.parse().map_or(Token::Text(s), Token::Number)
    } else {
        Token::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "packages": [
            { "name": "vim", "summary": "Vi IMproved", "installed": "9.0-1.1",
              "available": [ { "version": "9.0-1.1", "repo": "oss" },
                             { "version": "9.1-2.1", "repo": "update" } ] },
            { "name": "emacs", "summary": "GNU Emacs",
              "available": [ { "version": "29.1-1.1", "repo": "oss" } ],
              "requires": ["libfoo", "vim"] },
            { "name": "libfoo", "installed": "1.0-1",
              "available": [ { "version": "1.0-1" } ], "status": "protected" }
        ],
        "patches": [
            { "name": "SUSE-2024-1", "category": "security", "packages": ["vim", "emacs", "libfoo"] }
        ]
    }"#;

    fn db() -> PackageDb {
        PackageDb::from_json(SNAPSHOT).unwrap()
    }

    #[test]
    fn test_edition_cmp() {
        assert_eq!(edition_cmp("1.10-1", "1.9-1"), Ordering::Greater);
        assert_eq!(edition_cmp("9.0-1.1", "9.1-2.1"), Ordering::Less);
        assert_eq!(edition_cmp("2.0", "2.0"), Ordering::Equal);
        assert_eq!(edition_cmp("2.0.1", "2.0"), Ordering::Greater);
        assert_eq!(edition_version("9.1-2.1"), "9.1");
        assert_eq!(edition_version("2.0"), "2.0");
    }

    #[test]
    fn load_resolves_names_and_candidates() {
        let db = db();
        let vim = db.find("vim").unwrap();
        let emacs = db.find("emacs").unwrap();

        assert_eq!(db.len(), 4);
        assert_eq!(db.status(vim), Some(Status::KeepInstalled));
        assert_eq!(db.candidate(vim), Some(1));
        assert!(db.has_newer_candidate(vim));
        assert!(db.is_installed_version(vim, 0));
        assert_eq!(db.get(emacs).unwrap().requires().len(), 2);
        assert_eq!(db.status(db.find("libfoo").unwrap()), Some(Status::Protected));
        assert_eq!(db.patch_members(db.find("SUSE-2024-1").unwrap()).unwrap().len(), 3);
        assert_eq!(db.patch_members(vim), None);
    }

    #[test]
    fn unknown_patch_member_is_an_error() {
        let json = r#"{ "patches": [ { "name": "p", "packages": ["ghost"] } ] }"#;
        assert!(matches!(PackageDb::from_json(json), Err(ModelError::UnknownMember { .. })));
    }

    #[test]
    fn duplicate_names_are_an_error() {
        let json = r#"{
            "packages": [ { "name": "vim" } ],
            "patches": [ { "name": "vim", "packages": ["vim"] } ]
        }"#;
        assert!(matches!(PackageDb::from_json(json), Err(ModelError::DuplicateName(name)) if name == "vim"));

        let json = r#"{ "packages": [ { "name": "vim" }, { "name": "vim" } ] }"#;
        assert!(matches!(PackageDb::from_json(json), Err(ModelError::DuplicateName(_))));
    }

    #[test]
    fn set_status_enforces_install_state() {
        let mut db = db();
        let vim = db.find("vim").unwrap();
        let emacs = db.find("emacs").unwrap();

        assert!(!db.set_status(vim, Status::Install));
        assert!(db.set_status(vim, Status::Update));
        assert!(!db.set_status(emacs, Status::Del));
        assert!(db.set_status(emacs, Status::Taboo));
        assert_eq!(db.status(emacs), Some(Status::Taboo));
    }

    #[test]
    fn cascade_translates_and_skips_locked_members() {
        let mut db = db();
        let vim = db.find("vim").unwrap();
        let emacs = db.find("emacs").unwrap();
        let libfoo = db.find("libfoo").unwrap();

        assert!(db.cascade_status(vim, Status::Install));
        assert_eq!(db.status(vim), Some(Status::Update));
        assert!(db.cascade_status(emacs, Status::Install));
        assert_eq!(db.status(emacs), Some(Status::Install));
        assert!(!db.cascade_status(libfoo, Status::Install));
        assert_eq!(db.status(libfoo), Some(Status::Protected));

        assert!(db.cascade_status(vim, Status::NoInst));
        assert_eq!(db.status(vim), Some(Status::KeepInstalled));
    }

    #[test]
    fn filters_and_reset() {
        let mut db = db();
        assert_eq!(db.filter_count(FilterCategory::All), 3);
        assert_eq!(db.filter_count(FilterCategory::Installed), 2);
        assert_eq!(db.filter_count(FilterCategory::Updates), 1);
        assert_eq!(db.filter_count(FilterCategory::Patches), 1);
        assert_eq!(db.filter_count(FilterCategory::MarkedChanges), 0);

        let vim = db.find("vim").unwrap();
        db.set_candidate(vim, 0);
        assert!(!db.has_newer_candidate(vim));
        db.set_candidate(vim, 1);
        db.set_status(vim, Status::Update);
        assert_eq!(db.changed(), vec![vim]);

        db.reset();
        assert!(db.changed().is_empty());
        assert_eq!(db.status(db.find("libfoo").unwrap()), Some(Status::KeepInstalled));
    }

    #[test]
    fn snapshot_keeps_changed_statuses() {
        let mut db = db();
        let emacs = db.find("emacs").unwrap();
        db.set_status(emacs, Status::Install);

        let vim = db.find("vim").unwrap();
        db.set_candidate(vim, 0);

        let json = serde_json::to_string(&db.to_snapshot()).unwrap();
        let reloaded = PackageDb::from_json(&json).unwrap();
        assert_eq!(reloaded.status(reloaded.find("emacs").unwrap()), Some(Status::Install));
        assert_eq!(reloaded.candidate(reloaded.find("vim").unwrap()), Some(0));
        assert_eq!(reloaded.status(reloaded.find("vim").unwrap()), Some(Status::KeepInstalled));
    }
}
