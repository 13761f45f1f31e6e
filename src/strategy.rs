//! Status strategies
//!
//! Each object category (plain package, dependency, update, package inside a
//! patch, patch, available version) has its own rules for reading a status,
//! writing one, and turning a key press into the next status. Strategies are
//! stateless: the model and the object are passed into every call, so one
//! `'static` instance per category is all there is.
//!
//! `key_to_status` and `toggle_status` only compute. Nothing changes until
//! the caller hands the result to `set_status`.

use crossterm::event::KeyCode;
use tracing::debug;

use crate::model::ObjectModel;
use crate::types::{ObjectRef, Status};

pub trait StatusStrategy: Sync {
    fn name(&self) -> &'static str;

    /// Current desired status of the object
    fn status(&self, model: &dyn ObjectModel, obj: ObjectRef) -> Status {
        model.status(obj.id).unwrap_or(Status::NoInst)
    }

    /// Ask the model to apply `status`. Returns whether it was accepted.
    fn set_status(&self, model: &mut dyn ObjectModel, status: Status, obj: ObjectRef) -> bool {
        model.set_status(obj.id, status)
    }

    /// Status the key should produce given the object's current one, or
    /// `None` if the key means nothing here
    fn key_to_status(&self, key: KeyCode, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        base_key_to_status(self, key, model, obj)
    }

    /// Next status in the category's cycle
    fn toggle_status(&self, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        Some(base_toggle_status(self, model, obj))
    }
}

/// Key table shared by the plain categories
fn base_key_to_status<S: StatusStrategy + ?Sized>(
    strategy: &S,
    key: KeyCode,
    model: &dyn ObjectModel,
    obj: ObjectRef,
) -> Option<Status> {
    let old = strategy.status(model, obj);
    let installed = model.is_installed(obj.id);

    match key {
        KeyCode::Char(' ') => strategy.toggle_status(model, obj),
        KeyCode::Char('+') => match old {
            Status::NoInst | Status::AutoInstall => Some(Status::Install),
            // Installed but marked for deletion: keep it
            Status::Del | Status::AutoDel => Some(Status::KeepInstalled),
            Status::AutoUpdate => Some(Status::Update),
            _ => None,
        },
        KeyCode::Char('-') | KeyCode::Delete => {
            if installed {
                Some(Status::Del)
            } else {
                Some(Status::NoInst)
            }
        }
        KeyCode::Char('>') => match old {
            Status::KeepInstalled
            | Status::Del
            | Status::AutoDel
            | Status::AutoUpdate
            | Status::Protected
                if model.has_newer_candidate(obj.id) =>
            {
                Some(Status::Update)
            }
            _ => None,
        },
        KeyCode::Char('!') if !installed => Some(Status::Taboo),
        KeyCode::Char('*') if installed => Some(Status::Protected),
        _ => None,
    }
}

/// Toggle cycle shared by the plain categories
fn base_toggle_status<S: StatusStrategy + ?Sized>(strategy: &S, model: &dyn ObjectModel, obj: ObjectRef) -> Status {
    match strategy.status(model, obj) {
        Status::NoInst => Status::Install,
        Status::Install => Status::NoInst,
        Status::KeepInstalled => {
            if model.has_newer_candidate(obj.id) {
                Status::Update
            } else {
                Status::Del
            }
        }
        Status::Update => Status::Del,
        Status::Del => Status::KeepInstalled,
        Status::AutoInstall => Status::NoInst,
        Status::AutoUpdate | Status::AutoDel => Status::KeepInstalled,
        Status::Taboo => Status::NoInst,
        Status::Protected => Status::KeepInstalled,
    }
}

/// Packages in the main list
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageStrategy;

/// Packages shown as requirements of another package
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyStrategy;

/// Packages in the update list
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateStrategy;

/// Packages listed as contents of a patch
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchPackageStrategy;

/// Patches; status changes cascade to the bundled packages
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchStrategy;

/// One available version of a package
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailableStrategy;

impl StatusStrategy for PackageStrategy {
    fn name(&self) -> &'static str {
        "package"
    }
}

impl StatusStrategy for DependencyStrategy {
    fn name(&self) -> &'static str {
        "dependency"
    }
}

impl StatusStrategy for UpdateStrategy {
    fn name(&self) -> &'static str {
        "update"
    }
}

impl StatusStrategy for PatchPackageStrategy {
    fn name(&self) -> &'static str {
        "patch package"
    }

    /// Packages of a patch follow the patch; they can't be set on their own.
    fn set_status(&self, _model: &mut dyn ObjectModel, _status: Status, _obj: ObjectRef) -> bool {
        false
    }
}

impl PatchStrategy {
    fn can_cascade(model: &dyn ObjectModel, obj: ObjectRef) -> bool {
        model.patch_members(obj.id).is_some()
    }
}

impl StatusStrategy for PatchStrategy {
    fn name(&self) -> &'static str {
        "patch"
    }

    /// Set the patch, then push the same status to every bundled package.
    /// Whether a member actually follows is the model's call.
    fn set_status(&self, model: &mut dyn ObjectModel, status: Status, obj: ObjectRef) -> bool {
        if !model.set_status(obj.id, status) {
            return false;
        }
        let members = model.patch_members(obj.id).map(<[_]>::to_vec).unwrap_or_default();
        for member in members {
            let followed = model.cascade_status(member, status);
            debug!(patch = ?obj.id, ?member, ?status, followed, "patch cascade");
        }
        true
    }

    fn key_to_status(&self, key: KeyCode, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        if !Self::can_cascade(model, obj) {
            return None;
        }
        let old = self.status(model, obj);
        match key {
            KeyCode::Char(' ') => self.toggle_status(model, obj),
            KeyCode::Char('+') => match old {
                Status::NoInst | Status::AutoInstall => Some(Status::Install),
                Status::KeepInstalled | Status::AutoUpdate => Some(Status::Update),
                _ => None,
            },
            KeyCode::Char('-') | KeyCode::Delete => match old {
                Status::Install | Status::AutoInstall => Some(Status::NoInst),
                Status::Update | Status::AutoUpdate => Some(Status::KeepInstalled),
                _ => None,
            },
            _ => None,
        }
    }

    fn toggle_status(&self, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        if !Self::can_cascade(model, obj) {
            return None;
        }
        match self.status(model, obj) {
            Status::NoInst => Some(Status::Install),
            Status::Install | Status::AutoInstall => Some(Status::NoInst),
            Status::KeepInstalled => Some(Status::Update),
            Status::Update | Status::AutoUpdate => Some(Status::KeepInstalled),
            _ => None,
        }
    }
}

impl StatusStrategy for AvailableStrategy {
    fn name(&self) -> &'static str {
        "available"
    }

    /// Status of this particular version row: only the candidate carries the
    /// package status; the installed row shows whether it is kept or deleted.
    fn status(&self, model: &dyn ObjectModel, obj: ObjectRef) -> Status {
        let status = model.status(obj.id).unwrap_or(Status::NoInst);
        let Some(version) = obj.version else {
            return status;
        };

        if model.candidate(obj.id) == Some(version) {
            status
        } else if model.is_installed_version(obj.id, version) {
            match status {
                Status::Del | Status::AutoDel => status,
                _ => Status::KeepInstalled,
            }
        } else {
            Status::NoInst
        }
    }

    /// Make this version the candidate, then apply the status. A refused
    /// status puts the previous candidate back.
    fn set_status(&self, model: &mut dyn ObjectModel, status: Status, obj: ObjectRef) -> bool {
        let Some(version) = obj.version else {
            return false;
        };
        let previous = model.candidate(obj.id);
        if !model.set_candidate(obj.id, version) {
            return false;
        }
        if model.set_status(obj.id, status) {
            return true;
        }
        if let Some(previous) = previous {
            model.set_candidate(obj.id, previous);
        }
        false
    }

    /// On an installed package, picking another version means updating to
    /// it and picking the installed row means keeping it. Packages that
    /// are not installed use the plain tables.
    fn key_to_status(&self, key: KeyCode, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        let Some(version) = obj.version.filter(|_| model.is_installed(obj.id)) else {
            return base_key_to_status(self, key, model, obj);
        };
        let old = self.status(model, obj);

        if model.is_installed_version(obj.id, version) {
            let is_candidate = model.candidate(obj.id) == Some(version);
            return match key {
                KeyCode::Char(' ') => self.toggle_status(model, obj),
                KeyCode::Char('+' | '>') => {
                    (old != Status::KeepInstalled || !is_candidate).then_some(Status::KeepInstalled)
                }
                KeyCode::Char('-') | KeyCode::Delete => Some(Status::Del),
                _ => base_key_to_status(self, key, model, obj),
            };
        }

        let scheduled = matches!(old, Status::Update | Status::AutoUpdate);
        match key {
            KeyCode::Char(' ') => self.toggle_status(model, obj),
            KeyCode::Char('+' | '>') => (!scheduled || old == Status::AutoUpdate).then_some(Status::Update),
            KeyCode::Char('-') | KeyCode::Delete => scheduled.then_some(Status::KeepInstalled),
            _ => base_key_to_status(self, key, model, obj),
        }
    }

    fn toggle_status(&self, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        let Some(version) = obj.version.filter(|_| model.is_installed(obj.id)) else {
            return Some(base_toggle_status(self, model, obj));
        };
        let old = self.status(model, obj);

        let next = if model.is_installed_version(obj.id, version) {
            if model.candidate(obj.id) != Some(version) || matches!(old, Status::Del | Status::AutoDel) {
                Status::KeepInstalled
            } else {
                Status::Del
            }
        } else if matches!(old, Status::Update | Status::AutoUpdate) {
            Status::KeepInstalled
        } else {
            Status::Update
        };
        Some(next)
    }
}

/// The closed set of categories, for callers that pick a strategy per view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Package,
    Dependency,
    Update,
    PatchPackage,
    Patch,
    Available,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        Self::Package,
        Self::Dependency,
        Self::Update,
        Self::PatchPackage,
        Self::Patch,
        Self::Available,
    ];

    pub fn strategy(self) -> &'static dyn StatusStrategy {
        match self {
            Self::Package => &PackageStrategy,
            Self::Dependency => &DependencyStrategy,
            Self::Update => &UpdateStrategy,
            Self::PatchPackage => &PatchPackageStrategy,
            Self::Patch => &PatchStrategy,
            Self::Available => &AvailableStrategy,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.strategy().name().replace(' ', "-") == name)
    }

    pub fn status(self, model: &dyn ObjectModel, obj: ObjectRef) -> Status {
        self.strategy().status(model, obj)
    }

    pub fn set_status(self, model: &mut dyn ObjectModel, status: Status, obj: ObjectRef) -> bool {
        self.strategy().set_status(model, status, obj)
    }

    pub fn key_to_status(self, key: KeyCode, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        self.strategy().key_to_status(key, model, obj)
    }

    pub fn toggle_status(self, model: &dyn ObjectModel, obj: ObjectRef) -> Option<Status> {
        self.strategy().toggle_status(model, obj)
    }
}

/// Outcome of feeding a key (or a toggle) through a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The key has no meaning for this object
    Unmapped,
    /// The strategy or model refused the new status; nothing changed
    Rejected { wanted: Status },
    Changed { from: Status, to: Status },
}

/// Map a key to a status and apply it
pub fn apply_key(
    strategy: &dyn StatusStrategy,
    key: KeyCode,
    model: &mut dyn ObjectModel,
    obj: ObjectRef,
) -> StatusChange {
    let next = strategy.key_to_status(key, model, obj);
    apply(strategy, next, model, obj)
}

/// Toggle the status and apply it
pub fn apply_toggle(strategy: &dyn StatusStrategy, model: &mut dyn ObjectModel, obj: ObjectRef) -> StatusChange {
    let next = strategy.toggle_status(model, obj);
    apply(strategy, next, model, obj)
}

fn apply(
    strategy: &dyn StatusStrategy,
    next: Option<Status>,
    model: &mut dyn ObjectModel,
    obj: ObjectRef,
) -> StatusChange {
    let Some(to) = next else {
        return StatusChange::Unmapped;
    };
    let from = strategy.status(model, obj);
    if strategy.set_status(model, to, obj) {
        debug!(strategy = strategy.name(), ?obj, ?from, ?to, "status changed");
        StatusChange::Changed { from, to }
    } else {
        debug!(strategy = strategy.name(), ?obj, wanted = ?to, "status change rejected");
        StatusChange::Rejected { wanted: to }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::types::ObjectId;

    /// Plain store: accepts every status, every cascade, every candidate
    #[derive(Debug, Clone, Default, PartialEq)]
    struct MemoryModel {
        objects: HashMap<ObjectId, Entry>,
        rejecting: HashSet<ObjectId>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Entry {
        status: Status,
        installed: Option<usize>,
        newer: bool,
        candidate: Option<usize>,
        members: Option<Vec<ObjectId>>,
    }

    impl MemoryModel {
        fn add(&mut self, id: u32, entry: Entry) -> ObjectRef {
            self.objects.insert(ObjectId(id), entry);
            ObjectRef::selectable(ObjectId(id))
        }

        fn package(&mut self, id: u32, status: Status) -> ObjectRef {
            let installed = status.is_installed_state().then_some(0);
            self.add(id, Entry { status, installed, candidate: Some(0), ..Entry::default() })
        }

        fn get(&self, obj: ObjectRef) -> Status {
            self.objects[&obj.id].status
        }
    }

    impl ObjectModel for MemoryModel {
        fn status(&self, id: ObjectId) -> Option<Status> {
            self.objects.get(&id).map(|e| e.status)
        }

        fn set_status(&mut self, id: ObjectId, status: Status) -> bool {
            if self.rejecting.contains(&id) {
                return false;
            }
            match self.objects.get_mut(&id) {
                Some(e) => {
                    e.status = status;
                    true
                }
                None => false,
            }
        }

        fn is_installed(&self, id: ObjectId) -> bool {
            self.objects.get(&id).is_some_and(|e| e.installed.is_some())
        }

        fn has_newer_candidate(&self, id: ObjectId) -> bool {
            self.objects.get(&id).is_some_and(|e| e.newer)
        }

        fn candidate(&self, id: ObjectId) -> Option<usize> {
            self.objects.get(&id).and_then(|e| e.candidate)
        }

        fn set_candidate(&mut self, id: ObjectId, version: usize) -> bool {
            match self.objects.get_mut(&id) {
                Some(e) => {
                    e.candidate = Some(version);
                    true
                }
                None => false,
            }
        }

        fn is_installed_version(&self, id: ObjectId, version: usize) -> bool {
            self.objects.get(&id).is_some_and(|e| e.installed == Some(version))
        }

        fn patch_members(&self, id: ObjectId) -> Option<&[ObjectId]> {
            self.objects.get(&id).and_then(|e| e.members.as_deref())
        }
    }

    const STATUS_KEYS: [KeyCode; 7] = [
        KeyCode::Char(' '),
        KeyCode::Char('+'),
        KeyCode::Char('-'),
        KeyCode::Delete,
        KeyCode::Char('>'),
        KeyCode::Char('!'),
        KeyCode::Char('*'),
    ];

    #[test]
    fn set_then_get_round_trips_for_plain_categories() {
        for kind in [StrategyKind::Package, StrategyKind::Dependency, StrategyKind::Update] {
            let strategy = kind.strategy();
            let mut model = MemoryModel::default();
            let obj = model.package(1, Status::NoInst);

            for status in Status::ALL {
                assert!(strategy.set_status(&mut model, status, obj), "{kind:?} {status:?}");
                assert_eq!(strategy.status(&model, obj), status, "{kind:?}");
            }
        }
    }

    #[test]
    fn patch_package_never_accepts_a_status() {
        let strategy = StrategyKind::PatchPackage.strategy();
        let mut model = MemoryModel::default();
        let obj = model.package(1, Status::KeepInstalled);
        let before = model.clone();

        for status in Status::ALL {
            assert!(!strategy.set_status(&mut model, status, obj));
        }
        assert_eq!(model, before);
        assert_eq!(
            apply_key(strategy, KeyCode::Char('-'), &mut model, obj),
            StatusChange::Rejected { wanted: Status::Del }
        );
    }

    #[test]
    fn patch_status_cascades_to_every_member() {
        let strategy = StrategyKind::Patch.strategy();
        let mut model = MemoryModel::default();
        let a = model.package(1, Status::NoInst);
        let b = model.package(2, Status::KeepInstalled);
        let patch = model.add(
            10,
            Entry { members: Some(vec![a.id, b.id]), ..Entry::default() },
        );

        for status in [Status::Install, Status::NoInst, Status::Update, Status::KeepInstalled] {
            assert!(strategy.set_status(&mut model, status, patch));
            assert_eq!(model.get(patch), status);
            assert_eq!(model.get(a), status);
            assert_eq!(model.get(b), status);
        }
    }

    #[test]
    fn rejected_patch_does_not_cascade() {
        let strategy = StrategyKind::Patch.strategy();
        let mut model = MemoryModel::default();
        let a = model.package(1, Status::NoInst);
        let patch = model.add(10, Entry { members: Some(vec![a.id]), ..Entry::default() });
        model.rejecting.insert(patch.id);

        assert!(!strategy.set_status(&mut model, Status::Install, patch));
        assert_eq!(model.get(a), Status::NoInst);
    }

    #[test]
    fn patch_keys_need_a_resolvable_patch() {
        let strategy = StrategyKind::Patch.strategy();
        let mut model = MemoryModel::default();
        let not_a_patch = model.package(1, Status::NoInst);
        let patch = model.add(10, Entry { members: Some(Vec::new()), ..Entry::default() });

        assert_eq!(strategy.key_to_status(KeyCode::Char('+'), &model, not_a_patch), None);
        assert_eq!(strategy.toggle_status(&model, not_a_patch), None);
        assert_eq!(strategy.key_to_status(KeyCode::Char('+'), &model, patch), Some(Status::Install));
        assert_eq!(strategy.key_to_status(KeyCode::Char('-'), &model, patch), None);
        assert_eq!(strategy.key_to_status(KeyCode::Char('!'), &model, patch), None);

        model.set_status(patch.id, Status::Update);
        assert_eq!(
            strategy.key_to_status(KeyCode::Char('-'), &model, patch),
            Some(Status::KeepInstalled)
        );
    }

    #[test]
    fn base_key_table() {
        let strategy = StrategyKind::Package.strategy();
        let mut model = MemoryModel::default();
        let fresh = model.package(1, Status::NoInst);
        let kept = model.package(2, Status::KeepInstalled);
        let deleted = model.package(3, Status::Del);
        model.objects.get_mut(&kept.id).unwrap().newer = true;

        let key = |k: char, obj| strategy.key_to_status(KeyCode::Char(k), &model, obj);

        assert_eq!(key('+', fresh), Some(Status::Install));
        assert_eq!(key('-', fresh), Some(Status::NoInst));
        assert_eq!(key('!', fresh), Some(Status::Taboo));
        assert_eq!(key('*', fresh), None);
        assert_eq!(key('>', fresh), None);

        assert_eq!(key('+', kept), None);
        assert_eq!(key('-', kept), Some(Status::Del));
        assert_eq!(key('>', kept), Some(Status::Update));
        assert_eq!(key('*', kept), Some(Status::Protected));
        assert_eq!(key('!', kept), None);

        assert_eq!(key('+', deleted), Some(Status::KeepInstalled));
        assert_eq!(key('>', deleted), None);
        assert_eq!(key(' ', deleted), Some(Status::KeepInstalled));
    }

    #[test]
    fn unmapped_keys_return_none_and_mutate_nothing() {
        let mut model = MemoryModel::default();
        let pkg = model.package(1, Status::KeepInstalled);
        let patch = model.add(10, Entry { members: Some(vec![pkg.id]), ..Entry::default() });
        let before = model.clone();

        for kind in StrategyKind::ALL {
            let strategy = kind.strategy();
            for obj in [pkg, patch, ObjectRef::version(pkg.id, 0)] {
                for key in [KeyCode::Char('x'), KeyCode::Enter, KeyCode::F(1), KeyCode::Char('q')] {
                    assert_eq!(strategy.key_to_status(key, &model, obj), None, "{kind:?}");
                }
                for key in STATUS_KEYS {
                    let _ = strategy.key_to_status(key, &model, obj);
                }
                let _ = strategy.toggle_status(&model, obj);
            }
        }
        assert_eq!(model, before);
    }

    #[test]
    fn toggle_cycles_close() {
        let steady = [
            (Status::NoInst, false),
            (Status::Install, false),
            (Status::KeepInstalled, true),
            (Status::KeepInstalled, false),
            (Status::Update, true),
            (Status::Del, true),
            (Status::Del, false),
        ];
        let strategy = StrategyKind::Package.strategy();

        for (start, newer) in steady {
            let mut model = MemoryModel::default();
            let obj = model.package(1, start);
            model.objects.get_mut(&obj.id).unwrap().newer = newer;

            let mut seen = vec![start];
            for _ in 0..3 {
                let next = strategy.toggle_status(&model, obj).unwrap();
                model.set_status(obj.id, next);
                if next == start {
                    break;
                }
                seen.push(next);
            }
            assert_eq!(model.get(obj), start, "{start:?} (newer: {newer}) went {seen:?}");
        }

        // Auto and lock statuses step into one of the cycles above
        for start in [Status::AutoInstall, Status::AutoUpdate, Status::AutoDel, Status::Taboo, Status::Protected] {
            let mut model = MemoryModel::default();
            let obj = model.package(1, start);
            let next = strategy.toggle_status(&model, obj).unwrap();
            assert!(matches!(next, Status::NoInst | Status::KeepInstalled), "{start:?}");
        }
    }

    #[test]
    fn patch_toggle_cycles_close() {
        let strategy = StrategyKind::Patch.strategy();
        for start in [Status::NoInst, Status::Install, Status::KeepInstalled, Status::Update] {
            let mut model = MemoryModel::default();
            let patch = model.add(10, Entry { status: start, members: Some(Vec::new()), ..Entry::default() });

            let first = strategy.toggle_status(&model, patch).unwrap();
            assert_ne!(first, start);
            model.set_status(patch.id, first);
            assert_eq!(strategy.toggle_status(&model, patch), Some(start));
        }

        let mut model = MemoryModel::default();
        let patch = model.add(10, Entry { status: Status::Taboo, members: Some(Vec::new()), ..Entry::default() });
        assert_eq!(strategy.toggle_status(&model, patch), None);
    }

    #[test]
    fn available_rows_follow_the_candidate() {
        let strategy = StrategyKind::Available.strategy();
        let mut model = MemoryModel::default();
        let id = ObjectId(1);
        model.add(
            1,
            Entry {
                status: Status::KeepInstalled,
                installed: Some(0),
                candidate: Some(1),
                ..Entry::default()
            },
        );
        let installed_row = ObjectRef::version(id, 0);
        let newest_row = ObjectRef::version(id, 1);
        let other_row = ObjectRef::version(id, 2);

        assert_eq!(strategy.status(&model, newest_row), Status::KeepInstalled);
        assert_eq!(strategy.status(&model, installed_row), Status::KeepInstalled);
        assert_eq!(strategy.status(&model, other_row), Status::NoInst);

        assert!(strategy.set_status(&mut model, Status::Update, other_row));
        assert_eq!(model.candidate(id), Some(2));
        assert_eq!(strategy.status(&model, other_row), Status::Update);
        assert_eq!(strategy.status(&model, newest_row), Status::NoInst);
        assert_eq!(strategy.status(&model, installed_row), Status::KeepInstalled);

        model.set_status(id, Status::Del);
        assert_eq!(strategy.status(&model, installed_row), Status::Del);

        // Without a version row there is no candidate to bind
        assert!(!strategy.set_status(&mut model, Status::Install, ObjectRef::selectable(id)));
    }

    const VIM_SNAPSHOT: &str = r#"{
        "packages": [
            {
                "name": "vim",
                "installed": "9.0-1.1",
                "available": [
                    { "version": "9.0-1.1", "arch": "x86_64", "repo": "oss" },
                    { "version": "9.1-2.1", "arch": "x86_64", "repo": "update" },
                    { "version": "9.2-1.1", "arch": "x86_64", "repo": "update" }
                ]
            }
        ]
    }"#;

    fn vim_db() -> (crate::model::PackageDb, ObjectId) {
        let db = crate::model::PackageDb::from_json(VIM_SNAPSHOT).unwrap();
        let id = db.find("vim").unwrap();
        (db, id)
    }

    #[test]
    fn rejected_version_keeps_the_previous_candidate() {
        let (mut db, id) = vim_db();
        assert_eq!(db.candidate(id), Some(2));

        // Updating to the installed version is refused by the pool
        let strategy = StrategyKind::Available.strategy();
        assert!(!strategy.set_status(&mut db, Status::Update, ObjectRef::version(id, 0)));
        assert_eq!(db.candidate(id), Some(2));
        assert!(db.has_newer_candidate(id));
        assert_eq!(ObjectModel::status(&db, id), Some(Status::KeepInstalled));
    }

    #[test]
    fn installed_package_can_pick_any_version() {
        let (mut db, id) = vim_db();
        let strategy = StrategyKind::Available.strategy();
        let installed_row = ObjectRef::version(id, 0);
        let middle_row = ObjectRef::version(id, 1);
        let newest_row = ObjectRef::version(id, 2);

        assert_eq!(
            apply_key(strategy, KeyCode::Char('+'), &mut db, middle_row),
            StatusChange::Changed { from: Status::NoInst, to: Status::Update }
        );
        assert_eq!(db.candidate(id), Some(1));
        assert_eq!(strategy.status(&db, middle_row), Status::Update);
        assert_eq!(strategy.status(&db, newest_row), Status::NoInst);
        assert_eq!(strategy.key_to_status(KeyCode::Char('+'), &db, middle_row), None);

        assert_eq!(
            apply_key(strategy, KeyCode::Char('>'), &mut db, newest_row),
            StatusChange::Changed { from: Status::NoInst, to: Status::Update }
        );
        assert_eq!(db.candidate(id), Some(2));

        // Dropping the update keeps the newest row as candidate
        assert_eq!(
            apply_key(strategy, KeyCode::Char('-'), &mut db, newest_row),
            StatusChange::Changed { from: Status::Update, to: Status::KeepInstalled }
        );
        assert_eq!(strategy.key_to_status(KeyCode::Char('-'), &db, middle_row), None);

        assert_eq!(
            apply_toggle(strategy, &mut db, middle_row),
            StatusChange::Changed { from: Status::NoInst, to: Status::Update }
        );
        assert_eq!(db.candidate(id), Some(1));

        assert_eq!(
            apply_key(strategy, KeyCode::Char('+'), &mut db, installed_row),
            StatusChange::Changed { from: Status::KeepInstalled, to: Status::KeepInstalled }
        );
        assert_eq!(db.candidate(id), Some(0));
        assert!(!db.has_newer_candidate(id));
        assert_eq!(strategy.key_to_status(KeyCode::Char('+'), &db, installed_row), None);

        assert_eq!(
            apply_toggle(strategy, &mut db, installed_row),
            StatusChange::Changed { from: Status::KeepInstalled, to: Status::Del }
        );
        assert_eq!(
            apply_key(strategy, KeyCode::Char(' '), &mut db, installed_row),
            StatusChange::Changed { from: Status::Del, to: Status::KeepInstalled }
        );
    }

    #[test]
    fn not_installed_versions_use_the_plain_tables() {
        let mut model = MemoryModel::default();
        let id = ObjectId(1);
        model.add(1, Entry { candidate: Some(1), ..Entry::default() });
        let row = ObjectRef::version(id, 0);

        assert_eq!(StrategyKind::Available.key_to_status(KeyCode::Char('+'), &model, row), Some(Status::Install));
        assert_eq!(StrategyKind::Available.toggle_status(&model, row), Some(Status::Install));
        assert!(StrategyKind::Available.set_status(&mut model, Status::Install, row));
        assert_eq!(model.candidate(id), Some(0));
        assert_eq!(StrategyKind::Available.status(&model, row), Status::Install);
        assert_eq!(StrategyKind::Package.status(&model, ObjectRef::selectable(id)), Status::Install);
    }

    #[test]
    fn apply_reports_outcome() {
        let strategy = StrategyKind::Package.strategy();
        let mut model = MemoryModel::default();
        let obj = model.package(1, Status::NoInst);

        assert_eq!(apply_key(strategy, KeyCode::Char('x'), &mut model, obj), StatusChange::Unmapped);
        assert_eq!(
            apply_key(strategy, KeyCode::Char('+'), &mut model, obj),
            StatusChange::Changed { from: Status::NoInst, to: Status::Install }
        );
        model.rejecting.insert(obj.id);
        assert_eq!(
            apply_toggle(strategy, &mut model, obj),
            StatusChange::Rejected { wanted: Status::NoInst }
        );
        assert_eq!(model.get(obj), Status::Install);
    }

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in StrategyKind::ALL {
            let name = kind.strategy().name().replace(' ', "-");
            assert_eq!(StrategyKind::from_name(&name), Some(kind));
        }
        assert_eq!(StrategyKind::from_name("bogus"), None);
    }
}
