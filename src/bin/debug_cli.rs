//! Debug CLI for exercising status strategies and the history reader
//!
//! Works on a copy of a package snapshot kept in `debug_state.json`, so a
//! sequence of commands behaves like a sequence of key presses in the TUI.
//!
//! Usage:
//!   cargo run --bin debug_cli -- <command> [args]
//!
//! Objects are named `<name>` or, for available versions, `<name>#<index>`.

use std::env;
use std::fs;
use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::{bail, eyre};
use crossterm::event::KeyCode;

use zypsel::config::Settings;
use zypsel::history::{HISTORY_FILE, HistoryReader, ReaderOptions};
use zypsel::history_view::{HistoryView, TreePos};
use zypsel::logging;
use zypsel::model::{ObjectModel, PackageDb};
use zypsel::strategy::{StatusChange, StrategyKind, apply_key, apply_toggle};
use zypsel::types::*;

const STATE_FILE: &str = "debug_state.json";

fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = Settings::load()?;
    if let Err(e) = logging::init(&settings.log_file) {
        eprintln!("Logging disabled: {e}");
    }

    let args: Vec<String> = env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("help");
    let arg = |idx: usize, usage: &str| args.get(idx).map(String::as_str).ok_or_else(|| eyre!("Usage: {usage}"));

    match cmd {
        "load" => cmd_load(Path::new(arg(2, "load <snapshot.json>")?))?,
        "status" => cmd_status()?,
        "info" => cmd_info(arg(2, "info <name>")?)?,
        "key" => {
            let usage = "key <strategy> <object> <key>";
            cmd_key(arg(2, usage)?, arg(3, usage)?, arg(4, usage)?)?;
        }
        "toggle" => {
            let usage = "toggle <strategy> <object>";
            cmd_toggle(arg(2, usage)?, arg(3, usage)?)?;
        }
        "set" => {
            let usage = "set <strategy> <object> <status>";
            cmd_set(arg(2, usage)?, arg(3, usage)?, arg(4, usage)?)?;
        }
        "reset" => cmd_reset()?,
        "history" => {
            let ignore_invalid = args.iter().any(|a| a == "--ignore-invalid");
            let path = args.get(2).filter(|a| !a.starts_with("--")).map_or(HISTORY_FILE, String::as_str);
            cmd_history(Path::new(path), ignore_invalid, &settings.history_date_format);
        }
        _ => {
            println!("Debug CLI for zypsel");
            println!();
            println!("Commands:");
            println!("  load <snapshot.json>             Start a session from a snapshot");
            println!("  status                           Show all objects with pending changes");
            println!("  info <name>                      Show an object under every strategy");
            println!("  key <strategy> <object> <key>    Press a status key (+ - > ! * space del)");
            println!("  toggle <strategy> <object>       Toggle the status (Space)");
            println!("  set <strategy> <object> <status> Set a status directly");
            println!("  reset                            Drop all pending changes");
            println!("  history [path] [--ignore-invalid]  Print the grouped history log");
            println!();
            println!("Strategies: {}", strategy_names().join(", "));
            println!();
            println!("Example flow:");
            println!("  cli load snapshot.json");
            println!("  cli key patch SUSE-2024-1 +      # patch and members marked");
            println!("  cli info vim                     # update");
            println!("  cli set available vim#0 keep_installed");
        }
    }

    Ok(())
}

fn cmd_load(snapshot: &Path) -> Result<()> {
    let db = PackageDb::load(snapshot)?;
    save_state(&db)?;
    println!("Loaded {} objects from {}", db.len(), snapshot.display());
    Ok(())
}

fn cmd_status() -> Result<()> {
    let db = load_state()?;

    println!("=== Pending Changes ===");
    println!();

    let changed = db.changed();
    if changed.is_empty() {
        println!("No changes marked.");
    } else {
        for id in changed {
            if let Some(info) = db.object_info(id) {
                println!("  {:<2}{} ({})", info.status.symbol(), info.name, info.status.label());
            }
        }
    }

    println!();
    println!("Updates available: {}", db.filter_count(FilterCategory::Updates));
    Ok(())
}

fn cmd_info(name: &str) -> Result<()> {
    let db = load_state()?;
    let id = db.find(name).ok_or_else(|| eyre!("Object '{name}' not found"))?;
    let sel = db.get(id).ok_or_else(|| eyre!("Object '{name}' not found"))?;
    let obj = ObjectRef::selectable(id);

    println!("{name}: {}", status_display(db.status(id).unwrap_or_default()));
    println!("  installed: {}", sel.installed().unwrap_or("(none)"));
    println!("  candidate: {}", sel.candidate_version().map_or("(none)", |v| v.version.as_str()));
    for kind in StrategyKind::ALL {
        let strategy = kind.strategy();
        if kind == StrategyKind::Available {
            for (i, v) in sel.available().iter().enumerate() {
                let status = strategy.status(&db, ObjectRef::version(id, i));
                println!("  {:<14} #{i} {}: {}", strategy.name(), v.version, status_display(status));
            }
        } else {
            println!("  {:<14} {}", strategy.name(), status_display(strategy.status(&db, obj)));
        }
    }
    if let Some(members) = db.patch_members(id) {
        println!("  members:");
        for &member in members {
            if let Some(info) = db.object_info(member) {
                println!("    {:<2}{}", info.status.symbol(), info.name);
            }
        }
    }
    Ok(())
}

fn cmd_key(strategy: &str, object: &str, key: &str) -> Result<()> {
    let kind = parse_strategy(strategy)?;
    let key = parse_key(key)?;
    let mut db = load_state()?;
    let obj = parse_object(&db, object)?;

    let change = apply_key(kind.strategy(), key, &mut db, obj);
    report(&db, object, change)
}

fn cmd_toggle(strategy: &str, object: &str) -> Result<()> {
    let kind = parse_strategy(strategy)?;
    let mut db = load_state()?;
    let obj = parse_object(&db, object)?;

    let change = apply_toggle(kind.strategy(), &mut db, obj);
    report(&db, object, change)
}

fn cmd_set(strategy: &str, object: &str, status: &str) -> Result<()> {
    let kind = parse_strategy(strategy)?;
    let status: Status = serde_json::from_value(serde_json::Value::String(status.to_string()))
        .map_err(|_| eyre!("Unknown status '{status}'"))?;
    let mut db = load_state()?;
    let obj = parse_object(&db, object)?;

    let from = kind.status(&db, obj);
    let change = if kind.set_status(&mut db, status, obj) {
        StatusChange::Changed { from, to: status }
    } else {
        StatusChange::Rejected { wanted: status }
    };
    report(&db, object, change)
}

fn cmd_reset() -> Result<()> {
    let mut db = load_state()?;
    db.reset();
    save_state(&db)?;
    println!("All changes dropped.");
    Ok(())
}

fn cmd_history(path: &Path, ignore_invalid: bool, date_format: &str) {
    let mut view = HistoryView::new(date_format);
    view.load(path, ReaderOptions { ignore_invalid_items: ignore_invalid });

    for pos in view.visible_rows() {
        match pos {
            TreePos::Group(g) => println!("{}", view.groups()[g].date),
            TreePos::Action { group, index } => {
                let action = &view.groups()[group].actions[index];
                println!("  {} {}", action.icon.symbol(), action.columns.join(" | "));
            }
        }
    }

    if let Some(warning) = view.warning() {
        println!();
        println!("Unable to read history: {warning}");
    }
}

/// Print the outcome and persist the pool when something changed
fn report(db: &PackageDb, object: &str, change: StatusChange) -> Result<()> {
    match change {
        StatusChange::Unmapped => println!("{object}: key has no meaning here"),
        StatusChange::Rejected { wanted } => {
            println!("cannot change status of {object} to {}", status_display(wanted));
        }
        StatusChange::Changed { from, to } => {
            save_state(db)?;
            println!("{object}: {} -> {}", status_display(from), status_display(to));
        }
    }
    Ok(())
}

fn status_display(status: Status) -> String {
    format!("{} {}", status.symbol(), status.label()).trim().to_string()
}

fn strategy_names() -> Vec<String> {
    StrategyKind::ALL.iter().map(|k| k.strategy().name().replace(' ', "-")).collect()
}

fn parse_strategy(name: &str) -> Result<StrategyKind> {
    StrategyKind::from_name(name)
        .ok_or_else(|| eyre!("Unknown strategy '{name}' (one of: {})", strategy_names().join(", ")))
}

fn parse_key(key: &str) -> Result<KeyCode> {
    Ok(match key {
        "space" => KeyCode::Char(' '),
        "del" | "delete" => KeyCode::Delete,
        _ => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => bail!("Unknown key '{key}'"),
            }
        }
    })
}

fn parse_object(db: &PackageDb, object: &str) -> Result<ObjectRef> {
    let (name, version) = match object.split_once('#') {
        Some((name, idx)) => (name, Some(idx.parse::<usize>().map_err(|_| eyre!("Bad version index in '{object}'"))?)),
        None => (object, None),
    };
    let id = db.find(name).ok_or_else(|| eyre!("Object '{name}' not found"))?;
    Ok(ObjectRef { id, version })
}

// ============================================================================
// State persistence
// ============================================================================

fn load_state() -> Result<PackageDb> {
    if !Path::new(STATE_FILE).exists() {
        bail!("No session in {STATE_FILE}; run `load <snapshot.json>` first");
    }
    Ok(PackageDb::load(Path::new(STATE_FILE))?)
}

fn save_state(db: &PackageDb) -> Result<()> {
    let json = serde_json::to_string_pretty(&db.to_snapshot())?;
    fs::write(STATE_FILE, json)?;
    Ok(())
}
