//! Full-text search over object names and summaries using SQLite FTS5

use std::collections::HashSet;
use std::time::{Duration, Instant};

use color_eyre::Result;
use rusqlite::{Connection, params};

use crate::model::PackageDb;
use crate::types::ObjectId;

pub struct SearchIndex {
    conn: Connection,
}

impl SearchIndex {
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE VIRTUAL TABLE IF NOT EXISTS objects USING fts5(id UNINDEXED, name, summary)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// (Re)build the index from the object pool
    pub fn build(&mut self, db: &PackageDb) -> Result<(usize, Duration)> {
        let start = Instant::now();
        let mut count = 0;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM objects", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO objects (id, name, summary) VALUES (?, ?, ?)")?;
            for id in db.ids() {
                let Some(sel) = db.get(id) else { continue };
                stmt.execute(params![id.0, sel.name(), sel.summary()])?;
                count += 1;
            }
        }
        tx.commit()?;

        Ok((count, start.elapsed()))
    }

    /// Objects matching every word of the query as a prefix
    pub fn search(&self, query: &str) -> Result<HashSet<ObjectId>> {
        let mut results = HashSet::new();

        let fts_query = query
            .split_whitespace()
            .map(|word| word.replace('"', ""))
            .filter(|word| !word.is_empty())
            .map(|word| format!("\"{word}\"*"))
            .collect::<Vec<_>>()
            .join(" ");
        if fts_query.is_empty() {
            return Ok(results);
        }

        let mut stmt = self.conn.prepare("SELECT id FROM objects WHERE objects MATCH ?")?;
        let rows = stmt.query_map([&fts_query], |row| row.get::<_, u32>(0))?;
        for id in rows.flatten() {
            results.insert(ObjectId(id));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_by_name_and_summary_prefix() {
        let db = PackageDb::from_json(
            r#"{ "packages": [
                { "name": "vim", "summary": "Vi IMproved text editor" },
                { "name": "nano", "summary": "Small text editor" },
                { "name": "curl", "summary": "Transfer URLs" }
            ] }"#,
        )
        .unwrap();
        let mut index = SearchIndex::new().unwrap();
        let (count, _) = index.build(&db).unwrap();
        assert_eq!(count, 3);

        let editors = index.search("edit").unwrap();
        assert_eq!(editors.len(), 2);
        assert!(editors.contains(&db.find("nano").unwrap()));

        let vim = index.search("vi text").unwrap();
        assert_eq!(vim, HashSet::from([db.find("vim").unwrap()]));

        assert!(index.search("  \"\" ").unwrap().is_empty());
    }
}
