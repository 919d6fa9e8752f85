//! SQLite storage backend for the conspiracy board

use super::traits::{BoardStore, OpenStore, StorageError, StorageResult};
use crate::graph::{Entity, EntityId, Relationship};
use crate::session::SessionId;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed board store.
///
/// One database file holds any number of sessions; rows are keyed the same
/// way the in-memory board merges — entities by normalized-label id,
/// relationships by (sorted endpoint pair, normalized description).
/// Thread-safe via an internal mutex on the connection. Insertion order is
/// preserved through rowid, so loads reproduce snapshot ordering.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                session_id TEXT NOT NULL,
                id TEXT NOT NULL,
                label TEXT NOT NULL,
                kind TEXT,
                first_seen_round INTEGER NOT NULL,
                mention_count INTEGER NOT NULL,
                notes_json TEXT NOT NULL,
                PRIMARY KEY (session_id, id)
            );

            CREATE TABLE IF NOT EXISTS relationships (
                session_id TEXT NOT NULL,
                pair_lo TEXT NOT NULL,
                pair_hi TEXT NOT NULL,
                normalized_description TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                description TEXT NOT NULL,
                weight INTEGER NOT NULL,
                round_added INTEGER NOT NULL,
                last_touched_round INTEGER NOT NULL,
                PRIMARY KEY (session_id, pair_lo, pair_hi, normalized_description)
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection mutex poisoned".to_string()))
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl BoardStore for SqliteStore {
    fn save_entity(&self, session: &SessionId, entity: &Entity) -> StorageResult<()> {
        let conn = self.lock()?;
        let notes_json = serde_json::to_string(&entity.notes)?;
        conn.execute(
            r#"
            INSERT INTO entities (session_id, id, label, kind, first_seen_round, mention_count, notes_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id, id) DO UPDATE SET
                kind = excluded.kind,
                mention_count = excluded.mention_count,
                notes_json = excluded.notes_json
            "#,
            params![
                session.to_string(),
                entity.id.as_str(),
                entity.label,
                entity.kind,
                entity.first_seen_round,
                entity.mention_count,
                notes_json,
            ],
        )?;
        Ok(())
    }

    fn save_relationship(&self, session: &SessionId, rel: &Relationship) -> StorageResult<()> {
        let conn = self.lock()?;
        let (lo, hi) = rel.unordered_pair();
        conn.execute(
            r#"
            INSERT INTO relationships
                (session_id, pair_lo, pair_hi, normalized_description,
                 source_id, target_id, description, weight, round_added, last_touched_round)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(session_id, pair_lo, pair_hi, normalized_description) DO UPDATE SET
                weight = excluded.weight,
                last_touched_round = excluded.last_touched_round
            "#,
            params![
                session.to_string(),
                lo.as_str(),
                hi.as_str(),
                rel.normalized_description,
                rel.source.as_str(),
                rel.target.as_str(),
                rel.description,
                rel.weight,
                rel.round_added,
                rel.last_touched_round,
            ],
        )?;
        Ok(())
    }

    fn load_entities(&self, session: &SessionId) -> StorageResult<Vec<Entity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, label, kind, first_seen_round, mention_count, notes_json
             FROM entities WHERE session_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![session.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut entities = Vec::new();
        for row in rows {
            let (id, label, kind, first_seen_round, mention_count, notes_json) = row?;
            let notes: Vec<String> = serde_json::from_str(&notes_json)?;
            entities.push(Entity {
                id: EntityId::from_string(id),
                label,
                kind,
                first_seen_round,
                mention_count,
                notes,
            });
        }
        Ok(entities)
    }

    fn load_relationships(&self, session: &SessionId) -> StorageResult<Vec<Relationship>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, description, normalized_description,
                    weight, round_added, last_touched_round
             FROM relationships WHERE session_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![session.to_string()], |row| {
            Ok(Relationship {
                source: EntityId::from_string(row.get::<_, String>(0)?),
                target: EntityId::from_string(row.get::<_, String>(1)?),
                description: row.get(2)?,
                normalized_description: row.get(3)?,
                weight: row.get(4)?,
                round_added: row.get(5)?,
                last_touched_round: row.get(6)?,
            })
        })?;

        rows.map(|row| row.map_err(StorageError::from)).collect()
    }

    fn clear(&self, session: &SessionId) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM entities WHERE session_id = ?1",
            params![session.to_string()],
        )?;
        conn.execute(
            "DELETE FROM relationships WHERE session_id = ?1",
            params![session.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Board;

    fn sample_board() -> Board {
        let mut board = Board::new();
        board.upsert_entity("Dolphins", Some("animal"), 0).unwrap();
        board.upsert_entity("The Pyramids", Some("place"), 0).unwrap();
        board
            .upsert_relationship("Dolphins", "The Pyramids", "sonar-mapped the chambers of", 0)
            .unwrap();
        board
            .upsert_relationship("the pyramids", "dolphins", "Sonar-Mapped the chambers of", 1)
            .unwrap();
        board
    }

    // --- Scenario: board state round-trips through sqlite ---

    #[test]
    fn entities_round_trip_in_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let session = SessionId::new();
        let board = sample_board();

        for entity in board.snapshot().entities {
            store.save_entity(&session, &entity).unwrap();
        }

        let loaded = store.load_entities(&session).unwrap();
        let labels: Vec<&str> = loaded.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Dolphins", "The Pyramids"]);
        assert_eq!(loaded[0].kind.as_deref(), Some("animal"));
    }

    #[test]
    fn relationship_upsert_overwrites_weight_not_identity() {
        let store = SqliteStore::open_in_memory().unwrap();
        let session = SessionId::new();
        let board = sample_board();

        // The merged edge is saved twice, as the controller would after
        // each round. Key collides; weight reflects the latest state.
        let rel = board.snapshot().relationships.remove(0);
        store.save_relationship(&session, &rel).unwrap();
        store.save_relationship(&session, &rel).unwrap();

        let loaded = store.load_relationships(&session).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].weight, 2);
        assert_eq!(loaded[0].round_added, 0);
        assert_eq!(loaded[0].last_touched_round, 1);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        let one = SessionId::new();
        let two = SessionId::new();
        let board = sample_board();

        for entity in board.snapshot().entities {
            store.save_entity(&one, &entity).unwrap();
        }

        assert_eq!(store.load_entities(&one).unwrap().len(), 2);
        assert!(store.load_entities(&two).unwrap().is_empty());
    }

    #[test]
    fn clear_removes_only_the_given_session() {
        let store = SqliteStore::open_in_memory().unwrap();
        let one = SessionId::new();
        let two = SessionId::new();
        let board = sample_board();

        for entity in board.snapshot().entities {
            store.save_entity(&one, &entity).unwrap();
            store.save_entity(&two, &entity).unwrap();
        }

        store.clear(&one).unwrap();
        assert!(store.load_entities(&one).unwrap().is_empty());
        assert_eq!(store.load_entities(&two).unwrap().len(), 2);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/boards.db");
        let store = SqliteStore::open(&path).unwrap();
        let session = SessionId::new();
        assert!(store.load_entities(&session).unwrap().is_empty());
        assert!(path.exists());
    }
}
