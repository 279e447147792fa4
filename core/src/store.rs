//! SQLite save store.
//!
//! RULE: Only store.rs talks to the database.
//! The engine hands it `SaveData`; it never sees SQL.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use crate::{
    clock::Epoch,
    error::SimResult,
    presentation::format_short_date,
    save::SaveData,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot:      String,
    pub save_id:   String,
    pub saved_at:  String,
    pub game_date: String,
}

pub struct SaveStore {
    conn: Connection,
}

impl SaveStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_saves.sql"))?;
        Ok(())
    }

    /// Write `data` into `slot`, replacing what was there.
    /// Returns the new save id.
    pub fn write_slot(&self, slot: &str, data: &SaveData) -> SimResult<String> {
        let save_id = uuid::Uuid::new_v4().to_string();
        let saved_at = chrono::Utc::now().to_rfc3339();
        let restored = data.restore_clock();
        self.conn.execute(
            "INSERT INTO save_slot (slot, save_id, saved_at, game_date, time_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slot) DO UPDATE SET
                save_id = excluded.save_id,
                saved_at = excluded.saved_at,
                game_date = excluded.game_date,
                time_json = excluded.time_json",
            params![slot, save_id, saved_at, format_short_date(&restored), data.to_json()?],
        )?;
        log::info!("store: wrote slot '{slot}' ({save_id})");
        Ok(save_id)
    }

    /// Raw JSON blob for `slot`, if any.
    pub fn read_blob(&self, slot: &str) -> SimResult<Option<String>> {
        let blob = self
            .conn
            .query_row(
                "SELECT time_json FROM save_slot WHERE slot = ?1",
                params![slot],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(blob)
    }

    /// Read and sanitise `slot`. Missing fields fall back to `fallback`.
    pub fn read_slot(&self, slot: &str, fallback: &Epoch) -> SimResult<Option<SaveData>> {
        match self.read_blob(slot)? {
            Some(blob) => Ok(Some(SaveData::from_blob(&blob, fallback)?)),
            None => Ok(None),
        }
    }

    pub fn list_slots(&self) -> SimResult<Vec<SlotSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT slot, save_id, saved_at, game_date FROM save_slot
             ORDER BY saved_at DESC, slot ASC"
        )?;
        let slots = stmt.query_map([], |row| {
            Ok(SlotSummary {
                slot:      row.get(0)?,
                save_id:   row.get(1)?,
                saved_at:  row.get(2)?,
                game_date: row.get(3)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(slots)
    }

    /// Returns false if the slot did not exist.
    pub fn delete_slot(&self, slot: &str) -> SimResult<bool> {
        let removed = self.conn.execute("DELETE FROM save_slot WHERE slot = ?1", params![slot])?;
        Ok(removed > 0)
    }

    /// Store an arbitrary blob, bypassing `SaveData`. Lets tests and
    /// importers plant saves written by older builds.
    pub fn write_raw(&self, slot: &str, blob: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO save_slot (slot, save_id, saved_at, game_date, time_json)
             VALUES (?1, ?2, ?3, '', ?4)",
            params![slot, uuid::Uuid::new_v4().to_string(), chrono::Utc::now().to_rfc3339(), blob],
        )?;
        Ok(())
    }
}
