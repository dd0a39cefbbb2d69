//! SQLite-backed claim cache.
//!
//! Each claim is one row: indexed columns for lookups, the full record as
//! JSON in `payload`. `rowid` order is insertion order.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{resolve_appointment_claim, ClaimStore, StoreError};
use crate::db;
use crate::models::{Claim, ClaimLookup};

pub struct SqliteClaimStore {
    conn: Mutex<Connection>,
}

impl SqliteClaimStore {
    /// Open (or create) the cache file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open_database(path)?;
        tracing::info!(path = %path.display(), "Claim cache opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Throwaway in-memory cache (tests, demo mode).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = db::open_memory_database()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

impl ClaimStore for SqliteClaimStore {
    fn get(&self, claim_id: &str) -> Result<Option<Claim>, StoreError> {
        self.with_conn(|conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM claims WHERE id = ?1",
                    params![claim_id],
                    |row| row.get(0),
                )
                .optional()?;
            payload.map(|p| claim_from_payload(&p)).transpose()
        })
    }

    fn get_by_appointment(&self, appointment_id: i64) -> Result<ClaimLookup, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT payload FROM claims WHERE appointment_id = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![appointment_id], |row| row.get::<_, String>(0))?;
            let mut candidates = Vec::new();
            for row in rows {
                candidates.push(claim_from_payload(&row?)?);
            }
            Ok(resolve_appointment_claim(candidates))
        })
    }

    fn upsert(&self, claim: &Claim) -> Result<(), StoreError> {
        let payload = serde_json::to_string(claim)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO claims (id, appointment_id, reference_no, status, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    appointment_id = ?2,
                    reference_no = ?3,
                    status = ?4,
                    payload = ?5,
                    updated_at = ?6",
                params![
                    claim.id,
                    claim.appointment_id,
                    claim.reference_no,
                    claim.status.as_str(),
                    payload,
                    claim.updated_at,
                ],
            )?;
            Ok(())
        })?;
        tracing::debug!(claim_id = %claim.id, status = %claim.status, "Claim written to cache");
        Ok(())
    }

    fn list(&self) -> Result<Vec<Claim>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT payload FROM claims ORDER BY rowid ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut claims = Vec::new();
            for row in rows {
                claims.push(claim_from_payload(&row?)?);
            }
            Ok(claims)
        })
    }

    fn reference_exists(&self, reference_no: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM claims WHERE reference_no = ?1",
                params![reference_no],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}

fn claim_from_payload(payload: &str) -> Result<Claim, StoreError> {
    serde_json::from_str(payload)
        .map_err(|e| StoreError::Serialization(format!("Bad claim payload: {e}")))
}
