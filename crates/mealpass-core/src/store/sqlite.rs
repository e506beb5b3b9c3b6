//! `SQLite`-backed record store.
//!
//! The database file is the shared resource between every counter terminal
//! on a machine. A partial unique index on `(user_id, date, slot)` makes the
//! ledger's at-most-once rule hold across processes; code claims run inside
//! an `IMMEDIATE` transaction so the claim and the ledger insert commit
//! together or not at all.

// SQLite returns i64 for counts; changes() is always 0 or 1 here.
#![allow(clippy::cast_possible_truncation)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;
use uuid::Uuid;

use super::{CodeClaim, RecordStore};
use crate::error::CoreError;
use crate::model::{DelegatedCode, RecordId, RedemptionRecord, ShortId, Student, UserId};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// How long a writer waits on another process's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

const STUDENT_COLUMNS: &str =
    "id, short_id, name, is_active, subscription_end_date, enrolled_at";
const REDEMPTION_COLUMNS: &str = "id, user_id, date, slot, status, method, created_at";
const CODE_COLUMNS: &str = "id, code, user_id, created_at, expires_at, is_used";

/// A `RecordStore` persisted in a single SQLite database.
///
/// Statements run on the blocking pool so store round-trips never stall the
/// async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::StoreUnavailable {
                    reason: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened record store");
        Self::initialize(conn)
    }

    /// A private in-memory database, for tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, CoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, CoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CoreError::Internal("store connection mutex poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("store task failed: {e}")))?
    }
}

impl RecordStore for SqliteStore {
    async fn find_user(&self, id: UserId) -> Result<Option<Student>, CoreError> {
        self.with_conn(move |conn| {
            let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1");
            Ok(conn
                .query_row(&sql, params![id.to_string()], student_from_row)
                .optional()?)
        })
        .await
    }

    async fn find_user_by_short_id(&self, short_id: ShortId) -> Result<Option<Student>, CoreError> {
        self.with_conn(move |conn| {
            let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE short_id = ?1");
            Ok(conn
                .query_row(&sql, params![short_id.get()], student_from_row)
                .optional()?)
        })
        .await
    }

    async fn insert_user(&self, student: Student) -> Result<(), CoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO students (id, short_id, name, is_active, subscription_end_date, enrolled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    student.id.to_string(),
                    student.short_id.get(),
                    student.name,
                    student.is_active,
                    student.subscription_end_date,
                    student.enrolled_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<bool, CoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE students SET is_active = ?2 WHERE id = ?1",
                params![id.to_string(), active],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<Student>, CoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY short_id ASC");
            let mut stmt = conn.prepare(&sql)?;
            let students = stmt
                .query_map([], student_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(students)
        })
        .await
    }

    async fn insert_consumed_if_absent(&self, record: RedemptionRecord) -> Result<bool, CoreError> {
        self.with_conn(move |conn| Ok(insert_redemption(conn, &record)?))
            .await
    }

    async fn redemptions_on(&self, date: NaiveDate) -> Result<Vec<RedemptionRecord>, CoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE date = ?1 ORDER BY created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params![date], redemption_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn insert_code(&self, code: DelegatedCode) -> Result<(), CoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO delegated_codes (id, code, user_id, created_at, expires_at, is_used)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    code.id.to_string(),
                    code.code,
                    code.user_id.to_string(),
                    code.created_at,
                    code.expires_at,
                    code.is_used,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_active_code(&self, code: &str) -> Result<Option<DelegatedCode>, CoreError> {
        let code = code.to_owned();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {CODE_COLUMNS} FROM delegated_codes
                 WHERE code = ?1 AND is_used = 0
                 ORDER BY created_at DESC
                 LIMIT 1"
            );
            Ok(conn
                .query_row(&sql, params![code], code_from_row)
                .optional()?)
        })
        .await
    }

    async fn mark_code_used(&self, id: RecordId) -> Result<bool, CoreError> {
        self.with_conn(move |conn| Ok(claim_code(conn, id)?)).await
    }

    async fn redeem_code(&self, id: RecordId, record: RedemptionRecord) -> Result<CodeClaim, CoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !claim_code(&tx, id)? {
                return Ok(CodeClaim::AlreadyUsed);
            }
            let claim = if insert_redemption(&tx, &record)? {
                CodeClaim::Recorded
            } else {
                CodeClaim::AlreadyRecorded
            };
            tx.commit()?;
            debug!(code_id = %id, ?claim, "code claimed");
            Ok(claim)
        })
        .await
    }
}

// ── Statements shared by plain and transactional paths ───────────────

/// Flip `is_used` if it is still clear. True only for the winning caller.
fn claim_code(conn: &Connection, id: RecordId) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE delegated_codes SET is_used = 1 WHERE id = ?1 AND is_used = 0",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

/// Insert unless the unique index already holds this (user, date, slot).
fn insert_redemption(conn: &Connection, record: &RedemptionRecord) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO redemptions (id, user_id, date, slot, status, method, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT DO NOTHING",
        params![
            record.id.to_string(),
            record.user_id.to_string(),
            record.date,
            record.slot.as_ref(),
            record.status.as_ref(),
            record.method.as_ref(),
            record.created_at,
        ],
    )?;
    Ok(inserted == 1)
}

// ── Row mapping ──────────────────────────────────────────────────────

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: UserId::from(uuid_column(row, 0)?),
        short_id: ShortId::new(row.get(1)?),
        name: row.get(2)?,
        is_active: row.get(3)?,
        subscription_end_date: row.get(4)?,
        enrolled_at: row.get(5)?,
    })
}

fn redemption_from_row(row: &Row<'_>) -> rusqlite::Result<RedemptionRecord> {
    Ok(RedemptionRecord {
        id: record_id_column(row, 0)?,
        user_id: UserId::from(uuid_column(row, 1)?),
        date: row.get(2)?,
        slot: parsed_column(row, 3)?,
        status: parsed_column(row, 4)?,
        method: parsed_column(row, 5)?,
        created_at: row.get(6)?,
    })
}

fn code_from_row(row: &Row<'_>) -> rusqlite::Result<DelegatedCode> {
    Ok(DelegatedCode {
        id: record_id_column(row, 0)?,
        code: row.get(1)?,
        user_id: UserId::from(uuid_column(row, 2)?),
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        is_used: row.get(5)?,
    })
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_id_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<RecordId> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
