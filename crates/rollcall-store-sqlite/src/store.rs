//! [`SqliteStore`], the SQLite implementation of the Rollcall store traits.

use std::{path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::{
  attendance::{AttendanceRecord, Slot},
  id::{ShiftId, StudentKey, SupervisorId},
  shift::{Closing, Shift, Started},
  store::{
    AttendanceStore, Counted, InsertOutcome, ShiftStore, Store,
    StudentDirectory,
  },
  student::StudentProfile,
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{
    RECORD_COLUMNS, RawRecord, RawShift, RawStudent, SHIFT_COLUMNS,
    canonical_dt, encode_date, encode_dt,
  },
  schema::{REQUIRED_UNIQUE_INDEXES, SCHEMA},
};

/// How long a connection waits on another connection's write lock before
/// reporting the store as busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BUMP_SCAN_COUNT: &str = "UPDATE shifts SET scan_count = scan_count + 1
   WHERE shift_id = ?1 AND status = 'open'
   RETURNING scan_count";

// ─── Store ───────────────────────────────────────────────────────────────────

/// Rollcall stores backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted. Several
/// `SqliteStore`s (in one process or many) may share a file; every write is a
/// conditional statement inside an `IMMEDIATE` transaction, so the unique
/// indexes arbitrate between them.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What the admission transaction observed, before decoding.
enum RawInsert {
  Inserted,
  Conflict(Vec<RawRecord>),
  ShiftClosed,
  ShiftMissing,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation and verify
  /// the unique indexes are in place.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    self.verify_constraints().await
  }

  /// Fail loudly if an index the admission invariants rely on is missing or
  /// not unique, e.g. after a botched manual migration.
  pub async fn verify_constraints(&self) -> Result<()> {
    let present: Vec<(&'static str, bool)> = self
      .conn
      .call(|conn| {
        let mut found = Vec::with_capacity(REQUIRED_UNIQUE_INDEXES.len());
        for &(table, index) in REQUIRED_UNIQUE_INDEXES {
          let unique: Option<bool> = conn
            .query_row(
              "SELECT \"unique\" FROM pragma_index_list(?1) WHERE name = ?2",
              rusqlite::params![table, index],
              |row| row.get(0),
            )
            .optional()?;
          found.push((index, unique.unwrap_or(false)));
        }
        Ok(found)
      })
      .await?;

    match present.into_iter().find(|(_, unique)| !unique) {
      Some((index, _)) => Err(Error::MissingConstraint(index)),
      None => Ok(()),
    }
  }

  // ── Directory administration ──────────────────────────────────────────────

  /// Insert or refresh student profiles. Keys are immutable; descriptive
  /// fields are replaced. Returns the number of rows written.
  pub async fn import_students(&self, profiles: Vec<StudentProfile>) -> Result<usize> {
    for p in &profiles {
      if p.full_name.trim().is_empty() {
        return Err(Error::InvalidStudent(format!(
          "student {} has an empty name",
          p.student_key
        )));
      }
    }

    let imported_at = encode_dt(canonical_dt(Utc::now()));
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO students
               (student_key, full_name, email, university, phone, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (student_key) DO UPDATE SET
               full_name   = excluded.full_name,
               email       = excluded.email,
               university  = excluded.university,
               phone       = excluded.phone,
               imported_at = excluded.imported_at",
          )?;
          for p in &profiles {
            written += stmt.execute(rusqlite::params![
              p.student_key.to_string(),
              p.full_name.trim(),
              p.email,
              p.university,
              p.phone,
              imported_at,
            ])?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;

    info!(students = written, "student directory import");
    Ok(written)
  }

  // ── Query helpers ─────────────────────────────────────────────────────────

  async fn query_shifts(
    &self,
    filter: &'static str,
    param: String,
  ) -> Result<Vec<Shift>> {
    let raws: Vec<RawShift> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {SHIFT_COLUMNS} FROM shifts {filter}"))?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawShift::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawShift::into_shift).collect()
  }

  async fn query_records(
    &self,
    filter: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<AttendanceRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(select_records(
          conn,
          filter,
          rusqlite::params_from_iter(params.iter()),
        )?)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

fn select_records(
  conn: &rusqlite::Connection,
  filter: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawRecord>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM attendance {filter}"))?;
  stmt
    .query_map(params, RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

fn select_shift(
  conn: &rusqlite::Connection,
  shift_id: &str,
) -> rusqlite::Result<Option<RawShift>> {
  conn
    .query_row(
      &format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE shift_id = ?1"),
      rusqlite::params![shift_id],
      RawShift::from_row,
    )
    .optional()
}

fn shift_exists(conn: &rusqlite::Connection, shift_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM shifts WHERE shift_id = ?1",
        rusqlite::params![shift_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

impl Store for SqliteStore {
  type Error = Error;
}

// ─── ShiftStore impl ─────────────────────────────────────────────────────────

impl ShiftStore for SqliteStore {
  async fn open_shift(&self, shift: Shift) -> Result<Started> {
    let shift = Shift { started_at: canonical_dt(shift.started_at), ..shift };
    let id_str = shift.shift_id.to_string();
    let sup_str = shift.supervisor_id.to_string();
    let at_str = encode_dt(shift.started_at);

    let (inserted, open): (bool, Option<RawShift>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Any conflict here is the one-open-shift-per-supervisor index.
        let inserted = tx.execute(
          "INSERT INTO shifts
             (shift_id, supervisor_id, status, started_at, ended_at, scan_count)
           VALUES (?1, ?2, 'open', ?3, NULL, 0)
           ON CONFLICT DO NOTHING",
          rusqlite::params![id_str, sup_str, at_str],
        )?;
        let open = tx
          .query_row(
            &format!(
              "SELECT {SHIFT_COLUMNS} FROM shifts
               WHERE supervisor_id = ?1 AND status = 'open'"
            ),
            rusqlite::params![sup_str],
            RawShift::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok((inserted == 1, open))
      })
      .await?;

    match (inserted, open) {
      (true, _) => Ok(Started::Opened(shift)),
      (false, Some(raw)) => Ok(Started::AlreadyOpen(raw.into_shift()?)),
      (false, None) => Err(Error::Inconsistent(format!(
        "shift insert for {} conflicted but no open shift exists",
        shift.supervisor_id
      ))),
    }
  }

  async fn close_shift(
    &self,
    shift_id: ShiftId,
    ended_at: DateTime<Utc>,
  ) -> Result<Option<Closing<Shift>>> {
    let id_str = shift_id.to_string();
    let at_str = encode_dt(canonical_dt(ended_at));

    let (changed, raw): (bool, Option<RawShift>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
          "UPDATE shifts SET status = 'closed', ended_at = ?2
           WHERE shift_id = ?1 AND status = 'open'",
          rusqlite::params![id_str, at_str],
        )?;
        let raw = select_shift(&tx, &id_str)?;
        tx.commit()?;
        Ok((changed == 1, raw))
      })
      .await?;

    let Some(raw) = raw else { return Ok(None) };
    let shift = raw.into_shift()?;
    Ok(Some(if changed {
      Closing::Closed(shift)
    } else {
      debug!(shift = %shift_id, "close on already-closed shift");
      Closing::AlreadyClosed(shift)
    }))
  }

  async fn increment_scan_count(&self, shift_id: ShiftId) -> Result<Counted> {
    let id_str = shift_id.to_string();

    let counted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let count: Option<i64> = tx
          .query_row(BUMP_SCAN_COUNT, rusqlite::params![id_str], |row| row.get(0))
          .optional()?;
        let outcome = match count {
          Some(n) => Ok(n),
          None if shift_exists(&tx, &id_str)? => Err(Counted::ShiftClosed),
          None => Err(Counted::ShiftMissing),
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    match counted {
      Ok(n) => Ok(Counted::Recorded(u64::try_from(n).map_err(|_| {
        Error::Decode(format!("negative scan count {n}"))
      })?)),
      Err(not_open) => Ok(not_open),
    }
  }

  async fn get_shift(&self, shift_id: ShiftId) -> Result<Option<Shift>> {
    let mut found = self
      .query_shifts("WHERE shift_id = ?1", shift_id.to_string())
      .await?;
    Ok(found.pop())
  }

  async fn find_open_shift<'a>(
    &'a self,
    supervisor: &'a SupervisorId,
  ) -> Result<Option<Shift>> {
    let mut found = self
      .query_shifts(
        "WHERE supervisor_id = ?1 AND status = 'open'",
        supervisor.to_string(),
      )
      .await?;
    if found.len() > 1 {
      return Err(Error::Inconsistent(format!(
        "supervisor {supervisor} has {} open shifts",
        found.len()
      )));
    }
    Ok(found.pop())
  }

  async fn list_shifts<'a>(&'a self, supervisor: &'a SupervisorId) -> Result<Vec<Shift>> {
    self
      .query_shifts(
        "WHERE supervisor_id = ?1 ORDER BY started_at DESC, shift_id",
        supervisor.to_string(),
      )
      .await
  }
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  async fn insert_record(&self, record: AttendanceRecord) -> Result<InsertOutcome> {
    let record = AttendanceRecord {
      check_in_time: canonical_dt(record.check_in_time),
      ..record
    };
    let row = RawRecord::from_record(&record);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Count first: it doubles as the "shift is still open" check, and
        // the whole transaction rolls back if the key turns out to be taken.
        let counted: Option<i64> = tx
          .query_row(BUMP_SCAN_COUNT, rusqlite::params![row.shift_id], |r| r.get(0))
          .optional()?;
        if counted.is_none() {
          return Ok(if shift_exists(&tx, &row.shift_id)? {
            RawInsert::ShiftClosed
          } else {
            RawInsert::ShiftMissing
          });
        }

        let inserted = tx.execute(
          &format!(
            "INSERT INTO attendance ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (student_key, service_date, slot) DO NOTHING"
          ),
          rusqlite::params![
            row.record_id,
            row.student_key,
            row.service_date,
            row.slot,
            row.shift_id,
            row.supervisor_id,
            row.check_in_time,
          ],
        )?;

        if inserted == 0 {
          let holders = select_records(
            &tx,
            "WHERE student_key = ?1 AND service_date = ?2 AND slot = ?3",
            rusqlite::params![row.student_key, row.service_date, row.slot],
          )?;
          tx.rollback()?;
          return Ok(RawInsert::Conflict(holders));
        }

        tx.commit()?;
        Ok(RawInsert::Inserted)
      })
      .await?;

    Ok(match raw {
      RawInsert::Inserted => InsertOutcome::Inserted(record),
      RawInsert::Conflict(holders) => InsertOutcome::Conflict(
        holders
          .into_iter()
          .map(RawRecord::into_record)
          .collect::<Result<_>>()?,
      ),
      RawInsert::ShiftClosed => InsertOutcome::ShiftClosed,
      RawInsert::ShiftMissing => InsertOutcome::ShiftMissing,
    })
  }

  async fn find_records(
    &self,
    student: StudentKey,
    date: NaiveDate,
    slot: Slot,
  ) -> Result<Vec<AttendanceRecord>> {
    self
      .query_records(
        "WHERE student_key = ?1 AND service_date = ?2 AND slot = ?3",
        vec![student.to_string(), encode_date(date), slot.to_string()],
      )
      .await
  }

  async fn records_between(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<AttendanceRecord>> {
    self
      .query_records(
        "WHERE service_date BETWEEN ?1 AND ?2 ORDER BY check_in_time, record_id",
        vec![encode_date(from), encode_date(to)],
      )
      .await
  }

  async fn records_for_shift(&self, shift_id: ShiftId) -> Result<Vec<AttendanceRecord>> {
    self
      .query_records(
        "WHERE shift_id = ?1 ORDER BY check_in_time, record_id",
        vec![shift_id.to_string()],
      )
      .await
  }
}

// ─── StudentDirectory impl ───────────────────────────────────────────────────

impl StudentDirectory for SqliteStore {
  async fn lookup(&self, student: StudentKey) -> Result<Option<StudentProfile>> {
    let key_str = student.to_string();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT student_key, full_name, email, university, phone
               FROM students WHERE student_key = ?1",
              rusqlite::params![key_str],
              |row| {
                Ok(RawStudent {
                  student_key: row.get(0)?,
                  full_name:   row.get(1)?,
                  email:       row.get(2)?,
                  university:  row.get(3)?,
                  phone:       row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_profile).transpose()
  }
}
