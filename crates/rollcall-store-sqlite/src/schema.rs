//! SQL schema for the Rollcall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Read-only to the core; populated by the administrative import.
CREATE TABLE IF NOT EXISTS students (
    student_key TEXT PRIMARY KEY,
    full_name   TEXT NOT NULL,
    email       TEXT,
    university  TEXT,
    phone       TEXT,
    imported_at TEXT NOT NULL
);

-- Shifts are never deleted. The only updates are the scan counter and the
-- single open -> closed transition.
CREATE TABLE IF NOT EXISTS shifts (
    shift_id      TEXT PRIMARY KEY,
    supervisor_id TEXT NOT NULL,
    status        TEXT NOT NULL CHECK (status IN ('open', 'closed')),
    started_at    TEXT NOT NULL,   -- RFC 3339 UTC, microsecond precision
    ended_at      TEXT,
    scan_count    INTEGER NOT NULL DEFAULT 0 CHECK (scan_count >= 0),
    CHECK ((status = 'open') = (ended_at IS NULL))
);

CREATE UNIQUE INDEX IF NOT EXISTS shifts_one_open_per_supervisor
    ON shifts(supervisor_id) WHERE status = 'open';
CREATE INDEX IF NOT EXISTS shifts_supervisor_idx
    ON shifts(supervisor_id, started_at);

-- Attendance records are strictly append-only.
CREATE TABLE IF NOT EXISTS attendance (
    record_id     TEXT PRIMARY KEY,
    student_key   TEXT NOT NULL,
    service_date  TEXT NOT NULL,   -- YYYY-MM-DD in the service time zone
    slot          TEXT NOT NULL CHECK (slot IN ('first', 'second')),
    shift_id      TEXT NOT NULL REFERENCES shifts(shift_id),
    supervisor_id TEXT NOT NULL,
    check_in_time TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS attendance_one_per_slot
    ON attendance(student_key, service_date, slot);
CREATE INDEX IF NOT EXISTS attendance_date_idx  ON attendance(service_date);
CREATE INDEX IF NOT EXISTS attendance_shift_idx ON attendance(shift_id);

PRAGMA user_version = 1;
";

/// `(table, index)` pairs that must exist and be unique before the store
/// admits anything.
pub const REQUIRED_UNIQUE_INDEXES: &[(&str, &str)] = &[
  ("attendance", "attendance_one_per_slot"),
  ("shifts", "shifts_one_open_per_supervisor"),
];
