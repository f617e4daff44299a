//! SQLite-backed habit catalog and day-record persistence.
//!
//! One database file holds both tables:
//! - `habits`: the user's habit definitions, ordered by `sort_order`.
//! - `day_records`: one row per `(user_id, local_date)`, with the four
//!   habit sets stored as JSON arrays.
//!
//! `RecordDb` implements both collaborator traits the sequence core
//! consumes: [`HabitCatalog`] and [`DayRecordRepository`]. The narrow
//! `update_*_sets` writes lazily create the row (first write wins) and
//! are last-write-wins across sessions -- there is no concurrency token.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::habit::{Habit, HabitCatalog, TimingAffinity};
use crate::record::DayRecord;
use crate::store::DayRecordRepository;

use super::data_dir;

/// SQLite database for habits and day records.
pub struct RecordDb {
    conn: Connection,
}

impl RecordDb {
    /// Open the database at `~/.config/bookend/bookend.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("bookend.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and dry runs).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS habits (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    name        TEXT NOT NULL,
                    affinity    TEXT NOT NULL,
                    sort_order  INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS day_records (
                    user_id               TEXT NOT NULL,
                    local_date            TEXT NOT NULL,
                    prev_evening_rating   INTEGER,
                    sleep_rating          INTEGER,
                    morning_rating        INTEGER,
                    day_rating            INTEGER,
                    feeling               TEXT,
                    accomplishment        TEXT,
                    improvement           TEXT,
                    completed_morning     TEXT NOT NULL DEFAULT '[]',
                    completed_evening     TEXT NOT NULL DEFAULT '[]',
                    deferred_from_morning TEXT NOT NULL DEFAULT '[]',
                    deferred_from_evening TEXT NOT NULL DEFAULT '[]',
                    startup_completed_at  TEXT,
                    shutdown_completed_at TEXT,
                    PRIMARY KEY (user_id, local_date)
                );

                CREATE INDEX IF NOT EXISTS idx_habits_user_order
                    ON habits(user_id, sort_order);",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    // ── Habit catalog CRUD ───────────────────────────────────────────

    /// Create a habit at the end of the user's list.
    pub fn add_habit(
        &self,
        user_id: &str,
        name: &str,
        affinity: TimingAffinity,
    ) -> Result<Habit, StoreError> {
        let next_order: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM habits WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let habit = Habit {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            affinity,
            sort_order: next_order,
        };
        self.conn.execute(
            "INSERT INTO habits (id, user_id, name, affinity, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![habit.id, user_id, habit.name, habit.affinity.as_str(), habit.sort_order],
        )?;
        Ok(habit)
    }

    pub fn rename_habit(&self, habit_id: &str, name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE habits SET name = ?2 WHERE id = ?1",
            params![habit_id, name],
        )?;
        Ok(())
    }

    pub fn set_habit_affinity(
        &self,
        habit_id: &str,
        affinity: TimingAffinity,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE habits SET affinity = ?2 WHERE id = ?1",
            params![habit_id, affinity.as_str()],
        )?;
        Ok(())
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM habits WHERE id = ?1", params![habit_id])?;
        Ok(())
    }

    /// Move a habit to `new_index` in the user's list and renumber
    /// everything contiguously (drag-reorder semantics).
    pub fn move_habit(
        &self,
        user_id: &str,
        habit_id: &str,
        new_index: usize,
    ) -> Result<(), StoreError> {
        let mut habits = self.habits(user_id)?;
        let from = habits
            .iter()
            .position(|h| h.id == habit_id)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown habit: {habit_id}")))?;
        let habit = habits.remove(from);
        let to = new_index.min(habits.len());
        habits.insert(to, habit);

        for (order, habit) in habits.iter().enumerate() {
            self.conn.execute(
                "UPDATE habits SET sort_order = ?2 WHERE id = ?1",
                params![habit.id, order as i64],
            )?;
        }
        Ok(())
    }

    // ── Day records ──────────────────────────────────────────────────

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(DayRecord, [String; 4])> {
        let mut record = DayRecord {
            ratings: crate::record::Ratings {
                prev_evening: row.get::<_, Option<u8>>(0)?,
                sleep: row.get::<_, Option<u8>>(1)?,
                morning: row.get::<_, Option<u8>>(2)?,
                day_overall: row.get::<_, Option<u8>>(3)?,
            },
            text: crate::record::Texts {
                feeling: row.get(4)?,
                accomplishment: row.get(5)?,
                improvement: row.get(6)?,
            },
            ..Default::default()
        };
        record.startup_completed_at = parse_timestamp(row.get::<_, Option<String>>(11)?);
        record.shutdown_completed_at = parse_timestamp(row.get::<_, Option<String>>(12)?);
        let sets = [row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?];
        Ok((record, sets))
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn encode_set(set: &BTreeSet<String>) -> String {
    serde_json::to_string(set).unwrap_or_else(|_| "[]".to_string())
}

fn decode_set(
    raw: &str,
    user_id: &str,
    local_date: NaiveDate,
) -> Result<BTreeSet<String>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRecord {
        user_id: user_id.to_string(),
        local_date: local_date.to_string(),
        message: e.to_string(),
    })
}

impl HabitCatalog for RecordDb {
    fn habits(&self, user_id: &str) -> Result<Vec<Habit>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, affinity, sort_order FROM habits
             WHERE user_id = ?1 ORDER BY sort_order",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut habits = Vec::new();
        for row in rows {
            let (id, name, affinity_raw, sort_order) = row?;
            let affinity = TimingAffinity::parse(&affinity_raw).ok_or_else(|| {
                StoreError::QueryFailed(format!("unknown affinity '{affinity_raw}' for {id}"))
            })?;
            habits.push(Habit {
                id,
                name,
                affinity,
                sort_order,
            });
        }
        Ok(habits)
    }
}

impl DayRecordRepository for RecordDb {
    fn fetch(&self, user_id: &str, local_date: NaiveDate) -> Result<Option<DayRecord>, StoreError> {
        let date_key = local_date.to_string();
        let row = self
            .conn
            .query_row(
                "SELECT prev_evening_rating, sleep_rating, morning_rating, day_rating,
                        feeling, accomplishment, improvement,
                        completed_morning, completed_evening,
                        deferred_from_morning, deferred_from_evening,
                        startup_completed_at, shutdown_completed_at
                 FROM day_records WHERE user_id = ?1 AND local_date = ?2",
                params![user_id, date_key],
                Self::row_to_record,
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((mut record, [cm, ce, dm, de])) => {
                record.completed_morning_habits = decode_set(&cm, user_id, local_date)?;
                record.completed_evening_habits = decode_set(&ce, user_id, local_date)?;
                record.deferred_from_morning = decode_set(&dm, user_id, local_date)?;
                record.deferred_from_evening = decode_set(&de, user_id, local_date)?;
                Ok(Some(record))
            }
        }
    }

    fn upsert(
        &self,
        user_id: &str,
        local_date: NaiveDate,
        record: &DayRecord,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO day_records (
                user_id, local_date,
                prev_evening_rating, sleep_rating, morning_rating, day_rating,
                feeling, accomplishment, improvement,
                completed_morning, completed_evening,
                deferred_from_morning, deferred_from_evening,
                startup_completed_at, shutdown_completed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(user_id, local_date) DO UPDATE SET
                prev_evening_rating = excluded.prev_evening_rating,
                sleep_rating = excluded.sleep_rating,
                morning_rating = excluded.morning_rating,
                day_rating = excluded.day_rating,
                feeling = excluded.feeling,
                accomplishment = excluded.accomplishment,
                improvement = excluded.improvement,
                completed_morning = excluded.completed_morning,
                completed_evening = excluded.completed_evening,
                deferred_from_morning = excluded.deferred_from_morning,
                deferred_from_evening = excluded.deferred_from_evening,
                startup_completed_at = excluded.startup_completed_at,
                shutdown_completed_at = excluded.shutdown_completed_at",
            params![
                user_id,
                local_date.to_string(),
                record.ratings.prev_evening,
                record.ratings.sleep,
                record.ratings.morning,
                record.ratings.day_overall,
                record.text.feeling,
                record.text.accomplishment,
                record.text.improvement,
                encode_set(&record.completed_morning_habits),
                encode_set(&record.completed_evening_habits),
                encode_set(&record.deferred_from_morning),
                encode_set(&record.deferred_from_evening),
                record.startup_completed_at.map(|t| t.to_rfc3339()),
                record.shutdown_completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn update_deferred_sets(
        &self,
        user_id: &str,
        local_date: NaiveDate,
        deferred_from_morning: &BTreeSet<String>,
        deferred_from_evening: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO day_records (user_id, local_date, deferred_from_morning, deferred_from_evening)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, local_date) DO UPDATE SET
                deferred_from_morning = excluded.deferred_from_morning,
                deferred_from_evening = excluded.deferred_from_evening",
            params![
                user_id,
                local_date.to_string(),
                encode_set(deferred_from_morning),
                encode_set(deferred_from_evening),
            ],
        )?;
        Ok(())
    }

    fn update_completed_sets(
        &self,
        user_id: &str,
        local_date: NaiveDate,
        completed_morning: &BTreeSet<String>,
        completed_evening: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO day_records (user_id, local_date, completed_morning, completed_evening)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, local_date) DO UPDATE SET
                completed_morning = excluded.completed_morning,
                completed_evening = excluded.completed_evening",
            params![
                user_id,
                local_date.to_string(),
                encode_set(completed_morning),
                encode_set(completed_evening),
            ],
        )?;
        Ok(())
    }
}
