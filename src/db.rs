use crate::error::{AppError, AppResult};
use crate::models::{Gender, NewPatient, Patient};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed patient store.
///
/// Holds one connection behind a mutex; the guard scopes every access, so
/// the connection is released on all paths.
pub struct PatientStore {
    conn: Mutex<Connection>,
}

impl PatientStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        log::info!("[DB] opened patient store at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Custom("Database lock error".to_string()))
    }

    /// Create the patients table if it is absent.
    ///
    /// Returns `true` only when the table was created by this call, so the
    /// caller can surface the one-time bootstrap notice. Safe to call any
    /// number of times.
    pub fn ensure_schema(&self) -> AppResult<bool> {
        let conn = self.conn()?;

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'patients'",
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            log::debug!("[DB] patients table already present");
            return Ok(false);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                locality TEXT NOT NULL,
                registration_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;
        log::info!("[DB] created patients table");
        Ok(true)
    }

    /// Insert one registration. The registration timestamp is assigned here,
    /// server-side. Returns the new row id.
    pub fn insert_patient(&self, patient: &NewPatient) -> AppResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO patients (name, age, gender, locality, registration_date)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                patient.name,
                patient.age,
                patient.gender.as_str(),
                patient.locality,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        log::info!("[DB] registered patient id={} name='{}'", id, patient.name);
        Ok(id)
    }

    pub fn get_patient(&self, id: i64) -> AppResult<Option<Patient>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, age, gender, locality, registration_date
             FROM patients WHERE id = ?1",
        )?;

        let result = stmt.query_row([id], map_patient_row);
        match result {
            Ok(patient) => Ok(Some(patient)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_patients(&self) -> AppResult<Vec<Patient>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, age, gender, locality, registration_date
             FROM patients ORDER BY id",
        )?;
        let rows = stmt.query_map([], map_patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?);
        }
        Ok(patients)
    }

    pub fn count_patients(&self) -> AppResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn map_patient_row(row: &rusqlite::Row) -> rusqlite::Result<Patient> {
    let gender_raw: String = row.get(3)?;
    let gender = Gender::parse(&gender_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown gender value '{}'", gender_raw).into(),
        )
    })?;
    let ts_raw: String = row.get(5)?;
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender,
        locality: row.get(4)?,
        registration_date: parse_timestamp(&ts_raw, 5)?,
    })
}

/// Accepts RFC 3339 (our inserts) and SQLite's CURRENT_TIMESTAMP format
/// (rows created through the column default).
fn parse_timestamp(raw: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> PatientStore {
        let store = PatientStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn sample_patient() -> NewPatient {
        NewPatient {
            name: "Ravi Sharma".to_string(),
            age: 34,
            gender: Gender::Male,
            locality: "Janakpuri West".to_string(),
        }
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = PatientStore::open_in_memory().unwrap();
        assert!(store.ensure_schema().unwrap());
        // Second call must neither recreate the table nor error.
        assert!(!store.ensure_schema().unwrap());
    }

    #[test]
    fn test_insert_round_trips_all_fields() {
        let store = test_store();
        let before = Utc::now();

        let id = store.insert_patient(&sample_patient()).unwrap();
        let patient = store.get_patient(id).unwrap().unwrap();

        assert_eq!(patient.id, id);
        assert_eq!(patient.name, "Ravi Sharma");
        assert_eq!(patient.age, 34);
        assert_eq!(patient.gender, Gender::Male);
        assert_eq!(patient.locality, "Janakpuri West");
        assert!(patient.registration_date >= before);
        assert!(patient.registration_date <= Utc::now());
    }

    #[test]
    fn test_get_patient_missing_row_is_none() {
        let store = test_store();
        assert!(store.get_patient(999).unwrap().is_none());
    }

    #[test]
    fn test_list_patients_in_insert_order() {
        let store = test_store();
        store.insert_patient(&sample_patient()).unwrap();
        store
            .insert_patient(&NewPatient {
                name: "Meena Gupta".to_string(),
                age: 52,
                gender: Gender::Female,
                locality: "Dwarka Mor".to_string(),
            })
            .unwrap();

        let patients = store.list_patients().unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].name, "Ravi Sharma");
        assert_eq!(patients[1].name, "Meena Gupta");
        assert_eq!(store.count_patients().unwrap(), 2);
    }

    #[test]
    fn test_timestamp_parser_accepts_sqlite_default_format() {
        let parsed = parse_timestamp("2025-03-01 09:30:00", 5).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T09:30:00+00:00");
    }
}
