use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{
    Doctor, Member, NewDoctor, NewMember, NewPrescription, NewReport, Prescription, Report,
    VaultSnapshot,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        // foreign_keys is per-connection, not persisted
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.migrate()
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS members (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    age INTEGER NOT NULL,
                    relation TEXT NOT NULL,
                    gender TEXT NOT NULL,
                    photo_path TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS doctors (
                    id TEXT PRIMARY KEY,
                    member_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    specialization TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS prescriptions (
                    id TEXT PRIMARY KEY,
                    member_id TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                    doctor_id TEXT,
                    doctor_name TEXT NOT NULL,
                    date INTEGER NOT NULL,
                    notes TEXT,
                    attachments TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS reports (
                    id TEXT PRIMARY KEY,
                    member_id TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                    doctor_id TEXT,
                    name TEXT NOT NULL,
                    date INTEGER NOT NULL,
                    notes TEXT,
                    attachments TEXT,
                    mime_type TEXT,
                    preview_path TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_doctors_member ON doctors(member_id);
                CREATE INDEX IF NOT EXISTS idx_prescriptions_member ON prescriptions(member_id);
                CREATE INDEX IF NOT EXISTS idx_reports_member ON reports(member_id);

                CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Rows changed on this connection since it was opened. Callers that
    /// need to re-deliver query results poll this and re-query on a bump;
    /// the mobile UI's live queries map onto this hook.
    pub fn change_counter(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT total_changes()", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Row mapping helpers ---

    fn member_from_row(row: &rusqlite::Row) -> rusqlite::Result<Member> {
        Ok(Member {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            relation: row.get(3)?,
            gender: row.get(4)?,
            photo_path: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn doctor_from_row(row: &rusqlite::Row) -> rusqlite::Result<Doctor> {
        Ok(Doctor {
            id: row.get(0)?,
            member_id: row.get(1)?,
            name: row.get(2)?,
            specialization: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn prescription_from_row(row: &rusqlite::Row) -> rusqlite::Result<Prescription> {
        Ok(Prescription {
            id: row.get(0)?,
            member_id: row.get(1)?,
            doctor_id: row.get(2)?,
            doctor_name: row.get(3)?,
            date: row.get(4)?,
            notes: row.get(5)?,
            attachments: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn report_from_row(row: &rusqlite::Row) -> rusqlite::Result<Report> {
        Ok(Report {
            id: row.get(0)?,
            member_id: row.get(1)?,
            doctor_id: row.get(2)?,
            name: row.get(3)?,
            date: row.get(4)?,
            notes: row.get(5)?,
            attachments: row.get(6)?,
            mime_type: row.get(7)?,
            preview_path: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    // --- Members ---

    pub fn insert_member(&self, member: &NewMember) -> Result<Member> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO members (id, name, age, relation, gender, photo_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                member.name,
                member.age,
                member.relation,
                member.gender,
                member.photo_path,
                now,
                now,
            ],
        )?;
        self.get_member(&id)
    }

    pub fn upsert_member(&self, member: &Member) -> Result<()> {
        // Plain INSERT OR REPLACE would delete-then-insert and fire the
        // child cascade, so replace-on-conflict uses an upsert clause.
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO members (id, name, age, relation, gender, photo_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                relation = excluded.relation,
                gender = excluded.gender,
                photo_path = excluded.photo_path,
                updated_at = excluded.updated_at",
            params![
                member.id,
                member.name,
                member.age,
                member.relation,
                member.gender,
                member.photo_path,
                if member.created_at.is_empty() {
                    now.clone()
                } else {
                    member.created_at.clone()
                },
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_member(&self, id: &str) -> Result<Member> {
        self.conn
            .query_row(
                "SELECT id, name, age, relation, gender, photo_path, created_at, updated_at
                 FROM members WHERE id = ?1",
                params![id],
                Self::member_from_row,
            )
            .context("Member not found")
    }

    pub fn find_member(&self, id: &str) -> Result<Option<Member>> {
        let member = self
            .conn
            .query_row(
                "SELECT id, name, age, relation, gender, photo_path, created_at, updated_at
                 FROM members WHERE id = ?1",
                params![id],
                Self::member_from_row,
            )
            .optional()?;
        Ok(member)
    }

    pub fn list_members(&self) -> Result<Vec<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, age, relation, gender, photo_path, created_at, updated_at
             FROM members ORDER BY name",
        )?;
        let members = stmt
            .query_map([], Self::member_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    pub fn delete_member(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM members WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Doctors ---

    pub fn insert_doctor(&self, doctor: &NewDoctor) -> Result<Doctor> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO doctors (id, member_id, name, specialization, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                doctor.member_id,
                doctor.name,
                doctor.specialization,
                now,
                now
            ],
        )?;
        self.get_doctor(&id)
    }

    pub fn upsert_doctor(&self, doctor: &Doctor) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO doctors (id, member_id, name, specialization, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                doctor.id,
                doctor.member_id,
                doctor.name,
                doctor.specialization,
                if doctor.created_at.is_empty() {
                    now.clone()
                } else {
                    doctor.created_at.clone()
                },
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_doctor(&self, id: &str) -> Result<Doctor> {
        self.conn
            .query_row(
                "SELECT id, member_id, name, specialization, created_at, updated_at
                 FROM doctors WHERE id = ?1",
                params![id],
                Self::doctor_from_row,
            )
            .context("Doctor not found")
    }

    pub fn list_doctors(&self, member_id: &str) -> Result<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, name, specialization, created_at, updated_at
             FROM doctors WHERE member_id = ?1 ORDER BY name",
        )?;
        let doctors = stmt
            .query_map(params![member_id], Self::doctor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(doctors)
    }

    pub fn all_doctors(&self) -> Result<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, name, specialization, created_at, updated_at
             FROM doctors ORDER BY name",
        )?;
        let doctors = stmt
            .query_map([], Self::doctor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(doctors)
    }

    pub fn delete_doctor(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Prescriptions ---

    pub fn insert_prescription(&self, rx: &NewPrescription) -> Result<Prescription> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO prescriptions (id, member_id, doctor_id, doctor_name, date, notes, attachments, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                rx.member_id,
                rx.doctor_id,
                rx.doctor_name,
                rx.date,
                rx.notes,
                rx.attachments,
                now,
                now,
            ],
        )?;
        self.get_prescription(&id)
    }

    pub fn upsert_prescription(&self, rx: &Prescription) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO prescriptions (id, member_id, doctor_id, doctor_name, date, notes, attachments, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rx.id,
                rx.member_id,
                rx.doctor_id,
                rx.doctor_name,
                rx.date,
                rx.notes,
                rx.attachments,
                if rx.created_at.is_empty() {
                    now.clone()
                } else {
                    rx.created_at.clone()
                },
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_prescription(&self, id: &str) -> Result<Prescription> {
        self.conn
            .query_row(
                "SELECT id, member_id, doctor_id, doctor_name, date, notes, attachments, created_at, updated_at
                 FROM prescriptions WHERE id = ?1",
                params![id],
                Self::prescription_from_row,
            )
            .context("Prescription not found")
    }

    pub fn find_prescription(&self, id: &str) -> Result<Option<Prescription>> {
        let rx = self
            .conn
            .query_row(
                "SELECT id, member_id, doctor_id, doctor_name, date, notes, attachments, created_at, updated_at
                 FROM prescriptions WHERE id = ?1",
                params![id],
                Self::prescription_from_row,
            )
            .optional()?;
        Ok(rx)
    }

    pub fn list_prescriptions(&self, member_id: &str) -> Result<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, doctor_id, doctor_name, date, notes, attachments, created_at, updated_at
             FROM prescriptions WHERE member_id = ?1 ORDER BY date DESC",
        )?;
        let prescriptions = stmt
            .query_map(params![member_id], Self::prescription_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prescriptions)
    }

    pub fn all_prescriptions(&self) -> Result<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, doctor_id, doctor_name, date, notes, attachments, created_at, updated_at
             FROM prescriptions ORDER BY date DESC",
        )?;
        let prescriptions = stmt
            .query_map([], Self::prescription_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prescriptions)
    }

    pub fn delete_prescription(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Reports ---

    pub fn insert_report(&self, report: &NewReport) -> Result<Report> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO reports (id, member_id, doctor_id, name, date, notes, attachments, mime_type, preview_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                id,
                report.member_id,
                report.doctor_id,
                report.name,
                report.date,
                report.notes,
                report.attachments,
                report.mime_type,
                report.preview_path,
                now,
                now,
            ],
        )?;
        self.get_report(&id)
    }

    pub fn upsert_report(&self, report: &Report) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO reports (id, member_id, doctor_id, name, date, notes, attachments, mime_type, preview_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                report.id,
                report.member_id,
                report.doctor_id,
                report.name,
                report.date,
                report.notes,
                report.attachments,
                report.mime_type,
                report.preview_path,
                if report.created_at.is_empty() {
                    now.clone()
                } else {
                    report.created_at.clone()
                },
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_report(&self, id: &str) -> Result<Report> {
        self.conn
            .query_row(
                "SELECT id, member_id, doctor_id, name, date, notes, attachments, mime_type, preview_path, created_at, updated_at
                 FROM reports WHERE id = ?1",
                params![id],
                Self::report_from_row,
            )
            .context("Report not found")
    }

    pub fn find_report(&self, id: &str) -> Result<Option<Report>> {
        let report = self
            .conn
            .query_row(
                "SELECT id, member_id, doctor_id, name, date, notes, attachments, mime_type, preview_path, created_at, updated_at
                 FROM reports WHERE id = ?1",
                params![id],
                Self::report_from_row,
            )
            .optional()?;
        Ok(report)
    }

    pub fn list_reports(&self, member_id: &str) -> Result<Vec<Report>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, doctor_id, name, date, notes, attachments, mime_type, preview_path, created_at, updated_at
             FROM reports WHERE member_id = ?1 ORDER BY date DESC",
        )?;
        let reports = stmt
            .query_map(params![member_id], Self::report_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    pub fn all_reports(&self) -> Result<Vec<Report>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, doctor_id, name, date, notes, attachments, mime_type, preview_path, created_at, updated_at
             FROM reports ORDER BY date DESC",
        )?;
        let reports = stmt
            .query_map([], Self::report_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    pub fn delete_report(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM reports WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Bulk operations ---

    /// Empty every record table unconditionally. Settings survive; they
    /// belong to the account, not the dataset.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM prescriptions;
             DELETE FROM reports;
             DELETE FROM doctors;
             DELETE FROM members;",
        )?;
        Ok(())
    }

    /// Bulk-insert a restored snapshot, owners before dependents. Not
    /// wrapped in a transaction: a mid-insert failure leaves whatever
    /// already landed (see the restore contract in the archive module).
    pub fn insert_snapshot(&self, snapshot: &VaultSnapshot) -> Result<usize> {
        for member in &snapshot.members {
            self.upsert_member(member)?;
        }
        for doctor in &snapshot.doctors {
            self.upsert_doctor(doctor)?;
        }
        for rx in &snapshot.prescriptions {
            self.upsert_prescription(rx)?;
        }
        for report in &snapshot.reports {
            self.upsert_report(report)?;
        }
        Ok(snapshot.members.len()
            + snapshot.doctors.len()
            + snapshot.prescriptions.len()
            + snapshot.reports.len())
    }

    /// Full dataset snapshot for export.
    pub fn snapshot(&self) -> Result<VaultSnapshot> {
        Ok(VaultSnapshot {
            members: self.list_members()?,
            doctors: self.all_doctors()?,
            prescriptions: self.all_prescriptions()?,
            reports: self.all_reports()?,
        })
    }

    // --- Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_member() -> NewMember {
        NewMember {
            name: "Asha".to_string(),
            age: 34,
            relation: "self".to_string(),
            gender: "female".to_string(),
            photo_path: None,
        }
    }

    fn sample_prescription(member_id: &str) -> NewPrescription {
        NewPrescription {
            member_id: member_id.to_string(),
            doctor_id: None,
            doctor_name: "Dr. Rao".to_string(),
            date: 1_700_000_000_000,
            notes: Some("twice daily".to_string()),
            attachments: None,
        }
    }

    fn sample_report(member_id: &str) -> NewReport {
        NewReport {
            member_id: member_id.to_string(),
            doctor_id: None,
            name: "Blood panel".to_string(),
            date: 1_700_000_000_000,
            notes: None,
            attachments: None,
            mime_type: Some("application/pdf".to_string()),
            preview_path: None,
        }
    }

    #[test]
    fn test_insert_and_get_member() {
        let db = Database::open_in_memory().unwrap();
        let member = db.insert_member(&sample_member()).unwrap();
        assert!(!member.id.is_empty());
        assert!(!member.created_at.is_empty());

        let fetched = db.get_member(&member.id).unwrap();
        assert_eq!(fetched, member);
    }

    #[test]
    fn test_find_member_none_when_absent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_member("no-such-id").unwrap().is_none());

        let member = db.insert_member(&sample_member()).unwrap();
        assert_eq!(db.find_member(&member.id).unwrap(), Some(member));
    }

    #[test]
    fn test_upsert_member_replaces_on_conflict() {
        let db = Database::open_in_memory().unwrap();
        let mut member = db.insert_member(&sample_member()).unwrap();
        member.name = "Asha K".to_string();
        member.age = 35;
        db.upsert_member(&member).unwrap();

        let members = db.list_members().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "Asha K");
        assert_eq!(members[0].age, 35);
    }

    #[test]
    fn test_upsert_member_keeps_children() {
        let db = Database::open_in_memory().unwrap();
        let mut member = db.insert_member(&sample_member()).unwrap();
        db.insert_prescription(&sample_prescription(&member.id))
            .unwrap();

        member.name = "Renamed".to_string();
        db.upsert_member(&member).unwrap();

        assert_eq!(db.list_prescriptions(&member.id).unwrap().len(), 1);
    }

    #[test]
    fn test_cascade_delete_member() {
        let db = Database::open_in_memory().unwrap();
        let member = db.insert_member(&sample_member()).unwrap();
        let other = db
            .insert_member(&NewMember {
                name: "Ravi".to_string(),
                ..sample_member()
            })
            .unwrap();

        db.insert_prescription(&sample_prescription(&member.id))
            .unwrap();
        db.insert_report(&sample_report(&member.id)).unwrap();
        db.insert_prescription(&sample_prescription(&other.id))
            .unwrap();
        let doctor = db
            .insert_doctor(&NewDoctor {
                member_id: member.id.clone(),
                name: "Dr. Rao".to_string(),
                specialization: Some("GP".to_string()),
            })
            .unwrap();

        assert!(db.delete_member(&member.id).unwrap());

        // The member's prescriptions and reports are gone
        assert!(db.list_prescriptions(&member.id).unwrap().is_empty());
        assert!(db.list_reports(&member.id).unwrap().is_empty());
        // Doctors and other members' records survive
        assert!(db.get_doctor(&doctor.id).is_ok());
        assert_eq!(db.list_prescriptions(&other.id).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_member_returns_false_when_absent() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.delete_member("no-such-id").unwrap());
    }

    #[test]
    fn test_list_prescriptions_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let member = db.insert_member(&sample_member()).unwrap();
        let old = db
            .insert_prescription(&NewPrescription {
                date: 1_600_000_000_000,
                ..sample_prescription(&member.id)
            })
            .unwrap();
        let new = db
            .insert_prescription(&NewPrescription {
                date: 1_700_000_000_000,
                ..sample_prescription(&member.id)
            })
            .unwrap();

        let listed = db.list_prescriptions(&member.id).unwrap();
        assert_eq!(listed[0].id, new.id);
        assert_eq!(listed[1].id, old.id);
    }

    #[test]
    fn test_clear_all_empties_every_table() {
        let db = Database::open_in_memory().unwrap();
        let member = db.insert_member(&sample_member()).unwrap();
        db.insert_doctor(&NewDoctor {
            member_id: member.id.clone(),
            name: "Dr. Rao".to_string(),
            specialization: None,
        })
        .unwrap();
        db.insert_prescription(&sample_prescription(&member.id))
            .unwrap();
        db.insert_report(&sample_report(&member.id)).unwrap();

        db.clear_all().unwrap();

        let snapshot = db.snapshot().unwrap();
        assert!(snapshot.members.is_empty());
        assert!(snapshot.doctors.is_empty());
        assert!(snapshot.prescriptions.is_empty());
        assert!(snapshot.reports.is_empty());
    }

    #[test]
    fn test_snapshot_and_insert_snapshot_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let member = db.insert_member(&sample_member()).unwrap();
        db.insert_doctor(&NewDoctor {
            member_id: member.id.clone(),
            name: "Dr. Rao".to_string(),
            specialization: None,
        })
        .unwrap();
        db.insert_prescription(&sample_prescription(&member.id))
            .unwrap();
        db.insert_report(&sample_report(&member.id)).unwrap();

        let snapshot = db.snapshot().unwrap();

        let restored = Database::open_in_memory().unwrap();
        let count = restored.insert_snapshot(&snapshot).unwrap();
        assert_eq!(count, 4);
        assert_eq!(restored.list_members().unwrap().len(), 1);
        assert_eq!(restored.list_prescriptions(&member.id).unwrap().len(), 1);
        assert_eq!(restored.list_reports(&member.id).unwrap().len(), 1);
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_setting("pin").unwrap().is_none());

        db.set_setting("pin", "abc123").unwrap();
        assert_eq!(db.get_setting("pin").unwrap().as_deref(), Some("abc123"));

        db.set_setting("pin", "def456").unwrap();
        assert_eq!(db.get_setting("pin").unwrap().as_deref(), Some("def456"));

        assert!(db.delete_setting("pin").unwrap());
        assert!(db.get_setting("pin").unwrap().is_none());
        assert!(!db.delete_setting("pin").unwrap());
    }

    #[test]
    fn test_settings_survive_clear_all() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("tutorial_seen", "true").unwrap();
        db.clear_all().unwrap();
        assert_eq!(
            db.get_setting("tutorial_seen").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_change_counter_bumps_on_write() {
        let db = Database::open_in_memory().unwrap();
        let before = db.change_counter().unwrap();
        let member = db.insert_member(&sample_member()).unwrap();
        let after_insert = db.change_counter().unwrap();
        assert!(after_insert > before);

        // Bulk paths count too; pollers re-query off any bump
        db.insert_prescription(&sample_prescription(&member.id))
            .unwrap();
        db.clear_all().unwrap();
        assert!(db.change_counter().unwrap() > after_insert);
    }
}
