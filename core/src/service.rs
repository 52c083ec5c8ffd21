use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::archive::{self, ArchiveStats, BACKUP_FILE_NAME, RestoreStats};
use crate::db::Database;
use crate::models::{
    Doctor, Member, NewDoctor, NewMember, NewPrescription, NewReport, Prescription, Report,
    split_attachments, validate_doctor_data, validate_member_data, validate_pin,
    validate_prescription_data, validate_report_data,
};

/// Per-account remote storage for the single backup archive, addressed by
/// the fixed [`BACKUP_FILE_NAME`].
///
/// The CLI implements this with reqwest against a drive-style endpoint;
/// mobile shells bind their platform drive SDK. Upload has upsert
/// semantics: search for the fixed name, overwrite in place when found,
/// create otherwise. The search-then-write pair is not transactional
/// against concurrent writers; backups are triggered from one serialized
/// slot at a time.
pub trait RemoteArchiveStore: Send + Sync {
    /// Remote identifier of the fixed-named entry, if present.
    fn find(&self) -> Result<Option<String>>;
    /// Create or overwrite the fixed-named entry; returns its identifier.
    fn upload(&self, archive: &Path) -> Result<String>;
    /// Stream the entry's full content to `dest`.
    fn download(&self, id: &str, dest: &Path) -> Result<()>;
    /// Remove the fixed-named entry.
    fn delete(&self) -> Result<()>;
}

const PIN_KEY: &str = "pin_digest";
const TUTORIAL_KEY: &str = "tutorial_seen";
const FIRST_RUN_KEY: &str = "first_run_done";

const DB_FILE: &str = "vault.db";
const FILES_DIR: &str = "files";
const CACHE_DIR: &str = "cache";

/// Reject account ids that could escape the per-account directory.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.trim().is_empty() {
        bail!("Account id must not be empty");
    }
    if account_id.contains('/') || account_id.contains('\\') {
        bail!("Account id must not contain path separators");
    }
    if account_id.contains("..") {
        bail!("Account id must not contain '..'");
    }
    if account_id.contains('\0') {
        bail!("Account id must not contain null bytes");
    }
    Ok(())
}

/// One open vault: the database handle plus the private files and cache
/// directories for a single account. Components that need storage take
/// this explicitly; there is no process-wide current-account slot.
pub struct VaultService {
    db: Database,
    files_dir: PathBuf,
    cache_dir: PathBuf,
}

impl VaultService {
    /// Open (creating if needed) the vault rooted at `account_dir`.
    pub fn open(account_dir: &Path) -> Result<Self> {
        let files_dir = account_dir.join(FILES_DIR);
        let cache_dir = account_dir.join(CACHE_DIR);
        fs::create_dir_all(&files_dir)
            .with_context(|| format!("Failed to create {}", files_dir.display()))?;
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create {}", cache_dir.display()))?;
        let db = Database::open(&account_dir.join(DB_FILE))?;
        Ok(Self {
            db,
            files_dir,
            cache_dir,
        })
    }

    /// Open the vault for one account under the shared data root.
    /// Per-account isolation is one directory (and one database file)
    /// per account id.
    pub fn open_account(data_root: &Path, account_id: &str) -> Result<Self> {
        validate_account_id(account_id)?;
        Self::open(&data_root.join("accounts").join(account_id))
    }

    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    // --- Members ---

    pub fn add_member(&self, member: &NewMember) -> Result<Member> {
        validate_member_data(&member.name, member.age)?;
        self.db.insert_member(member)
    }

    pub fn update_member(&self, member: &Member) -> Result<()> {
        validate_member_data(&member.name, member.age)?;
        self.db.upsert_member(member)
    }

    pub fn get_member(&self, id: &str) -> Result<Member> {
        self.db.get_member(id)
    }

    pub fn members(&self) -> Result<Vec<Member>> {
        self.db.list_members()
    }

    /// Delete a member, the attachment files its records exclusively own,
    /// and its profile photo. Prescriptions and reports go with it via
    /// the cascade. Returns `Ok(false)` when no such member exists.
    pub fn remove_member(&self, id: &str) -> Result<bool> {
        let Some(member) = self.db.find_member(id)? else {
            return Ok(false);
        };
        if let Some(photo) = &member.photo_path {
            remove_file_quietly(photo);
        }
        for rx in self.db.list_prescriptions(id)? {
            delete_attachments(rx.attachments.as_deref());
        }
        for report in self.db.list_reports(id)? {
            delete_attachments(report.attachments.as_deref());
        }
        self.db.delete_member(id)
    }

    // --- Doctors ---

    pub fn add_doctor(&self, doctor: &NewDoctor) -> Result<Doctor> {
        validate_doctor_data(&doctor.name)?;
        self.db.insert_doctor(doctor)
    }

    pub fn doctors(&self, member_id: &str) -> Result<Vec<Doctor>> {
        self.db.list_doctors(member_id)
    }

    pub fn remove_doctor(&self, id: &str) -> Result<bool> {
        self.db.delete_doctor(id)
    }

    // --- Prescriptions ---

    /// Insert a prescription. When a doctor id is given and no display
    /// name, the doctor's current name is denormalized onto the record.
    pub fn add_prescription(&self, rx: &NewPrescription) -> Result<Prescription> {
        validate_prescription_data(rx.date)?;
        let mut rx = rx.clone();
        if rx.doctor_name.trim().is_empty() {
            if let Some(doctor_id) = &rx.doctor_id {
                rx.doctor_name = self.db.get_doctor(doctor_id)?.name;
            }
        }
        self.db.insert_prescription(&rx)
    }

    pub fn prescriptions(&self, member_id: &str) -> Result<Vec<Prescription>> {
        self.db.list_prescriptions(member_id)
    }

    pub fn remove_prescription(&self, id: &str) -> Result<bool> {
        let Some(rx) = self.db.find_prescription(id)? else {
            return Ok(false);
        };
        delete_attachments(rx.attachments.as_deref());
        self.db.delete_prescription(id)
    }

    /// Copy an external file into the private files area and append its
    /// new path to the prescription's attachment list.
    pub fn attach_to_prescription(&self, id: &str, source: &Path) -> Result<Prescription> {
        let mut rx = self.db.get_prescription(id)?;
        let stored = self.import_attachment(source)?;
        let mut paths = rx
            .attachments
            .as_deref()
            .map(split_attachments)
            .unwrap_or_default();
        paths.push(stored);
        rx.attachments = crate::models::join_attachments(&paths);
        self.db.upsert_prescription(&rx)?;
        self.db.get_prescription(id)
    }

    // --- Reports ---

    pub fn add_report(&self, report: &NewReport) -> Result<Report> {
        validate_report_data(&report.name, report.date)?;
        self.db.insert_report(report)
    }

    pub fn reports(&self, member_id: &str) -> Result<Vec<Report>> {
        self.db.list_reports(member_id)
    }

    pub fn remove_report(&self, id: &str) -> Result<bool> {
        let Some(report) = self.db.find_report(id)? else {
            return Ok(false);
        };
        delete_attachments(report.attachments.as_deref());
        self.db.delete_report(id)
    }

    pub fn attach_to_report(&self, id: &str, source: &Path) -> Result<Report> {
        let mut report = self.db.get_report(id)?;
        let stored = self.import_attachment(source)?;
        let mut paths = report
            .attachments
            .as_deref()
            .map(split_attachments)
            .unwrap_or_default();
        paths.push(stored);
        report.attachments = crate::models::join_attachments(&paths);
        self.db.upsert_report(&report)?;
        self.db.get_report(id)
    }

    fn import_attachment(&self, source: &Path) -> Result<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .context("Attachment has no usable file name")?;
        let mut dest = self.files_dir.join(name);
        if dest.exists() {
            let prefix: String = Uuid::new_v4().to_string().chars().take(8).collect();
            dest = self.files_dir.join(format!("{prefix}_{name}"));
        }
        fs::copy(source, &dest)
            .with_context(|| format!("Failed to copy attachment {}", source.display()))?;
        Ok(dest.to_string_lossy().into_owned())
    }

    // --- Export / Import ---

    pub fn export_backup(&self, dest: &Path) -> Result<ArchiveStats> {
        archive::write_archive(&self.db, dest)
    }

    pub fn import_backup(&self, src: &Path) -> Result<RestoreStats> {
        archive::restore_archive(&self.db, &self.files_dir, src)
    }

    // --- Cloud backup ---

    /// Build a fresh archive in the cache area and upsert it to the
    /// remote store. Returns the remote identifier.
    pub fn backup_to_remote(&self, remote: &dyn RemoteArchiveStore) -> Result<String> {
        let archive_path = self.cache_dir.join(BACKUP_FILE_NAME);
        archive::write_archive(&self.db, &archive_path)?;
        remote.upload(&archive_path)
    }

    /// Fetch the remote archive and replace all local state with it.
    pub fn restore_from_remote(&self, remote: &dyn RemoteArchiveStore) -> Result<RestoreStats> {
        let Some(id) = remote.find()? else {
            bail!("No backup found in cloud storage");
        };
        let dest = self.cache_dir.join(BACKUP_FILE_NAME);
        remote.download(&id, &dest)?;
        archive::restore_archive(&self.db, &self.files_dir, &dest)
    }

    /// Best-effort remote delete; only used during account deletion,
    /// where a retry is not meaningful.
    pub fn delete_remote(&self, remote: &dyn RemoteArchiveStore) {
        if let Err(e) = remote.delete() {
            warn!(error = %e, "Failed to delete remote backup");
        }
    }

    /// Wipe the account: all record tables, all private files, and (best
    /// effort) the remote backup.
    pub fn delete_account(&self, remote: Option<&dyn RemoteArchiveStore>) -> Result<()> {
        self.db.clear_all()?;
        archive::clear_dir(&self.files_dir)?;
        if let Some(remote) = remote {
            self.delete_remote(remote);
        }
        Ok(())
    }

    // --- Settings: PIN lock and one-time flags ---

    pub fn set_pin(&self, pin: &str) -> Result<()> {
        validate_pin(pin)?;
        self.db.set_setting(PIN_KEY, &pin_digest(pin))
    }

    pub fn verify_pin(&self, pin: &str) -> Result<bool> {
        Ok(self
            .db
            .get_setting(PIN_KEY)?
            .is_some_and(|stored| stored == pin_digest(pin)))
    }

    pub fn has_pin(&self) -> Result<bool> {
        Ok(self.db.get_setting(PIN_KEY)?.is_some())
    }

    pub fn clear_pin(&self) -> Result<bool> {
        self.db.delete_setting(PIN_KEY)
    }

    pub fn mark_tutorial_seen(&self) -> Result<()> {
        self.db.set_setting(TUTORIAL_KEY, "true")
    }

    pub fn tutorial_seen(&self) -> Result<bool> {
        Ok(self.db.get_setting(TUTORIAL_KEY)?.as_deref() == Some("true"))
    }

    pub fn mark_first_run_done(&self) -> Result<()> {
        self.db.set_setting(FIRST_RUN_KEY, "true")
    }

    pub fn first_run_done(&self) -> Result<bool> {
        Ok(self.db.get_setting(FIRST_RUN_KEY)?.as_deref() == Some("true"))
    }
}

/// The PIN is stored as a SHA-256 hex digest, never in clear.
fn pin_digest(pin: &str) -> String {
    let hash = Sha256::digest(pin.as_bytes());
    hash.iter()
        .fold(String::with_capacity(64), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

fn delete_attachments(joined: Option<&str>) {
    if let Some(joined) = joined {
        for path in split_attachments(joined) {
            remove_file_quietly(&path);
        }
    }
}

fn remove_file_quietly(path: &str) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path, error = %e, "Failed to delete attachment file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RemoteEntry {
        id: String,
        name: String,
        content: Vec<u8>,
    }

    #[derive(Default)]
    struct MockRemote {
        entries: Mutex<Vec<RemoteEntry>>,
        next_id: Mutex<u32>,
    }

    impl MockRemote {
        fn entry_count(&self) -> usize {
            self.entries.lock().unwrap().len()
        }
    }

    impl RemoteArchiveStore for MockRemote {
        fn find(&self) -> Result<Option<String>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.name == BACKUP_FILE_NAME)
                .map(|e| e.id.clone()))
        }

        fn upload(&self, archive: &Path) -> Result<String> {
            let content = fs::read(archive)?;
            let mut entries = self.entries.lock().unwrap();
            if let Some(existing) = entries.iter_mut().find(|e| e.name == BACKUP_FILE_NAME) {
                existing.content = content;
                return Ok(existing.id.clone());
            }
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let id = format!("remote-{}", *next);
            entries.push(RemoteEntry {
                id: id.clone(),
                name: BACKUP_FILE_NAME.to_string(),
                content,
            });
            Ok(id)
        }

        fn download(&self, id: &str, dest: &Path) -> Result<()> {
            let entries = self.entries.lock().unwrap();
            let entry = entries
                .iter()
                .find(|e| e.id == id)
                .context("Remote entry not found")?;
            fs::write(dest, &entry.content)?;
            Ok(())
        }

        fn delete(&self) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .retain(|e| e.name != BACKUP_FILE_NAME);
            Ok(())
        }
    }

    struct FailingRemote;

    impl RemoteArchiveStore for FailingRemote {
        fn find(&self) -> Result<Option<String>> {
            bail!("network down")
        }
        fn upload(&self, _archive: &Path) -> Result<String> {
            bail!("network down")
        }
        fn download(&self, _id: &str, _dest: &Path) -> Result<()> {
            bail!("network down")
        }
        fn delete(&self) -> Result<()> {
            bail!("network down")
        }
    }

    fn open_vault(dir: &TempDir) -> VaultService {
        VaultService::open(dir.path()).unwrap()
    }

    fn sample_member() -> NewMember {
        NewMember {
            name: "Asha".to_string(),
            age: 34,
            relation: "self".to_string(),
            gender: "female".to_string(),
            photo_path: None,
        }
    }

    #[test]
    fn test_add_member_validates() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        assert!(
            vault
                .add_member(&NewMember {
                    name: String::new(),
                    ..sample_member()
                })
                .is_err()
        );
        assert!(vault.add_member(&sample_member()).is_ok());
    }

    #[test]
    fn test_add_prescription_denormalizes_doctor_name() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        let member = vault.add_member(&sample_member()).unwrap();
        let doctor = vault
            .add_doctor(&NewDoctor {
                member_id: member.id.clone(),
                name: "Dr. Rao".to_string(),
                specialization: None,
            })
            .unwrap();

        let rx = vault
            .add_prescription(&NewPrescription {
                member_id: member.id,
                doctor_id: Some(doctor.id),
                doctor_name: String::new(),
                date: 1_700_000_000_000,
                notes: None,
                attachments: None,
            })
            .unwrap();
        assert_eq!(rx.doctor_name, "Dr. Rao");
    }

    #[test]
    fn test_remove_member_deletes_owned_files() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);

        let photo = dir.path().join("photo.jpg");
        let scan = dir.path().join("scan.png");
        fs::write(&photo, b"photo").unwrap();
        fs::write(&scan, b"scan").unwrap();

        let member = vault
            .add_member(&NewMember {
                photo_path: Some(photo.to_string_lossy().into_owned()),
                ..sample_member()
            })
            .unwrap();
        vault
            .add_prescription(&NewPrescription {
                member_id: member.id.clone(),
                doctor_id: None,
                doctor_name: "Dr. Rao".to_string(),
                date: 0,
                notes: None,
                attachments: Some(scan.to_string_lossy().into_owned()),
            })
            .unwrap();

        assert!(vault.remove_member(&member.id).unwrap());
        assert!(!photo.exists());
        assert!(!scan.exists());
        assert!(vault.members().unwrap().is_empty());
    }

    #[test]
    fn test_remove_returns_false_for_unknown_ids() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        assert!(!vault.remove_member("no-such-id").unwrap());
        assert!(!vault.remove_prescription("no-such-id").unwrap());
        assert!(!vault.remove_report("no-such-id").unwrap());
    }

    #[test]
    fn test_attach_to_report_copies_into_files_dir() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        let member = vault.add_member(&sample_member()).unwrap();
        let report = vault
            .add_report(&NewReport {
                member_id: member.id,
                doctor_id: None,
                name: "X-ray".to_string(),
                date: 0,
                notes: None,
                attachments: None,
                mime_type: None,
                preview_path: None,
            })
            .unwrap();

        let source = dir.path().join("xray.png");
        fs::write(&source, b"image").unwrap();

        let updated = vault.attach_to_report(&report.id, &source).unwrap();
        let paths = split_attachments(updated.attachments.as_deref().unwrap());
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with(vault.files_dir().to_str().unwrap()));
        assert_eq!(fs::read(&paths[0]).unwrap(), b"image");
    }

    #[test]
    fn test_remote_upload_is_upsert_second_content_wins() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        let remote = MockRemote::default();

        vault.add_member(&sample_member()).unwrap();
        let first_id = vault.backup_to_remote(&remote).unwrap();
        assert_eq!(remote.entry_count(), 1);

        vault
            .add_member(&NewMember {
                name: "Ravi".to_string(),
                ..sample_member()
            })
            .unwrap();
        let second_id = vault.backup_to_remote(&remote).unwrap();
        assert_eq!(remote.entry_count(), 1);
        assert_eq!(first_id, second_id);

        // Restoring yields the second upload's dataset
        let restore_dir = TempDir::new().unwrap();
        let restored = open_vault(&restore_dir);
        restored.restore_from_remote(&remote).unwrap();
        assert_eq!(restored.members().unwrap().len(), 2);
    }

    #[test]
    fn test_restore_from_remote_without_backup_fails() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        let remote = MockRemote::default();
        assert!(vault.restore_from_remote(&remote).is_err());
    }

    #[test]
    fn test_delete_remote_swallows_errors() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        vault.delete_remote(&FailingRemote);
    }

    #[test]
    fn test_delete_account_wipes_local_state() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        let remote = MockRemote::default();

        vault.add_member(&sample_member()).unwrap();
        vault.backup_to_remote(&remote).unwrap();
        fs::write(vault.files_dir().join("a.png"), b"x").unwrap();

        vault.delete_account(Some(&remote)).unwrap();
        assert!(vault.members().unwrap().is_empty());
        assert!(fs::read_dir(vault.files_dir()).unwrap().next().is_none());
        assert_eq!(remote.entry_count(), 0);
    }

    #[test]
    fn test_pin_round_trip() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);

        assert!(!vault.has_pin().unwrap());
        assert!(!vault.verify_pin("1234").unwrap());

        vault.set_pin("1234").unwrap();
        assert!(vault.has_pin().unwrap());
        assert!(vault.verify_pin("1234").unwrap());
        assert!(!vault.verify_pin("4321").unwrap());

        assert!(vault.clear_pin().unwrap());
        assert!(!vault.has_pin().unwrap());
    }

    #[test]
    fn test_pin_is_not_stored_in_clear() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);
        vault.set_pin("1234").unwrap();
        let stored = vault.db().get_setting("pin_digest").unwrap().unwrap();
        assert_ne!(stored, "1234");
        assert_eq!(stored.len(), 64);
    }

    #[test]
    fn test_tutorial_and_first_run_flags() {
        let dir = TempDir::new().unwrap();
        let vault = open_vault(&dir);

        assert!(!vault.tutorial_seen().unwrap());
        vault.mark_tutorial_seen().unwrap();
        assert!(vault.tutorial_seen().unwrap());

        assert!(!vault.first_run_done().unwrap());
        vault.mark_first_run_done().unwrap();
        assert!(vault.first_run_done().unwrap());
    }

    #[test]
    fn test_validate_account_id() {
        assert!(validate_account_id("user-123").is_ok());
        assert!(validate_account_id("").is_err());
        assert!(validate_account_id("a/b").is_err());
        assert!(validate_account_id("a\\b").is_err());
        assert!(validate_account_id("..").is_err());
        assert!(validate_account_id("a\0b").is_err());
    }

    #[test]
    fn test_open_account_isolates_tenants() {
        let dir = TempDir::new().unwrap();
        let alice = VaultService::open_account(dir.path(), "alice").unwrap();
        let bob = VaultService::open_account(dir.path(), "bob").unwrap();

        alice.add_member(&sample_member()).unwrap();
        assert_eq!(alice.members().unwrap().len(), 1);
        assert!(bob.members().unwrap().is_empty());
    }
}
