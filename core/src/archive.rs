use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::db::Database;
use crate::models::{VaultSnapshot, split_attachments};

/// The single JSON entry carrying the full record snapshot.
pub const SNAPSHOT_ENTRY: &str = "backup_data.json";
/// Prefix for attachment entries. Only the base name of each source file
/// is kept; directory structure is intentionally discarded.
pub const FILES_PREFIX: &str = "files/";
/// Fixed name used for the exported archive and the remote copy.
pub const BACKUP_FILE_NAME: &str = "medvault_backup.zip";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub records: usize,
    pub files_written: usize,
    pub files_missing: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub records: usize,
    pub files_restored: usize,
    pub files_skipped: usize,
}

/// Every non-blank attachment path referenced by the snapshot, de-duplicated:
/// prescription and report attachment lists plus member profile photos.
fn referenced_attachments(snapshot: &VaultSnapshot) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for member in &snapshot.members {
        if let Some(photo) = member.photo_path.as_deref() {
            if !photo.trim().is_empty() {
                paths.insert(photo.trim().to_string());
            }
        }
    }
    for joined in snapshot
        .prescriptions
        .iter()
        .filter_map(|rx| rx.attachments.as_deref())
        .chain(snapshot.reports.iter().filter_map(|r| r.attachments.as_deref()))
    {
        paths.extend(split_attachments(joined));
    }
    paths
}

/// Export the entire dataset to a self-contained archive at `dest`.
///
/// The archive is assembled at a temporary sibling path and renamed into
/// place on success, so a failed export never leaves a partial archive at
/// the final destination. Referenced attachments that no longer exist on
/// disk are counted, not fatal.
pub fn write_archive(db: &Database, dest: &Path) -> Result<ArchiveStats> {
    let snapshot = db.snapshot()?;
    let tmp = dest.with_extension("zip.part");

    match write_archive_inner(&snapshot, &tmp) {
        Ok(stats) => {
            fs::rename(&tmp, dest).with_context(|| {
                format!("Failed to move finished archive to {}", dest.display())
            })?;
            info!(
                records = stats.records,
                files = stats.files_written,
                missing = stats.files_missing,
                "Backup archive written"
            );
            Ok(stats)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn write_archive_inner(snapshot: &VaultSnapshot, tmp: &Path) -> Result<ArchiveStats> {
    let file = File::create(tmp)
        .with_context(|| format!("Failed to create archive at {}", tmp.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let json = serde_json::to_string(snapshot).context("Failed to serialize snapshot")?;
    zip.start_file(SNAPSHOT_ENTRY, options)?;
    zip.write_all(json.as_bytes())?;

    let mut stats = ArchiveStats {
        records: snapshot.members.len()
            + snapshot.doctors.len()
            + snapshot.prescriptions.len()
            + snapshot.reports.len(),
        ..ArchiveStats::default()
    };

    for path in referenced_attachments(snapshot) {
        let source = Path::new(&path);
        let Some(base_name) = source.file_name().and_then(|n| n.to_str()) else {
            stats.files_missing += 1;
            continue;
        };
        if !source.is_file() {
            stats.files_missing += 1;
            continue;
        }
        // Base-name collisions between distinct source paths silently keep
        // the last entry written; known limitation of the format.
        zip.start_file(format!("{FILES_PREFIX}{base_name}"), options)?;
        let mut input = File::open(source)
            .with_context(|| format!("Failed to read attachment {}", source.display()))?;
        io::copy(&mut input, &mut zip)?;
        stats.files_written += 1;
    }

    zip.finish()?;
    Ok(stats)
}

/// Replace all local state from an archive produced by [`write_archive`].
///
/// Destructive by contract: the record tables are cleared and every file
/// under `files_root` is deleted *before* the archive is read, so a failure
/// partway through leaves neither the old nor the complete new dataset.
/// Entries whose name escapes `files_root` are skipped with a warning; the
/// rest of the restore continues.
pub fn restore_archive(db: &Database, files_root: &Path, src: &Path) -> Result<RestoreStats> {
    db.clear_all()?;
    clear_dir(files_root)?;

    let file = File::open(src)
        .with_context(|| format!("Failed to open archive {}", src.display()))?;
    let mut archive = ZipArchive::new(file).context("Not a readable backup archive")?;

    let root = files_root
        .canonicalize()
        .context("Files directory is not accessible")?;
    let mut stats = RestoreStats::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        if name == SNAPSHOT_ENTRY {
            let mut json = String::new();
            entry.read_to_string(&mut json)?;
            let snapshot: VaultSnapshot =
                serde_json::from_str(&json).context("Backup data entry is not valid")?;
            stats.records = db.insert_snapshot(&snapshot)?;
        } else if let Some(rest) = name.strip_prefix(FILES_PREFIX) {
            let Some(dest) = resolve_under_root(&root, rest) else {
                warn!(entry = %name, "Rejected archive entry escaping the files root");
                stats.files_skipped += 1;
                continue;
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            io::copy(&mut entry, &mut out)?;
            stats.files_restored += 1;
        } else {
            warn!(entry = %name, "Ignoring unknown archive entry");
            stats.files_skipped += 1;
        }
    }

    info!(
        records = stats.records,
        files = stats.files_restored,
        skipped = stats.files_skipped,
        "Backup archive restored"
    );
    Ok(stats)
}

/// Resolve an archive entry remainder against the trusted root.
///
/// `root` must already be canonical. The joined candidate is normalized
/// lexically (`..` pops, `.` drops) and accepted only if it stays inside
/// the root, which defends against entry names such as
/// `files/../../etc/evil`.
fn resolve_under_root(root: &Path, entry_rest: &str) -> Option<PathBuf> {
    let candidate = root.join(entry_rest);
    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized != *root && normalized.starts_with(root) {
        Some(normalized)
    } else {
        None
    }
}

/// Delete everything under `dir`, creating it if missing.
pub(crate) fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
