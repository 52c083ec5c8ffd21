use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// A family profile under which medical records are organized.
///
/// Root entity: deleting a member cascades deletion of that member's
/// prescriptions and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub relation: String,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub member_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// `doctor_name` is denormalized at creation time; `doctor_id` is
/// informational only and not enforced as a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub member_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doctor_id: Option<String>,
    pub doctor_name: String,
    /// Milliseconds since the Unix epoch.
    pub date: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    /// Comma-joined local attachment paths; consumers must go through
    /// [`split_attachments`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attachments: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// `mime_type` and `preview_path` are carried in the schema and archive
/// but not consulted by the backup path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub member_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doctor_id: Option<String>,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub date: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attachments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preview_path: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

// --- New-record types (id and timestamps are generated at insert) ---

#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub age: i64,
    pub relation: String,
    pub gender: String,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub member_id: String,
    pub name: String,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub member_id: String,
    pub doctor_id: Option<String>,
    pub doctor_name: String,
    pub date: i64,
    pub notes: Option<String>,
    pub attachments: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub member_id: String,
    pub doctor_id: Option<String>,
    pub name: String,
    pub date: i64,
    pub notes: Option<String>,
    pub attachments: Option<String>,
    pub mime_type: Option<String>,
    pub preview_path: Option<String>,
}

// --- Archive snapshot ---

/// Ephemeral aggregate of the full local dataset, built fresh for each
/// export and consumed whole on each import. The archive format carries
/// no version field, so there is no forward/backward compatibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultSnapshot {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub reports: Vec<Report>,
}

// --- Attachment list helpers ---

/// Split a comma-joined attachment field, dropping blank segments.
/// `"a.png,,b.png"` becomes `["a.png", "b.png"]`.
#[must_use]
pub fn split_attachments(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Join attachment paths back into the stored form; `None` when empty.
#[must_use]
pub fn join_attachments(paths: &[String]) -> Option<String> {
    if paths.is_empty() {
        None
    } else {
        Some(paths.join(","))
    }
}

// --- Validation (callers validate before the record store) ---

pub fn validate_member_data(name: &str, age: i64) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Member name must not be empty");
    }
    if !(0..=150).contains(&age) {
        bail!("Member age must be between 0 and 150 (got {age})");
    }
    Ok(())
}

pub fn validate_doctor_data(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Doctor name must not be empty");
    }
    Ok(())
}

pub fn validate_prescription_data(date_ms: i64) -> Result<()> {
    if date_ms < 0 {
        bail!("Prescription date must not be before the Unix epoch");
    }
    Ok(())
}

pub fn validate_report_data(name: &str, date_ms: i64) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Report name must not be empty");
    }
    if date_ms < 0 {
        bail!("Report date must not be before the Unix epoch");
    }
    Ok(())
}

/// A PIN is 4 to 8 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<()> {
    if !(4..=8).contains(&pin.len()) || !pin.bytes().all(|b| b.is_ascii_digit()) {
        bail!("PIN must be 4 to 8 digits");
    }
    Ok(())
}
