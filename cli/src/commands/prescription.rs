use std::path::Path;

use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use medvault_core::models::{NewPrescription, split_attachments};
use medvault_core::service::VaultService;

use super::helpers::{format_date_ms, parse_date_ms};

pub(crate) fn cmd_prescription_add(
    vault: &VaultService,
    member: &str,
    doctor: Option<String>,
    doctor_name: &str,
    date: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    vault.get_member(member)?;
    let date = parse_date_ms(date)?;

    let rx = vault.add_prescription(&NewPrescription {
        member_id: member.to_string(),
        doctor_id: doctor,
        doctor_name: doctor_name.to_string(),
        date,
        notes,
        attachments: None,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rx)?);
    } else {
        println!(
            "Added prescription from {} on {} ({})",
            rx.doctor_name,
            format_date_ms(rx.date),
            rx.id
        );
    }

    Ok(())
}

pub(crate) fn cmd_prescription_list(vault: &VaultService, member: &str, json: bool) -> Result<()> {
    let prescriptions = vault.prescriptions(member)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prescriptions)?);
    } else if prescriptions.is_empty() {
        eprintln!("No prescriptions for this member.");
    } else {
        #[derive(Tabled)]
        struct PrescriptionRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Doctor")]
            doctor: String,
            #[tabled(rename = "Files")]
            files: usize,
            #[tabled(rename = "Notes")]
            notes: String,
        }

        let rows: Vec<PrescriptionRow> = prescriptions
            .iter()
            .map(|rx| PrescriptionRow {
                id: rx.id.clone(),
                date: format_date_ms(rx.date),
                doctor: rx.doctor_name.clone(),
                files: rx
                    .attachments
                    .as_deref()
                    .map_or(0, |a| split_attachments(a).len()),
                notes: rx.notes.clone().unwrap_or_default(),
            })
            .collect();

        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_prescription_remove(vault: &VaultService, id: &str, json: bool) -> Result<()> {
    let removed = vault.remove_prescription(id)?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed, "id": id }));
    } else if removed {
        println!("Removed prescription {id}");
    } else {
        eprintln!("No prescription with id {id}");
    }

    Ok(())
}

pub(crate) fn cmd_prescription_attach(
    vault: &VaultService,
    id: &str,
    file: &Path,
    json: bool,
) -> Result<()> {
    let rx = vault.attach_to_prescription(id, file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rx)?);
    } else {
        let count = rx
            .attachments
            .as_deref()
            .map_or(0, |a| split_attachments(a).len());
        println!("Attached {} ({count} file(s) total)", file.display());
    }

    Ok(())
}
