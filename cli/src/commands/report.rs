use std::path::Path;

use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use medvault_core::models::{NewReport, split_attachments};
use medvault_core::service::VaultService;

use super::helpers::{format_date_ms, parse_date_ms};

pub(crate) fn cmd_report_add(
    vault: &VaultService,
    member: &str,
    name: &str,
    doctor: Option<String>,
    date: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    vault.get_member(member)?;
    let date = parse_date_ms(date)?;

    let report = vault.add_report(&NewReport {
        member_id: member.to_string(),
        doctor_id: doctor,
        name: name.to_string(),
        date,
        notes,
        attachments: None,
        mime_type: None,
        preview_path: None,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Added report {} on {} ({})",
            report.name,
            format_date_ms(report.date),
            report.id
        );
    }

    Ok(())
}

pub(crate) fn cmd_report_list(vault: &VaultService, member: &str, json: bool) -> Result<()> {
    let reports = vault.reports(member)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if reports.is_empty() {
        eprintln!("No reports for this member.");
    } else {
        #[derive(Tabled)]
        struct ReportRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Files")]
            files: usize,
            #[tabled(rename = "Notes")]
            notes: String,
        }

        let rows: Vec<ReportRow> = reports
            .iter()
            .map(|r| ReportRow {
                id: r.id.clone(),
                date: format_date_ms(r.date),
                name: r.name.clone(),
                files: r
                    .attachments
                    .as_deref()
                    .map_or(0, |a| split_attachments(a).len()),
                notes: r.notes.clone().unwrap_or_default(),
            })
            .collect();

        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_report_remove(vault: &VaultService, id: &str, json: bool) -> Result<()> {
    let removed = vault.remove_report(id)?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed, "id": id }));
    } else if removed {
        println!("Removed report {id}");
    } else {
        eprintln!("No report with id {id}");
    }

    Ok(())
}

pub(crate) fn cmd_report_attach(
    vault: &VaultService,
    id: &str,
    file: &Path,
    json: bool,
) -> Result<()> {
    let report = vault.attach_to_report(id, file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let count = report
            .attachments
            .as_deref()
            .map_or(0, |a| split_attachments(a).len());
        println!("Attached {} ({count} file(s) total)", file.display());
    }

    Ok(())
}
