use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use medvault_core::models::NewDoctor;
use medvault_core::service::VaultService;

pub(crate) fn cmd_doctor_add(
    vault: &VaultService,
    member: &str,
    name: &str,
    specialization: Option<String>,
    json: bool,
) -> Result<()> {
    // Fails fast when the member does not exist
    vault.get_member(member)?;

    let doctor = vault.add_doctor(&NewDoctor {
        member_id: member.to_string(),
        name: name.to_string(),
        specialization,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doctor)?);
    } else {
        println!("Added doctor {} ({})", doctor.name, doctor.id);
    }

    Ok(())
}

pub(crate) fn cmd_doctor_list(vault: &VaultService, member: &str, json: bool) -> Result<()> {
    let doctors = vault.doctors(member)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doctors)?);
    } else if doctors.is_empty() {
        eprintln!("No doctors for this member.");
    } else {
        #[derive(Tabled)]
        struct DoctorRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Specialization")]
            specialization: String,
        }

        let rows: Vec<DoctorRow> = doctors
            .iter()
            .map(|d| DoctorRow {
                id: d.id.clone(),
                name: d.name.clone(),
                specialization: d.specialization.clone().unwrap_or_default(),
            })
            .collect();

        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_doctor_remove(vault: &VaultService, id: &str, json: bool) -> Result<()> {
    let removed = vault.remove_doctor(id)?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed, "id": id }));
    } else if removed {
        println!("Removed doctor {id}");
    } else {
        eprintln!("No doctor with id {id}");
    }

    Ok(())
}
