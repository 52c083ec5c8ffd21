use std::path::PathBuf;

use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use medvault_core::models::NewMember;
use medvault_core::service::VaultService;

pub(crate) fn cmd_member_add(
    vault: &VaultService,
    name: &str,
    age: i64,
    relation: &str,
    gender: &str,
    photo: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let member = vault.add_member(&NewMember {
        name: name.to_string(),
        age,
        relation: relation.to_string(),
        gender: gender.to_string(),
        photo_path: photo.map(|p| p.to_string_lossy().into_owned()),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&member)?);
    } else {
        println!("Added member {} ({})", member.name, member.id);
    }

    Ok(())
}

pub(crate) fn cmd_member_list(vault: &VaultService, json: bool) -> Result<()> {
    let members = vault.members()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&members)?);
    } else if members.is_empty() {
        eprintln!("No members yet. Use `medvault member add` to create one.");
    } else {
        #[derive(Tabled)]
        struct MemberRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Age")]
            age: i64,
            #[tabled(rename = "Relation")]
            relation: String,
            #[tabled(rename = "Gender")]
            gender: String,
        }

        let rows: Vec<MemberRow> = members
            .iter()
            .map(|m| MemberRow {
                id: m.id.clone(),
                name: m.name.clone(),
                age: m.age,
                relation: m.relation.clone(),
                gender: m.gender.clone(),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_member_show(vault: &VaultService, id: &str, json: bool) -> Result<()> {
    let member = vault.get_member(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&member)?);
    } else {
        println!("{} ({})", member.name, member.id);
        println!("  Age: {}", member.age);
        println!("  Relation: {}", member.relation);
        println!("  Gender: {}", member.gender);
        if let Some(photo) = &member.photo_path {
            println!("  Photo: {photo}");
        }
    }

    Ok(())
}

pub(crate) fn cmd_member_remove(vault: &VaultService, id: &str, json: bool) -> Result<()> {
    let removed = vault.remove_member(id)?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed, "id": id }));
    } else if removed {
        println!("Removed member {id} and all of their records");
    } else {
        eprintln!("No member with id {id}");
    }

    Ok(())
}
