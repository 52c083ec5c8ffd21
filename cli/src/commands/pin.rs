use anyhow::Result;

use medvault_core::service::VaultService;

pub(crate) fn cmd_pin_set(vault: &VaultService, pin: &str, json: bool) -> Result<()> {
    vault.set_pin(pin)?;

    if json {
        println!("{}", serde_json::json!({ "pin_set": true }));
    } else {
        println!("PIN set");
    }

    Ok(())
}

pub(crate) fn cmd_pin_check(vault: &VaultService, pin: &str, json: bool) -> Result<()> {
    let valid = vault.verify_pin(pin)?;

    if json {
        println!("{}", serde_json::json!({ "valid": valid }));
    } else if valid {
        println!("PIN is correct");
    } else {
        eprintln!("PIN is incorrect");
    }

    Ok(())
}

pub(crate) fn cmd_pin_clear(vault: &VaultService, json: bool) -> Result<()> {
    let removed = vault.clear_pin()?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else if removed {
        println!("PIN removed");
    } else {
        eprintln!("No PIN was set");
    }

    Ok(())
}
