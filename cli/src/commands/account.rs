use anyhow::Result;

use medvault_core::service::{RemoteArchiveStore, VaultService};

use crate::config::Config;

pub(crate) fn cmd_account_use(config: &mut Config, id: &str, json: bool) -> Result<()> {
    // Validates the id and creates the account directories
    VaultService::open_account(&config.data_dir, id)?;

    config.state.active_account = Some(id.to_string());
    config.save()?;

    if json {
        println!("{}", serde_json::json!({ "active_account": id }));
    } else {
        println!("Switched to account {id}");
    }

    Ok(())
}

pub(crate) fn cmd_account_show(config: &Config, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({ "active_account": config.state.active_account })
        );
    } else if let Some(account) = &config.state.active_account {
        println!("{account}");
    } else {
        eprintln!("No active account");
    }

    Ok(())
}

pub(crate) fn cmd_account_delete(config: &mut Config, json: bool) -> Result<()> {
    let account = config.active_account()?.to_string();
    let vault = config.open_active_vault()?;

    // Remote delete is best effort; a configured remote that is
    // unreachable must not block the local wipe
    let remote = config.remote_client().ok();
    vault.delete_account(remote.as_ref().map(|r| r as &dyn RemoteArchiveStore))?;
    drop(vault);

    let account_dir = config.active_account_dir()?;
    std::fs::remove_dir_all(&account_dir)?;

    config.state.active_account = None;
    config.save()?;

    if json {
        println!("{}", serde_json::json!({ "deleted_account": account }));
    } else {
        println!("Deleted account {account}");
    }

    Ok(())
}
