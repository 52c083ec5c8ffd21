use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use medvault_core::service::{RemoteArchiveStore, VaultService};

use crate::config::Config;

pub(crate) fn cmd_export(vault: &VaultService, dest: &Path, json: bool) -> Result<()> {
    let stats = vault.export_backup(dest)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "records": stats.records,
                "files": stats.files_written,
                "missing": stats.files_missing,
            })
        );
    } else {
        println!(
            "Exported {} record(s) and {} file(s) to {}",
            stats.records,
            stats.files_written,
            dest.display()
        );
        if stats.files_missing > 0 {
            eprintln!(
                "Warning: {} referenced file(s) were missing on disk",
                stats.files_missing
            );
        }
    }

    Ok(())
}

pub(crate) fn cmd_import(vault: &VaultService, src: &Path, json: bool) -> Result<()> {
    let stats = vault.import_backup(src)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "records": stats.records,
                "files": stats.files_restored,
                "skipped": stats.files_skipped,
            })
        );
    } else {
        println!(
            "Imported {} record(s) and {} file(s) from {}",
            stats.records,
            stats.files_restored,
            src.display()
        );
        if stats.files_skipped > 0 {
            eprintln!("Warning: {} archive entr(ies) were skipped", stats.files_skipped);
        }
    }

    Ok(())
}

pub(crate) fn cmd_backup(config: &Config, scheduled: bool, json: bool) -> Result<()> {
    if config.state.active_account.is_none() {
        // A scheduled run on a signed-out machine is a quiet success
        if scheduled {
            info!("No active account, skipping scheduled backup");
            if json {
                println!("{}", serde_json::json!({ "skipped": true }));
            }
            return Ok(());
        }
        bail!("No active account. Run `medvault account use <id>` first");
    }

    let vault = config.open_active_vault()?;
    let remote = config.remote_client()?;
    let id = vault.backup_to_remote(&remote)?;

    if json {
        println!("{}", serde_json::json!({ "uploaded": id }));
    } else {
        println!("Backup uploaded to cloud storage ({id})");
    }

    Ok(())
}

pub(crate) fn cmd_restore(config: &Config, json: bool) -> Result<()> {
    let vault = config.open_active_vault()?;
    let remote = config.remote_client()?;
    let stats = vault.restore_from_remote(&remote)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "records": stats.records,
                "files": stats.files_restored,
                "skipped": stats.files_skipped,
            })
        );
    } else {
        println!(
            "Restored {} record(s) and {} file(s) from cloud storage",
            stats.records, stats.files_restored
        );
    }

    Ok(())
}

pub(crate) fn cmd_remote_delete(config: &Config, json: bool) -> Result<()> {
    let remote = config.remote_client()?;
    remote.delete()?;

    if json {
        println!("{}", serde_json::json!({ "deleted": true }));
    } else {
        println!("Deleted cloud backup");
    }

    Ok(())
}
