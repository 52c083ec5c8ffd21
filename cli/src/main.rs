mod commands;
mod config;
mod drive;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_account_delete, cmd_account_show, cmd_account_use, cmd_backup, cmd_doctor_add,
    cmd_doctor_list, cmd_doctor_remove, cmd_export, cmd_import, cmd_member_add, cmd_member_list,
    cmd_member_remove, cmd_member_show, cmd_pin_check, cmd_pin_clear, cmd_pin_set, cmd_prescription_add,
    cmd_prescription_attach, cmd_prescription_list, cmd_prescription_remove, cmd_remote_delete,
    cmd_report_add, cmd_report_attach, cmd_report_list, cmd_report_remove, cmd_restore,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "medvault",
    version,
    about = "A local-first family medical records vault"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage family members
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Manage doctors
    Doctor {
        #[command(subcommand)]
        command: DoctorCommands,
    },
    /// Manage prescriptions
    Prescription {
        #[command(subcommand)]
        command: PrescriptionCommands,
    },
    /// Manage medical reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export all records and attachments to a backup archive
    Export {
        /// Destination path for the archive
        dest: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace all local data with the contents of a backup archive
    Import {
        /// Path to the archive
        src: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a backup archive and upload it to cloud storage
    Backup {
        /// Run quietly; succeed as a no-op when no account is active
        #[arg(long)]
        scheduled: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the cloud backup and replace all local data with it
    Restore {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the backup archive from cloud storage
    RemoteDelete {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the app PIN lock
    Pin {
        #[command(subcommand)]
        command: PinCommands,
    },
    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
enum MemberCommands {
    /// Add a family member
    Add {
        /// Member name
        name: String,
        /// Age in years
        #[arg(long)]
        age: i64,
        /// Relation (e.g. self, spouse, child)
        #[arg(long, default_value = "self")]
        relation: String,
        /// Gender
        #[arg(long, default_value = "unspecified")]
        gender: String,
        /// Path to a profile photo
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all family members
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one member
    Show {
        /// Member ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a member and all of their records
    Remove {
        /// Member ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DoctorCommands {
    /// Add a doctor for a member
    Add {
        /// Member ID the doctor belongs to
        #[arg(long)]
        member: String,
        /// Doctor name
        name: String,
        /// Specialization
        #[arg(long)]
        specialization: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a member's doctors
    List {
        /// Member ID
        #[arg(long)]
        member: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a doctor
    Remove {
        /// Doctor ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PrescriptionCommands {
    /// Add a prescription for a member
    Add {
        /// Member ID
        #[arg(long)]
        member: String,
        /// Doctor ID (the doctor's name is copied onto the record)
        #[arg(long)]
        doctor: Option<String>,
        /// Doctor name, when no doctor record exists
        #[arg(long, default_value = "")]
        doctor_name: String,
        /// Prescription date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a member's prescriptions, newest first
    List {
        /// Member ID
        #[arg(long)]
        member: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a prescription and its attachment files
    Remove {
        /// Prescription ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Attach a file to a prescription
    Attach {
        /// Prescription ID
        id: String,
        /// File to attach
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Add a medical report for a member
    Add {
        /// Member ID
        #[arg(long)]
        member: String,
        /// Report name (e.g. "Blood panel")
        name: String,
        /// Doctor ID
        #[arg(long)]
        doctor: Option<String>,
        /// Report date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a member's reports, newest first
    List {
        /// Member ID
        #[arg(long)]
        member: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a report and its attachment files
    Remove {
        /// Report ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Attach a file to a report
    Attach {
        /// Report ID
        id: String,
        /// File to attach
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PinCommands {
    /// Set (or replace) the PIN
    Set {
        /// 4-8 digit PIN
        pin: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a PIN against the stored one
    Check {
        /// PIN to verify
        pin: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the PIN
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Switch to (creating if needed) an account
    Use {
        /// Account ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active account
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the active account's local data and its cloud backup
    Delete {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;

    match cli.command {
        Commands::Member { command } => {
            let vault = config.open_active_vault()?;
            match command {
                MemberCommands::Add {
                    name,
                    age,
                    relation,
                    gender,
                    photo,
                    json,
                } => cmd_member_add(&vault, &name, age, &relation, &gender, photo, json),
                MemberCommands::List { json } => cmd_member_list(&vault, json),
                MemberCommands::Show { id, json } => cmd_member_show(&vault, &id, json),
                MemberCommands::Remove { id, json } => cmd_member_remove(&vault, &id, json),
            }
        }
        Commands::Doctor { command } => {
            let vault = config.open_active_vault()?;
            match command {
                DoctorCommands::Add {
                    member,
                    name,
                    specialization,
                    json,
                } => cmd_doctor_add(&vault, &member, &name, specialization, json),
                DoctorCommands::List { member, json } => cmd_doctor_list(&vault, &member, json),
                DoctorCommands::Remove { id, json } => cmd_doctor_remove(&vault, &id, json),
            }
        }
        Commands::Prescription { command } => {
            let vault = config.open_active_vault()?;
            match command {
                PrescriptionCommands::Add {
                    member,
                    doctor,
                    doctor_name,
                    date,
                    notes,
                    json,
                } => cmd_prescription_add(&vault, &member, doctor, &doctor_name, date, notes, json),
                PrescriptionCommands::List { member, json } => {
                    cmd_prescription_list(&vault, &member, json)
                }
                PrescriptionCommands::Remove { id, json } => {
                    cmd_prescription_remove(&vault, &id, json)
                }
                PrescriptionCommands::Attach { id, file, json } => {
                    cmd_prescription_attach(&vault, &id, &file, json)
                }
            }
        }
        Commands::Report { command } => {
            let vault = config.open_active_vault()?;
            match command {
                ReportCommands::Add {
                    member,
                    name,
                    doctor,
                    date,
                    notes,
                    json,
                } => cmd_report_add(&vault, &member, &name, doctor, date, notes, json),
                ReportCommands::List { member, json } => cmd_report_list(&vault, &member, json),
                ReportCommands::Remove { id, json } => cmd_report_remove(&vault, &id, json),
                ReportCommands::Attach { id, file, json } => {
                    cmd_report_attach(&vault, &id, &file, json)
                }
            }
        }
        Commands::Export { dest, json } => {
            let vault = config.open_active_vault()?;
            cmd_export(&vault, &dest, json)
        }
        Commands::Import { src, json } => {
            let vault = config.open_active_vault()?;
            cmd_import(&vault, &src, json)
        }
        Commands::Backup { scheduled, json } => cmd_backup(&config, scheduled, json),
        Commands::Restore { json } => cmd_restore(&config, json),
        Commands::RemoteDelete { json } => cmd_remote_delete(&config, json),
        Commands::Pin { command } => {
            let vault = config.open_active_vault()?;
            match command {
                PinCommands::Set { pin, json } => cmd_pin_set(&vault, &pin, json),
                PinCommands::Check { pin, json } => cmd_pin_check(&vault, &pin, json),
                PinCommands::Clear { json } => cmd_pin_clear(&vault, json),
            }
        }
        Commands::Account { command } => match command {
            AccountCommands::Use { id, json } => cmd_account_use(&mut config, &id, json),
            AccountCommands::Show { json } => cmd_account_show(&config, json),
            AccountCommands::Delete { json } => cmd_account_delete(&mut config, json),
        },
    }
}
