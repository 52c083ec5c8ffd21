mod account;
mod backup;
mod doctor;
mod helpers;
mod member;
mod pin;
mod prescription;
mod report;

pub(crate) use account::{cmd_account_delete, cmd_account_show, cmd_account_use};
pub(crate) use backup::{cmd_backup, cmd_export, cmd_import, cmd_remote_delete, cmd_restore};
pub(crate) use doctor::{cmd_doctor_add, cmd_doctor_list, cmd_doctor_remove};
pub(crate) use member::{cmd_member_add, cmd_member_list, cmd_member_remove, cmd_member_show};
pub(crate) use pin::{cmd_pin_check, cmd_pin_clear, cmd_pin_set};
pub(crate) use prescription::{
    cmd_prescription_add, cmd_prescription_attach, cmd_prescription_list, cmd_prescription_remove,
};
pub(crate) use report::{
    cmd_report_add, cmd_report_attach, cmd_report_list, cmd_report_remove,
};
