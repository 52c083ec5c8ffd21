//! Core library for the medvault family health records app: data model,
//! SQLite storage, backup archive layer, and the account service used by
//! the CLI and other front ends.

pub mod archive;
pub mod db;
pub mod models;
pub mod service;
