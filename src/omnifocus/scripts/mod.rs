//! Script builders, one per operation.
//!
//! Each builder is pure: same arguments, byte-identical payload.

pub mod database;
pub mod folders;
pub mod projects;
pub mod tags;
pub mod tasks;
