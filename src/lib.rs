//! Academic term engine: hour slots, weekly schedule blocks, grade computation and
//! lab preference handling, plus the JSON-lines sidecar protocol that fronts them.

pub mod config;
pub mod grades;
pub mod hours;
pub mod ipc;
pub mod labs;
pub mod schedule;
pub mod store;
