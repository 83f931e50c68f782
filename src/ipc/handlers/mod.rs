pub mod attendance;
pub mod core;
pub mod grades;
pub mod labs;
pub mod schedule;
