//! JSON-lines request handling. Method families: `health`, `config.*`, `hours.*`,
//! `schedule.*`, `grades.*`, `labs.*`, `attendance.*`.

mod handlers;
mod helpers;
mod router;
mod types;

pub use router::handle_request;
pub use types::{AppState, Request};
