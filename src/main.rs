use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use termd::config::{EngineConfig, CONFIG_ENV};
use termd::hours::HourTable;
use termd::ipc;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_env("TERMD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

/// Best-effort: a broken config file must not keep the sidecar from starting.
fn startup_config() -> (EngineConfig, HourTable) {
    let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) else {
        return (EngineConfig::default(), HourTable::default());
    };
    let loaded = EngineConfig::load(&path).and_then(|cfg| {
        let hours = cfg.hour_table()?;
        Ok((cfg, hours))
    });
    match loaded {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %format_args!("{e:#}"), "ignoring {}", CONFIG_ENV);
            (EngineConfig::default(), HourTable::default())
        }
    }
}

fn main() {
    init_logging();
    let (config, hours) = startup_config();
    let mut state = ipc::AppState::new(config, hours);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
