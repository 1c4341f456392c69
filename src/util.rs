/// Process-level helpers shared by `main`.
///
/// IMPORTANT:
/// - No API or reconciliation logic should live here.
///

use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env};

/// Installs the `env_logger` backend for the `log` facade.
///
/// Line format:
///     2026-10-16 09:30:00,123 - INFO - Followers: 42
///
/// Level defaults to `info`; `RUST_LOG` overrides it
/// (e.g. `RUST_LOG=follow_sync=debug` shows every request).
///
pub fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}
