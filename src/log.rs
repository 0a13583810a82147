//! Status lines printed by every participant.
//!
//! Messages may carry `color_print` markup (built with `cformat!`).

use color_print::{ceprintln, cprintln};
use std::{
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn debug_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("RING_LOG")
            .map(|level| level.eq_ignore_ascii_case("debug"))
            .unwrap_or(false)
    })
}

pub fn info(message: &str) {
    cprintln!("<dim>{}</> <green, bold>INFO</> {}", timestamp(), message);
}

pub fn warn(message: &str) {
    cprintln!("<dim>{}</> <yellow, bold>WARN</> {}", timestamp(), message);
}

pub fn error(message: &str) {
    ceprintln!("<dim>{}</> <red, bold>ERROR</> {}", timestamp(), message);
}

/// Only printed when `RING_LOG=debug`.
pub fn debug(message: &str) {
    if debug_enabled() {
        cprintln!("<dim>{}</> <blue, bold>DEBUG</> {}", timestamp(), message);
    }
}
