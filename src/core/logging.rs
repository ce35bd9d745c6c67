use tracing::Level;

/// Install a global fmt subscriber for the client's tracing output
///
/// `debug` lowers the level from `INFO` to `DEBUG`, which adds session state
/// transitions and per-request events. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init(debug: bool) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level_for(debug))
        .with_target(true)
        .try_init()
        .is_ok()
}

pub const fn level_for(debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}
