// Sampler constants (no magic values in the loop)
use std::time::Duration;

/// Default seconds between subsequent sampling rounds
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of rounds to execute (0 = run forever)
pub const DEFAULT_NUM_RUNS: u32 = 1;

/// Default per-command wall-clock timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(180);
