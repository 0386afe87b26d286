pub const RUN_TX_ERR: &str = "Failed to send submission to run_tx";
pub const RES_TX_ERR: &str = "Failed to send reply to res_tx";
pub const READ_TX_ERR: &str = "Failed to send socket to read_tx";
pub const MSG_HANDLE_TX_ERR: &str = "Failed to send message to msg_handle_tx";

/// Reported when a test ran but not a single memory probe landed.
/// It is an approximation, never a measurement.
pub const FALLBACK_MEMORY_MB: f64 = 5.0;

pub const EARLY_PROBE_DELAY_MS: u64 = 5;
pub const STEADY_PROBE_DELAY_MS: u64 = 10;
pub const STEADY_PROBE_INTERVAL_MS: u64 = 20;
pub const PROBE_GRACE_MS: u64 = 50;

pub const DEFAULT_TIME_LIMIT_MS: u64 = 5000;
/// Per stream. A program printing more than this is stopped.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub const CHANNEL_CAPACITY: usize = 128;
