// Snapshot Domain Model

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One sampling round's captured output, keyed by command label.
///
/// Values are opaque text consumed verbatim from the diagnostic commands;
/// envsnap never interprets them beyond the two well-known entries below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    outputs: BTreeMap<String, String>,
}

impl Snapshot {
    /// Label of the device-clock command (epoch seconds on stdout)
    pub const TIMESTAMP_KEY: &'static str = "timestamp";

    /// Label of the hostname command
    pub const HOSTNAME_KEY: &'static str = "etcHostname";

    pub fn new(outputs: BTreeMap<String, String>) -> Self {
        Self { outputs }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.outputs.get(label).map(String::as_str)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Device hostname as captured, trimmed. None if the hostname command
    /// was skipped or produced only whitespace.
    pub fn hostname(&self) -> Option<&str> {
        self.get(Self::HOSTNAME_KEY)
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    /// Device clock at sampling time, parsed from the timestamp entry.
    /// None if the command was skipped or printed something unparsable.
    pub fn sampled_epoch_secs(&self) -> Option<i64> {
        self.get(Self::TIMESTAMP_KEY)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
    }
}

/// Derives the on-disk file name of a snapshot from the optional leader
/// prefix, the device hostname, and the sampled clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotName {
    leader: String,
    hostname: String,
    sampled_at: DateTime<Local>,
}

impl SnapshotName {
    pub const EXTENSION: &'static str = "json.zst";

    pub fn new(
        leader: impl Into<String>,
        hostname: impl Into<String>,
        sampled_at: DateTime<Local>,
    ) -> Self {
        Self {
            leader: leader.into(),
            hostname: hostname.into(),
            sampled_at,
        }
    }

    pub fn sampled_at(&self) -> DateTime<Local> {
        self.sampled_at
    }

    /// `<leader><hostname>_cmds_<YYMMDD-HHMMSS>.json.zst`
    pub fn file_name(&self) -> String {
        format!(
            "{}{}_cmds_{}.{}",
            self.leader,
            self.hostname,
            self.sampled_at.format("%y%m%d-%H%M%S"),
            Self::EXTENSION
        )
    }
}
