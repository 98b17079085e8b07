use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions, dedup & correlation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Inbound event ids retained before a batch eviction is triggered.
    #[serde(default = "d_high_water")]
    pub dedup_high_water: usize,
    /// Size the dedup set is trimmed down to on eviction.
    #[serde(default = "d_low_water")]
    pub dedup_low_water: usize,
    /// An active session with no activity for this long is annotated as
    /// inactive and gets no reply button.
    #[serde(default = "d_stale_after")]
    pub stale_after_secs: u64,
    /// Periodically purge disconnected sessions.  Disabled when unset; the
    /// `/stats` command and the cleanup endpoint still purge on demand.
    #[serde(default)]
    pub cleanup_interval_secs: Option<u64>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dedup_high_water: d_high_water(),
            dedup_low_water: d_low_water(),
            stale_after_secs: d_stale_after(),
            cleanup_interval_secs: None,
        }
    }
}

fn d_high_water() -> usize {
    1000
}
fn d_low_water() -> usize {
    500
}
fn d_stale_after() -> u64 {
    300
}
