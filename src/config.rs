// LotKeeper - Configuration
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::retry::PollBudget;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct KeeperConfig {
    /// RPC endpoint of the ledger node
    pub rpc_url: String,
    /// Address of the deployed lottery program
    pub program_id: String,
    /// Randomness oracle queue passed to request_draw
    pub oracle_queue: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HttpConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Shared secret required by POST /lottery/draw
    #[serde(default)]
    pub draw_secret: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8700".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            draw_secret: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScheduleConfig {
    /// Wall-clock hour of the daily draw, in the configured offset
    #[serde(default)]
    pub draw_hour: u8,
    #[serde(default = "default_draw_minute")]
    pub draw_minute: u8,
    /// Offset from UTC, in seconds, defining "local" wall-clock time
    #[serde(default)]
    pub utc_offset_secs: i64,
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
    #[serde(default = "default_startup_delay")]
    pub startup_check_delay_secs: u64,
}

fn default_draw_minute() -> u8 {
    5
}

fn default_health_interval() -> u64 {
    300
}

fn default_startup_delay() -> u64 {
    15
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            draw_hour: 0,
            draw_minute: default_draw_minute(),
            utc_offset_secs: 0,
            health_interval_secs: default_health_interval(),
            startup_check_delay_secs: default_startup_delay(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PollConfig {
    #[serde(default = "default_poll_attempts")]
    pub attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

fn default_poll_attempts() -> u32 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: default_poll_attempts(),
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl KeeperConfig {
    pub fn program_pubkey(&self) -> Result<Pubkey, String> {
        Pubkey::from_str(&self.program_id).map_err(|_| "invalid program_id".to_string())
    }

    pub fn oracle_queue_pubkey(&self) -> Result<Pubkey, String> {
        Pubkey::from_str(&self.oracle_queue).map_err(|_| "invalid oracle_queue".to_string())
    }

    pub fn poll_budget(&self) -> PollBudget {
        PollBudget::new(self.poll.attempts, Duration::from_millis(self.poll.interval_ms))
    }
}

/// Seconds from `now` (unix) until the next daily fire at hour:minute in the
/// configured offset from UTC. Always strictly positive, so a run at the
/// fire instant schedules the following day.
pub fn seconds_until_daily_fire(now: u64, hour: u8, minute: u8, utc_offset_secs: i64) -> u64 {
    const DAY_SECS: i64 = 86_400;
    let local = now as i64 + utc_offset_secs;
    let today_start = local.div_euclid(DAY_SECS) * DAY_SECS;
    let target = today_start + hour as i64 * 3600 + minute as i64 * 60;
    let next = if target > local { target } else { target + DAY_SECS };
    (next - local) as u64
}
