// ── Keepalive monitor ──
//
// The server does not ping us, and a silent feed looks the same as a
// half-dead connection. Every tick the session asks the monitor whether
// the last inbound frame is old enough to warrant a probe. The monitor
// never reconnects or escalates; the transport reports dead connections.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveMonitor {
    /// How often the session checks for silence.
    pub tick: Duration,
    /// Silence longer than this triggers a probe on every tick.
    pub idle_timeout: Duration,
}

impl Default for KeepaliveMonitor {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl KeepaliveMonitor {
    /// A probe is due once something has been received and the newest
    /// frame is older than the idle timeout.
    pub fn probe_due(&self, last_message: Option<Instant>, now: Instant) -> bool {
        last_message.is_some_and(|last| now.saturating_duration_since(last) > self.idle_timeout)
    }

    /// Timer for the session loop. The first tick fires one period from now.
    pub fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }
}
