//! Host metrics sampling.
//!
//! A single background task polls CPU, memory, and process counts on a
//! fixed interval, broadcasts each snapshot through the hub, and keeps
//! the latest value in an `ArcSwap` for lock-free reads by the
//! `cpu`/`memory`/`processes` commands. A bad reading never crashes the
//! task: the last-known-good snapshot is re-broadcast instead.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, info, warn};
use webterm_protocol::{MetricsSnapshot, ServerMessage};

use crate::hub::BroadcastHub;
use crate::state::SessionRegistry;

/// Lock-free read access to the latest snapshot (cheap to Clone).
#[derive(Clone)]
pub struct MetricsReader {
    latest: Arc<ArcSwap<MetricsSnapshot>>,
}

impl MetricsReader {
    pub fn latest(&self) -> MetricsSnapshot {
        **self.latest.load()
    }
}

pub struct MetricsSampler {
    system: System,
    latest: Arc<ArcSwap<MetricsSnapshot>>,
    last_good: MetricsSnapshot,
}

impl MetricsSampler {
    pub fn new() -> (Self, MetricsReader) {
        let latest = Arc::new(ArcSwap::from_pointee(MetricsSnapshot::default()));
        let reader = MetricsReader {
            latest: latest.clone(),
        };
        (
            Self {
                system: System::new(),
                latest,
                last_good: MetricsSnapshot::default(),
            },
            reader,
        )
    }

    /// Take one reading. Falls back to the last-known-good values when
    /// the host reports nothing (e.g. a restricted /proc).
    pub fn sample(&mut self) -> MetricsSnapshot {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        let process_count = self.system.refresh_processes(ProcessesToUpdate::All, true) as u64;

        let total = self.system.total_memory();
        let memory_percent = if total == 0 {
            warn!(
                component = "metrics",
                event = "metrics.sample.degraded",
                "Host reported zero total memory, reusing last-known-good values"
            );
            self.last_good.memory_percent
        } else {
            (self.system.used_memory() as f32 / total as f32) * 100.0
        };

        let process_count = if process_count == 0 {
            self.last_good.process_count
        } else {
            process_count
        };

        let snapshot = MetricsSnapshot {
            cpu_percent: self.system.global_cpu_usage().clamp(0.0, 100.0),
            memory_percent: memory_percent.clamp(0.0, 100.0),
            process_count,
            sampled_at_ms: unix_millis(),
        };
        self.last_good = snapshot;
        self.latest.store(Arc::new(snapshot));
        snapshot
    }

    /// Tick loop: sample, broadcast, and tear down sessions whose
    /// connection dropped mid-broadcast.
    pub async fn run(
        mut self,
        hub: Arc<BroadcastHub>,
        sessions: std::sync::Weak<SessionRegistry>,
        period: Duration,
    ) {
        info!(
            component = "metrics",
            event = "metrics.sampler.started",
            period_secs = period.as_secs(),
        );
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let snapshot = self.sample();
            debug!(
                component = "metrics",
                event = "metrics.sample.taken",
                cpu_percent = snapshot.cpu_percent,
                memory_percent = snapshot.memory_percent,
                process_count = snapshot.process_count,
            );

            let dropped = hub
                .broadcast(ServerMessage::SystemInfo {
                    cpu: snapshot.cpu(),
                    memory: snapshot.memory(),
                    process_count: snapshot.process_count,
                })
                .await;

            if dropped.is_empty() {
                continue;
            }
            let Some(registry) = sessions.upgrade() else {
                return;
            };
            for conn in dropped {
                warn!(
                    component = "metrics",
                    event = "metrics.broadcast.connection_dropped",
                    connection_id = conn.conn_id,
                    tabs = conn.tabs.len(),
                );
                for tab_id in conn.tabs {
                    registry.schedule_teardown(tab_id);
                }
            }
        }
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_in_range_and_updates_reader() {
        let (mut sampler, reader) = MetricsSampler::new();
        let snapshot = sampler.sample();
        assert!((0.0..=100.0).contains(&snapshot.cpu_percent));
        assert!((0.0..=100.0).contains(&snapshot.memory_percent));
        assert_eq!(reader.latest(), snapshot);
    }

    #[test]
    fn reader_starts_zeroed_before_first_tick() {
        let (_sampler, reader) = MetricsSampler::new();
        assert_eq!(reader.latest(), MetricsSnapshot::default());
    }
}
