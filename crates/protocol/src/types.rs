//! Core types shared across the protocol

use serde::{Deserialize, Serialize};

/// How an output event should be styled by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Standard,
    Error,
}

/// CPU stats carried in a `system_info` broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub percent: f32,
}

/// Memory stats carried in a `system_info` broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub percent: f32,
}

/// One reading of the host metrics sampler.
///
/// Transient: broadcast on each tick and retained only as the latest value
/// for the `cpu`/`memory`/`processes` commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Overall CPU utilization, 0–100
    pub cpu_percent: f32,
    /// Physical memory utilization, 0–100
    pub memory_percent: f32,
    /// Number of running processes
    pub process_count: u64,
    /// Unix milliseconds at sampling time
    pub sampled_at_ms: u64,
}

impl MetricsSnapshot {
    pub fn cpu(&self) -> CpuStats {
        CpuStats {
            percent: self.cpu_percent,
        }
    }

    pub fn memory(&self) -> MemoryStats {
        MemoryStats {
            percent: self.memory_percent,
        }
    }
}

/// One command/output pair recorded for log export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub tab_id: String,
    pub command: String,
    pub output: String,
    pub kind: OutputKind,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_views_carry_percentages() {
        let snap = MetricsSnapshot {
            cpu_percent: 12.5,
            memory_percent: 43.0,
            process_count: 211,
            sampled_at_ms: 1_700_000_000_000,
        };
        assert_eq!(snap.cpu().percent, 12.5);
        assert_eq!(snap.memory().percent, 43.0);
    }

    #[test]
    fn output_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OutputKind::Standard).unwrap(),
            "\"standard\""
        );
        assert_eq!(
            serde_json::to_string(&OutputKind::Error).unwrap(),
            "\"error\""
        );
    }
}
