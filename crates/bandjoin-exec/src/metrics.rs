//! Per-invocation timing and memory observations.
//!
//! Nothing here is process-wide: every join invocation owns its clocks and
//! returns a [`JoinMetrics`] value when it finishes. Memory figures are
//! structural estimates of the join's in-memory state (hash tables, key
//! sets, row buffers), not allocator measurements.

use std::mem;
use std::time::{Duration, Instant};

use bandjoin_types::{Row, Value};
use serde::Serialize;
use tracing::info;

use crate::Strategy;
use crate::reader::KeySet;

/// Approximate in-memory footprint of a join data structure.
pub trait EstimateSize {
    fn estimated_bytes(&self) -> usize;
}

impl EstimateSize for Vec<Row> {
    fn estimated_bytes(&self) -> usize {
        let spare = (self.capacity() - self.len()) * mem::size_of::<Row>();
        mem::size_of::<Self>() + spare + self.iter().map(Row::estimated_bytes).sum::<usize>()
    }
}

impl EstimateSize for KeySet {
    fn estimated_bytes(&self) -> usize {
        let slots = self.capacity() * (mem::size_of::<Value>() + 1);
        let heap: usize = self
            .iter()
            .map(|v| v.estimated_bytes() - mem::size_of::<Value>())
            .sum();
        mem::size_of::<Self>() + slots + heap
    }
}

/// One labelled memory figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryEstimate {
    pub label: String,
    pub bytes: u64,
}

impl MemoryEstimate {
    pub fn of(label: impl Into<String>, structure: &impl EstimateSize) -> Self {
        Self {
            label: label.into(),
            bytes: structure.estimated_bytes() as u64,
        }
    }

    #[must_use]
    pub fn mebibytes(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Observations reported by one join invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinMetrics {
    pub strategy: Strategy,
    /// Human-readable variant, e.g. "Semi-join (Small join Large)".
    pub variant: String,
    /// Single-pass only: time to materialize the build side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_time_seconds: Option<f64>,
    /// Hash joins: probe time (fused build+probe for the symmetric join).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_time_seconds: Option<f64>,
    /// Semi-join only: nested-loop phase time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_phase_time_seconds: Option<f64>,
    pub row_count: u64,
    /// `None` when the join produced no rows.
    pub latency_to_first_result_seconds: Option<f64>,
    pub memory: Vec<MemoryEstimate>,
}

impl JoinMetrics {
    #[must_use]
    pub fn total_time_seconds(&self) -> f64 {
        self.build_time_seconds.unwrap_or(0.0)
            + self.probe_time_seconds.unwrap_or(0.0)
            + self.join_phase_time_seconds.unwrap_or(0.0)
    }

    #[must_use]
    pub fn total_memory_bytes(&self) -> u64 {
        self.memory.iter().map(|m| m.bytes).sum()
    }

    #[must_use]
    pub fn memory_for(&self, label: &str) -> Option<&MemoryEstimate> {
        self.memory.iter().find(|m| m.label == label)
    }

    /// Emit the run summary through `tracing`.
    pub fn log(&self) {
        info!(
            strategy = self.strategy.as_str(),
            variant = %self.variant,
            rows = self.row_count,
            build_s = self.build_time_seconds,
            probe_s = self.probe_time_seconds,
            join_phase_s = self.join_phase_time_seconds,
            total_s = self.total_time_seconds(),
            "join finished"
        );
        match self.latency_to_first_result_seconds {
            Some(latency) => info!(latency_s = latency, "time until first result"),
            None => info!("no results were produced"),
        }
        for estimate in &self.memory {
            info!(
                structure = %estimate.label,
                bytes = estimate.bytes,
                mib = estimate.mebibytes(),
                "memory estimate"
            );
        }
        info!(
            total_mib = self.total_memory_bytes() as f64 / (1024.0 * 1024.0),
            "total memory estimate"
        );
    }
}

/// Remembers when the first result was emitted, relative to an origin.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FirstResultClock {
    origin: Instant,
    first: Option<Duration>,
}

impl FirstResultClock {
    pub(crate) fn starting_at(origin: Instant) -> Self {
        Self {
            origin,
            first: None,
        }
    }

    pub(crate) fn observe(&mut self) {
        if self.first.is_none() {
            self.first = Some(self.origin.elapsed());
        }
    }

    pub(crate) fn latency_seconds(&self) -> Option<f64> {
        self.first.map(|d| d.as_secs_f64())
    }
}
