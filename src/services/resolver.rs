use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::sources::{DataKind, MarketSource, RecordSet, SourceError};

/// Outcome of walking an adapter chain for one record kind.
#[derive(Debug)]
pub enum Resolution {
    /// First adapter that produced a usable record set.
    Resolved {
        source: &'static str,
        records: RecordSet,
    },
    /// Every adapter failed; the caller falls back to the synthetic generator.
    Exhausted {
        failures: Vec<(&'static str, SourceError)>,
    },
}

impl Resolution {
    pub fn source(&self) -> Option<&'static str> {
        match self {
            Resolution::Resolved { source, .. } => Some(source),
            Resolution::Exhausted { .. } => None,
        }
    }
}

/// Per-source counters, process lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceHealth {
    pub source: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_latency_ms: Option<u64>,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SourceHealthBook {
    entries: DashMap<&'static str, SourceHealth>,
}

impl SourceHealthBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, source: &'static str, latency: Duration, outcome: Result<(), &SourceError>) {
        let mut entry = self.entries.entry(source).or_insert_with(|| SourceHealth {
            source: source.to_string(),
            ..SourceHealth::default()
        });
        entry.attempts += 1;
        entry.last_latency_ms = Some(latency.as_millis() as u64);
        match outcome {
            Ok(()) => {
                entry.successes += 1;
                entry.last_success_at = Some(Utc::now());
            }
            Err(e) => {
                entry.failures += 1;
                entry.last_error = Some(e.to_string());
            }
        }
    }

    pub fn snapshot(&self) -> Vec<SourceHealth> {
        let mut all: Vec<SourceHealth> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.source.cmp(&b.source));
        all
    }
}

/// Tries adapters in order, one at a time, and stops at the first usable answer.
///
/// Adapter errors never leave this type. They are recorded and folded into
/// `Resolution::Exhausted`.
pub struct FallbackResolver {
    timeout: Duration,
    health: Arc<SourceHealthBook>,
}

impl FallbackResolver {
    pub fn new(timeout: Duration, health: Arc<SourceHealthBook>) -> Self {
        Self { timeout, health }
    }

    pub async fn resolve(&self, kind: DataKind, adapters: &[Arc<dyn MarketSource>]) -> Resolution {
        let mut failures = Vec::new();

        for adapter in adapters {
            let source = adapter.name();
            if !adapter.serves(kind) {
                tracing::debug!("{} does not serve {}, skipping", source, kind);
                continue;
            }

            let started = Instant::now();
            let outcome = match tokio::time::timeout(self.timeout, adapter.fetch(kind)).await {
                Ok(Ok(records)) if records.kind() != kind => Err(SourceError::Malformed(format!(
                    "asked for {}, got {}",
                    kind,
                    records.kind()
                ))),
                Ok(Ok(records)) if records.is_empty() => Err(SourceError::Empty(kind)),
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout(self.timeout)),
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(records) => {
                    self.health.record(source, elapsed, Ok(()));
                    tracing::debug!(
                        "{} served {} {} in {}ms",
                        source,
                        records.len(),
                        kind,
                        elapsed.as_millis()
                    );
                    return Resolution::Resolved { source, records };
                }
                Err(e) => {
                    self.health.record(source, elapsed, Err(&e));
                    tracing::warn!(
                        source,
                        %kind,
                        class = ?e.class(),
                        "source failed: {}",
                        e
                    );
                    failures.push((source, e));
                }
            }
        }

        Resolution::Exhausted { failures }
    }
}
