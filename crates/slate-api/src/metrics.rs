//! Prometheus counters for lifecycle events, served on `/metrics`.
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use slate_core::{LifecycleEvent, LifecycleListener, RunContext};

/// `slate_stage_events_total{event, stage}`, shared by every run of a store
#[derive(Clone)]
pub struct StageMetrics {
    registry: Registry,
    events: IntCounterVec,
}

impl StageMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let events = IntCounterVec::new(
            Opts::new("slate_stage_events_total", "Lifecycle events by event and stage"),
            &["event", "stage"],
        )?;
        registry.register(Box::new(events.clone()))?;
        Ok(Self { registry, events })
    }

    pub fn count(&self, event: &str, stage: &str) -> u64 {
        self.events.with_label_values(&[event, stage]).get()
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        encode(&self.registry)
    }
}

impl LifecycleListener for StageMetrics {
    fn on_event(&self, _context: &RunContext, event: &LifecycleEvent) {
        self.events
            .with_label_values(&[event.name(), event.stage().as_str()])
            .inc();
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
