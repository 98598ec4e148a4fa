//! Process-local counters for emit and reduce statistics.
//!
//! The engine exposes a small metrics surface keyed by
//! `(group_type, counter name)`: how many pairs were emitted, how many items
//! and groups were produced, and so on. Counter names are scoped as
//! `agg_type_{id}.{name}` so several unrelated countings sharing one stream
//! stay distinguishable in the output.
//!
//! The collector is thread-safe and cheaply cloneable; the emitter and all
//! reducer workers share one instance. Snapshots can be printed, converted to
//! JSON, or saved to a file after a run.

use crate::error::TallyError;
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Well-known counter names, scoped per group type.
pub mod counters {
    /// Number of emitted `(key, value)` pairs.
    pub const INPUT_PAIRS: &str = "input_pairs";
    /// Sum of the `times` argument across all emits.
    pub const INPUT_PAIRS_TOTAL_COUNT: &str = "input_pairs_total_count";
    /// Number of groups that produced a group-level row.
    pub const OUT_NUM_GROUPS: &str = "out_num_groups";
    /// Number of distinct `(group, item)` rows emitted.
    pub const OUT_NUM_ITEMS: &str = "out_num_items";
    /// Sum of emitted per-item counts.
    pub const OUT_TOTAL_ITEMS: &str = "out_total_items";
    /// Sum of emitted distinct counts across groups.
    pub const OUT_TOTAL_DISTINCTS: &str = "out_total_distincts";
}

/// Scope a counter name to one group type.
pub fn scoped(group_type: i32, name: &str) -> String {
    format!("agg_type_{group_type}.{name}")
}

/// Trait for custom metrics registered alongside the built-in counters.
pub trait Metric: Send + Sync + Any {
    /// The name of this metric.
    fn name(&self) -> &str;

    /// The current value of this metric as a JSON value.
    fn value(&self) -> Value;

    /// Optional description of what this metric measures.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// A fixed-value counter metric, useful for registering externally computed
/// statistics next to the engine's own counters.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self { name: name.into(), count }
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.count)
    }
}

struct Inner {
    counters: HashMap<String, u64>,
    custom: HashMap<String, Box<dyn Metric>>,
}

/// Thread-safe container for run statistics.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MetricsCollector")
            .field("counters", &inner.counters)
            .field("custom", &inner.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                counters: HashMap::new(),
                custom: HashMap::new(),
            })),
        }
    }

    /// Register a custom metric, replacing any metric with the same name.
    pub fn register(&self, metric: Box<dyn Metric>) {
        let mut inner = self.inner.lock().unwrap();
        inner.custom.insert(metric.name().to_string(), metric);
    }

    /// Increment a counter by name, creating it at zero if absent.
    pub fn increment_counter(&self, name: &str, by: u64) {
        let mut inner = self.inner.lock().unwrap();
        *inner.counters.entry(name.to_string()).or_insert(0) += by;
    }

    /// Increment a group-type-scoped counter.
    pub fn increment_scoped(&self, group_type: i32, name: &str, by: u64) {
        self.increment_counter(&scoped(group_type, name), by);
    }

    /// Read one counter; 0 when it was never incremented.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.counters.get(name).copied().unwrap_or(0)
    }

    /// Read one group-type-scoped counter.
    #[must_use]
    pub fn scoped_counter(&self, group_type: i32, name: &str) -> u64 {
        self.counter(&scoped(group_type, name))
    }

    /// Snapshot of every metric name and value.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        let mut out: HashMap<String, Value> = inner
            .counters
            .iter()
            .map(|(name, v)| (name.clone(), json!(v)))
            .collect();
        for (name, metric) in &inner.custom {
            out.insert(name.clone(), metric.value());
        }
        out
    }

    /// All metrics as one JSON object, descriptions included where present.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let mut map = serde_json::Map::new();
        for (name, v) in &inner.counters {
            map.insert(name.clone(), json!({ "value": v }));
        }
        for (name, metric) in &inner.custom {
            let mut obj = serde_json::Map::new();
            obj.insert("value".to_string(), metric.value());
            if let Some(desc) = metric.description() {
                obj.insert("description".to_string(), json!(desc));
            }
            map.insert(name.clone(), Value::Object(obj));
        }
        Value::Object(map)
    }

    /// Print all metrics to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n========== Count Run Metrics ==========");
        let mut entries: Vec<_> = self.snapshot().into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (name, value) in entries {
            println!("{name}: {value}");
        }
        println!("=======================================\n");
    }

    /// Save all metrics to a pretty-printed JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<(), TallyError> {
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path)?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
