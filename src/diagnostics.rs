use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Usage percentages and failure counts feeding the health score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthMetrics {
    pub cpu_usage: u32,
    pub memory_usage: u32,
    pub disk_usage: u32,
    pub failed_services: u32,
}

/// Score a host from 0 to 100 using fixed thresholds.
pub fn health_score(metrics: &HealthMetrics) -> u8 {
    let mut score: i64 = 100;

    score -= match metrics.cpu_usage {
        u if u > 90 => 30,
        u if u > 70 => 15,
        _ => 0,
    };

    score -= match metrics.memory_usage {
        u if u > 90 => 30,
        u if u > 80 => 15,
        _ => 0,
    };

    score -= match metrics.disk_usage {
        u if u > 95 => 25,
        u if u > 85 => 10,
        _ => 0,
    };

    score -= i64::from(metrics.failed_services) * 10;

    score.clamp(0, 100) as u8
}

fn result_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(?m)^(\S+) \| (?:SUCCESS|CHANGED) =>\s*").expect("valid result header regex")
    })
}

/// Extract the `ansible_facts` object for `hostname` from ad-hoc `setup` output.
pub fn facts_for_host(stdout: &str, hostname: &str) -> Option<Value> {
    for caps in result_header().captures_iter(stdout) {
        if &caps[1] != hostname {
            continue;
        }
        let body = &stdout[caps.get(0)?.end()..];
        let value = serde_json::Deserializer::from_str(body)
            .into_iter::<Value>()
            .next()?
            .ok()?;
        return value.get("ansible_facts").cloned();
    }
    None
}

/// Derive usage metrics from gathered facts. Missing facts count as zero.
pub fn metrics_from_facts(facts: &Value) -> HealthMetrics {
    HealthMetrics {
        cpu_usage: 0,
        memory_usage: memory_usage(facts).unwrap_or(0),
        disk_usage: disk_usage(facts).unwrap_or(0),
        failed_services: 0,
    }
}

fn percent(used: f64, total: f64) -> Option<u32> {
    if total <= 0.0 {
        return None;
    }
    Some(((used / total) * 100.0).round().clamp(0.0, 100.0) as u32)
}

fn memory_usage(facts: &Value) -> Option<u32> {
    if let Some(memory) = facts.get("ansible_memory_mb") {
        let used = memory.pointer("/nocache/used").and_then(Value::as_f64);
        let total = memory.pointer("/real/total").and_then(Value::as_f64);
        if let (Some(used), Some(total)) = (used, total) {
            return percent(used, total);
        }
    }

    let total = facts.get("ansible_memtotal_mb")?.as_f64()?;
    let free = facts.get("ansible_memfree_mb")?.as_f64()?;
    percent(total - free, total)
}

fn disk_usage(facts: &Value) -> Option<u32> {
    facts
        .get("ansible_mounts")?
        .as_array()?
        .iter()
        .filter_map(|mount| {
            let total = mount.get("size_total")?.as_f64()?;
            let available = mount.get("size_available")?.as_f64()?;
            percent(total - available, total)
        })
        .max()
}

/// Identifier for one diagnostic run: `snapshot_YYYYmmdd_HHMMSS_<hash>`.
pub fn snapshot_id(at: DateTime<Local>) -> String {
    let digest = Sha256::digest(at.to_rfc3339().as_bytes());
    let short = &hex::encode(digest)[..8];
    format!("snapshot_{}_{}", at.format("%Y%m%d_%H%M%S"), short)
}
