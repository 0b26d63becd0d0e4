pub mod escape;
pub mod report;

use serde::Serialize;

use crate::metrics::{self, RatioBand};
use crate::model::Item;

pub use escape::{escape_html, escape_opt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// Structured form of one view-item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewRecord {
    pub id: String,
    pub title: String,
    pub status: String,
    pub badge: &'static str,
    pub tags: Vec<String>,
    pub replications: u64,
    pub success: u64,
    pub fail: u64,
    pub ratio: f64,
    pub success_percent: u64,
    pub band: RatioBand,
    pub updated: Option<String>,
}

pub fn status_badge(item: &Item) -> &'static str {
    if item.is_grand() {
        "Grandmaster"
    } else {
        "Master"
    }
}

pub fn build_records(items: &[&Item]) -> Vec<ViewRecord> {
    items
        .iter()
        .map(|item| ViewRecord {
            id: item.id.clone().unwrap_or_default(),
            title: item.title.clone().unwrap_or_default(),
            status: item.status.clone().unwrap_or_default(),
            badge: status_badge(item),
            tags: item.tags.clone(),
            replications: item.metrics.replications,
            success: item.metrics.success,
            fail: item.metrics.fail,
            ratio: metrics::ratio(item),
            success_percent: metrics::success_percent(item),
            band: metrics::band(item),
            updated: item.display_timestamp().map(str::to_string),
        })
        .collect()
}

pub fn render_text(records: &[ViewRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!(
            "[{}] {} ({}) replications={} success={} fail={} success_ratio={}%\n",
            r.badge,
            if r.title.is_empty() { "—" } else { r.title.as_str() },
            r.id,
            r.replications,
            r.success,
            r.fail,
            r.success_percent
        ));
    }
    out.into_bytes()
}

pub fn render_json(records: &[ViewRecord]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}
