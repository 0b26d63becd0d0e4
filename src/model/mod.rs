use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const FINGERPRINT_PLACEHOLDER: &str = "—";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metrics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub replications: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub success: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub fail: u64,
}

// one catalog record; every field degrades to a default instead of failing
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_metrics")]
    pub metrics: Metrics,
    #[serde(default, deserialize_with = "lenient_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub heartbeat: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub actions: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub proof: Option<String>,
}

impl Item {
    pub fn status_lower(&self) -> String {
        self.status.as_deref().unwrap_or_default().to_lowercase()
    }

    pub fn is_grand(&self) -> bool {
        self.status_lower() == "grand"
    }

    /// Timestamp shown on the card: `updatedAt`, then `createdAt`.
    pub fn display_timestamp(&self) -> Option<&str> {
        non_empty(self.updated_at.as_deref()).or_else(|| non_empty(self.created_at.as_deref()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub bank_fingerprint: String,
    pub items: Vec<Item>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            bank_fingerprint: FINGERPRINT_PLACEHOLDER.to_string(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("payload is not valid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("payload is null")]
    NullDocument,
}

impl Dataset {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, DatasetError> {
        let doc: Value =
            serde_json::from_slice(bytes).map_err(|e| DatasetError::InvalidJson { source: e })?;
        Self::from_value(doc)
    }

    pub fn from_value(doc: Value) -> Result<Self, DatasetError> {
        let mut obj = match doc {
            Value::Null => return Err(DatasetError::NullDocument),
            Value::Object(obj) => obj,
            other => {
                tracing::debug!(kind = json_kind(&other), "document is not an object, using defaults");
                return Ok(Self::default());
            }
        };

        let bank_fingerprint = obj
            .remove("bankFingerprint")
            .and_then(value_to_text)
            .filter(|fp| !fp.is_empty())
            .unwrap_or_else(|| FINGERPRINT_PLACEHOLDER.to_string());

        let items = match obj.remove("items") {
            Some(Value::Array(raw)) => raw.into_iter().map(item_from_value).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                tracing::debug!(kind = json_kind(&other), "items is not an array, ignoring");
                Vec::new()
            }
        };

        Ok(Self {
            bank_fingerprint,
            items,
        })
    }
}

fn item_from_value(value: Value) -> Item {
    match serde_json::from_value::<Item>(value) {
        Ok(item) => item,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable record replaced with defaults");
            Item::default()
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_count(value: &Value) -> u64 {
    if let Some(n) = value.as_u64() {
        return n;
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => f as u64,
        _ => 0,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_text))
}

fn lenient_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(raw)) => raw.into_iter().filter_map(value_to_text).collect(),
        _ => Vec::new(),
    };
    Ok(tags)
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .map(|v| value_to_count(&v))
        .unwrap_or(0))
}

fn lenient_metrics<'de, D>(deserializer: D) -> Result<Metrics, D::Error>
where
    D: Deserializer<'de>,
{
    let metrics = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(obj)) => {
            let count = |key: &str| obj.get(key).map(value_to_count).unwrap_or(0);
            Metrics {
                replications: count("replications"),
                success: count("success"),
                fail: count("fail"),
            }
        }
        _ => Metrics::default(),
    };
    Ok(metrics)
}
