use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One selectable agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    /// Numeric or string on the wire; kept as text.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub agents_count: u32,
    #[serde(default)]
    pub nodes_count: u32,
    #[serde(default)]
    pub edges_count: u32,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigsResponse {
    #[serde(default)]
    pub configs: Vec<ConfigItem>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub cached_count: u32,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(crate::value_to_text(&Value::deserialize(deserializer)?))
}
