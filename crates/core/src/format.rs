//! Creative format definitions as published by creative agents.
//!
//! A [`FormatSpec`] is immutable once fetched. Whether a format is generative
//! is carried as an explicit [`FormatKind`] discriminant rather than inferred
//! from the presence of `output_format_ids` at every call site.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Keys lifted out of the wire object into typed fields. Everything else is
/// preserved verbatim in [`FormatSpec::payload`].
const TYPED_KEYS: &[&str] = &[
    "format_id",
    "agent_url",
    "name",
    "type",
    "description",
    "output_format_ids",
];

// ---------------------------------------------------------------------------
// FormatType
// ---------------------------------------------------------------------------

/// Media type of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    Display,
    Video,
    Audio,
    Native,
    Dooh,
    #[serde(other)]
    Other,
}

impl FormatType {
    /// Parse a wire `type` string. Unknown values map to [`FormatType::Other`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "display" => Self::Display,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "native" => Self::Native,
            "dooh" => Self::Dooh,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Native => "native",
            Self::Dooh => "dooh",
            Self::Other => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// FormatKind
// ---------------------------------------------------------------------------

/// Whether the final asset is supplied by the buyer or produced by a build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatKind {
    Static,
    Generative { output_format_ids: Vec<String> },
}

// ---------------------------------------------------------------------------
// FormatSpec
// ---------------------------------------------------------------------------

/// Pixel dimensions extracted from a format payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A format definition owned by a creative agent.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    pub format_id: String,
    /// URL of the agent that owns this format.
    pub agent_url: String,
    pub name: String,
    pub format_type: FormatType,
    pub description: Option<String>,
    pub kind: FormatKind,
    /// Remaining spec payload (renders, assets, requirements, ...).
    pub payload: Map<String, Value>,
}

impl FormatSpec {
    /// Parse one element of a `list_creative_formats` response.
    ///
    /// `format_id` may be a plain string or an `{agent_url, id}` object.
    /// When the object names no agent, `source_agent_url` is used.
    pub fn from_wire(value: &Value, source_agent_url: &str) -> Result<Self, CoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CoreError::Validation("format entry must be an object".to_string()))?;

        let reference = obj
            .get("format_id")
            .and_then(FormatRef::from_value)
            .ok_or_else(|| CoreError::Validation("format entry is missing format_id".to_string()))?;

        let agent_url = reference
            .agent_url
            .or_else(|| obj.get("agent_url").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| source_agent_url.to_string());

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| reference.id.clone());

        let format_type = obj
            .get("type")
            .and_then(Value::as_str)
            .map(FormatType::parse)
            .unwrap_or(FormatType::Other);

        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        let output_format_ids: Vec<String> = obj
            .get("output_format_ids")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(FormatRef::from_value)
                    .map(|r| r.id)
                    .collect()
            })
            .unwrap_or_default();

        let kind = if output_format_ids.is_empty() {
            FormatKind::Static
        } else {
            FormatKind::Generative { output_format_ids }
        };

        let payload = obj
            .iter()
            .filter(|(k, _)| !TYPED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            format_id: reference.id,
            agent_url,
            name,
            format_type,
            description,
            kind,
            payload,
        })
    }

    /// Serialize back into the flat wire shape (used by the disk cache).
    pub fn to_wire(&self) -> Value {
        let mut obj = self.payload.clone();
        obj.insert("format_id".into(), Value::String(self.format_id.clone()));
        obj.insert("agent_url".into(), Value::String(self.agent_url.clone()));
        obj.insert("name".into(), Value::String(self.name.clone()));
        obj.insert("type".into(), Value::String(self.format_type.as_str().into()));
        if let Some(desc) = &self.description {
            obj.insert("description".into(), Value::String(desc.clone()));
        }
        if let FormatKind::Generative { output_format_ids } = &self.kind {
            obj.insert(
                "output_format_ids".into(),
                Value::Array(
                    output_format_ids
                        .iter()
                        .map(|id| Value::String(id.clone()))
                        .collect(),
                ),
            );
        }
        Value::Object(obj)
    }

    pub fn is_generative(&self) -> bool {
        matches!(self.kind, FormatKind::Generative { .. })
    }

    /// Case-insensitive substring match on id, name or description.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.format_id.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Fixed pixel dimensions, looked up in `renders[0].dimensions`, then
    /// `requirements`, then a top-level `dimensions` object.
    pub fn dimensions(&self) -> Option<Dimensions> {
        let from_obj = |v: &Value| -> Option<Dimensions> {
            let width = v.get("width")?.as_u64()?;
            let height = v.get("height")?.as_u64()?;
            Some(Dimensions {
                width: u32::try_from(width).ok()?,
                height: u32::try_from(height).ok()?,
            })
        };

        self.payload
            .get("renders")
            .and_then(Value::as_array)
            .and_then(|renders| renders.first())
            .and_then(|r| r.get("dimensions"))
            .and_then(from_obj)
            .or_else(|| self.payload.get("requirements").and_then(from_obj))
            .or_else(|| self.payload.get("dimensions").and_then(from_obj))
    }

    pub fn is_responsive(&self) -> bool {
        if let Some(flag) = self.payload.get("is_responsive").and_then(Value::as_bool) {
            return flag;
        }
        self.payload
            .get("renders")
            .and_then(Value::as_array)
            .and_then(|renders| renders.first())
            .and_then(|r| r.pointer("/dimensions/responsive"))
            .and_then(Value::as_object)
            .is_some_and(|axes| axes.values().any(|v| v.as_bool() == Some(true)))
    }
}

// ---------------------------------------------------------------------------
// FormatRef
// ---------------------------------------------------------------------------

/// A namespaced format reference as it appears in creative payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatRef {
    pub agent_url: Option<String>,
    pub id: String,
}

impl FormatRef {
    /// Accepts either `"display_300x250"` or `{"agent_url": ..., "id": ...}`.
    /// Returns `None` for empty ids or any other shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) if !id.trim().is_empty() => Some(Self {
                agent_url: None,
                id: id.trim().to_string(),
            }),
            Value::Object(obj) => {
                let id = obj
                    .get("id")
                    .or_else(|| obj.get("format_id"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|id| !id.is_empty())?;
                Some(Self {
                    agent_url: obj
                        .get("agent_url")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    id: id.to_string(),
                })
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FormatFilter
// ---------------------------------------------------------------------------

/// Structured filter applied to a format list after retrieval.
///
/// Dimension bounds exclude formats that publish no fixed dimensions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatFilter {
    #[serde(rename = "type")]
    pub format_type: Option<FormatType>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub is_responsive: Option<bool>,
    #[serde(default)]
    pub format_ids: Vec<String>,
}

impl FormatFilter {
    pub fn matches(&self, format: &FormatSpec) -> bool {
        if let Some(t) = self.format_type {
            if format.format_type != t {
                return false;
            }
        }
        if !self.format_ids.is_empty() && !self.format_ids.contains(&format.format_id) {
            return false;
        }
        if let Some(responsive) = self.is_responsive {
            if format.is_responsive() != responsive {
                return false;
            }
        }

        let has_dimension_bounds = self.min_width.is_some()
            || self.max_width.is_some()
            || self.min_height.is_some()
            || self.max_height.is_some();
        if !has_dimension_bounds {
            return true;
        }

        let Some(dims) = format.dimensions() else {
            return false;
        };
        self.min_width.map_or(true, |min| dims.width >= min)
            && self.max_width.map_or(true, |max| dims.width <= max)
            && self.min_height.map_or(true, |min| dims.height >= min)
            && self.max_height.map_or(true, |max| dims.height <= max)
    }

    pub fn apply(&self, formats: Vec<FormatSpec>) -> Vec<FormatSpec> {
        formats.into_iter().filter(|f| self.matches(f)).collect()
    }
}
