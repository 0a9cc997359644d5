//! Agent-side validation: preview for static formats, build for
//! generative ones. Runs before the item's transaction opens.

use salesagent_agents::{BuildRequest, CreativeAgentRegistry};
use salesagent_core::creative::{CreativeFields, CreativeInput};
use salesagent_core::format::FormatSpec;
use serde_json::{json, Map, Value};

use crate::config::SyncConfig;
use crate::error::ItemError;

pub const DATA_PREVIEW: &str = "preview";
pub const DATA_PREVIEW_URL: &str = "preview_url";
pub const DATA_PREVIEW_DIMENSIONS: &str = "preview_dimensions";
pub const DATA_GENERATIVE_STATUS: &str = "generative_status";
pub const DATA_GENERATIVE_CONTEXT_ID: &str = "generative_context_id";
pub const DATA_GENERATIVE_MESSAGE: &str = "generative_message";
pub const DATA_CREATIVE_OUTPUT: &str = "creative_output";
pub const DATA_GENERATED_URL: &str = "generated_url";

/// Derived keys to merge into a creative's `data`. `Null` removes a key.
pub type DerivedData = Map<String, Value>;

/// Validate the merged creative against its owning agent.
///
/// `prior_context_id` is the stored build context, reused for refinement
/// when the input names none.
pub async fn validate_with_agent(
    registry: &CreativeAgentRegistry,
    config: &SyncConfig,
    format: &FormatSpec,
    fields: &CreativeFields,
    input: &CreativeInput,
    prior_context_id: Option<&str>,
) -> Result<DerivedData, ItemError> {
    if format.is_generative() {
        build_generative(registry, config, format, fields, input, prior_context_id).await
    } else {
        preview_static(registry, format, fields).await
    }
}

async fn build_generative(
    registry: &CreativeAgentRegistry,
    config: &SyncConfig,
    format: &FormatSpec,
    fields: &CreativeFields,
    input: &CreativeInput,
    prior_context_id: Option<&str>,
) -> Result<DerivedData, ItemError> {
    let api_key = config
        .generation_api_key
        .clone()
        .ok_or_else(|| ItemError::GenerativeConfig(format.format_id.clone()))?;

    let request = BuildRequest {
        format_id: format.format_id.clone(),
        message: input.generation_message(&fields.name),
        api_key,
        promoted_offerings: input.promoted_offerings.clone(),
        context_id: input
            .context_id
            .clone()
            .or_else(|| prior_context_id.map(str::to_string)),
        finalize: input.approved == Some(true),
    };

    let result = registry
        .build(&format.agent_url, &request)
        .await
        .map_err(ItemError::from_agent)?;

    let mut derived = DerivedData::new();
    derived.insert(DATA_GENERATIVE_STATUS.into(), json!(result.status));
    derived.insert(
        DATA_GENERATIVE_CONTEXT_ID.into(),
        json!(result.context_id.clone().or(request.context_id.clone())),
    );
    derived.insert(DATA_GENERATIVE_MESSAGE.into(), json!(request.message));
    derived.insert(
        DATA_CREATIVE_OUTPUT.into(),
        result.creative_output.clone().unwrap_or(Value::Null),
    );
    derived.insert(DATA_GENERATED_URL.into(), json!(result.output_url()));
    Ok(derived)
}

async fn preview_static(
    registry: &CreativeAgentRegistry,
    format: &FormatSpec,
    fields: &CreativeFields,
) -> Result<DerivedData, ItemError> {
    let manifest = preview_manifest(format, fields);
    let preview = registry
        .preview(&format.agent_url, &format.format_id, &manifest)
        .await
        .map_err(ItemError::from_agent)?;

    let mut derived = DerivedData::new();
    if preview.is_empty() {
        // A ready-made media url stands in for the missing preview.
        if fields.url.is_none() {
            return Err(ItemError::PreviewUnavailable);
        }
        derived.insert(DATA_PREVIEW.into(), Value::Null);
        derived.insert(DATA_PREVIEW_URL.into(), Value::Null);
        derived.insert(DATA_PREVIEW_DIMENSIONS.into(), Value::Null);
        return Ok(derived);
    }

    derived.insert(DATA_PREVIEW_URL.into(), json!(preview.preview_url()));
    let dimensions = preview.dimensions().map(|d| {
        let mut dims = json!({"width": d.width, "height": d.height});
        if let Some(duration) = preview.duration() {
            dims["duration"] = json!(duration);
        }
        dims
    });
    derived.insert(DATA_PREVIEW_DIMENSIONS.into(), dimensions.unwrap_or(Value::Null));
    derived.insert(DATA_PREVIEW.into(), preview.into_value());
    Ok(derived)
}

/// Manifest sent to `preview_creative`.
pub fn preview_manifest(format: &FormatSpec, fields: &CreativeFields) -> Value {
    let mut manifest = json!({
        "format_id": {"agent_url": format.agent_url, "id": format.format_id},
        "name": fields.name,
        "assets": fields.assets.clone().unwrap_or_else(|| json!({})),
    });
    if let Some(url) = &fields.url {
        manifest["url"] = json!(url);
    }
    manifest
}

/// Merge derived keys into `data`, removing keys whose value is `Null`.
pub fn apply_derived(data: &mut Map<String, Value>, derived: DerivedData) {
    for (key, value) in derived {
        if value.is_null() {
            data.remove(&key);
        } else {
            data.insert(key, value);
        }
    }
}
