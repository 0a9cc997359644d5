//! Creative input parsing, validation, and merge rules.
//!
//! A sync request carries loosely-typed creative objects. They are parsed
//! into [`CreativeInput`], validated, and merged onto the stored
//! [`CreativeFields`] with either patch or full-upsert semantics.

use serde::Serialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::CoreError;
use crate::format::FormatRef;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_FAILED: &str = "failed";

/// All valid creative statuses.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_APPROVED,
    STATUS_REJECTED,
    STATUS_ACTIVE,
    STATUS_FAILED,
];

/// Prefix for server-generated creative ids.
const GENERATED_ID_PREFIX: &str = "creative_";

/// Fallback brief for generative builds when the buyer gave none.
const DEFAULT_BRIEF_PREFIX: &str = "Create a creative for:";

/// Asset keys that may carry a natural-language generation brief, in lookup order.
const BRIEF_ASSET_KEYS: &[&str] = &["message", "brief", "prompt"];

/// Generate a fresh creative id for inputs that did not supply one.
pub fn generate_creative_id() -> String {
    format!("{GENERATED_ID_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Merge mode
// ---------------------------------------------------------------------------

/// How an input is applied to an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Only fields present in the input overwrite stored values.
    Patch,
    /// Every upsertable field is overwritten, absent optional fields are cleared.
    FullUpsert,
}

impl MergeMode {
    pub fn from_patch_flag(patch: bool) -> Self {
        if patch {
            Self::Patch
        } else {
            Self::FullUpsert
        }
    }
}

// ---------------------------------------------------------------------------
// CreativeInput
// ---------------------------------------------------------------------------

/// One creative from a sync request, after shape parsing.
///
/// All fields are optional at this stage; [`CreativeInput::validate_for`]
/// enforces what each merge mode requires.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct CreativeInput {
    pub creative_id: Option<String>,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub format: Option<FormatRef>,
    pub assets: Option<Value>,
    #[validate(url(message = "url must be a valid URL"))]
    pub url: Option<String>,
    #[validate(url(message = "click_url must be a valid URL"))]
    pub click_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[validate(range(min = 0.0, message = "duration must not be negative"))]
    pub duration: Option<f64>,
    pub template_variables: Option<Value>,
    /// Generative refinement context supplied by the buyer.
    pub context_id: Option<String>,
    /// Buyer approval of generated output; finalizes a generative build.
    pub approved: Option<bool>,
    pub promoted_offerings: Option<Value>,
    pub inputs: Option<Value>,
}

impl CreativeInput {
    /// Parse a raw creative object.
    ///
    /// Accepts `format_id` or `format`, each either a string or an
    /// `{agent_url, id}` object. Wrongly-typed known keys are rejected,
    /// unknown keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CoreError::Validation("creative must be a JSON object".to_string()))?;

        let format = match obj.get("format_id").or_else(|| obj.get("format")) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(FormatRef::from_value(raw).ok_or_else(|| {
                CoreError::Validation(
                    "format_id must be a non-empty string or an {agent_url, id} object".to_string(),
                )
            })?),
        };

        Ok(Self {
            creative_id: opt_string(obj, "creative_id")?.filter(|id| !id.trim().is_empty()),
            name: opt_string(obj, "name")?.map(|n| n.trim().to_string()),
            format,
            assets: opt_object(obj, "assets")?,
            url: opt_string(obj, "url")?.or(opt_string(obj, "media_url")?),
            click_url: opt_string(obj, "click_url")?,
            width: opt_u32(obj, "width")?,
            height: opt_u32(obj, "height")?,
            duration: opt_f64(obj, "duration")?,
            template_variables: opt_object(obj, "template_variables")?,
            context_id: opt_string(obj, "context_id")?,
            approved: opt_bool(obj, "approved")?,
            promoted_offerings: obj.get("promoted_offerings").filter(|v| !v.is_null()).cloned(),
            inputs: obj.get("inputs").filter(|v| !v.is_null()).cloned(),
        })
    }

    /// Validate field contents and mode-specific required fields.
    ///
    /// `has_existing` tells whether an owned record with this id already
    /// exists. Creating always needs a name and a format; patching an
    /// existing record needs neither.
    pub fn validate_for(&self, mode: MergeMode, has_existing: bool) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(format_validation_errors(&e)))?;

        let needs_identity = !(mode == MergeMode::Patch && has_existing);
        if needs_identity {
            if self.name.is_none() {
                return Err(CoreError::Validation("name is required".to_string()));
            }
            if self.format.is_none() {
                return Err(CoreError::Validation(
                    "format_id is required".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Natural-language brief for a generative build.
    ///
    /// Looks for a `message`/`brief`/`prompt` asset (either a string or an
    /// object with `content`/`text`), then `inputs[0].context_description`,
    /// and finally falls back to a brief built from the creative name.
    pub fn generation_message(&self, fallback_name: &str) -> String {
        let from_assets = self.assets.as_ref().and_then(|assets| {
            BRIEF_ASSET_KEYS.iter().find_map(|key| {
                let asset = assets.get(*key)?;
                match asset {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o
                        .get("content")
                        .or_else(|| o.get("text"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                }
            })
        });

        let from_inputs = || {
            self.inputs
                .as_ref()
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|first| first.get("context_description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        from_assets
            .or_else(from_inputs)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("{DEFAULT_BRIEF_PREFIX} {fallback_name}"))
    }
}

/// Best-effort creative id extraction from a raw object, used to label
/// results for inputs that fail to parse.
pub fn raw_creative_id(value: &Value) -> Option<String> {
    value
        .get("creative_id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

/// Flatten validator errors into one human-readable line.
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

fn opt_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, CoreError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CoreError::Validation(format!("{key} must be a string"))),
    }
}

fn opt_object(obj: &Map<String, Value>, key: &str) -> Result<Option<Value>, CoreError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v @ Value::Object(_)) => Ok(Some(v.clone())),
        Some(_) => Err(CoreError::Validation(format!("{key} must be an object"))),
    }
}

fn opt_u32(obj: &Map<String, Value>, key: &str) -> Result<Option<u32>, CoreError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| CoreError::Validation(format!("{key} must be a non-negative integer"))),
    }
}

fn opt_f64(obj: &Map<String, Value>, key: &str) -> Result<Option<f64>, CoreError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| CoreError::Validation(format!("{key} must be a number"))),
    }
}

fn opt_bool(obj: &Map<String, Value>, key: &str) -> Result<Option<bool>, CoreError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(CoreError::Validation(format!("{key} must be a boolean"))),
    }
}

// ---------------------------------------------------------------------------
// CreativeFields
// ---------------------------------------------------------------------------

pub const FIELD_NAME: &str = "name";
pub const FIELD_FORMAT: &str = "format";
pub const FIELD_URL: &str = "url";
pub const FIELD_CLICK_URL: &str = "click_url";
pub const FIELD_WIDTH: &str = "width";
pub const FIELD_HEIGHT: &str = "height";
pub const FIELD_DURATION: &str = "duration";
pub const FIELD_ASSETS: &str = "assets";
pub const FIELD_TEMPLATE_VARIABLES: &str = "template_variables";

/// Buyer-controlled, upsertable fields of a stored creative.
///
/// Derived data (preview results, generative build state) is deliberately
/// not part of this struct, so re-validating an unchanged creative does
/// not register as a change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreativeFields {
    pub name: String,
    pub agent_url: String,
    pub format_id: String,
    pub url: Option<String>,
    pub click_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub assets: Option<Value>,
    pub template_variables: Option<Value>,
}

/// The canonical format a creative resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub agent_url: String,
    pub format_id: String,
}

impl CreativeFields {
    /// Rebuild fields from stored columns and the `data` blob.
    pub fn from_stored(name: &str, agent_url: &str, format_id: &str, data: &Value) -> Self {
        let u32_of = |key: &str| {
            data.get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
        };
        Self {
            name: name.to_string(),
            agent_url: agent_url.to_string(),
            format_id: format_id.to_string(),
            url: data.get(FIELD_URL).and_then(Value::as_str).map(str::to_string),
            click_url: data
                .get(FIELD_CLICK_URL)
                .and_then(Value::as_str)
                .map(str::to_string),
            width: u32_of(FIELD_WIDTH),
            height: u32_of(FIELD_HEIGHT),
            duration: data.get(FIELD_DURATION).and_then(Value::as_f64),
            assets: data.get(FIELD_ASSETS).filter(|v| !v.is_null()).cloned(),
            template_variables: data
                .get(FIELD_TEMPLATE_VARIABLES)
                .filter(|v| !v.is_null())
                .cloned(),
        }
    }

    /// Fields for a brand-new creative.
    pub fn for_create(input: &CreativeInput, format: &ResolvedFormat) -> Self {
        Self {
            name: input.name.clone().unwrap_or_default(),
            agent_url: format.agent_url.clone(),
            format_id: format.format_id.clone(),
            url: input.url.clone(),
            click_url: input.click_url.clone(),
            width: input.width,
            height: input.height,
            duration: input.duration,
            assets: input.assets.clone(),
            template_variables: input.template_variables.clone(),
        }
    }

    /// Apply `input` onto `self`, returning the merged fields and the names
    /// of fields whose value actually changed.
    ///
    /// `format` is the resolved format when the input named one.
    pub fn merge(
        &self,
        input: &CreativeInput,
        format: Option<&ResolvedFormat>,
        mode: MergeMode,
    ) -> (Self, Vec<&'static str>) {
        let mut next = self.clone();
        let mut changes = Vec::new();

        fn apply<T: PartialEq + Clone>(
            slot: &mut T,
            incoming: Option<T>,
            cleared: T,
            mode: MergeMode,
            field: &'static str,
            changes: &mut Vec<&'static str>,
        ) {
            let value = match (incoming, mode) {
                (Some(v), _) => v,
                (None, MergeMode::FullUpsert) => cleared,
                (None, MergeMode::Patch) => return,
            };
            if *slot != value {
                *slot = value;
                changes.push(field);
            }
        }

        if let Some(name) = &input.name {
            if next.name != *name {
                next.name = name.clone();
                changes.push(FIELD_NAME);
            }
        }
        if let Some(resolved) = format {
            if next.agent_url != resolved.agent_url || next.format_id != resolved.format_id {
                next.agent_url = resolved.agent_url.clone();
                next.format_id = resolved.format_id.clone();
                changes.push(FIELD_FORMAT);
            }
        }

        apply(&mut next.url, input.url.clone().map(Some), None, mode, FIELD_URL, &mut changes);
        apply(
            &mut next.click_url,
            input.click_url.clone().map(Some),
            None,
            mode,
            FIELD_CLICK_URL,
            &mut changes,
        );
        apply(&mut next.width, input.width.map(Some), None, mode, FIELD_WIDTH, &mut changes);
        apply(&mut next.height, input.height.map(Some), None, mode, FIELD_HEIGHT, &mut changes);
        apply(
            &mut next.duration,
            input.duration.map(Some),
            None,
            mode,
            FIELD_DURATION,
            &mut changes,
        );
        apply(
            &mut next.assets,
            input.assets.clone().map(Some),
            None,
            mode,
            FIELD_ASSETS,
            &mut changes,
        );
        apply(
            &mut next.template_variables,
            input.template_variables.clone().map(Some),
            None,
            mode,
            FIELD_TEMPLATE_VARIABLES,
            &mut changes,
        );

        (next, changes)
    }

    /// Write the buyer-controlled keys into a `data` blob, removing keys for
    /// cleared optional fields and leaving derived keys untouched.
    pub fn write_into(&self, data: &mut Map<String, Value>) {
        fn set(data: &mut Map<String, Value>, key: &str, value: Option<Value>) {
            match value {
                Some(v) => {
                    data.insert(key.to_string(), v);
                }
                None => {
                    data.remove(key);
                }
            }
        }
        set(data, FIELD_URL, self.url.clone().map(Value::String));
        set(data, FIELD_CLICK_URL, self.click_url.clone().map(Value::String));
        set(data, FIELD_WIDTH, self.width.map(Value::from));
        set(data, FIELD_HEIGHT, self.height.map(Value::from));
        set(data, FIELD_DURATION, self.duration.map(Value::from));
        set(data, FIELD_ASSETS, self.assets.clone());
        set(data, FIELD_TEMPLATE_VARIABLES, self.template_variables.clone());
    }
}
