//! Input policy record.
//!
//! The structural shape an external validator is assumed to enforce.
//! Deserialization failures and field-level problems (unknown type tags,
//! malformed parameter lists) surface as `Input` diagnostics; this module
//! only defines the records.

use serde::Deserialize;

/// A whole policy as submitted by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRecord {
    #[serde(rename = "Policy")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "PolicyType", default)]
    pub policy_type: String,
    #[serde(rename = "CallingFunctions", default)]
    pub calling_functions: Vec<CallingFunctionRecord>,
    #[serde(rename = "ForeignCalls", default)]
    pub foreign_calls: Vec<ForeignCallRecord>,
    #[serde(rename = "Trackers", default)]
    pub trackers: Vec<TrackerRecord>,
    #[serde(rename = "MappedTrackers", default)]
    pub mapped_trackers: Vec<MappedTrackerRecord>,
    #[serde(rename = "Rules", default)]
    pub rules: Vec<RuleRecord>,
}

/// A user-code function whose invocation triggers rule checks.
///
/// `encoded_values` is a comma-separated, ordered list of `type name`
/// pairs; the position of each pair is the parameter's placeholder slot.
#[derive(Debug, Clone, Deserialize)]
pub struct CallingFunctionRecord {
    pub name: String,
    #[serde(rename = "functionSignature", default)]
    pub function_signature: String,
    #[serde(rename = "encodedValues")]
    pub encoded_values: String,
}

/// An external read participating in rule evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct ForeignCallRecord {
    pub name: String,
    pub address: String,
    pub function: String,
    #[serde(rename = "returnType")]
    pub return_type: String,
    #[serde(rename = "valuesToPass", default)]
    pub values_to_pass: String,
    #[serde(rename = "mappedTrackerKeyValues", default)]
    pub mapped_tracker_key_values: String,
    #[serde(rename = "callingFunction")]
    pub calling_function: String,
}

/// Scalar persistent state owned by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(rename = "initialValue")]
    pub initial_value: String,
}

/// Keyed persistent state owned by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct MappedTrackerRecord {
    pub name: String,
    #[serde(rename = "keyType")]
    pub key_type: String,
    #[serde(rename = "valueType")]
    pub value_type: String,
    #[serde(rename = "initialKeys", default)]
    pub initial_keys: Vec<String>,
    #[serde(rename = "initialValues", default)]
    pub initial_values: Vec<String>,
}

/// One rule: a condition plus its positive and negative effects.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    pub condition: String,
    #[serde(rename = "positiveEffects", default)]
    pub positive_effects: Vec<String>,
    #[serde(rename = "negativeEffects", default)]
    pub negative_effects: Vec<String>,
    #[serde(rename = "callingFunction")]
    pub calling_function: String,
}
