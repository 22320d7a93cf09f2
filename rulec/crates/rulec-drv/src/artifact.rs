//! The compiled artifact.
//!
//! Immutable once emitted. Words serialize as decimal strings so 256-bit
//! values survive JSON consumers that only understand doubles.

use serde::{Serialize, Serializer};

use rulec_ir::{Effect, InstructionStream};
use rulec_sem::PlaceholderDescriptor;
use rulec_types::{PrimitiveType, U256};

/// Where a foreign-call argument is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgSource {
    Parameter = 0,
    ForeignCall = 1,
    Tracker = 2,
    MappedTracker = 3,
}

impl Serialize for ArgSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// One resolved foreign-call argument: its source namespace and the
/// referent's 0-based declaration position within that namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncodedIndex {
    #[serde(rename = "eType")]
    pub e_type: ArgSource,
    pub index: u32,
}

/// A parameter slot of a calling function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrimitiveType,
}

/// A calling function carried into the artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompiledCallingFunction {
    pub name: String,
    pub signature: String,
    pub params: Vec<ParamRecord>,
}

/// A scalar tracker with its encoded initial value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompiledTracker {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PrimitiveType,
    #[serde(rename = "initialValue", serialize_with = "word_as_string")]
    pub initial_value: U256,
}

/// A mapped tracker with its packed-encoded initial entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompiledMappedTracker {
    pub id: u32,
    pub name: String,
    #[serde(rename = "keyType")]
    pub key_ty: PrimitiveType,
    #[serde(rename = "valueType")]
    pub value_ty: PrimitiveType,
    #[serde(rename = "initialKeys", serialize_with = "words_as_strings")]
    pub initial_keys: Vec<U256>,
    #[serde(rename = "initialValues", serialize_with = "words_as_strings")]
    pub initial_values: Vec<U256>,
}

/// A foreign call with resolved argument indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompiledForeignCall {
    pub id: u32,
    pub name: String,
    /// Checksummed target address
    pub address: String,
    pub function: String,
    #[serde(rename = "returnType")]
    pub return_ty: PrimitiveType,
    #[serde(rename = "encodedIndices")]
    pub encoded_indices: Vec<EncodedIndex>,
    #[serde(rename = "mappedTrackerKeyIndices")]
    pub mapped_tracker_key_indices: Vec<EncodedIndex>,
    #[serde(rename = "callingFunction")]
    pub calling_function: String,
}

/// One compiled rule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledRule {
    pub name: String,
    pub description: String,
    pub condition: InstructionStream,
    #[serde(rename = "positiveEffects")]
    pub positive_effects: Vec<Effect>,
    #[serde(rename = "negativeEffects")]
    pub negative_effects: Vec<Effect>,
    #[serde(rename = "placeHolders")]
    pub placeholders: Vec<PlaceholderDescriptor>,
    #[serde(rename = "effectPlaceHolders")]
    pub effect_placeholders: Vec<PlaceholderDescriptor>,
    #[serde(rename = "callingFunction")]
    pub calling_function: String,
}

/// The whole compiled policy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledPolicy {
    pub name: String,
    pub description: String,
    #[serde(rename = "policyType")]
    pub policy_type: String,
    #[serde(rename = "callingFunctions")]
    pub calling_functions: Vec<CompiledCallingFunction>,
    pub trackers: Vec<CompiledTracker>,
    #[serde(rename = "mappedTrackers")]
    pub mapped_trackers: Vec<CompiledMappedTracker>,
    #[serde(rename = "foreignCalls")]
    pub foreign_calls: Vec<CompiledForeignCall>,
    pub rules: Vec<CompiledRule>,
}

fn word_as_string<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn words_as_strings<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(U256::to_string))
}
