//! rulec-drv - The policy assembler.
//!
//! Orchestrates compilation of a whole policy record:
//!
//! ```text
//! Policy JSON
//!      |
//!      v
//! [Parse schema] - calling functions, trackers, foreign calls validated
//!      |
//!      v
//! [Assign ids] - declaration-order ids; foreign-call argument indices
//!      |
//!      v
//! [Compile rules] - per rule: lex -> parse -> resolve -> emit, effects too
//!      |
//!      v
//! [Emit artifact] - withheld entirely if anything failed
//! ```
//!
//! Diagnostics accumulate across all stages; the caller receives either the
//! artifact plus out-of-band warnings, or the complete diagnostic list.

pub mod artifact;
pub mod reverse;
pub mod schema;

pub use artifact::{
    ArgSource, CompiledCallingFunction, CompiledForeignCall, CompiledMappedTracker,
    CompiledPolicy, CompiledRule, CompiledTracker, EncodedIndex, ParamRecord,
};
pub use reverse::{reverse_condition, reverse_effect};
pub use schema::{
    CallingFunctionRecord, ForeignCallRecord, MappedTrackerRecord, PolicyRecord, RuleRecord,
    TrackerRecord,
};

use tracing::debug;

use rulec_ir::{compile_effect, Effect, Emitter};
use rulec_par::parse_condition;
use rulec_sem::{ExprContext, Resolver, ScopeCtx};
use rulec_types::{
    encode_packed, encode_word, parse_address, to_checksum, LiteralValue, PrimitiveType,
};
use rulec_util::{Diagnostic, ErrorKind, Handler, Level, Span, Stage};

/// A successful compilation: the artifact plus non-fatal findings.
#[derive(Debug)]
pub struct CompileOutput {
    pub artifact: CompiledPolicy,
    pub warnings: Vec<Diagnostic>,
}

/// Compile a policy from its JSON record.
///
/// Returns the artifact with out-of-band warnings, or the accumulated
/// diagnostic list. No partial artifact is ever produced.
pub fn compile_policy(json: &str) -> Result<CompileOutput, Vec<Diagnostic>> {
    let handler = Handler::new();
    handler.set_stage(Stage::ParseSchema);

    let record: PolicyRecord = match serde_json::from_str(json) {
        Ok(record) => record,
        Err(err) => {
            handler.error(
                ErrorKind::Input,
                format!("malformed policy record: {err}"),
                Span::DUMMY,
            );
            return Err(handler.take());
        }
    };

    run(&record, &handler)
}

/// Compile an already-deserialized policy record.
pub fn compile_policy_record(record: &PolicyRecord) -> Result<CompileOutput, Vec<Diagnostic>> {
    let handler = Handler::new();
    run(record, &handler)
}

fn run(record: &PolicyRecord, handler: &Handler) -> Result<CompileOutput, Vec<Diagnostic>> {
    let artifact = Assembler::new(record, handler).assemble();
    let diagnostics = handler.take();

    match artifact {
        Some(artifact) if !diagnostics.iter().any(|d| d.level == Level::Error) => {
            Ok(CompileOutput {
                artifact,
                warnings: diagnostics,
            })
        }
        _ => Err(diagnostics),
    }
}

/// Builds one artifact from one record.
struct Assembler<'a> {
    record: &'a PolicyRecord,
    handler: &'a Handler,
    calling_functions: Vec<CompiledCallingFunction>,
    trackers: Vec<CompiledTracker>,
    mapped_trackers: Vec<CompiledMappedTracker>,
    foreign_calls: Vec<CompiledForeignCall>,
}

impl<'a> Assembler<'a> {
    fn new(record: &'a PolicyRecord, handler: &'a Handler) -> Self {
        Self {
            record,
            handler,
            calling_functions: Vec::new(),
            trackers: Vec::new(),
            mapped_trackers: Vec::new(),
            foreign_calls: Vec::new(),
        }
    }

    fn assemble(mut self) -> Option<CompiledPolicy> {
        self.handler.set_stage(Stage::ParseSchema);
        debug!(policy = %self.record.name.trim(), "parsing policy schema");
        self.parse_schema();

        self.handler.set_stage(Stage::AssignIds);
        debug!("assigning entity ids");
        self.assign_ids();

        self.handler.set_stage(Stage::CompileRules);
        debug!(rules = self.record.rules.len(), "compiling rules");
        let rules = self.compile_rules();

        self.handler.set_stage(Stage::EmitArtifact);
        if self.handler.has_errors() {
            debug!("artifact withheld: compilation reported errors");
            return None;
        }

        Some(CompiledPolicy {
            name: self.record.name.trim().to_owned(),
            description: self.record.description.trim().to_owned(),
            policy_type: self.record.policy_type.trim().to_owned(),
            calling_functions: self.calling_functions,
            trackers: self.trackers,
            mapped_trackers: self.mapped_trackers,
            foreign_calls: self.foreign_calls,
            rules,
        })
    }

    // ------------------------------------------------------------------
    // Stage: parse schema
    // ------------------------------------------------------------------

    fn parse_schema(&mut self) {
        for function in &self.record.calling_functions {
            let name = function.name.trim();
            if name.is_empty() {
                self.input_error("calling function with empty name");
                continue;
            }
            if self.calling_functions.iter().any(|f| f.name == name) {
                self.input_error(format!("duplicate calling function `{name}`"));
                continue;
            }
            let params = self.parse_encoded_values(name, &function.encoded_values);
            self.calling_functions.push(CompiledCallingFunction {
                name: name.to_owned(),
                signature: function.function_signature.trim().to_owned(),
                params,
            });
        }

        for tracker in &self.record.trackers {
            let ty = self.parse_type_tag(&tracker.ty, &tracker.name);
            let initial_value = self
                .parse_initial(&tracker.initial_value, ty, &tracker.name)
                .map(|value| encode_word(&value))
                .unwrap_or_default();
            self.trackers.push(CompiledTracker {
                id: 0,
                name: tracker.name.trim().to_owned(),
                ty,
                initial_value,
            });
        }

        for mapped in &self.record.mapped_trackers {
            let key_ty = self.parse_type_tag(&mapped.key_type, &mapped.name);
            let value_ty = self.parse_type_tag(&mapped.value_type, &mapped.name);
            if mapped.initial_keys.len() != mapped.initial_values.len() {
                self.input_error(format!(
                    "mapped tracker `{}` declares {} keys but {} values",
                    mapped.name.trim(),
                    mapped.initial_keys.len(),
                    mapped.initial_values.len()
                ));
            }
            let initial_keys = self.parse_packed_list(&mapped.initial_keys, key_ty, &mapped.name);
            let initial_values =
                self.parse_packed_list(&mapped.initial_values, value_ty, &mapped.name);
            self.mapped_trackers.push(CompiledMappedTracker {
                id: 0,
                name: mapped.name.trim().to_owned(),
                key_ty,
                value_ty,
                initial_keys,
                initial_values,
            });
        }

        for call in &self.record.foreign_calls {
            let name = call.name.trim();
            let address = match parse_address(call.address.trim()) {
                Ok(addr) => to_checksum(&addr),
                Err(err) => {
                    self.input_error(format!("foreign call `{name}`: {err}"));
                    String::new()
                }
            };
            let return_ty = self.parse_type_tag(&call.return_type, name);
            if return_ty == PrimitiveType::Void {
                self.handler.error(
                    ErrorKind::Type,
                    format!("foreign call `{name}` has unsupported return type void"),
                    Span::DUMMY,
                );
            }
            self.foreign_calls.push(CompiledForeignCall {
                id: 0,
                name: name.to_owned(),
                address,
                function: call.function.trim().to_owned(),
                return_ty,
                encoded_indices: Vec::new(),
                mapped_tracker_key_indices: Vec::new(),
                calling_function: call.calling_function.trim().to_owned(),
            });
        }
    }

    /// Parse `type name, type name, ...` into parameter slots.
    fn parse_encoded_values(&self, function: &str, encoded: &str) -> Vec<ParamRecord> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Vec::new();
        }

        let mut params: Vec<ParamRecord> = Vec::new();
        for entry in encoded.split(',') {
            let mut parts = entry.split_whitespace();
            let (Some(tag), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
                self.input_error(format!(
                    "calling function `{function}`: malformed parameter `{}`, expected `type name`",
                    entry.trim()
                ));
                continue;
            };
            let Some(ty) = PrimitiveType::parse_tag(tag) else {
                self.handler.error(
                    ErrorKind::Type,
                    format!("calling function `{function}`: unknown type tag `{tag}`"),
                    Span::DUMMY,
                );
                continue;
            };
            if ty == PrimitiveType::Void {
                self.handler.error(
                    ErrorKind::Type,
                    format!("calling function `{function}`: parameter `{name}` cannot be void"),
                    Span::DUMMY,
                );
                continue;
            }
            if params.iter().any(|p| p.name == name) {
                self.input_error(format!(
                    "calling function `{function}`: duplicate parameter `{name}`"
                ));
                continue;
            }
            params.push(ParamRecord {
                name: name.to_owned(),
                ty,
            });
        }
        params
    }

    fn parse_type_tag(&self, tag: &str, owner: &str) -> PrimitiveType {
        match PrimitiveType::parse_tag(tag.trim()) {
            Some(ty) => ty,
            None => {
                self.handler.error(
                    ErrorKind::Type,
                    format!("`{}`: unknown type tag `{}`", owner.trim(), tag.trim()),
                    Span::DUMMY,
                );
                PrimitiveType::Uint256
            }
        }
    }

    fn parse_initial(&self, text: &str, ty: PrimitiveType, owner: &str) -> Option<LiteralValue> {
        match LiteralValue::parse(text, ty) {
            Ok(value) => Some(value),
            Err(err) => {
                self.handler.error(
                    ErrorKind::Type,
                    format!("`{}`: {err}", owner.trim()),
                    Span::DUMMY,
                );
                None
            }
        }
    }

    fn parse_packed_list(
        &self,
        entries: &[String],
        ty: PrimitiveType,
        owner: &str,
    ) -> Vec<rulec_types::U256> {
        entries
            .iter()
            .filter_map(|entry| self.parse_initial(entry, ty, owner))
            .map(|value| encode_packed(&value))
            .collect()
    }

    // ------------------------------------------------------------------
    // Stage: assign ids
    // ------------------------------------------------------------------

    fn assign_ids(&mut self) {
        // Scalar and mapped trackers share one id namespace
        let mut next = 1u32;
        for tracker in &mut self.trackers {
            tracker.id = next;
            next += 1;
        }
        for mapped in &mut self.mapped_trackers {
            mapped.id = next;
            next += 1;
        }
        for (position, call) in self.foreign_calls.iter_mut().enumerate() {
            call.id = position as u32 + 1;
        }

        // Cross-references become resolvable only now that every entity
        // has its id
        let resolved: Vec<_> = self
            .record
            .foreign_calls
            .iter()
            .map(|call| {
                (
                    self.resolve_arg_list(call, &call.values_to_pass),
                    self.resolve_arg_list(call, &call.mapped_tracker_key_values),
                )
            })
            .collect();
        for (call, (encoded, keys)) in self.foreign_calls.iter_mut().zip(resolved) {
            call.encoded_indices = encoded;
            call.mapped_tracker_key_indices = keys;
        }
    }

    /// Resolve a comma list of argument names into namespace indices.
    fn resolve_arg_list(&self, call: &ForeignCallRecord, list: &str) -> Vec<EncodedIndex> {
        let list = list.trim();
        if list.is_empty() {
            return Vec::new();
        }

        let call_name = call.name.trim();
        let mut indices = Vec::new();
        for token in list.split(',') {
            let token = token.trim();

            if let Some(name) = token.strip_prefix("TR:") {
                if let Some(position) = self.trackers.iter().position(|t| t.name == name) {
                    indices.push(EncodedIndex {
                        e_type: ArgSource::Tracker,
                        index: position as u32,
                    });
                } else if let Some(position) =
                    self.mapped_trackers.iter().position(|t| t.name == name)
                {
                    indices.push(EncodedIndex {
                        e_type: ArgSource::MappedTracker,
                        index: position as u32,
                    });
                } else {
                    self.resolution_error(format!(
                        "foreign call `{call_name}` refers to undeclared tracker `{name}`"
                    ));
                }
                continue;
            }

            if let Some(name) = token.strip_prefix("FC:") {
                if let Some(position) = self.foreign_calls.iter().position(|f| f.name == name) {
                    indices.push(EncodedIndex {
                        e_type: ArgSource::ForeignCall,
                        index: position as u32,
                    });
                } else {
                    self.resolution_error(format!(
                        "foreign call `{call_name}` refers to undeclared foreign call `{name}`"
                    ));
                }
                continue;
            }

            let function_name = call.calling_function.trim();
            let Some(function) = self
                .calling_functions
                .iter()
                .find(|f| f.name == function_name)
            else {
                self.resolution_error(format!(
                    "foreign call `{call_name}` names unknown calling function `{function_name}`"
                ));
                continue;
            };
            match function.params.iter().position(|p| p.name == token) {
                Some(slot) => indices.push(EncodedIndex {
                    e_type: ArgSource::Parameter,
                    index: slot as u32,
                }),
                None => self.resolution_error(format!(
                    "foreign call `{call_name}` refers to undeclared parameter `{token}`"
                )),
            }
        }
        indices
    }

    // ------------------------------------------------------------------
    // Stage: compile rules
    // ------------------------------------------------------------------

    fn compile_rules(&self) -> Vec<CompiledRule> {
        let mut rules = Vec::new();
        for rule in &self.record.rules {
            if let Some(compiled) = self.compile_rule(rule) {
                rules.push(compiled);
            }
        }

        for function in &self.calling_functions {
            let used = self
                .record
                .rules
                .iter()
                .any(|rule| rule.calling_function.trim() == function.name);
            if !used {
                self.handler.warn(
                    format!("calling function `{}` is not used by any rule", function.name),
                    Span::DUMMY,
                );
            }
        }

        rules
    }

    fn compile_rule(&self, rule: &RuleRecord) -> Option<CompiledRule> {
        let rule_name = rule.name.trim();
        debug!(rule = %rule_name, "compiling rule");

        let function_name = rule.calling_function.trim();
        let Some(function) = self
            .calling_functions
            .iter()
            .find(|f| f.name == function_name)
        else {
            self.resolution_error(format!(
                "rule `{rule_name}` references unknown calling function `{function_name}`"
            ));
            return None;
        };

        let scope = self.scope_for(function);

        // Condition
        let mut condition_resolver = Resolver::new(&scope, self.handler, ExprContext::Condition);
        let condition = parse_condition(rule.condition.trim(), self.handler)
            .and_then(|expr| condition_resolver.resolve(&expr))
            .map(|resolved| {
                if resolved.ty != PrimitiveType::Bool {
                    self.handler.error(
                        ErrorKind::Type,
                        format!(
                            "rule `{rule_name}`: condition must be bool, found {}",
                            resolved.ty
                        ),
                        resolved.span,
                    );
                }
                let mut emitter = Emitter::new();
                emitter.emit(&resolved);
                emitter.finish()
            });

        // Effects share one resolver so positive and negative effects draw
        // from a single placeholder namespace, disjoint from the condition's
        let mut effect_resolver = Resolver::new(&scope, self.handler, ExprContext::Effect);
        let positive_effects = self.compile_effects(&rule.positive_effects, &mut effect_resolver);
        let negative_effects = self.compile_effects(&rule.negative_effects, &mut effect_resolver);

        let (condition, positive_effects, negative_effects) =
            (condition?, positive_effects?, negative_effects?);

        Some(CompiledRule {
            name: rule_name.to_owned(),
            description: rule.description.trim().to_owned(),
            condition,
            positive_effects,
            negative_effects,
            placeholders: condition_resolver.into_descriptors(),
            effect_placeholders: effect_resolver.into_descriptors(),
            calling_function: function.name.clone(),
        })
    }

    fn compile_effects(
        &self,
        sources: &[String],
        resolver: &mut Resolver<'_>,
    ) -> Option<Vec<Effect>> {
        let mut effects = Vec::with_capacity(sources.len());
        let mut failed = false;
        for source in sources {
            match compile_effect(source, resolver, self.handler) {
                Some(effect) => effects.push(effect),
                None => failed = true,
            }
        }
        if failed {
            None
        } else {
            Some(effects)
        }
    }

    fn scope_for(&self, function: &CompiledCallingFunction) -> ScopeCtx {
        let mut scope = ScopeCtx::new();
        for param in &function.params {
            scope.add_param(param.name.clone(), param.ty);
        }
        for tracker in &self.trackers {
            scope.add_tracker(tracker.name.clone(), tracker.id, tracker.ty);
        }
        for mapped in &self.mapped_trackers {
            scope.add_mapped_tracker(mapped.name.clone(), mapped.id, mapped.key_ty, mapped.value_ty);
        }
        for call in &self.foreign_calls {
            scope.add_foreign_call(call.name.clone(), call.id, call.return_ty);
        }
        scope
    }

    fn input_error(&self, message: impl Into<String>) {
        self.handler.error(ErrorKind::Input, message, Span::DUMMY);
    }

    fn resolution_error(&self, message: impl Into<String>) {
        self.handler.error(ErrorKind::Resolution, message, Span::DUMMY);
    }
}
