//! JSON format handler
//!
//! The binder walks template and payload trees in lock-step, extracting a
//! value wherever the template holds a variable pattern at a leaf. The
//! injector is the inverse walk over the output template. Aggregation packs
//! raw fragments into a JSON array, preserving fragment text exactly.

use serde_json::Value;

use super::{Aggregator, FormatError, FormatHandler};
use crate::bindings::{Bindings, VariablesFetcher};
use crate::variables::{Finding, Variables};

/// Built-in handler for `json`-typed schemas.
pub struct JsonFormat;

impl FormatHandler for JsonFormat {
    fn format_type(&self) -> &'static str {
        "json"
    }

    fn create_aggregator(&self) -> Box<dyn Aggregator> {
        Box::new(JsonAggregator::default())
    }

    fn bind(&self, template: &str, payload: &str) -> Result<Bindings, FormatError> {
        let model = parse(template)?;
        let payload = parse(payload)?;
        Ok(JsonTemplateFetcher::new(model).fetch(&payload))
    }

    fn inject(&self, template: &str, bindings: &Bindings) -> Result<String, FormatError> {
        let model = parse(template)?;
        let result = JsonValuesInjector::new(bindings).inject(&model)?;
        serde_json::to_string_pretty(&result).map_err(|e| FormatError::Malformed {
            format: "json",
            reason: e.to_string(),
        })
    }
}

fn parse(text: &str) -> Result<Value, FormatError> {
    serde_json::from_str(text).map_err(|e| FormatError::Malformed {
        format: "json",
        reason: e.to_string(),
    })
}

/// Binds a parsed template's variables against candidate payloads.
pub struct JsonTemplateFetcher {
    template: Value,
}

impl JsonTemplateFetcher {
    pub fn new(template: Value) -> Self {
        Self { template }
    }
}

impl VariablesFetcher for JsonTemplateFetcher {
    fn fetch(&self, candidate: &Value) -> Bindings {
        if candidate.is_null() {
            return Bindings::new();
        }
        let mut bindings = Bindings::new();
        bind_walk(&self.template, candidate, &mut bindings);
        bindings
    }

    fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(&self.template, &mut names);
        names
    }
}

// Lock-step walk. Structural mismatches and missing keys are skipped, never
// raised: a missing binding means "value not supplied, use default if any".
fn bind_walk(template: &Value, payload: &Value, bindings: &mut Bindings) {
    match (template, payload) {
        (Value::Object(t), Value::Object(p)) => {
            for (key, tv) in t {
                if let Some(pv) = p.get(key) {
                    bind_walk(tv, pv, bindings);
                }
            }
        }
        (Value::Array(t), Value::Array(p)) => {
            if let Some((_, finding)) = wildcard_element(t) {
                // One wildcard pattern stands for "bind each element", in
                // payload order.
                for pv in p {
                    bindings.push(finding.name(), pv.clone());
                }
            } else {
                for (tv, pv) in t.iter().zip(p.iter()) {
                    bind_walk(tv, pv, bindings);
                }
            }
        }
        (Value::String(s), pv) => bind_leaf(s, pv, bindings),
        _ => {}
    }
}

fn bind_leaf(template: &str, payload: &Value, bindings: &mut Bindings) {
    let variables = Variables::new(template);
    let findings = variables.findings();
    if findings.len() != 1 {
        return;
    }
    let finding = &findings[0];

    if is_whole_token(template, finding) {
        bindings.bind(finding.name(), payload.clone());
        return;
    }

    // A single variable embedded in a longer string extracts by stripping
    // the literal prefix and suffix, string payloads only.
    if let Value::String(text) = payload {
        let prefix = &template[..finding.start()];
        let suffix = &template[finding.start() + finding.token().len()..];
        if text.len() >= prefix.len() + suffix.len()
            && text.starts_with(prefix)
            && text.ends_with(suffix)
        {
            let middle = &text[prefix.len()..text.len() - suffix.len()];
            bindings.bind(finding.name(), Value::String(middle.to_string()));
        }
    }
}

fn wildcard_element(template: &[Value]) -> Option<(&str, Finding)> {
    if template.len() != 1 {
        return None;
    }
    let text = template[0].as_str()?;
    let variables = Variables::new(text);
    match variables.findings() {
        [finding] if finding.is_wildcard() => Some((text, finding.clone())),
        _ => None,
    }
}

fn is_whole_token(template: &str, finding: &Finding) -> bool {
    finding.start() == 0 && finding.token().len() == template.len()
}

fn collect_names(template: &Value, names: &mut Vec<String>) {
    match template {
        Value::Object(map) => {
            for value in map.values() {
                collect_names(value, names);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_names(item, names);
            }
        }
        Value::String(s) => {
            for finding in Variables::new(s).findings() {
                if !names.iter().any(|n| n == finding.name()) {
                    names.push(finding.name().to_string());
                }
            }
        }
        _ => {}
    }
}

/// Substitutes bindings into an output template tree.
pub struct JsonValuesInjector<'a> {
    bindings: &'a Bindings,
    missing: Vec<String>,
}

impl<'a> JsonValuesInjector<'a> {
    pub fn new(bindings: &'a Bindings) -> Self {
        Self {
            bindings,
            missing: Vec::new(),
        }
    }

    /// Produce the output document. Fails with the full list of unbound,
    /// defaultless variable names after the walk completes.
    pub fn inject(mut self, template: &Value) -> Result<Value, FormatError> {
        let result = self.walk(template);
        if self.missing.is_empty() {
            Ok(result)
        } else {
            Err(FormatError::UnboundVariables(self.missing))
        }
    }

    fn walk(&mut self, template: &Value) -> Value {
        match template {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.walk(v)))
                    .collect(),
            ),
            Value::Array(items) => self.walk_array(items),
            Value::String(s) => self.walk_leaf(s),
            other => other.clone(),
        }
    }

    fn walk_array(&mut self, items: &[Value]) -> Value {
        if let Some((template, finding)) = wildcard_element(items) {
            return match self.bindings.get(finding.name()) {
                Some(values) if is_whole_token(template, &finding) => {
                    Value::Array(values.to_vec())
                }
                Some(values) => Value::Array(
                    values
                        .iter()
                        .map(|v| {
                            Value::String(template.replace(finding.token(), &value_text(v)))
                        })
                        .collect(),
                ),
                None => match finding.default() {
                    Some(default) => Value::Array(vec![Value::String(default.to_string())]),
                    None => {
                        self.record_missing(finding.name());
                        Value::Array(items.to_vec())
                    }
                },
            };
        }
        Value::Array(items.iter().map(|item| self.walk(item)).collect())
    }

    fn walk_leaf(&mut self, template: &str) -> Value {
        let variables = Variables::new(template);
        let findings = variables.findings();
        if findings.is_empty() {
            return Value::String(template.to_string());
        }

        // A leaf that is exactly one token keeps the bound value's type.
        if findings.len() == 1 && is_whole_token(template, &findings[0]) {
            let finding = &findings[0];
            return match self.bindings.first(finding.name()) {
                Some(value) => value.clone(),
                None => match finding.default() {
                    Some(default) => Value::String(default.to_string()),
                    None => {
                        self.record_missing(finding.name());
                        Value::String(template.to_string())
                    }
                },
            };
        }

        // Embedded or repeated tokens splice textually.
        let mut out = template.to_string();
        for finding in findings {
            let replacement = match self.bindings.first(finding.name()) {
                Some(value) => value_text(value),
                None => match finding.default() {
                    Some(default) => default.to_string(),
                    None => {
                        self.record_missing(finding.name());
                        continue;
                    }
                },
            };
            out = out.replace(finding.token(), &replacement);
        }
        Value::String(out)
    }

    fn record_missing(&mut self, name: &str) {
        if !self.missing.iter().any(|n| n == name) {
            self.missing.push(name.to_string());
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Packs raw JSON fragments into an array. Fragments enter and leave
/// untouched: de-aggregation slices the combined text at top-level element
/// boundaries instead of reparsing, so padding inside a fragment survives.
#[derive(Default)]
pub struct JsonAggregator {
    fragments: Vec<String>,
}

impl Aggregator for JsonAggregator {
    fn add(&mut self, raw: &str) {
        self.fragments.push(raw.to_string());
    }

    fn emit(&self) -> String {
        let mut out = String::from("[");
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(fragment);
        }
        out.push(']');
        out
    }

    fn de_aggregate(&self, combined: &str) -> Result<Vec<String>, FormatError> {
        let spans = element_spans(combined)?;
        Ok(spans
            .into_iter()
            .map(|(start, end)| combined[start..end].to_string())
            .collect())
    }
}

// Byte spans of each top-level array element, split at depth-zero commas
// outside string literals.
fn element_spans(combined: &str) -> Result<Vec<(usize, usize)>, FormatError> {
    let open = match combined.find(|c: char| !c.is_whitespace()) {
        Some(i) if combined[i..].starts_with('[') => i,
        _ => return Err(malformed("combined payload is not a json array")),
    };
    let close = match combined.rfind(|c: char| !c.is_whitespace()) {
        Some(i) if i > open && combined[i..].starts_with(']') => i,
        _ => return Err(malformed("combined payload is not a json array")),
    };

    if combined[open + 1..close].trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = open + 1;

    for (i, b) in combined[open + 1..close].bytes().enumerate() {
        let here = open + 1 + i;
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed("unbalanced brackets"))?;
            }
            b',' if depth == 0 => {
                spans.push((start, here));
                start = here + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || in_string {
        return Err(malformed("unbalanced brackets"));
    }
    spans.push((start, close));
    Ok(spans)
}

fn malformed(reason: &str) -> FormatError {
    FormatError::Malformed {
        format: "json",
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wildcard_array_binding_preserves_order() {
        let handler = JsonFormat;
        let template = r#"{"addresses": ["${ADD[*]}"]}"#;
        let payload = r#"{"addresses": ["1.2.3.4", "5.6.7.8", "9.10.11.12"]}"#;
        let bindings = handler.bind(template, payload).unwrap();
        assert_eq!(
            bindings.get("ADD").unwrap(),
            &[json!("1.2.3.4"), json!("5.6.7.8"), json!("9.10.11.12")]
        );
    }

    #[test]
    fn test_scalar_leaf_binding_keeps_value_type() {
        let handler = JsonFormat;
        let bindings = handler
            .bind(r#"{"port": "${PORT}"}"#, r#"{"port": 8443}"#)
            .unwrap();
        assert_eq!(bindings.first("PORT"), Some(&json!(8443)));
    }

    #[test]
    fn test_embedded_variable_extracts_by_prefix_suffix() {
        let handler = JsonFormat;
        let bindings = handler
            .bind(r#"{"id": "device-${NUM}-x"}"#, r#"{"id": "device-42-x"}"#)
            .unwrap();
        assert_eq!(bindings.first("NUM"), Some(&json!("42")));
    }

    #[test]
    fn test_structural_mismatch_is_skipped_not_raised() {
        let handler = JsonFormat;
        // Template expects an object under "a"; payload has a scalar.
        let bindings = handler
            .bind(
                r#"{"a": {"b": "${B}"}, "c": "${C}"}"#,
                r#"{"a": 5, "c": "kept"}"#,
            )
            .unwrap();
        assert!(bindings.get("B").is_none());
        assert_eq!(bindings.first("C"), Some(&json!("kept")));
    }

    #[test]
    fn test_missing_key_is_skipped() {
        let handler = JsonFormat;
        let bindings = handler.bind(r#"{"a": "${A}"}"#, r#"{}"#).unwrap();
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_fetcher_null_candidate_yields_empty() {
        let fetcher = JsonTemplateFetcher::new(json!({"a": "${A}"}));
        assert!(fetcher.fetch(&Value::Null).is_empty());
        assert_eq!(fetcher.names(), vec!["A"]);
    }

    #[test]
    fn test_inject_whole_token_and_defaults() {
        let mut bindings = Bindings::new();
        bindings.bind("PORT", json!(8443));
        let handler = JsonFormat;
        let out = handler
            .inject(r#"{"port": "${PORT}", "host": "${HOST=localhost}"}"#, &bindings)
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"port": 8443, "host": "localhost"}));
    }

    #[test]
    fn test_inject_wildcard_expands_in_order() {
        let mut bindings = Bindings::new();
        bindings.push("ADD", json!("1.2.3.4"));
        bindings.push("ADD", json!("5.6.7.8"));
        let handler = JsonFormat;
        let out = handler
            .inject(r#"{"addresses": ["${ADD[*]}"]}"#, &bindings)
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"addresses": ["1.2.3.4", "5.6.7.8"]}));
    }

    #[test]
    fn test_inject_collects_all_unbound_names() {
        let handler = JsonFormat;
        let err = handler
            .inject(r#"{"a": "${A}", "b": "${B}"}"#, &Bindings::new())
            .unwrap_err();
        match err {
            FormatError::UnboundVariables(names) => assert_eq!(names, vec!["A", "B"]),
            other => panic!("expected unbound variables, got {other:?}"),
        }
    }

    #[test]
    fn test_inject_embedded_splices_text() {
        let mut bindings = Bindings::new();
        bindings.bind("NUM", json!(7));
        let handler = JsonFormat;
        let out = handler
            .inject(r#"{"id": "device-${NUM}-${NUM}"}"#, &bindings)
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"id": "device-7-7"}));
    }

    #[test]
    fn test_aggregate_round_trip_is_exact() {
        let mut agg = JsonAggregator::default();
        let fragments = [r#"{"a": 1}"#, r#"[1, 2]"#, r#""text""#];
        for f in &fragments {
            agg.add(f);
        }
        let combined = agg.emit();
        let back = agg.de_aggregate(&combined).unwrap();
        assert_eq!(back, fragments);
    }

    #[test]
    fn test_aggregate_round_trip_keeps_padding() {
        let mut agg = JsonAggregator::default();
        // File-read payloads commonly carry a trailing newline.
        let fragments = ["{\"n\": 1}\n", "  {\"n\": 2}", "\t3 "];
        for f in &fragments {
            agg.add(f);
        }
        let back = agg.de_aggregate(&agg.emit()).unwrap();
        assert_eq!(back, fragments);
    }

    #[test]
    fn test_de_aggregate_ignores_separators_inside_strings() {
        let agg = JsonAggregator::default();
        let back = agg
            .de_aggregate(r#"[{"s": "a,b]"},{"t": "\",{"}]"#)
            .unwrap();
        assert_eq!(back, vec![r#"{"s": "a,b]"}"#, r#"{"t": "\",{"}"#]);
    }

    #[test]
    fn test_de_aggregate_empty_array() {
        let agg = JsonAggregator::default();
        assert!(agg.de_aggregate("[]").unwrap().is_empty());
        assert!(agg.de_aggregate(" [ ] ").unwrap().is_empty());
    }

    #[test]
    fn test_de_aggregate_rejects_non_array() {
        let agg = JsonAggregator::default();
        assert!(matches!(
            agg.de_aggregate(r#"{"a": 1}"#),
            Err(FormatError::Malformed { .. })
        ));
        assert!(matches!(
            agg.de_aggregate(r#"[{"a": 1]"#),
            Err(FormatError::Malformed { .. })
        ));
    }
}
