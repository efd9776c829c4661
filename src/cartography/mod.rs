//! Translation façade
//!
//! [`Cartography`] is the interface the engine is driven through: translate
//! one raw payload from an input schema to an output schema, optionally with
//! caller-supplied defaults. [`CartographerWorker`] is the stateless
//! per-request orchestration: plan building, classifier resolution,
//! template binding, morpher application, value injection, and re-aggregation
//! of collection payloads.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::aggregation::{AggregationError, PayloadAggregation};
use crate::bindings::Bindings;
use crate::formats::{FormatError, Formats};
use crate::library::{LibraryError, TemplateLibrary};
use crate::plan::{
    ClassifierResolver, Morpher, PlanError, TranslationPlanLite, DEFAULT_INPUT_MORPHER,
    DEFAULT_OUTPUT_MORPHER,
};
use crate::schema::{SchemaError, VersionedSchema, VersionedSchemaRaw};

/// The representation of "no defaults supplied", recognized by all parsers.
pub const EMPTY_DEFAULTS: &str = "";

/// Error translating one payload.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("defaults must be a json object of variable name to value: {0}")]
    MalformedDefaults(String),
    #[error("schema name needs a classifier but none is configured: {0}")]
    NoClassifier(String),
    #[error("morpher {morpher} failed: {reason}")]
    Morpher { morpher: String, reason: String },
}

/// Translate payloads between versioned schemas.
pub trait Cartography {
    /// Translate `payload` from the input schema's shape to the output
    /// schema's shape.
    fn translate(
        &self,
        input: &VersionedSchema,
        output: &VersionedSchema,
        payload: &str,
    ) -> Result<String, TranslateError> {
        self.translate_with_defaults(input, output, payload, EMPTY_DEFAULTS)
    }

    /// Like [`Cartography::translate`], with a JSON-encoded map of variable
    /// defaults applied wherever the payload supplied no value.
    fn translate_with_defaults(
        &self,
        input: &VersionedSchema,
        output: &VersionedSchema,
        payload: &str,
        defaults: &str,
    ) -> Result<String, TranslateError>;

    /// Release process-wide resources. Idempotent; never raises.
    fn close(&self);
}

/// Executes named morpher steps against the bindings. Morpher lookup and
/// behavior belong to an external collaborator; the engine only drives the
/// chain in order.
pub trait MorpherExecutor: Send + Sync {
    fn apply(&self, morpher: &Morpher, bindings: &mut Bindings) -> Result<(), TranslateError>;
}

/// Default executor: skips every morpher, logging the ones that are not
/// input/output placeholders. Executing real morphers belongs to an
/// embedder-supplied implementation.
pub struct NoopMorphers;

impl MorpherExecutor for NoopMorphers {
    fn apply(&self, morpher: &Morpher, _bindings: &mut Bindings) -> Result<(), TranslateError> {
        if morpher.is_default() {
            return Ok(());
        }
        debug!("no executor registered for morpher {morpher}, skipping");
        Ok(())
    }
}

/// Stateless per-request translation worker.
pub struct CartographerWorker {
    formats: Formats,
    aggregation: PayloadAggregation,
    library: Box<dyn TemplateLibrary>,
    classifier: Option<Arc<dyn ClassifierResolver + Send + Sync>>,
    morphers: Box<dyn MorpherExecutor>,
}

impl CartographerWorker {
    pub fn new(library: Box<dyn TemplateLibrary>) -> Self {
        let formats = Formats::default();
        Self {
            aggregation: PayloadAggregation::new(formats.clone()),
            formats,
            library,
            classifier: None,
            morphers: Box::new(NoopMorphers),
        }
    }

    pub fn with_formats(mut self, formats: Formats) -> Self {
        self.aggregation = PayloadAggregation::new(formats.clone());
        self.formats = formats;
        self
    }

    pub fn with_classifier(
        mut self,
        classifier: Arc<dyn ClassifierResolver + Send + Sync>,
    ) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_morpher_executor(mut self, executor: Box<dyn MorpherExecutor>) -> Self {
        self.morphers = executor;
        self
    }

    /// Wrap this worker in the request-logging decorator.
    pub fn logged(self) -> CartographyLogged<Self> {
        CartographyLogged::new(self)
    }

    /// Drive a caller-constructed plan. This is the entry point for
    /// collection payloads: classifiers must preserve a plan's role, so a
    /// parent plan and its children are composed before resolution and
    /// handed in here.
    pub fn translate_plan(
        &self,
        plan: &TranslationPlanLite,
        payload: &str,
        defaults: &str,
    ) -> Result<String, TranslateError> {
        let defaults = parse_defaults(defaults)?;
        let plan = self.resolve_plan(plan.clone(), payload)?;
        plan.validate()?;
        self.run_plan(&plan, payload, &defaults)
    }

    fn build_plan(&self, input: &VersionedSchema, output: &VersionedSchema) -> TranslationPlanLite {
        let mut plan = TranslationPlanLite::new(input.clone(), output.clone());
        plan.add_morpher(Morpher::new(DEFAULT_INPUT_MORPHER));
        plan.add_morpher(Morpher::new(DEFAULT_OUTPUT_MORPHER));
        plan
    }

    fn resolve_plan(
        &self,
        plan: TranslationPlanLite,
        payload: &str,
    ) -> Result<TranslationPlanLite, TranslateError> {
        if !plan.is_unresolved() {
            return Ok(plan);
        }
        let classifier = self.classifier.as_deref().ok_or_else(|| {
            TranslateError::NoClassifier(plan.input().name().to_string())
        })?;
        let resolved = plan.resolve(classifier, payload)?;
        plan.validate_lineage(&resolved)?;
        Ok(resolved)
    }

    fn resolve_child_plan(
        &self,
        child: &TranslationPlanLite,
    ) -> Result<TranslationPlanLite, TranslateError> {
        if !child.is_unresolved() {
            return Ok(child.clone());
        }
        let classifier = self.classifier.as_deref().ok_or_else(|| {
            TranslateError::NoClassifier(child.input().name().to_string())
        })?;
        let resolved = child.resolve_child(classifier)?;
        child.validate_lineage(&resolved)?;
        Ok(resolved)
    }

    fn run_plan(
        &self,
        plan: &TranslationPlanLite,
        payload: &str,
        defaults: &Bindings,
    ) -> Result<String, TranslateError> {
        if plan.has_parent_role() {
            return self.run_parent_plan(plan, defaults);
        }

        let in_handler = self.formats.must_lookup(plan.input().schema_type())?;
        let in_template = self.library.locate(plan.input())?;
        let mut bindings = in_handler.bind(&in_template, payload)?;
        bindings.merge_missing_from(defaults);

        for morpher in plan.morphers() {
            self.morphers.apply(morpher, &mut bindings)?;
        }

        let out_handler = self.formats.must_lookup(plan.output().schema_type())?;
        let out_template = self.library.locate(plan.output())?;
        Ok(out_handler.inject(&out_template, &bindings)?)
    }

    // Collection payloads translate element by element, then the child
    // outputs aggregate back into one payload under the first child's
    // output schema.
    fn run_parent_plan(
        &self,
        plan: &TranslationPlanLite,
        defaults: &Bindings,
    ) -> Result<String, TranslateError> {
        let mut outputs: Vec<VersionedSchemaRaw> = Vec::new();
        for child in plan.child_plans()? {
            let child = self.resolve_child_plan(child)?;
            child.validate()?;
            let sub_payload = child.child_role()?.payload().to_string();
            let result = self.run_plan(&child, &sub_payload, defaults)?;
            outputs.push(VersionedSchemaRaw::new(child.output().clone(), result));
        }
        let combined = self.aggregation.aggregate(&outputs)?;
        Ok(combined.raw().to_string())
    }
}

impl Cartography for CartographerWorker {
    fn translate_with_defaults(
        &self,
        input: &VersionedSchema,
        output: &VersionedSchema,
        payload: &str,
        defaults: &str,
    ) -> Result<String, TranslateError> {
        let defaults = parse_defaults(defaults)?;
        let plan = self.build_plan(input, output);
        let plan = self.resolve_plan(plan, payload)?;
        plan.validate()?;
        self.run_plan(&plan, payload, &defaults)
    }

    fn close(&self) {}
}

/// Decorator logging the start and end of every translate request.
pub struct CartographyLogged<C> {
    inner: C,
}

impl<C: Cartography> CartographyLogged<C> {
    pub fn new(inner: C) -> Self {
        info!("cartography initialized");
        Self { inner }
    }
}

impl<C: Cartography> Cartography for CartographyLogged<C> {
    fn translate(
        &self,
        input: &VersionedSchema,
        output: &VersionedSchema,
        payload: &str,
    ) -> Result<String, TranslateError> {
        info!("received translate request: input({input}) output({output})");
        let result = self.inner.translate(input, output, payload);
        info!("finished translation");
        result
    }

    fn translate_with_defaults(
        &self,
        input: &VersionedSchema,
        output: &VersionedSchema,
        payload: &str,
        defaults: &str,
    ) -> Result<String, TranslateError> {
        info!("received translate (with defaults) request: input({input}) output({output})");
        let result = self
            .inner
            .translate_with_defaults(input, output, payload, defaults);
        info!("finished translation");
        result
    }

    fn close(&self) {
        self.inner.close();
        info!("cartography closed");
    }
}

// Defaults arrive as a JSON object keyed by variable name; empty text means
// no defaults.
fn parse_defaults(defaults: &str) -> Result<Bindings, TranslateError> {
    if defaults.trim().is_empty() {
        return Ok(Bindings::new());
    }
    let parsed: Value = serde_json::from_str(defaults)
        .map_err(|e| TranslateError::MalformedDefaults(e.to_string()))?;
    match parsed {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(TranslateError::MalformedDefaults(format!(
            "expected an object, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_empty_and_object() {
        assert!(parse_defaults(EMPTY_DEFAULTS).unwrap().is_empty());
        assert!(parse_defaults("  \n").unwrap().is_empty());

        let bindings = parse_defaults(r#"{"A": "x", "B": 2}"#).unwrap();
        assert_eq!(bindings.first("A"), Some(&serde_json::json!("x")));
        assert_eq!(bindings.first("B"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_noop_morphers_skip_every_morpher() {
        let executor = NoopMorphers;
        let mut bindings = Bindings::new();
        bindings.bind("A", serde_json::json!(1));

        executor
            .apply(&Morpher::new(DEFAULT_INPUT_MORPHER), &mut bindings)
            .unwrap();
        executor
            .apply(&Morpher::new("custom-step"), &mut bindings)
            .unwrap();
        assert_eq!(bindings.first("A"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_parse_defaults_rejects_non_object() {
        assert!(matches!(
            parse_defaults("[1,2]"),
            Err(TranslateError::MalformedDefaults(_))
        ));
        assert!(matches!(
            parse_defaults("not json"),
            Err(TranslateError::MalformedDefaults(_))
        ));
    }
}
