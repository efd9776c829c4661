//! Translation plans
//!
//! A translation plan is an ordered pair of schema identities (input, output)
//! plus a chain of named morpher tokens. Plans may start out unresolved: an
//! input schema name can itself carry a variable pattern that an external
//! classifier fills in after inspecting the actual payload.
//!
//! Plans for collection payloads decompose recursively: a parent plan owns
//! one child plan per element, each child carrying its own sub-payload.

use std::fmt;
use std::mem;

use crate::schema::{SchemaError, VersionedSchema};
use crate::variables::{splice, VariableError, Variables};

/// Placeholder morpher applied to inputs when a plan names no explicit one.
pub const DEFAULT_INPUT_MORPHER: &str = "default-input-morpher";
/// Placeholder morpher applied to outputs when a plan names no explicit one.
pub const DEFAULT_OUTPUT_MORPHER: &str = "default-output-morpher";

/// Error validating, resolving, or role-checking a translation plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("translation plan is empty")]
    Empty,
    #[error("translation plan is missing a schema")]
    MissingSchema,
    #[error("translation plan expected two schemas but found {0}")]
    TooManySchemas(usize),
    #[error("translation plan is unresolved: {0}")]
    Unresolved(String),
    #[error("schema name has no classifier variable present: {0}")]
    ResolutionNotPossible(String),
    #[error("schema name has more than one variable: {0}")]
    MultipleVariables(String),
    #[error("classifier returned a blank replacement schema name part")]
    MalformedReplacement,
    #[error("translation plan found in wrong role, wanted: {wanted} found: {found}")]
    WrongRole {
        wanted: &'static str,
        found: &'static str,
    },
    #[error("plan resolution changed the plan role, which classifiers may not do")]
    RoleChanged,
    #[error("cannot add a plan as a child unless it carries the child role")]
    InvalidChild,
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<VariableError> for PlanError {
    fn from(err: VariableError) -> Self {
        match err {
            VariableError::NoneFound(raw) => PlanError::ResolutionNotPossible(raw),
            VariableError::Multiple(raw) => PlanError::MultipleVariables(raw),
        }
    }
}

/// An opaque, named transformation step. Resolution and execution of
/// morphers belong to an external collaborator; plans only carry the tokens
/// in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Morpher(String);

impl Morpher {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// True for the input/output placeholder tokens.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_INPUT_MORPHER || self.0 == DEFAULT_OUTPUT_MORPHER
    }
}

impl fmt::Display for Morpher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generic plan container: an ordered schema list and a morpher chain.
///
/// Kept generic over the schema and morpher types so tests and future
/// pipeline work can instantiate it with plain strings.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPlan<S, M> {
    schemas: Vec<S>,
    morphers: Vec<M>,
}

impl<S, M> Default for TranslationPlan<S, M> {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            morphers: Vec::new(),
        }
    }
}

impl<S, M> TranslationPlan<S, M> {
    pub fn new(input: S, output: S) -> Self {
        Self {
            schemas: vec![input, output],
            morphers: Vec::new(),
        }
    }

    pub fn with_morphers(input: S, output: S, morphers: Vec<M>) -> Self {
        Self {
            schemas: vec![input, output],
            morphers,
        }
    }

    pub fn add_schema(&mut self, schema: S) {
        self.schemas.push(schema);
    }

    pub fn add_morpher(&mut self, morpher: M) {
        self.morphers.push(morpher);
    }

    pub fn maybe_add_morpher(&mut self, morpher: Option<M>) {
        if let Some(morpher) = morpher {
            self.morphers.push(morpher);
        }
    }

    pub fn first_schema(&self) -> Option<&S> {
        self.schemas.first()
    }

    pub fn last_schema(&self) -> Option<&S> {
        self.schemas.last()
    }

    pub fn schemas(&self) -> &[S] {
        &self.schemas
    }

    pub fn morphers(&self) -> &[M] {
        &self.morphers
    }

    pub fn has_morphers(&self) -> bool {
        !self.morphers.is_empty()
    }

    /// Structural check: exactly two schemas (input, output). Pipelining
    /// more stages is an explicit non-goal today.
    pub fn validate(&self) -> Result<(), PlanError> {
        match self.schemas.len() {
            0 => Err(PlanError::Empty),
            1 => Err(PlanError::MissingSchema),
            2 => Ok(()),
            n => Err(PlanError::TooManySchemas(n)),
        }
    }
}

/// Parent side of a decomposed collection plan: owns the per-element child
/// plans in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentRole {
    children: Vec<TranslationPlanLite>,
}

impl ParentRole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, child: TranslationPlanLite) -> Result<(), PlanError> {
        if !child.has_child_role() {
            return Err(PlanError::InvalidChild);
        }
        self.children.push(child);
        Ok(())
    }

    pub fn child_plans(&self) -> &[TranslationPlanLite] {
        &self.children
    }
}

/// Child side of a decomposed collection plan: a name for the element and
/// the element's sub-payload, owned by value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRole {
    name: String,
    payload: String,
}

impl ChildRole {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// The closed set of roles a plan can carry. Exhaustive matching means a new
/// role cannot silently fall through to a wrong-role failure at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Role {
    #[default]
    None,
    Parent(ParentRole),
    Child(ChildRole),
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Parent(_) => "parent",
            Role::Child(_) => "child",
        }
    }
}

/// External classifier: inspects a payload and returns a resolved copy of
/// the plan, preserving its role.
pub trait ClassifierResolver {
    fn resolve(
        &self,
        plan: &TranslationPlanLite,
        payload: &str,
    ) -> Result<TranslationPlanLite, PlanError>;
}

/// The concrete plan the engine runs: versioned schemas, morpher tokens,
/// and an attached role.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPlanLite {
    inner: TranslationPlan<VersionedSchema, Morpher>,
    role: Role,
}

impl TranslationPlanLite {
    pub fn new(input: VersionedSchema, output: VersionedSchema) -> Self {
        Self {
            inner: TranslationPlan::new(input, output),
            role: Role::None,
        }
    }

    pub fn with_morphers(
        input: VersionedSchema,
        output: VersionedSchema,
        morphers: Vec<Morpher>,
    ) -> Self {
        Self {
            inner: TranslationPlan::with_morphers(input, output, morphers),
            role: Role::None,
        }
    }

    /// Attach a role at composition time.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn input(&self) -> &VersionedSchema {
        self.inner.first_schema().expect("plan has input schema")
    }

    pub fn output(&self) -> &VersionedSchema {
        self.inner.last_schema().expect("plan has output schema")
    }

    pub fn morphers(&self) -> &[Morpher] {
        self.inner.morphers()
    }

    pub fn has_morphers(&self) -> bool {
        self.inner.has_morphers()
    }

    pub fn add_morpher(&mut self, morpher: Morpher) {
        self.inner.add_morpher(morpher);
    }

    pub fn maybe_add_morpher(&mut self, morpher: Option<Morpher>) {
        self.inner.maybe_add_morpher(morpher);
    }

    pub fn schemas(&self) -> &[VersionedSchema] {
        self.inner.schemas()
    }

    /// Structural check plus the terminal consistency check: after all
    /// resolution steps no schema name may still carry a variable pattern.
    pub fn validate(&self) -> Result<(), PlanError> {
        self.inner.validate()?;
        for schema in self.inner.schemas() {
            if Variables::new(schema.name()).is_present() {
                return Err(PlanError::Unresolved(schema.name().to_string()));
            }
        }
        Ok(())
    }

    /// True when the input schema name still carries a variable pattern.
    pub fn is_unresolved(&self) -> bool {
        Variables::new(self.input().name()).is_present()
    }

    /// The sole variable name in the input schema name, used to pick a
    /// classifier.
    pub fn classifier_name(&self) -> Result<String, PlanError> {
        let variables = Variables::new(self.input().name());
        Ok(variables.get()?.to_string())
    }

    /// Splice a classifier-supplied fragment over the variable in the input
    /// schema name, yielding a new plan with the renamed input schema and
    /// everything else unchanged. The splice is literal text surgery, not a
    /// regex replace.
    pub fn resolve_using(&self, fragment: &str) -> Result<TranslationPlanLite, PlanError> {
        let unresolved = self.input();
        let variables = Variables::new(unresolved.name());
        let name = variables.get()?.to_string();

        if fragment.trim().is_empty() {
            return Err(PlanError::MalformedReplacement);
        }

        let adorned = variables.adorn(&name);
        let resolved_name = splice(unresolved.name(), &adorned, fragment)
            .unwrap_or_else(|| unresolved.name().to_string());
        let renamed = unresolved.rename(resolved_name)?;

        let mut schemas = self.inner.schemas().to_vec();
        schemas[0] = renamed;
        let inner = TranslationPlan {
            schemas,
            morphers: self.inner.morphers().to_vec(),
        };
        Ok(TranslationPlanLite {
            inner,
            role: self.role.clone(),
        })
    }

    /// Fail unless `resolved` kept this plan's role variant. Classifiers are
    /// not permitted to turn a parent into a child or vice versa.
    pub fn validate_lineage(&self, resolved: &TranslationPlanLite) -> Result<(), PlanError> {
        if mem::discriminant(&self.role) != mem::discriminant(&resolved.role) {
            return Err(PlanError::RoleChanged);
        }
        Ok(())
    }

    /// Resolve a whole-payload plan through a classifier. Child plans must
    /// go through [`TranslationPlanLite::resolve_child`] instead.
    pub fn resolve(
        &self,
        classifier: &dyn ClassifierResolver,
        payload: &str,
    ) -> Result<TranslationPlanLite, PlanError> {
        self.must_not_be_child()?;
        classifier.resolve(self, payload)
    }

    /// Resolve a child plan against its own stored sub-payload.
    pub fn resolve_child(
        &self,
        classifier: &dyn ClassifierResolver,
    ) -> Result<TranslationPlanLite, PlanError> {
        let payload = self.child_role()?.payload().to_string();
        classifier.resolve(self, &payload)
    }

    pub fn has_child_role(&self) -> bool {
        matches!(self.role, Role::Child(_))
    }

    pub fn has_parent_role(&self) -> bool {
        matches!(self.role, Role::Parent(_))
    }

    pub fn child_role(&self) -> Result<&ChildRole, PlanError> {
        match &self.role {
            Role::Child(child) => Ok(child),
            other => Err(PlanError::WrongRole {
                wanted: "child",
                found: other.name(),
            }),
        }
    }

    pub fn parent_role(&self) -> Result<&ParentRole, PlanError> {
        match &self.role {
            Role::Parent(parent) => Ok(parent),
            other => Err(PlanError::WrongRole {
                wanted: "parent",
                found: other.name(),
            }),
        }
    }

    /// Add one child plan; requires the parent role on self and the child
    /// role on the argument.
    pub fn add_child(&mut self, child: TranslationPlanLite) -> Result<&mut Self, PlanError> {
        match &mut self.role {
            Role::Parent(parent) => {
                parent.add_child(child)?;
                Ok(self)
            }
            other => Err(PlanError::WrongRole {
                wanted: "parent",
                found: other.name(),
            }),
        }
    }

    pub fn add_children(
        &mut self,
        children: Vec<TranslationPlanLite>,
    ) -> Result<&mut Self, PlanError> {
        for child in children {
            self.add_child(child)?;
        }
        Ok(self)
    }

    /// Children of a parent plan, in insertion order.
    pub fn child_plans(&self) -> Result<&[TranslationPlanLite], PlanError> {
        Ok(self.parent_role()?.child_plans())
    }

    fn must_not_be_child(&self) -> Result<(), PlanError> {
        if self.has_child_role() {
            return Err(PlanError::WrongRole {
                wanted: "parent or none",
                found: self.role.name(),
            });
        }
        Ok(())
    }
}
