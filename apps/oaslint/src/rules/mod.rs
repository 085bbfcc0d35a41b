//! Lint rules and the rule registry.
//!
//! A rule is anything implementing `Rule`: a stable id, a default severity,
//! and a `check` over the read-only normalized document. Rules report
//! `Violation`s; the engine stamps them with the rule id and the effective
//! severity, so a rule cannot mislabel its own output.
//!
//! Built-in rules:
//! - `naming-granularity`: generic verbs as operationId or path segment.
//! - `missing-response-schema`: 2xx responses without a schema.
//! - `duplicate-operation-id`: operationId shared by several operations.
//! - `unused-component`: component schemas no operation reaches.
//! - `missing-operation-id`: operations without an operationId.
//! - `path-parameter-mismatch`: template placeholders vs declared path params.

mod components;
mod naming;
mod operation_ids;
mod parameters;
mod responses;

pub use components::UnusedComponent;
pub use naming::NamingGranularity;
pub use operation_ids::{DuplicateOperationId, MissingOperationId};
pub use parameters::PathParameterMismatch;
pub use responses::MissingResponseSchema;

use crate::config::RulesCfg;
use crate::error::{ConfigError, RuleError};
use crate::models::openapi::OpenApiDocument;
use crate::models::{Severity, SourceSpan};

/// Rule id used for findings synthesized from a failing rule.
pub const RULE_FAILURE: &str = "rule-failure";
/// Rule ids used for findings synthesized from structural anomalies.
pub const UNRESOLVED_REFERENCE: &str = "unresolved-reference";
pub const MISSING_VERSION: &str = "missing-version";
pub const STRUCTURAL_ANOMALY: &str = "structural-anomaly";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One problem reported by a rule, before severity is attached.
pub struct Violation {
    pub location: String,
    pub message: String,
    pub span: SourceSpan,
    pub related: Vec<SourceSpan>,
}

impl Violation {
    pub fn new(location: impl Into<String>, message: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            span,
            related: Vec::new(),
        }
    }

    pub fn with_related(mut self, related: Vec<SourceSpan>) -> Self {
        self.related = related;
        self
    }
}

pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;
    fn default_severity(&self) -> Severity;
    fn description(&self) -> &'static str;
    fn check(&self, doc: &OpenApiDocument) -> Result<Vec<Violation>, RuleError>;
}

/// A rule together with the severity it reports at.
pub struct RegisteredRule {
    pub rule: Box<dyn Rule>,
    pub severity: Severity,
}

impl RegisteredRule {
    pub fn id(&self) -> &'static str {
        self.rule.id()
    }
}

#[derive(Default)]
/// Declarative registry of independent rules. Registration order does not
/// affect reports.
pub struct RuleSet {
    rules: Vec<RegisteredRule>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All built-in rules at their default severities.
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.register(Box::new(NamingGranularity));
        set.register(Box::new(MissingResponseSchema));
        set.register(Box::new(DuplicateOperationId));
        set.register(Box::new(UnusedComponent));
        set.register(Box::new(MissingOperationId));
        set.register(Box::new(PathParameterMismatch));
        set
    }

    /// Built-in rules adjusted by the `[rules]` config section.
    pub fn from_config(cfg: &RulesCfg) -> Result<Self, ConfigError> {
        let mut set = Self::builtin();
        set.apply(cfg)?;
        Ok(set)
    }

    /// Add `rule`, replacing any rule registered under the same id.
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.retain(|r| r.id() != rule.id());
        let severity = rule.default_severity();
        self.rules.push(RegisteredRule { rule, severity });
    }

    pub fn without(mut self, id: &str) -> Self {
        self.rules.retain(|r| r.id() != id);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.id() == id)
    }

    pub fn set_severity(&mut self, id: &str, severity: Severity) -> bool {
        match self.rules.iter_mut().find(|r| r.id() == id) {
            Some(r) => {
                r.severity = severity;
                true
            }
            None => false,
        }
    }

    /// Apply disabled ids and severity overrides. Unknown ids are errors.
    pub fn apply(&mut self, cfg: &RulesCfg) -> Result<(), ConfigError> {
        for (id, value) in &cfg.severity {
            let severity = Severity::parse(value).ok_or_else(|| ConfigError::InvalidSeverity {
                rule: id.clone(),
                value: value.clone(),
            })?;
            if !self.set_severity(id, severity) {
                return Err(ConfigError::UnknownRule(id.clone()));
            }
        }
        for id in &cfg.disabled {
            if !self.contains(id) {
                return Err(ConfigError::UnknownRule(id.clone()));
            }
            self.rules.retain(|r| r.id() != id.as_str());
        }
        Ok(())
    }

    pub fn rules(&self) -> &[RegisteredRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::loader::load;
    use crate::models::openapi::OpenApiDocument;
    use crate::normalize::normalize;

    pub fn doc(text: &str) -> OpenApiDocument {
        normalize(&load(text).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_builtin_ids_are_unique() {
        let set = RuleSet::builtin();
        let mut ids: Vec<_> = set.rules().iter().map(|r| r.id()).collect();
        let n = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), n);
        assert!(set.contains("naming-granularity"));
        assert!(set.contains("missing-response-schema"));
        assert!(set.contains("duplicate-operation-id"));
        assert!(set.contains("unused-component"));
    }

    #[test]
    fn test_apply_config_disables_and_overrides() {
        let mut severity = BTreeMap::new();
        severity.insert("unused-component".to_string(), "warn".to_string());
        let cfg = RulesCfg {
            disabled: vec!["missing-operation-id".into()],
            severity,
        };
        let set = RuleSet::from_config(&cfg).unwrap();
        assert!(!set.contains("missing-operation-id"));
        let unused = set
            .rules()
            .iter()
            .find(|r| r.id() == "unused-component")
            .unwrap();
        assert_eq!(unused.severity, Severity::Warning);
    }

    #[test]
    fn test_apply_config_rejects_unknown_rule_and_bad_severity() {
        let cfg = RulesCfg {
            disabled: vec!["no-such-rule".into()],
            severity: BTreeMap::new(),
        };
        assert!(matches!(
            RuleSet::from_config(&cfg),
            Err(ConfigError::UnknownRule(id)) if id == "no-such-rule"
        ));

        let mut severity = BTreeMap::new();
        severity.insert("naming-granularity".to_string(), "loud".to_string());
        let cfg = RulesCfg {
            disabled: vec![],
            severity,
        };
        assert!(matches!(
            RuleSet::from_config(&cfg),
            Err(ConfigError::InvalidSeverity { .. })
        ));
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut set = RuleSet::empty();
        set.register(Box::new(NamingGranularity));
        set.register(Box::new(NamingGranularity));
        assert_eq!(set.len(), 1);
        assert!(set.without("naming-granularity").is_empty());
    }
}
