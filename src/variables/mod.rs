//! Variable pattern engine
//!
//! Scans arbitrary strings for `${name}`, `${name=default}` and
//! wildcard-indexed `${name[*]}` occurrences. Schema names carry at most one
//! variable (resolved by a classifier); templates may carry many.
//!
//! Substitution is a plain index-based substring splice, never a regex
//! replace: `$`, `{` and `}` are all regex metacharacters and must be treated
//! as literal text.

use once_cell::sync::Lazy;
use regex::Regex;

static PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern"));

/// Error scanning a string for variables.
#[derive(Debug, thiserror::Error)]
pub enum VariableError {
    #[error("no variable name present in: {0}")]
    NoneFound(String),
    #[error("more than one variable present in: {0}")]
    Multiple(String),
}

/// One variable occurrence found in a scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    name: String,
    default: Option<String>,
    wildcard: bool,
    token: String,
    start: usize,
}

impl Finding {
    /// Variable name, without any `=default` or `[*]` decoration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default value carried by `${name=default}`, if any.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// True for wildcard-indexed occurrences such as `${name[*]}`.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// The exact matched token, e.g. `${ADD[*]}`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Byte offset of the token in the scanned string.
    pub fn start(&self) -> usize {
        self.start
    }
}

/// The result of scanning one string for variable occurrences.
///
/// Findings keep first-occurrence order; repeated names collapse onto the
/// first finding. An empty or blank input yields an empty scan, never an
/// error.
#[derive(Debug, Clone)]
pub struct Variables {
    raw: String,
    findings: Vec<Finding>,
}

impl Variables {
    pub fn new(text: impl Into<String>) -> Self {
        let raw = text.into();
        let findings = scan(&raw);
        Self { raw, findings }
    }

    /// Scan `text` and return the findings, unique by name, in
    /// first-occurrence order.
    pub fn parse(text: &str) -> Vec<Finding> {
        scan(text)
    }

    /// The original scanned string, for error messages.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_present(&self) -> bool {
        !self.findings.is_empty()
    }

    /// True when at least two distinct variable names were found.
    pub fn has_multiple(&self) -> bool {
        self.findings.len() >= 2
    }

    /// Findings in first-occurrence order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn find(&self, name: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.name == name)
    }

    /// The sole variable name. Fails when none is present or when more than
    /// one distinct name appears (schema-name resolution requires exactly
    /// one).
    pub fn get(&self) -> Result<&str, VariableError> {
        if !self.is_present() {
            return Err(VariableError::NoneFound(self.raw.clone()));
        }
        if self.has_multiple() {
            return Err(VariableError::Multiple(self.raw.clone()));
        }
        Ok(self.findings[0].name())
    }

    /// The decorated token that must be located in the source to substitute
    /// `name`. When the name was found in this scan the original matched
    /// span is returned, so defaults and wildcard decorations survive.
    pub fn adorn(&self, name: &str) -> String {
        match self.find(name) {
            Some(finding) => finding.token.clone(),
            None => format!("${{{name}}}"),
        }
    }
}

/// Replace the first occurrence of the literal `token` in `source` with
/// `replacement`, by index splice. Returns `None` when the token is absent.
pub fn splice(source: &str, token: &str, replacement: &str) -> Option<String> {
    let here = source.find(token)?;
    let mut out = String::with_capacity(source.len() - token.len() + replacement.len());
    out.push_str(&source[..here]);
    out.push_str(replacement);
    out.push_str(&source[here + token.len()..]);
    Some(out)
}

fn scan(text: &str) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();

    for caps in PATTERN.captures_iter(text) {
        let whole = caps.get(0).expect("match");
        let inner = &caps[1];

        let (body, default) = match inner.split_once('=') {
            Some((name, default)) => (name, Some(default.to_string())),
            None => (inner, None),
        };

        let (name, wildcard) = match body.strip_suffix("[*]") {
            Some(stripped) => (stripped, true),
            None => (body, false),
        };

        if name.is_empty() {
            continue;
        }
        if findings.iter().any(|f| f.name == name) {
            continue;
        }

        findings.push(Finding {
            name: name.to_string(),
            default,
            wildcard,
            token: whole.as_str().to_string(),
            start: whole.start(),
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_variable() {
        let vars = Variables::new("abcdef");
        assert!(!vars.is_present());
        assert!(!vars.has_multiple());
        assert!(matches!(vars.get(), Err(VariableError::NoneFound(_))));
    }

    #[test]
    fn test_empty_input_is_empty_not_error() {
        let vars = Variables::new("");
        assert!(vars.findings().is_empty());
        assert!(Variables::parse("").is_empty());
    }

    #[test]
    fn test_single_variable() {
        let vars = Variables::new("${abcdef}");
        assert!(vars.is_present());
        assert_eq!(vars.get().unwrap(), "abcdef");
        assert_eq!(vars.adorn("abcdef"), "${abcdef}");
    }

    #[test]
    fn test_single_variable_with_default() {
        let vars = Variables::new("${abcdefghijklmnopqrstuvwxyz=123456790}");
        assert_eq!(vars.get().unwrap(), "abcdefghijklmnopqrstuvwxyz");
        let finding = vars.find("abcdefghijklmnopqrstuvwxyz").unwrap();
        assert_eq!(finding.default(), Some("123456790"));
        // The adorned token is the original span, default included.
        assert_eq!(
            vars.adorn("abcdefghijklmnopqrstuvwxyz"),
            "${abcdefghijklmnopqrstuvwxyz=123456790}"
        );
    }

    #[test]
    fn test_multiple_variables() {
        let vars = Variables::new("${abcdef}${ghijkl}${mnopq}");
        assert!(vars.has_multiple());
        assert!(matches!(vars.get(), Err(VariableError::Multiple(_))));
        let names: Vec<_> = vars.findings().iter().map(Finding::name).collect();
        assert_eq!(names, vec!["abcdef", "ghijkl", "mnopq"]);
    }

    #[test]
    fn test_multiple_with_defaults() {
        let vars = Variables::new("${abcdef=123}${ghijkl=1234567890}");
        assert!(vars.has_multiple());
        assert_eq!(vars.find("abcdef").unwrap().default(), Some("123"));
        assert_eq!(vars.find("ghijkl").unwrap().default(), Some("1234567890"));
    }

    #[test]
    fn test_repeated_name_collapses() {
        let vars = Variables::new("${a} and ${a} again");
        assert!(!vars.has_multiple());
        assert_eq!(vars.get().unwrap(), "a");
        assert_eq!(vars.findings().len(), 1);
        assert_eq!(vars.findings()[0].start(), 0);
    }

    #[test]
    fn test_wildcard_variable() {
        let vars = Variables::new("${ADD[*]}");
        let finding = vars.find("ADD").unwrap();
        assert!(finding.is_wildcard());
        assert_eq!(finding.token(), "${ADD[*]}");
        assert_eq!(vars.adorn("ADD"), "${ADD[*]}");
    }

    #[test]
    fn test_embedded_variable_span() {
        let vars = Variables::new("widget-${KIND}-v2");
        let finding = vars.find("KIND").unwrap();
        assert_eq!(finding.start(), 7);
        assert_eq!(finding.token(), "${KIND}");
    }

    #[test]
    fn test_splice_is_literal_not_regex() {
        // A regex replace would trip over ${...}; the splice must not.
        let out = splice("widget-${KIND}", "${KIND}", "acme").unwrap();
        assert_eq!(out, "widget-acme");
        assert_eq!(splice("no token here", "${KIND}", "acme"), None);
        assert_eq!(
            splice("a${X}b${X}", "${X}", "1").unwrap(),
            "a1b${X}",
            "only the first occurrence is spliced"
        );
    }
}
