//! Validation report types for structured error reporting.
//!
//! Validation never aborts a compile: every problem becomes a
//! [`ValidationIssue`] so a degraded interface can still be built.

use serde::Serialize;
use std::fmt;

/// The result of validating a configuration or loading results.
///
/// Contains all issues found, categorized by severity.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// All issues found during validation.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns true if any issue carries `code`.
    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// Issues with the given code.
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// The severity of the issue.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Context about where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    /// Creates a new validation issue.
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a new error.
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    /// Creates a new warning.
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {} in {}: {}",
            severity,
            self.code.as_str(),
            self.context,
            self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but harmless.
    Warning,
    /// The affected element or result cannot work as declared.
    Error,
}

/// A stable code identifying the type of validation issue.
///
/// The serialized form matches the codes hosts already display
/// (`ERR_REQUIRED`, `ERR_TAG_NOT_FOUND`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    /// A required attribute (`name`, `toname`, `value`, ...) is missing.
    #[serde(rename = "ERR_REQUIRED")]
    Required,
    /// The tag is not known to the element registry.
    #[serde(rename = "ERR_UNKNOWN_TAG")]
    UnknownTag,
    /// `toname` points at a name that does not exist.
    #[serde(rename = "ERR_TAG_NOT_FOUND")]
    TagNotFound,
    /// `toname` points at a tag the control cannot annotate.
    #[serde(rename = "ERR_TAG_UNSUPPORTED")]
    TagUnsupported,
    /// An attribute value fails its type constraint.
    #[serde(rename = "ERR_BAD_TYPE")]
    BadType,
    /// Two elements share one name.
    #[serde(rename = "ERR_DUPLICATE_NAME")]
    DuplicateName,
    /// Anything else, e.g. a failure while loading results.
    #[serde(rename = "ERR_GENERAL")]
    General,
    /// A repeater produced no copies: its `on` source is missing, not an
    /// array, or empty.
    #[serde(rename = "WARN_EMPTY_REPEATER")]
    EmptyRepeater,
    /// One control lists the same label or choice value twice.
    #[serde(rename = "WARN_DUPLICATE_LABEL")]
    DuplicateLabel,
}

impl IssueCode {
    /// The stable string form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::Required => "ERR_REQUIRED",
            IssueCode::UnknownTag => "ERR_UNKNOWN_TAG",
            IssueCode::TagNotFound => "ERR_TAG_NOT_FOUND",
            IssueCode::TagUnsupported => "ERR_TAG_UNSUPPORTED",
            IssueCode::BadType => "ERR_BAD_TYPE",
            IssueCode::DuplicateName => "ERR_DUPLICATE_NAME",
            IssueCode::General => "ERR_GENERAL",
            IssueCode::EmptyRepeater => "WARN_EMPTY_REPEATER",
            IssueCode::DuplicateLabel => "WARN_DUPLICATE_LABEL",
        }
    }
}

/// Context about where a validation issue occurred.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum IssueContext {
    /// Issue with the configuration as a whole.
    Config,
    /// Issue with one configuration element.
    Element { tag: String, name: String },
    /// Issue with one attribute of an element.
    Attribute {
        tag: String,
        name: String,
        attribute: String,
    },
    /// Issue raised while loading an annotation's results.
    Annotation { id: String },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Config => write!(f, "config"),
            IssueContext::Element { tag, name } => write!(f, "<{}> '{}'", tag, name),
            IssueContext::Attribute {
                tag,
                name,
                attribute,
            } => write!(f, "<{}> '{}' attribute '{}'", tag, name, attribute),
            IssueContext::Annotation { id } => write!(f, "annotation {}", id),
        }
    }
}
