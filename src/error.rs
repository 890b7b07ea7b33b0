use std::fmt;

use crate::target::TargetId;

/// Errors that can abort a paged invocation.
///
/// Failures of the wrapped call itself never appear here: they are returned
/// to the caller exactly as `proceed()` produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum PagingError {
    /// The declaration cannot be satisfied by the call target's shape
    Config(ConfigError),
    /// Sort text was malformed or named a property outside the whitelist
    Sort(SortError),
    /// The gating condition could not be evaluated
    Condition(EvalError),
    /// The `start_page` hook refused the invocation
    Hook(HookError),
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagingError::Config(e) => write!(f, "Paging configuration error: {}", e),
            PagingError::Sort(e) => write!(f, "Invalid sort: {}", e),
            PagingError::Condition(e) => write!(f, "Paging condition failed: {}", e),
            PagingError::Hook(e) => write!(f, "Paging hook failed: {}", e),
        }
    }
}

impl std::error::Error for PagingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PagingError::Config(e) => Some(e),
            PagingError::Sort(e) => Some(e),
            PagingError::Condition(e) => Some(e),
            PagingError::Hook(e) => Some(e),
        }
    }
}

impl From<ConfigError> for PagingError {
    fn from(e: ConfigError) -> Self {
        PagingError::Config(e)
    }
}

impl From<SortError> for PagingError {
    fn from(e: SortError) -> Self {
        PagingError::Sort(e)
    }
}

impl From<EvalError> for PagingError {
    fn from(e: EvalError) -> Self {
        PagingError::Condition(e)
    }
}

impl From<HookError> for PagingError {
    fn from(e: HookError) -> Self {
        PagingError::Hook(e)
    }
}

/// A declaration that cannot be satisfied.
///
/// Carries the offending call target (when the error was raised during
/// resolution) so misconfiguration can be diagnosed from the message alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    target: Option<TargetId>,
    kind: ConfigErrorKind,
}

impl ConfigError {
    /// Creates an error raised while resolving `target`.
    pub fn for_target(target: TargetId, kind: ConfigErrorKind) -> Self {
        Self {
            target: Some(target),
            kind,
        }
    }

    /// Creates an error raised while building a declaration.
    pub fn declaration(kind: ConfigErrorKind) -> Self {
        Self { target: None, kind }
    }

    /// Returns the call target the error was raised for, if any.
    pub fn target(&self) -> Option<&TargetId> {
        self.target.as_ref()
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "call target [{}]: {}", target, self.kind),
            None => write!(f, "declaration: {}", self.kind),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The reason a declaration cannot be satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorKind {
    /// The call target declares no parameters at all
    NoParameters,
    /// No parameter is a paging carrier and no names were declared
    NoPagingSource,
    /// The declared argument index is past the end of the parameter list
    IndexOutOfRange {
        /// Declared index
        index: usize,
        /// Number of declared parameters
        len: usize,
    },
    /// The parameter at a forced index does not expose the carrier shape
    NotACarrier {
        /// Declared index
        index: usize,
        /// Static type of the parameter
        type_name: String,
    },
    /// The parameter at the declared index has no field with this name
    MissingField {
        /// Declared index
        index: usize,
        /// Field name that could not be found
        field: String,
    },
    /// No parameter of the call target has this name
    MissingParameter {
        /// Parameter name that could not be found
        name: String,
    },
    /// Parameter names were needed but the call target does not provide them
    ParameterNamesUnavailable,
    /// A numeric default is out of range
    InvalidDefault {
        /// Name of the default
        name: &'static str,
        /// Rejected value
        value: u32,
    },
    /// The default sort text does not parse or violates the whitelist
    InvalidDefaultSort(SortError),
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoParameters => write!(f, "no parameters, paging cannot be derived"),
            Self::NoPagingSource => write!(f, "no paging source available"),
            Self::IndexOutOfRange { index, len } => write!(
                f,
                "argument index {} is out of range for {} parameter(s)",
                index, len
            ),
            Self::NotACarrier { index, type_name } => write!(
                f,
                "parameter {} of type '{}' is not a paging carrier",
                index, type_name
            ),
            Self::MissingField { index, field } => {
                write!(f, "parameter {} has no field '{}'", index, field)
            }
            Self::MissingParameter { name } => write!(f, "no parameter named '{}'", name),
            Self::ParameterNamesUnavailable => write!(f, "parameter names are unavailable"),
            Self::InvalidDefault { name, value } => {
                write!(f, "{} must be at least 1, got {}", name, value)
            }
            Self::InvalidDefaultSort(e) => write!(f, "invalid default sort: {}", e),
        }
    }
}

/// Error returned when sort text cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortError {
    kind: SortErrorKind,
}

impl SortError {
    /// Creates a new sort error.
    pub fn new(kind: SortErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &SortErrorKind {
        &self.kind
    }
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for SortError {}

/// Kind of sort error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortErrorKind {
    /// A condition is not of the form `property:direction`
    MalformedCondition {
        /// The offending condition text
        condition: String,
    },
    /// The direction is neither `asc` nor `desc`
    InvalidDirection {
        /// The offending direction text
        direction: String,
    },
    /// The property is not in the call target's whitelist
    PropertyNotAllowed {
        /// The rejected property
        property: String,
    },
}

impl fmt::Display for SortErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedCondition { condition } => {
                write!(f, "malformed sort condition '{}'", condition)
            }
            Self::InvalidDirection { direction } => {
                write!(f, "illegal sort direction '{}'", direction)
            }
            Self::PropertyNotAllowed { property } => {
                write!(f, "illegal sort property '{}'", property)
            }
        }
    }
}

/// Failure of a gating condition evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    expression: String,
    message: String,
}

impl EvalError {
    /// Creates a new evaluation error for `expression`.
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Returns the expression that failed.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.expression, self.message)
    }
}

impl std::error::Error for EvalError {}

/// Failure reported by a [`PagingHooks`](crate::PagingHooks) implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a new hook error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HookError {}

/// Error returned when reading the call-scoped paging context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// No paging value is published for the current invocation
    NotPublished,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::NotPublished => write!(f, "no paging value is published"),
        }
    }
}

impl std::error::Error for ContextError {}
