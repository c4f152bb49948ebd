use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    FileUnreadable,
    MalformedXml,
    MalformedSnapshot,
    NodeNotFound,
    ParentNotFound,
    DuplicateId,
    CycleDetected,
    InvalidField,
    BackendUnavailable,
    BackendTimeout,
    BackendBadResponse,
    BackendDisabled,
    LauncherFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::FileUnreadable => "E1002",
            Self::MalformedXml => "E1101",
            Self::MalformedSnapshot => "E1102",
            Self::NodeNotFound => "E2001",
            Self::ParentNotFound => "E2002",
            Self::DuplicateId => "E2003",
            Self::CycleDetected => "E2004",
            Self::InvalidField => "E2005",
            Self::BackendUnavailable => "E4001",
            Self::BackendTimeout => "E4002",
            Self::BackendBadResponse => "E4003",
            Self::BackendDisabled => "E4004",
            Self::LauncherFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::FileUnreadable => "Input file could not be read",
            Self::MalformedXml => "Malformed XML document",
            Self::MalformedSnapshot => "Malformed tree snapshot",
            Self::NodeNotFound => "Node not found",
            Self::ParentNotFound => "Parent node not found",
            Self::DuplicateId => "Duplicate node id",
            Self::CycleDetected => "Move would create a cycle",
            Self::InvalidField => "Invalid field value",
            Self::BackendUnavailable => "AI backend unreachable",
            Self::BackendTimeout => "AI backend timed out",
            Self::BackendBadResponse => "AI backend returned an unusable response",
            Self::BackendDisabled => "AI backend disabled",
            Self::LauncherFailed => "Backend launcher failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ptree.toml and retry."),
            Self::FileUnreadable => Some("Check the path and read permissions."),
            Self::MalformedXml => Some("Fix the XML syntax near the reported position."),
            Self::MalformedSnapshot => {
                Some("Editing needs a forest with unique ids and one parent per node. Run `pt analyze` on the file to see what is wrong.")
            }
            Self::NodeNotFound => Some("Use `pt tree` to list node ids."),
            Self::ParentNotFound => Some("Pick an existing parent id from `pt tree`."),
            Self::DuplicateId => Some("Give every element a distinct `id` attribute."),
            Self::CycleDetected => Some("A node cannot be moved under itself or a descendant."),
            Self::InvalidField => None,
            Self::BackendUnavailable => {
                Some("Start the backend with `pt backend start` or check [ai] endpoint.")
            }
            Self::BackendTimeout => Some("Raise [ai] timeout_secs or use a smaller model."),
            Self::BackendBadResponse => Some("Check that [ai] backend matches the server type."),
            Self::BackendDisabled => Some("Set [ai] backend to ollama, openai or service."),
            Self::LauncherFailed => Some("Check the [launcher] command and its logs."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the tree model, importer and snapshot conversion.
///
/// Every error is local to the operation that raised it: a failed import
/// produces no tree, a failed mutation leaves the tree untouched.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("malformed XML at byte {position}: {message}")]
    Parse { message: String, position: u64 },

    #[error("node '{id}' not found")]
    NotFound { id: String },

    #[error("parent node '{id}' not found")]
    ParentNotFound { id: String },

    #[error("duplicate node id '{id}'")]
    DuplicateId { id: String },

    #[error("cannot move '{id}' under '{parent}': it would create a cycle")]
    Cycle { id: String, parent: String },

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TreeError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse { .. } => ErrorCode::MalformedXml,
            Self::NotFound { .. } => ErrorCode::NodeNotFound,
            Self::ParentNotFound { .. } => ErrorCode::ParentNotFound,
            Self::DuplicateId { .. } => ErrorCode::DuplicateId,
            Self::Cycle { .. } => ErrorCode::CycleDetected,
            Self::Snapshot(_) => ErrorCode::MalformedSnapshot,
            Self::Validation(_) => ErrorCode::InvalidField,
            Self::Io { .. } => ErrorCode::FileUnreadable,
        }
    }

    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}
