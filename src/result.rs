use std::path::PathBuf;

use compact_str::CompactString;
use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, IsrenError>;

/// Failure categories reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyUrl,
    MissingAuth,
    MissingFileOut,
    FileTransformName,
    UnknownOutput,
    CsvTransformOrder,
    FileWriteError,
    StdoutWriteError,
    MissingProject,
    DuplicateProjectGroupName,
    MissingIssues,
    InvalidParameters,
    SslError,
    AuthError,
    TransformType,
    TransformPath,
    TransformError,
    NoImplementation,
    NotImplemented,
    MalformedOptions,
    ConfigError,
    Api,
    General,
}

#[derive(Debug, Error)]
pub enum IsrenError {
    #[error("No hosted git url was given.")]
    EmptyUrl,
    #[error("No authentication token was given, use --auth or set ISREN_AUTH.")]
    MissingAuth,
    #[error("An output file was given but `file` is not one of the selected outputs, add it with --out.")]
    MissingFileOut,
    #[error("The `file` output was selected but no output file name was given, set one with --file.")]
    FileTransformName,
    #[error("Unknown output type: {format}")]
    UnknownOutput { format: CompactString },
    #[error("The csv output needs issue records as input, place it before any json output.")]
    CsvTransformOrder,
    #[error("Failed to write the output file [{}]", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write to standard output")]
    StdoutWrite(#[source] std::io::Error),
    #[error("No project or group was found for {path}, check the url and that the token can access it.")]
    MissingProject { path: CompactString },
    #[error("Both a project and a group are named {path}, the url is ambiguous.")]
    DuplicateProjectGroupName { path: CompactString },
    #[error("The issue listing did not return a list of issues.")]
    MissingIssues,
    #[error("Invalid parameters given to {operation} ({argument}: {value})")]
    InvalidParameters {
        operation: &'static str,
        argument: &'static str,
        value: String,
    },
    #[error("The server certificate could not be verified, use --insecure to skip the check.")]
    Ssl(#[source] ClientError),
    #[error("Authentication failed, check the url and the authentication token.")]
    Auth(#[source] ClientError),
    #[error("Transform files must be scripts (.sh, .py, .js, .mjs or .cjs): {}", path.display())]
    TransformType { path: PathBuf },
    #[error("The transform file could not be read ({})", path.display())]
    TransformPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("The transform {} failed: {message}", path.display())]
    Transform { path: PathBuf, message: String },
    #[error("No git implementation was found for the given url: {url}")]
    NoImplementation { url: CompactString },
    #[error("{operation} is not implemented for {provider}")]
    NotImplemented {
        operation: &'static str,
        provider: CompactString,
    },
    #[error("Malformed {option} given: {message}")]
    MalformedOptions { option: &'static str, message: String },
    #[error("Failure reading configuration file.")]
    Config(#[source] confy::ConfyError),
    #[error(transparent)]
    Api(#[from] ClientError),
    #[error("{0}")]
    General(CompactString),
}

impl IsrenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IsrenError::EmptyUrl => ErrorKind::EmptyUrl,
            IsrenError::MissingAuth => ErrorKind::MissingAuth,
            IsrenError::MissingFileOut => ErrorKind::MissingFileOut,
            IsrenError::FileTransformName => ErrorKind::FileTransformName,
            IsrenError::UnknownOutput { .. } => ErrorKind::UnknownOutput,
            IsrenError::CsvTransformOrder => ErrorKind::CsvTransformOrder,
            IsrenError::FileWrite { .. } => ErrorKind::FileWriteError,
            IsrenError::StdoutWrite(_) => ErrorKind::StdoutWriteError,
            IsrenError::MissingProject { .. } => ErrorKind::MissingProject,
            IsrenError::DuplicateProjectGroupName { .. } => ErrorKind::DuplicateProjectGroupName,
            IsrenError::MissingIssues => ErrorKind::MissingIssues,
            IsrenError::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            IsrenError::Ssl(_) => ErrorKind::SslError,
            IsrenError::Auth(_) => ErrorKind::AuthError,
            IsrenError::TransformType { .. } => ErrorKind::TransformType,
            IsrenError::TransformPath { .. } => ErrorKind::TransformPath,
            IsrenError::Transform { .. } => ErrorKind::TransformError,
            IsrenError::NoImplementation { .. } => ErrorKind::NoImplementation,
            IsrenError::NotImplemented { .. } => ErrorKind::NotImplemented,
            IsrenError::MalformedOptions { .. } => ErrorKind::MalformedOptions,
            IsrenError::Config(_) => ErrorKind::ConfigError,
            IsrenError::Api(_) => ErrorKind::Api,
            IsrenError::General(_) => ErrorKind::General,
        }
    }

    pub fn invalid_parameters(
        operation: &'static str,
        argument: &'static str,
        value: impl std::fmt::Display,
    ) -> Self {
        IsrenError::InvalidParameters { operation, argument, value: value.to_string() }
    }

    pub fn not_implemented(operation: &'static str, provider: impl Into<CompactString>) -> Self {
        IsrenError::NotImplemented { operation, provider: provider.into() }
    }

    /// Classify a failure that happened while opening a session
    pub fn from_authentication(err: ClientError) -> Self {
        if err.is_certificate_error() {
            IsrenError::Ssl(err)
        } else {
            IsrenError::Auth(err)
        }
    }
}
