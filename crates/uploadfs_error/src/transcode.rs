//! Image transcoding error types.

/// Kinds of transcode errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum TranscodeErrorKind {
    /// The external tool could not be started
    #[display("Failed to spawn {}: {}", tool, reason)]
    Spawn {
        /// Tool name
        tool: String,
        /// Reason reported by the OS
        reason: String,
    },
    /// The external tool exited unsuccessfully
    #[display("{} exited with {}: {}", tool, status, stderr)]
    Failed {
        /// Tool name
        tool: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },
    /// The tool produced output that could not be understood
    #[display("Malformed output: {}", _0)]
    MalformedOutput(String),
    /// The image format is not supported
    #[display("Unsupported image: {}", _0)]
    Unsupported(String),
    /// Decoding the image failed
    #[display("Decode failed: {}", _0)]
    Decode(String),
    /// Encoding a derivative failed
    #[display("Encode failed: {}", _0)]
    Encode(String),
    /// The requested crop does not fit the image
    #[display("Invalid crop: {}", _0)]
    InvalidCrop(String),
    /// Reading or writing a workspace file failed
    #[display("Workspace I/O failure: {}", _0)]
    Io(String),
}

/// Transcode error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transcode Error: {} at line {} in {}", kind, line, file)]
pub struct TranscodeError {
    /// The kind of error that occurred
    pub kind: TranscodeErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl TranscodeError {
    /// Create a new transcode error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: TranscodeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
