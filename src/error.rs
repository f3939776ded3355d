//! Error types for the REPL.
//!
//! One enum covers the HTTP client, the execution modes, the command layer
//! and process bootstrap.  From a caller's point of view every transport,
//! status and decoding failure is an "API error"; see [`Error::is_api`].

use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// A boxed error accepted by the constructors.
pub type BoxError = Box<dyn error::Error + Send + Sync>;

/// A shared cause kept inside an [`Error`] so that it stays `Clone`.
pub type SharedError = Arc<dyn error::Error + Send + Sync>;

/// The main error type for the REPL.
#[derive(Clone, Debug)]
pub enum Error {
    /// The server answered with a non-success status.
    Api {
        /// Status returned by the server.
        status_code: u16,
        /// The server's `error` field, or the raw body.
        message: String,
    },

    /// The server could not be reached.
    Connection {
        /// What went wrong.
        message: String,
        /// Transport-level cause, if known.
        source: Option<SharedError>,
    },

    /// A request did not finish in time.
    Timeout {
        /// What timed out.
        message: String,
        /// The limit that was exceeded, in seconds.
        duration: Option<f64>,
    },

    /// The HTTP client failed for a reason other than connect or timeout.
    HttpClient {
        /// What went wrong.
        message: String,
        /// Cause reported by the client.
        source: Option<SharedError>,
    },

    /// A body or line could not be encoded or decoded.
    Serialization {
        /// What could not be decoded.
        message: String,
        /// Cause reported by the decoder.
        source: Option<SharedError>,
    },

    /// The transport failed part way through a streamed reply.
    Streaming {
        /// What went wrong.
        message: String,
        /// Assistant text received before the failure.
        partial_content: String,
        /// Cause reported by the transport.
        source: Option<SharedError>,
    },

    /// The configured model is not installed on the host.
    ModelNotFound {
        /// The model that was asked for.
        model: String,
        /// What the host does have, sorted.
        available: Vec<String>,
    },

    /// A mode tag outside llm, code and shell.
    UnknownMode {
        /// The tag as typed.
        tag: String,
    },

    /// A required setting is missing or malformed.
    Configuration {
        /// Which setting and why.
        message: String,
    },

    /// Local I/O failed.
    Io {
        /// What was being done.
        message: String,
        /// The operating system's error.
        source: Arc<io::Error>,
    },

    /// A file to ingest does not exist.
    FileNotFound {
        /// The path as given.
        path: PathBuf,
    },

    /// A file to ingest exists but may not be read.
    FileNotReadable {
        /// The path as given.
        path: PathBuf,
    },

    /// The user pressed Ctrl+C during the operation.
    Interrupted,

    /// Anything not covered above.
    Unknown {
        /// Description.
        message: String,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(SharedError::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(SharedError::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(SharedError::from),
        }
    }

    /// Creates a new streaming error with no partial content.
    pub fn streaming(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::Streaming {
            message: message.into(),
            partial_content: String::new(),
            source: source.map(SharedError::from),
        }
    }

    /// Creates a new model-not-found error.
    pub fn model_not_found(model: impl Into<String>, available: Vec<String>) -> Self {
        Error::ModelNotFound {
            model: model.into(),
            available,
        }
    }

    /// Creates a new unknown-mode error.
    pub fn unknown_mode(tag: impl Into<String>) -> Self {
        Error::UnknownMode { tag: tag.into() }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new file-not-found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Creates a new file-not-readable error.
    pub fn file_not_readable(path: impl Into<PathBuf>) -> Self {
        Error::FileNotReadable { path: path.into() }
    }

    /// Creates a new unclassified error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
        }
    }

    /// Attaches the assistant text received so far to a streaming failure.
    ///
    /// Other variants are converted into a streaming error that keeps their
    /// rendered message.
    pub fn with_partial_content(self, partial: impl Into<String>) -> Self {
        let partial_content = partial.into();
        match self {
            Error::Streaming {
                message, source, ..
            } => Error::Streaming {
                message,
                partial_content,
                source,
            },
            other => Error::Streaming {
                message: other.to_string(),
                partial_content,
                source: Some(Arc::new(other) as SharedError),
            },
        }
    }

    /// Returns true if this error came from talking to the model server.
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Error::Api { .. }
                | Error::Connection { .. }
                | Error::Timeout { .. }
                | Error::HttpClient { .. }
                | Error::Serialization { .. }
                | Error::Streaming { .. }
        )
    }

    /// Returns true if the server could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if the configured model is missing from the host.
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, Error::ModelNotFound { .. })
    }

    /// Returns true for a missing or malformed setting.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Returns true if the user interrupted the operation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    /// The HTTP status, for errors the server answered.
    pub fn status_code(&self) -> Option<u16> {
        if let Error::Api { status_code, .. } = self {
            Some(*status_code)
        } else {
            None
        }
    }

    /// Returns the partial assistant text carried by a streaming failure.
    pub fn partial_content(&self) -> Option<&str> {
        if let Error::Streaming {
            partial_content, ..
        } = self
        {
            Some(partial_content)
        } else {
            None
        }
    }

    /// Returns the model list carried by a model-not-found error.
    pub fn available_models(&self) -> Option<&[String]> {
        if let Error::ModelNotFound { available, .. } = self {
            Some(available)
        } else {
            None
        }
    }

    /// A short, stable name for the variant; used when reporting
    /// unclassified errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Api { .. } => "ApiError",
            Error::Connection { .. } => "ConnectionError",
            Error::Timeout { .. } => "TimeoutError",
            Error::HttpClient { .. } => "HttpClientError",
            Error::Serialization { .. } => "SerializationError",
            Error::Streaming { .. } => "StreamingError",
            Error::ModelNotFound { .. } => "ModelNotFoundError",
            Error::UnknownMode { .. } => "UnknownModeError",
            Error::Configuration { .. } => "ConfigurationError",
            Error::Io { .. } => "IoError",
            Error::FileNotFound { .. } => "FileNotFoundError",
            Error::FileNotReadable { .. } => "FileNotReadableError",
            Error::Interrupted => "Interrupted",
            Error::Unknown { .. } => "UnknownError",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                message,
            } => write!(f, "API error ({status_code}): {message}"),
            Error::Connection { message, .. } => write!(f, "Cannot connect: {message}"),
            Error::Timeout {
                message,
                duration: Some(seconds),
            } => write!(f, "Timed out after {seconds}s: {message}"),
            Error::Timeout { message, .. } => write!(f, "Timed out: {message}"),
            Error::HttpClient { message, .. } => write!(f, "HTTP error: {message}"),
            Error::Serialization { message, .. } => write!(f, "Decoding error: {message}"),
            Error::Streaming {
                message,
                partial_content,
                ..
            } if partial_content.is_empty() => write!(f, "Streaming error: {message}"),
            Error::Streaming {
                message,
                partial_content,
                ..
            } => write!(
                f,
                "Streaming error: {message} (after {} bytes of response)",
                partial_content.len()
            ),
            Error::ModelNotFound { model, available } if available.is_empty() => {
                write!(f, "Model '{model}' not found; the host reports no models")
            }
            Error::ModelNotFound { model, available } => write!(
                f,
                "Model '{model}' not found; available: {}",
                available.join(", ")
            ),
            Error::UnknownMode { tag } => write!(f, "Unknown mode: {tag}"),
            Error::Configuration { message } => write!(f, "Configuration error: {message}"),
            Error::Io { message, .. } => write!(f, "{message}"),
            Error::FileNotFound { path } => write!(f, "File not found: {}", path.display()),
            Error::FileNotReadable { path } => {
                write!(f, "File not readable: {}", path.display())
            }
            Error::Interrupted => write!(f, "Interrupted"),
            Error::Unknown { message } => write!(f, "{message}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        let shared = match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. }
            | Error::Streaming { source, .. } => source.as_ref(),
            Error::Io { source, .. } => return Some(source.as_ref()),
            _ => None,
        };
        shared.map(|cause| cause.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("invalid JSON: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for REPL operations.
pub type Result<T> = std::result::Result<T, Error>;
