use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    /// A type reference starting with `array<` that does not follow the collection grammar
    MalformedDirective(String),
    /// A handler's `#[api_doc]` declaration could not be read
    InvalidDeclaration { handler: String, message: String },
    InvalidNamingStrategy(String),
    SerializationError(String),
}

impl Error {
    /// Attaches the offending handler to an error raised while extracting its entry.
    pub fn in_handler(self, handler: &str) -> Self {
        match self {
            Error::InvalidDeclaration { .. } => self,
            other => Error::InvalidDeclaration {
                handler: handler.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::MalformedDirective(directive) => write!(
                f,
                "Malformed collection directive: {}. Proper format is: array<Fully\\Qualified\\ClassName> or array<Fully\\Qualified\\ClassName> as collectionName",
                directive
            ),
            Error::InvalidDeclaration { handler, message } => {
                write!(f, "Invalid api_doc declaration on {}: {}", handler, message)
            }
            Error::InvalidNamingStrategy(name) => write!(
                f,
                "Invalid naming strategy '{}'. Choose from: [\"dot_notation\",\"last_segment_only\"]",
                name
            ),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML error: {}", err))
    }
}

impl From<syn::Error> for Error {
    fn from(err: syn::Error) -> Self {
        Error::ParseError {
            file: PathBuf::from("<unknown>"),
            message: err.to_string(),
        }
    }
}
