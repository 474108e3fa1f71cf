use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error during file I/O operations
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Read, write or rename failure on the SSH config file or identity store
    #[error("{context}: {source}")]
    ConfigIo {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// Error during JSON serialization or deserialization
    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Error when user input fails.
    #[error("inquire error: {0}")]
    Inquire(#[from] inquire::InquireError),
    /// Error when executing Git commands
    #[error("git command failed: {0}")]
    GitCommand(String),
    /// Error when current directory is not a Git repository
    #[error("not a git repository")]
    NotARepository,
    /// Error during input validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Error when specific identity alias is not found.
    #[error("identity not found: '{0}'")]
    IdentityNotFound(String),
    /// Error when adding an identity whose alias is already taken.
    #[error("identity with alias '{0}' already exists")]
    AliasConflict(String),
    /// Error during UTF-8 conversion.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
    /// A step of a multi-step operation failed; earlier steps stay applied.
    #[error("{step}: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Builds a closure mapping an `io::Error` into [`AppError::ConfigIo`].
    pub fn config_io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> AppError {
        let context = context.into();
        move |source| AppError::ConfigIo { context, source }
    }
}

/// Attaches the name of the failing step to an error.
pub trait StepContext<T> {
    fn step(self, step: &str) -> Result<T, AppError>;
}

impl<T> StepContext<T> for Result<T, AppError> {
    fn step(self, step: &str) -> Result<T, AppError> {
        self.map_err(|source| AppError::Step {
            step: step.to_string(),
            source: Box::new(source),
        })
    }
}
