use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// The only conditions under which a parse request returns nothing but an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("could not open workbook '{filename}': {detail}")]
    MalformedFile { filename: String, detail: String },
    #[error("workbook '{filename}' contains no worksheets")]
    NoWorksheets { filename: String },
}

impl ParseError {
    /// Message for the failure envelope's `detail` field.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// Taxonomy definition defects, raised while building the registry.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("duplicate taxonomy key '{0}'")]
    DuplicateKey(String),
    #[error("alias '{alias}' is claimed by both '{first}' and '{second}'")]
    AmbiguousAlias {
        alias: String,
        first: String,
        second: String,
    },
    #[error("'{0}' has an alias that normalizes to an empty string")]
    EmptyAlias(String),
    #[error("'{0}' has a valid_range with min > max")]
    InvalidRange(String),
    #[error("'{0}' is enumerated but lists no enum_values")]
    MissingEnumValues(String),
    #[error("'{key}' uses unknown unit '{unit}'")]
    UnknownUnit { key: String, unit: String },
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid taxonomy JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<TaxonomyError> for AppError {
    fn from(err: TaxonomyError) -> Self {
        AppError::new(3, format!("Taxonomy configuration error: {err}"))
    }
}
