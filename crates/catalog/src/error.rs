use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Scan error: {0}")]
    ScanError(String),

    #[error("Unable to open data file \"{path}\" for reading: {reason}")]
    Open { path: String, reason: String },

    #[error(
        "Dimension variable \"{axis}\" type mismatch ({expected} vs {found}); \
         possible duplicate axis name with incompatible type"
    )]
    AxisTypeMismatch {
        axis: String,
        expected: String,
        found: String,
    },

    #[error("Dimension variable \"{axis}\" missing from file \"{file}\", but present in other files")]
    MissingCoordinate { axis: String, file: String },

    #[error("Dimension variable \"{axis}\" is malformed: {reason}")]
    MalformedAxis { axis: String, reason: String },

    #[error("Dimension variable \"{axis}\" has unsupported datatype \"{datatype}\"")]
    UnsupportedAxisType { axis: String, datatype: String },

    #[error("Variable \"{variable}\" is malformed: {reason}")]
    MalformedVariable { variable: String, reason: String },

    #[error("Axis \"{axis}\" has inconsistent {what} across files")]
    AxisMismatch { axis: String, what: String },

    #[error("Variable \"{variable}\" has inconsistent {what} across files")]
    VariableMismatch { variable: String, what: String },

    #[error(
        "Variable \"{variable}\" slice {slice} is stored in file \"{existing}\" \
         and again in file \"{file}\""
    )]
    DuplicateLocation {
        variable: String,
        slice: String,
        existing: String,
        file: String,
    },

    #[error("Attribute key \"{0}\" already exists")]
    DuplicateAttribute(String),

    #[error("Malformed catalog {entity}: {message}")]
    Parse { entity: String, message: String },
}

impl CatalogError {
    pub(crate) fn parse(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            entity: entity.into(),
            message: message.into(),
        }
    }
}
