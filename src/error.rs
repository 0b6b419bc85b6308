use thiserror::Error;

/// Errors produced while parsing item strings, resolving item level
/// curves, working with the binary store, or rendering exports.
#[derive(Debug, Error)]
pub enum Error {
    /// A textual item string could not be parsed.
    #[error("invalid item string: {0:?}")]
    InvalidItemString(String),

    /// A modifier list had an odd length, or a derived item level
    /// sentinel was combined with other modifiers or bonuses.
    #[error("invalid mods: {0:?}")]
    InvalidMods(Vec<i32>),

    /// A curve had no points, or the requested player level could not
    /// be bracketed by two points.
    #[error("invalid curve points")]
    InvalidCurve,

    /// An export field spec named a field this crate doesn't know.
    #[error("unsupported export field: {0:?}")]
    InvalidFieldName(String),

    /// A value that must be numeric wasn't.
    #[error("expected a numeric value: {0:?}")]
    InvalidValueType(String),

    /// No scan metadata was available at export time.
    #[error("no scan metadata available for export")]
    MissingMeta,

    /// An export requested realms that aren't in the scan metadata.
    #[error("realms not present in scan metadata: {0:?}")]
    InvalidRealmSet(Vec<String>),

    #[error(transparent)]
    Decode(#[from] prost::DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
