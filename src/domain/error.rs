//! Domain error types.

/// Errors raised while parsing a comma-separated item tag list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemListError {
    #[error("empty token in item list")]
    EmptyToken,

    #[error("duplicate item: {0}")]
    DuplicateItem(String),

    #[error("invalid holding '{entry}': {reason}")]
    InvalidHolding { entry: String, reason: String },
}

/// Top-level error type for skytrader.
#[derive(Debug, thiserror::Error)]
pub enum SkytraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ItemList(#[from] ItemListError),

    #[error("failed to fetch {item_tag}: {reason}")]
    Fetch { item_tag: String, reason: String },

    #[error("insufficient data for {item_tag}: have {rows} rows, need {minimum}")]
    InsufficientData {
        item_tag: String,
        rows: usize,
        minimum: usize,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SkytraderError {
    pub fn fetch(item_tag: &str, reason: impl ToString) -> Self {
        SkytraderError::Fetch {
            item_tag: item_tag.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl ToString) -> Self {
        SkytraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<&SkytraderError> for std::process::ExitCode {
    fn from(err: &SkytraderError) -> Self {
        let code: u8 = match err {
            SkytraderError::Io(_) | SkytraderError::Report { .. } => 1,
            SkytraderError::ConfigParse { .. }
            | SkytraderError::ConfigMissing { .. }
            | SkytraderError::ConfigInvalid { .. } => 2,
            SkytraderError::Fetch { .. } => 3,
            SkytraderError::ItemList(_) => 4,
            SkytraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
