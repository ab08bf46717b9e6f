pub type TopotrackResult<T> = Result<T, TopotrackError>;

/// What a failed lookup was looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    Template,
    Variable,
    Preset,
    Format,
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Template => "template",
            Self::Variable => "variable",
            Self::Preset => "preset",
            Self::Format => "format",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TopotrackError {
    #[error("template '{0}' is already registered")]
    DuplicateTemplate(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: LookupKind, name: String },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("an export is already in progress for surface {0}")]
    ExportBusy(u64),

    #[error("telemetry unavailable: {0}")]
    TelemetryUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("animation error: {0}")]
    Animation(String),

    #[error("export error: {0}")]
    Export(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TopotrackError {
    pub fn not_found(kind: LookupKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::TelemetryUnavailable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// True for lookups that failed because the thing does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
