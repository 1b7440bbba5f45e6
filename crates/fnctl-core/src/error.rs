use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("watch.debounce_ms in {path} must be greater than zero")]
    ZeroDebounce { path: PathBuf },

    // ── Stack file ──
    #[error("failed to read stack file {path}")]
    StackLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse stack file {path}")]
    StackParse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("no functions in stack match filter '{filter}'")]
    NoMatchingFunctions { filter: String },

    // ── Options ──
    #[error("{0}")]
    InvalidOptions(String),

    #[error("invalid {flag} value '{value}': expected KEY=VALUE")]
    InvalidKeyValue { flag: &'static str, value: String },

    #[error(
        "flag --{name} is declared by '{existing_owner}' as {existing} and by '{incoming_owner}' as {incoming}"
    )]
    FlagConflict {
        name: String,
        existing_owner: String,
        existing: String,
        incoming_owner: String,
        incoming: String,
    },

    // ── Ignore rules ──
    #[error("ignore file {path} not found; watch needs it to know which changes to skip")]
    IgnoreFileMissing { path: PathBuf },

    #[error("failed to read ignore file {path}")]
    IgnoreFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid ignore pattern '{pattern}' at {path}:{line}")]
    IgnorePattern {
        path: PathBuf,
        line: usize,
        pattern: String,
        source: ignore::Error,
    },

    #[error("failed to build ignore matcher from {path}")]
    IgnoreBuild {
        path: PathBuf,
        source: ignore::Error,
    },
}
