use std::io;

/// Failures from the repository store. `FileNotFound` is the only variant
/// the resolver treats as non-fatal: a missing candidate file is expected,
/// everything else aborts the resolution that observed it.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("could not clone branch {branch}: {detail}")]
    Clone { branch: String, detail: String },

    #[error("could not list remote branches: {0}")]
    ListRemote(String),

    #[error("could not sync branch {branch}: {detail}")]
    Sync { branch: String, detail: String },

    #[error("no checkout for branch {0}")]
    NotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("top-level value must be a mapping")]
    NotAMapping,

    #[error("unsupported extension: {0}")]
    UnsupportedExtension(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("could not parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
