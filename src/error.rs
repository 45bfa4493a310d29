use thiserror::Error;

/// Fatal errors raised while setting up a dependency graph.
///
/// Nothing on the render path returns these; bundling failures degrade to
/// serving the on-the-fly transform URL instead.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("'{0}' is not a script or style dependency graph")]
    UnsupportedGraph(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read options file.\n{0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Couldn't parse options.\n{0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Couldn't create cache directory {0}.\n{1}")]
    CreateDir(camino::Utf8PathBuf, std::io::Error),

    #[error("Couldn't write cache artifact {0}.\n{1}")]
    Write(camino::Utf8PathBuf, std::io::Error),

    #[error("Couldn't remove cache artifact.\n{0}")]
    Remove(#[from] std::io::Error),

    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't list cache directory.\n{0}")]
    Glob(#[from] glob::GlobError),
}

/// Errors that can occur while running the external transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transform process exited with {0}")]
    Status(std::process::ExitStatus),

    #[error("Transform timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Transform output pipe closed unexpectedly")]
    Pipe,
}
