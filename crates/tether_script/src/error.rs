use thiserror::Error;

/// Errors raised while loading scripts, configs, or talking to the engine.
///
/// Script calls themselves report success as `bool`; these errors only
/// surface from loading code and from inside interpreter bindings.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script function '{module}.{function}' is not defined")]
    MissingFunction { module: String, function: String },

    #[error("script raised: {message}")]
    Exception { message: String, stack: String },

    #[error("script returned {found}, expected {expected}")]
    ReturnType {
        expected: &'static str,
        found: String,
    },

    #[error("javascript engine error: {0}")]
    Js(#[from] rquickjs::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid bridge config: {0}")]
    Config(#[from] serde_json::Error),
}
