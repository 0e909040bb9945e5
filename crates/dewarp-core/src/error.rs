use std::path::PathBuf;

/// Engine-level errors used across the dewarp crates.
///
/// Lives in `dewarp-core` and is re-exported by the runtime so hosts only match on one type.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    // ---- Config ----
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json parse error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config at {}: {msg}", path.display())]
    InvalidConfig { path: PathBuf, msg: String },

    // ---- Backend ----
    #[error("vertex shader compile error ({origin}): {log}\n{source_text}")]
    VertexCompile {
        origin: String,
        log: String,
        source_text: String,
    },

    #[error("fragment shader compile error ({origin}): {log}\n{source_text}")]
    FragmentCompile {
        origin: String,
        log: String,
        source_text: String,
    },

    #[error("program link error ({origin}): {log}")]
    Link { origin: String, log: String },

    #[error("backend object creation failed: {0}")]
    GlCreate(String),

    #[error("program {origin} has no active attribute `{name}`")]
    MissingAttribute { origin: String, name: String },

    // ---- Lifecycle ----
    #[error("{op} is not valid while {state}")]
    InvalidState { op: &'static str, state: &'static str },

    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        EngineError::Other(s.into())
    }

    /// Config errors that are not tied to a file on disk.
    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        EngineError::InvalidConfig {
            path: PathBuf::from("<inline>"),
            msg: msg.into(),
        }
    }

    /// True for the errors that abort pipeline setup (compile, link, allocation).
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            EngineError::VertexCompile { .. }
                | EngineError::FragmentCompile { .. }
                | EngineError::Link { .. }
                | EngineError::GlCreate(_)
                | EngineError::MissingAttribute { .. }
        )
    }
}

/// Prefix every line of `src` with its 1-based line number, as compiler logs refer to them.
pub fn numbered_listing(src: &str) -> String {
    src.lines()
        .enumerate()
        .map(|(i, line)| format!("{:>4}| {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
