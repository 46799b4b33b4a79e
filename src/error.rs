/// Errors raised while dispatching a tool call.
///
/// Subprocess failures are not errors; they are reported inside the tool's payload.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    /// Whether the caller sent a request the dispatcher cannot accept
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::InvalidArguments { .. })
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
