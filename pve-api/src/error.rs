/// Errors returned by the Proxmox VE API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A background task finished with an exit status other than `OK`.
    #[error("task {upid} failed: {exit_status}")]
    Task { upid: String, exit_status: String },

    #[error("timed out waiting for task {0}")]
    TaskTimeout(String),

    #[error("invalid API URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
