use std::time::Duration;

/// Errors returned by the machine driver.
///
/// Remote failures keep the API client's error as their source so the
/// caller sees the original cause.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Building the API client or logging in failed.
    #[error("authentication failed: {0}")]
    Authentication(#[source] pve_api::Error),

    /// No VM with the machine's name exists on the cluster.
    #[error("no VM named {0:?} found")]
    NotFound(String),

    /// Any other remote call failed.
    #[error(transparent)]
    Remote(#[from] pve_api::Error),

    /// The VM did not report running with an IP before the deadline.
    #[error("Timeout reached. VM didn't start within {} seconds", .0.as_secs())]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
