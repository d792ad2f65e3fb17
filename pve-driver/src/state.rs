use std::fmt;

/// Machine state as reported to the host tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The remote status was missing or not one the driver recognizes.
    None,
    Running,
    Stopped,
    Starting,
    /// The state could not be queried.
    Error,
}

impl State {
    /// Map the `status` value of `/status/current`.
    pub fn from_remote_status(status: Option<&str>) -> Self {
        match status {
            Some("stopped") => Self::Stopped,
            Some("running") => Self::Running,
            Some("starting") => Self::Starting,
            _ => Self::None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}
