/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why the service is shutting down
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}

/// Names under which component states are tracked
pub(super) mod component {
    pub const RETENTION: &str = "retention";
    pub const STREAM: &str = "stream";
    pub const COLLECTORS: &str = "collectors";
}
