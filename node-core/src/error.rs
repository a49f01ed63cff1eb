//! Per-module error enums.

use thiserror::Error;

/// C3 Tool Registry + Executor errors.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),
    #[error("command cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Execution(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// C4 Reasoning Loop errors.
#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
}

/// C5 Fleet Client errors. These never escape as exceptions to the caller: a
/// `FleetClient` call returns a `Result` whose `Err` is always converted by its
/// caller into the `{success:false, error}` shape callers expect.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("tls setup: {0}")]
    Tls(String),
    #[error("peer returned status {0}")]
    Status(u16),
    #[error("decode response: {0}")]
    Decode(String),
}

/// C2 Memory Store errors.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory not found: {0}")]
    NotFound(String),
    #[error("cannot mutate a non-local memory: {0}")]
    NotLocal(String),
}

/// C6 Event-Hook Monitor probe errors. These never propagate; probes translate
/// them into `triggered=false`, but the type still documents the failure modes
/// for logging.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("spawn command: {0}")]
    Spawn(std::io::Error),
    #[error("http probe: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tcp connect: {0}")]
    Tcp(std::io::Error),
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

/// C7 Scheduler / C8 Handoff Controller errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{0}")]
    Handoff(String),
}

/// C9 Knowledge-Sync errors. Advisory: a sync round failing leaves persisted
/// state untouched so the next round retries the same window.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fleet error: {0}")]
    Fleet(#[from] FleetError),
    #[error("peer reply missing sync marker")]
    MissingMarker,
    #[error("parse peer payload: {0}")]
    Parse(#[from] serde_json::Error),
}
