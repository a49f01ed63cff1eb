//! Per-kind probe evaluation.
//!
//! Every probe returns an [`EvalResult`] rather than a `Result<_, ProbeError>`:
//! probe errors are treated as `triggered=false` with no state update rather than
//! raised, so failures are folded into the same success path the monitor drives
//! rather than needing a separate catch at the call site.

use std::net::ToSocketAddrs;
use std::time::Duration;

use node_config::EventKind;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use crate::load::SystemLoadReader;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const TCP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalResult {
    pub triggered: bool,
    pub value: Option<f64>,
    pub message: Option<String>,
}

impl EvalResult {
    fn none() -> Self {
        Self::default()
    }

    fn level(value: f64, triggered: bool, message: impl Into<String>) -> Self {
        Self {
            triggered,
            value: Some(value),
            message: if triggered { Some(message.into()) } else { None },
        }
    }
}

/// `previous` is the prior tick's raw observed quantity.
pub async fn evaluate(
    kind: &EventKind,
    previous: Option<f64>,
    load: &SystemLoadReader,
) -> EvalResult {
    match kind {
        EventKind::DiskUsage { mount, threshold } => disk_usage(mount, *threshold, load).await,
        EventKind::MemoryUsage { threshold } => memory_usage(*threshold, load).await,
        EventKind::LoadAverage { threshold } => load_average(*threshold, load).await,
        EventKind::ServiceDown { service } => service_edge(service, previous, Edge::ToBad).await,
        EventKind::ServiceUp { service } => service_edge(service, previous, Edge::ToGood).await,
        EventKind::FileExists { path } => file_edge(path, previous, Edge::ToGood),
        EventKind::FileMissing { path } => file_edge(path, previous, Edge::ToBad),
        EventKind::FileChanged { path } => file_changed(path, previous),
        EventKind::CommandFails { command } => command_level(command, true).await,
        EventKind::CommandSucceeds { command } => command_edge(command, previous).await,
        EventKind::CommandOutput { command, pattern } => command_output(command, pattern).await,
        EventKind::HttpDown {
            url,
            expected_status,
        } => http_edge(url, *expected_status, previous, Edge::ToBad).await,
        EventKind::HttpUp {
            url,
            expected_status,
        } => http_edge(url, *expected_status, previous, Edge::ToGood).await,
        EventKind::PortOpen { host, port } => port_edge(host, *port, previous, Edge::ToGood).await,
        EventKind::PortClosed { host, port } => port_edge(host, *port, previous, Edge::ToBad).await,
    }
}

/// Direction of the transition this probe fires on. `ToBad` kinds (`*_down`/`*_missing`/`*_closed`) treat a missing prior
/// observation as "previously healthy" so the first observed bad state fires.
/// `ToGood` kinds treat a missing prior as "unknown" and never fire on it.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Edge {
    ToBad,
    ToGood,
}

fn edge_triggered(edge: Edge, previous: Option<f64>, current: f64) -> bool {
    match edge {
        Edge::ToBad => previous.unwrap_or(1.0) == 1.0 && current == 0.0,
        Edge::ToGood => previous == Some(0.0) && current == 1.0,
    }
}

async fn disk_usage(mount: &str, threshold: f64, load: &SystemLoadReader) -> EvalResult {
    let Some(used) = load.disk_usage_fraction(mount).await else {
        return EvalResult::none();
    };
    EvalResult::level(
        used,
        used >= threshold,
        format!("disk usage on {mount} is {:.0}% (>= {:.0}%)", used * 100.0, threshold * 100.0),
    )
}

async fn memory_usage(threshold: f64, load: &SystemLoadReader) -> EvalResult {
    let used = load.memory_usage_fraction().await;
    EvalResult::level(
        used,
        used >= threshold,
        format!("memory usage is {:.0}% (>= {:.0}%)", used * 100.0, threshold * 100.0),
    )
}

async fn load_average(threshold: f64, load: &SystemLoadReader) -> EvalResult {
    let normalized = load.normalized_load().await;
    EvalResult::level(
        normalized,
        normalized >= threshold,
        format!("load average is {:.2} (>= {:.2})", normalized, threshold),
    )
}

async fn service_edge(service: &str, previous: Option<f64>, edge: Edge) -> EvalResult {
    let active = match timeout(
        COMMAND_TIMEOUT,
        Command::new("systemctl")
            .args(["is-active", service])
            .output(),
    )
    .await
    {
        Ok(Ok(output)) => String::from_utf8_lossy(&output.stdout).trim() == "active",
        _ => return EvalResult::none(),
    };
    let current = if active { 1.0 } else { 0.0 };
    let triggered = edge_triggered(edge, previous, current);
    let verb = if active { "is running" } else { "stopped" };
    EvalResult {
        triggered,
        value: Some(current),
        message: triggered.then(|| format!("service {service} {verb}")),
    }
}

fn file_edge(path: &str, previous: Option<f64>, edge: Edge) -> EvalResult {
    let exists = std::path::Path::new(path).exists();
    let current = if exists { 1.0 } else { 0.0 };
    let triggered = edge_triggered(edge, previous, current);
    let verb = if exists { "now exists" } else { "is missing" };
    EvalResult {
        triggered,
        value: Some(current),
        message: triggered.then(|| format!("file {path} {verb}")),
    }
}

fn file_changed(path: &str, previous: Option<f64>) -> EvalResult {
    let Ok(metadata) = std::fs::metadata(path) else {
        return EvalResult::none();
    };
    let Ok(modified) = metadata.modified() else {
        return EvalResult::none();
    };
    let Ok(since_epoch) = modified.duration_since(std::time::UNIX_EPOCH) else {
        return EvalResult::none();
    };
    let mtime = since_epoch.as_secs_f64();
    let triggered = previous.is_some_and(|p| p != mtime);
    EvalResult {
        triggered,
        value: Some(mtime),
        message: triggered.then(|| format!("file {path} changed")),
    }
}

async fn run_command(command: &str) -> Option<(i32, String)> {
    let output = timeout(COMMAND_TIMEOUT, Command::new("sh").arg("-c").arg(command).output())
        .await
        .ok()?
        .ok()?;
    let code = output.status.code().unwrap_or(-1);
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Some((code, combined))
}

async fn command_level(command: &str, fail_triggers: bool) -> EvalResult {
    let Some((code, _)) = run_command(command).await else {
        return EvalResult::none();
    };
    let failing = code != 0;
    let triggered = failing == fail_triggers;
    EvalResult {
        triggered,
        value: Some(code as f64),
        message: triggered.then(|| format!("command `{command}` exited {code}")),
    }
}

async fn command_edge(command: &str, previous: Option<f64>) -> EvalResult {
    let Some((code, _)) = run_command(command).await else {
        return EvalResult::none();
    };
    // Mirrors `Edge::ToGood`: a missing prior exit code is unknown, so the first
    // observation never fires, even if it already succeeds.
    let succeeded_now = code == 0;
    let previously_failing = previous.is_some_and(|p| p != 0.0);
    let triggered = previous.is_some() && previously_failing && succeeded_now;
    EvalResult {
        triggered,
        value: Some(code as f64),
        message: triggered.then(|| format!("command `{command}` now succeeds")),
    }
}

async fn command_output(command: &str, pattern: &str) -> EvalResult {
    let Some((_, output)) = run_command(command).await else {
        return EvalResult::none();
    };
    let Ok(re) = Regex::new(pattern) else {
        return EvalResult::none();
    };
    let matched = re.is_match(&output);
    EvalResult {
        triggered: matched,
        value: None,
        message: matched.then(|| format!("command `{command}` output matched `{pattern}`")),
    }
}

async fn http_edge(url: &str, expected_status: u16, previous: Option<f64>, edge: Edge) -> EvalResult {
    let client = match reqwest::Client::builder().timeout(HTTP_TIMEOUT).build() {
        Ok(c) => c,
        Err(_) => return EvalResult::none(),
    };
    let up = match client.get(url).send().await {
        Ok(resp) => resp.status().as_u16() == expected_status,
        Err(_) => false,
    };
    let current = if up { 1.0 } else { 0.0 };
    let triggered = edge_triggered(edge, previous, current);
    let verb = if up { "is up" } else { "is down" };
    EvalResult {
        triggered,
        value: Some(current),
        message: triggered.then(|| format!("endpoint {url} {verb}")),
    }
}

async fn port_edge(host: &str, port: u16, previous: Option<f64>, edge: Edge) -> EvalResult {
    let addr = format!("{host}:{port}");
    let Ok(mut addrs) = addr.to_socket_addrs() else {
        return EvalResult::none();
    };
    let Some(addr) = addrs.next() else {
        return EvalResult::none();
    };
    let open = timeout(TCP_TIMEOUT, tokio::net::TcpStream::connect(addr))
        .await
        .is_ok_and(|r| r.is_ok());
    let current = if open { 1.0 } else { 0.0 };
    let triggered = edge_triggered(edge, previous, current);
    let verb = if open { "is open" } else { "is closed" };
    EvalResult {
        triggered,
        value: Some(current),
        message: triggered.then(|| format!("port {host}:{port} {verb}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A service-down hook does not fire on an undefined-previous `service_up`
    /// observation, but does fire for `service_down` when the underlying edge
    /// is the same 1->0 transition.
    #[test]
    fn edge_to_bad_fires_on_undefined_prior() {
        assert!(edge_triggered(Edge::ToBad, None, 0.0));
        assert!(!edge_triggered(Edge::ToBad, None, 1.0));
    }

    #[test]
    fn edge_to_good_does_not_fire_on_undefined_prior() {
        assert!(!edge_triggered(Edge::ToGood, None, 1.0));
        assert!(!edge_triggered(Edge::ToGood, None, 0.0));
    }

    #[test]
    fn edge_to_bad_fires_only_on_one_to_zero_transition() {
        assert!(edge_triggered(Edge::ToBad, Some(1.0), 0.0));
        assert!(!edge_triggered(Edge::ToBad, Some(0.0), 0.0));
        assert!(!edge_triggered(Edge::ToBad, Some(1.0), 1.0));
    }

    #[test]
    fn edge_to_good_fires_only_on_zero_to_one_transition() {
        assert!(edge_triggered(Edge::ToGood, Some(0.0), 1.0));
        assert!(!edge_triggered(Edge::ToGood, Some(1.0), 1.0));
        assert!(!edge_triggered(Edge::ToGood, Some(0.0), 0.0));
    }

    /// Exactly one trigger over running, running, stopped.
    #[tokio::test]
    async fn s5_edge_detecting_service_down_fires_once_on_transition() {
        let mut previous = Some(1.0);
        let mut fires = 0;
        for current in [1.0, 1.0, 0.0] {
            if edge_triggered(Edge::ToBad, previous, current) {
                fires += 1;
            }
            previous = Some(current);
        }
        assert_eq!(fires, 1);
    }

    #[tokio::test]
    async fn file_changed_does_not_trigger_on_first_observation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.txt");
        std::fs::write(&path, "v1").unwrap();
        let result = file_changed(path.to_str().unwrap(), None);
        assert!(!result.triggered);
        assert!(result.value.is_some());
    }

    #[tokio::test]
    async fn file_changed_triggers_when_mtime_differs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watched.txt");
        std::fs::write(&path, "v1").unwrap();
        let result = file_changed(path.to_str().unwrap(), Some(1.0));
        assert!(result.triggered);
    }

    #[tokio::test]
    async fn file_exists_edge_requires_prior_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("present.txt");
        std::fs::write(&path, "x").unwrap();
        let first = file_edge(path.to_str().unwrap(), None, Edge::ToGood);
        assert!(!first.triggered);
        let second = file_edge(path.to_str().unwrap(), Some(0.0), Edge::ToGood);
        assert!(second.triggered);
    }

    #[tokio::test]
    async fn command_fails_is_a_level_trigger() {
        let result = command_level("exit 1", true).await;
        assert!(result.triggered);
        let result = command_level("exit 0", true).await;
        assert!(!result.triggered);
    }

    #[tokio::test]
    async fn command_output_matches_regex() {
        let result = command_output("echo hello-world", "hello-\\w+").await;
        assert!(result.triggered);
        let result = command_output("echo nope", "hello-\\w+").await;
        assert!(!result.triggered);
    }

    #[tokio::test]
    async fn port_closed_fires_on_unreachable_local_port() {
        let result = port_edge("127.0.0.1", 1, Some(1.0), Edge::ToBad).await;
        assert!(result.triggered);
    }
}
