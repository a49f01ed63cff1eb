//! Typed configuration document.
//!
//! `NodeConfig` is the root of `config.json`. Everything under it is plain
//! `serde`-derived data; the daemon loads it once at startup and the various
//! subsystems in `node-core` hold an `Arc<NodeConfig>` (or a typed sub-view) rather
//! than re-reading the file.

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "0.0.0.0:7700".to_string()
}

fn default_cooldown_ms() -> u64 {
    300_000
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_check_interval_secs() -> u64 {
    30
}

/// Unit of knowledge category, shared between `node-config` (sync filters) and
/// `node-core` (the Memory Store itself) to avoid a core -> config -> core cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Learning,
    Solution,
    Observation,
    Note,
}

/// Root configuration document, persisted at `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_name: String,

    pub listen_addr: String,

    /// Bearer token required on authenticated endpoints. `None` means the daemon
    /// generates one at boot and logs it once.
    pub auth_token: Option<String>,

    pub tls: TlsSettings,

    pub peers: Vec<FleetNodeConfig>,

    pub scheduled_tasks: Vec<ScheduledTaskConfig>,

    pub event_hooks: Vec<EventHookConfig>,

    pub sync: SyncConfig,

    pub mcp_servers: Vec<McpServerConfig>,

    /// Server-side confirmation policy for tools that `requiresConfirmation`:
    /// the HTTP endpoint has no TTY, so this flag decides whether those tools proceed
    /// unattended.
    pub auto_confirm: bool,

    /// Master tick period for the event-hook monitor.
    #[serde(default = "default_check_interval_secs")]
    pub event_check_interval_secs: u64,

    /// Master tick period for memory TTL cleanup.
    #[serde(default = "default_cleanup_interval_secs")]
    pub memory_cleanup_interval_secs: u64,
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: "node".to_string(),
            listen_addr: default_listen_addr(),
            auth_token: None,
            tls: TlsSettings::default(),
            peers: Vec::new(),
            scheduled_tasks: Vec::new(),
            event_hooks: Vec::new(),
            sync: SyncConfig::default(),
            mcp_servers: Vec::new(),
            auto_confirm: false,
            event_check_interval_secs: default_check_interval_secs(),
            memory_cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// TLS / mTLS material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsSettings {
    /// This node's own server certificate/key, for serving HTTPS.
    #[serde(default)]
    pub server_cert: Option<String>,
    #[serde(default)]
    pub server_key: Option<String>,
    /// CA used to verify *inbound* client certs (mTLS). Presence of this field is
    /// what turns plain TLS into mTLS on the server side.
    #[serde(default)]
    pub client_ca: Option<String>,
    /// Fleet-wide default client identity used when calling peers that don't
    /// override it per-node.
    #[serde(default)]
    pub default_client_cert: Option<String>,
    #[serde(default)]
    pub default_client_key: Option<String>,
}

/// A configured peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetNodeConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub client_cert: Option<String>,
    #[serde(default)]
    pub client_key: Option<String>,
}

/// A scheduled task definition, immutable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTaskConfig {
    pub name: String,
    pub schedule: String,
    pub prompt: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub condition: Option<TaskCondition>,
    #[serde(default)]
    pub handoff: Option<HandoffTaskConfig>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskCondition {
    #[serde(default)]
    pub max_load: Option<f64>,
    #[serde(default)]
    pub min_load: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffTaskConfig {
    #[serde(default)]
    pub enabled: bool,
    pub load_threshold: f64,
    #[serde(default)]
    pub peers: Option<Vec<String>>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// An event hook definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHookConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub event: EventKind,
    pub prompt: String,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub notify_peers: bool,
    #[serde(default)]
    pub peer_prompt: Option<String>,
}

/// Discriminated union of probe kinds. Tagged by `type` so the
/// configuration document reads as a natural JSON discriminated union rather than
/// requiring out-of-band validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    DiskUsage {
        #[serde(default = "default_mount")]
        mount: String,
        #[serde(default = "default_usage_threshold")]
        threshold: f64,
    },
    MemoryUsage {
        #[serde(default = "default_usage_threshold")]
        threshold: f64,
    },
    LoadAverage {
        #[serde(default = "default_usage_threshold")]
        threshold: f64,
    },
    ServiceDown {
        service: String,
    },
    ServiceUp {
        service: String,
    },
    FileExists {
        path: String,
    },
    FileMissing {
        path: String,
    },
    FileChanged {
        path: String,
    },
    CommandFails {
        command: String,
    },
    CommandSucceeds {
        command: String,
    },
    CommandOutput {
        command: String,
        pattern: String,
    },
    HttpDown {
        url: String,
        #[serde(default = "default_http_status")]
        expected_status: u16,
    },
    HttpUp {
        url: String,
        #[serde(default = "default_http_status")]
        expected_status: u16,
    },
    PortOpen {
        host: String,
        port: u16,
    },
    PortClosed {
        host: String,
        port: u16,
    },
}

fn default_mount() -> String {
    "/".to_string()
}

fn default_usage_threshold() -> f64 {
    0.9
}

fn default_http_status() -> u16 {
    200
}

/// Knowledge-sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: u64,
    /// Only sync memories in these categories; `None` means all categories.
    pub categories: Option<Vec<MemoryCategory>>,
    /// Only sync with these peer names; `None` means every configured peer.
    pub peers: Option<Vec<String>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            categories: None,
            peers: None,
        }
    }
}

/// Stub registration record for an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}
