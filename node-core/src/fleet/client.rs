//! C5 Fleet Client: authenticated HTTPS/mTLS requests to peers.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use node_config::FleetNodeConfig;

use crate::memory::Memory;

/// `queryFleetNode` / `queryFleetNodes` result shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FleetExecuteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_executed: Option<Vec<ToolExecutedEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutedEntry {
    pub name: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartResult {
    pub success: bool,
    pub message: String,
}

/// Result of attempting the dedicated `/v1/fleet/sync` endpoint against a peer.
/// `NotSupported` means the peer answered 404, so the caller should fall back
/// to the prompt-embedded exchange instead of treating it as a transient
/// failure.
pub enum SyncOutcome {
    Ok(Vec<Memory>),
    NotSupported,
    Err(String),
}

#[derive(Serialize)]
struct SyncRequestBody<'a> {
    since: i64,
    peer: &'a str,
    memories: &'a [Memory],
}

#[derive(Deserialize)]
struct SyncResponseBody {
    memories: Vec<Memory>,
}

/// Extra options accepted by `queryFleetNode`.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub model: Option<String>,
    pub system: Option<String>,
}

/// Fleet-wide default client identity, used when a peer doesn't override it.
#[derive(Debug, Clone, Default)]
pub struct DefaultClientIdentity {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Authenticated HTTP(S)/mTLS client to the fleet's peers. Caches one
/// `reqwest::Client` per peer name since building a client (and loading its TLS
/// identity) is comparatively expensive.
pub struct FleetClient {
    default_identity: DefaultClientIdentity,
    clients: RwLock<HashMap<String, reqwest::Client>>,
    /// This node's own name, stamped into outbound `/v1/fleet/sync` requests so
    /// the receiving peer knows which shared bucket to merge into.
    self_name: String,
}

impl FleetClient {
    pub fn new(default_identity: DefaultClientIdentity, self_name: String) -> Self {
        Self {
            default_identity,
            clients: RwLock::new(HashMap::new()),
            self_name,
        }
    }

    async fn client_for(&self, node: &FleetNodeConfig, timeout: Duration) -> reqwest::Client {
        if let Some(client) = self.clients.read().await.get(&node.name) {
            return client.clone();
        }

        let mut builder = reqwest::Client::builder().timeout(timeout);

        let cert_path = node.client_cert.as_ref().or(self.default_identity.cert_path.as_ref());
        let key_path = node.client_key.as_ref().or(self.default_identity.key_path.as_ref());

        if let (Some(cert_path), Some(key_path)) = (cert_path, key_path) {
            match load_identity(cert_path, key_path) {
                Ok(identity) => {
                    builder = builder.identity(identity);
                }
                Err(e) => {
                    warn!(peer = %node.name, error = %e, "failed to load client TLS identity, proceeding without it");
                }
            }
        }

        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());
        self.clients
            .write()
            .await
            .insert(node.name.clone(), client.clone());
        client
    }

    fn request(&self, client: &reqwest::Client, method: reqwest::Method, url: &str, node: &FleetNodeConfig) -> reqwest::RequestBuilder {
        let mut req = client.request(method, url);
        if let Some(token) = &node.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// `queryFleetNode(node, prompt, opts) -> FleetExecuteResult`.
    pub async fn query_fleet_node(
        &self,
        node: &FleetNodeConfig,
        prompt: &str,
        opts: ExecuteOptions,
    ) -> FleetExecuteResult {
        let client = self.client_for(node, Duration::from_secs(60)).await;
        let url = format!("{}/v1/fleet/execute", node.url.trim_end_matches('/'));
        let body = serde_json::json!({
            "prompt": prompt,
            "model": opts.model,
            "system": opts.system,
        });

        let result = self
            .request(&client, reqwest::Method::POST, &url, node)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<FleetExecuteResult>().await {
                    Ok(parsed) => parsed,
                    Err(e) => FleetExecuteResult {
                        success: false,
                        error: Some(format!("decode response: {}", e)),
                        ..Default::default()
                    },
                }
            }
            Ok(resp) => FleetExecuteResult {
                success: false,
                error: Some(format!("peer returned status {}", resp.status())),
                ..Default::default()
            },
            Err(e) => FleetExecuteResult {
                success: false,
                error: Some(e.to_string()),
                ..Default::default()
            },
        }
    }

    /// `queryFleetNodes(nodes, prompt, opts) -> results[]`, fan-out in parallel,
    /// preserving input ordering.
    pub async fn query_fleet_nodes(
        &self,
        nodes: &[FleetNodeConfig],
        prompt: &str,
        opts: ExecuteOptions,
    ) -> Vec<FleetExecuteResult> {
        let futures = nodes
            .iter()
            .map(|node| self.query_fleet_node(node, prompt, opts.clone()));
        futures::future::join_all(futures).await
    }

    /// `getFleetHealth(config) -> per-node {healthy, info?}`, unauthenticated,
    /// 5s timeout per peer.
    pub async fn get_fleet_health(&self, nodes: &[FleetNodeConfig]) -> Vec<(String, HealthResult)> {
        let futures = nodes.iter().map(|node| async move {
            let client = self.client_for(node, Duration::from_secs(5)).await;
            let url = format!("{}/v1/fleet/health", node.url.trim_end_matches('/'));
            let result = client.get(&url).send().await;
            let health = match result {
                Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
                    Ok(info) => HealthResult { healthy: true, info: Some(info) },
                    Err(_) => HealthResult { healthy: true, info: None },
                },
                _ => HealthResult { healthy: false, info: None },
            };
            (node.name.clone(), health)
        });
        futures::future::join_all(futures).await
    }

    /// `upgradeFleetNode(node, performUpgrade)`: GET to check, POST to perform;
    /// 60s timeout.
    pub async fn upgrade_fleet_node(&self, node: &FleetNodeConfig, perform_upgrade: bool) -> UpgradeResult {
        let client = self.client_for(node, Duration::from_secs(60)).await;
        let url = format!("{}/v1/fleet/upgrade", node.url.trim_end_matches('/'));
        let method = if perform_upgrade { reqwest::Method::POST } else { reqwest::Method::GET };

        let result = self.request(&client, method, &url, node).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<UpgradeResult>().await.unwrap_or(UpgradeResult {
                    success: false,
                    message: "decode error".to_string(),
                    current_version: None,
                    latest_version: None,
                })
            }
            Ok(resp) => UpgradeResult {
                success: false,
                message: format!("peer returned status {}", resp.status()),
                current_version: None,
                latest_version: None,
            },
            Err(e) => UpgradeResult {
                success: false,
                message: e.to_string(),
                current_version: None,
                latest_version: None,
            },
        }
    }

    /// `restartFleetNode(node)`: POST, 10s timeout. A connection-reset/socket error
    /// is treated as success because the server closes the socket intentionally
    /// before it can reply.
    pub async fn restart_fleet_node(&self, node: &FleetNodeConfig) -> RestartResult {
        let client = self.client_for(node, Duration::from_secs(10)).await;
        let url = format!("{}/v1/fleet/restart", node.url.trim_end_matches('/'));

        let result = self
            .request(&client, reqwest::Method::POST, &url, node)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => RestartResult {
                success: true,
                message: "restart acknowledged".to_string(),
            },
            Ok(resp) => RestartResult {
                success: false,
                message: format!("peer returned status {}", resp.status()),
            },
            Err(e) if is_connection_reset(&e) => RestartResult {
                success: true,
                message: "peer is restarting".to_string(),
            },
            Err(e) => RestartResult {
                success: false,
                message: e.to_string(),
            },
        }
    }

    /// `POST /v1/fleet/sync`: push `memories` created since `since` and receive
    /// the peer's own since-`since` memories in the same round trip. A 404 means
    /// the peer predates this endpoint, signalling the
    /// caller to fall back to a prompt-embedded exchange.
    pub async fn sync_with_peer(&self, node: &FleetNodeConfig, since: i64, memories: &[Memory]) -> SyncOutcome {
        let client = self.client_for(node, Duration::from_secs(30)).await;
        let url = format!("{}/v1/fleet/sync", node.url.trim_end_matches('/'));
        let body = SyncRequestBody { since, peer: &self.self_name, memories };

        let result = self
            .request(&client, reqwest::Method::POST, &url, node)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => SyncOutcome::NotSupported,
            Ok(resp) if resp.status().is_success() => match resp.json::<SyncResponseBody>().await {
                Ok(parsed) => SyncOutcome::Ok(parsed.memories),
                Err(e) => SyncOutcome::Err(format!("decode response: {}", e)),
            },
            Ok(resp) => SyncOutcome::Err(format!("peer returned status {}", resp.status())),
            Err(e) => SyncOutcome::Err(e.to_string()),
        }
    }
}

fn is_connection_reset(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_request() || e.to_string().to_lowercase().contains("reset")
}

fn load_identity(cert_path: &str, key_path: &str) -> Result<reqwest::Identity, std::io::Error> {
    let mut pem = std::fs::read(cert_path)?;
    let mut key = std::fs::read(key_path)?;
    pem.push(b'\n');
    pem.append(&mut key);
    reqwest::Identity::from_pem(&pem).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
