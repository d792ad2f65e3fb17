use std::time::Duration;

use hyper::ext::ReasonPhrase;
use reqwest::header::COOKIE;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{
    AgentNetworkInterfaces, ClusterResource, NetworkInterface, NextId, QemuConfig, ResponseBase,
    TaskId, TaskStatus, Ticket, VmRef, VmStatus,
};

const CSRF_HEADER: &str = "CSRFPreventionToken";

// =============================================================================
// ClientBuilder
// =============================================================================

/// Builder for an unauthenticated [`Client`].
///
/// Certificate verification is disabled by default: a stock Proxmox VE
/// installation serves a self-signed certificate on port 8006.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    accept_invalid_certs: bool,
    timeout: Option<Duration>,
    task_timeout: Duration,
    task_poll_interval: Duration,
    debug: bool,
}

impl ClientBuilder {
    /// Create a builder for the API rooted at `base_url`
    /// (e.g. `https://pve:8006/api2/json`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            accept_invalid_certs: true,
            timeout: None,
            task_timeout: Duration::from_secs(300),
            task_poll_interval: Duration::from_secs(1),
            debug: false,
        }
    }

    /// Accept certificates that fail verification.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set a per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Maximum time to wait for a background task to finish.
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Interval between task status checks.
    pub fn task_poll_interval(mut self, interval: Duration) -> Self {
        self.task_poll_interval = interval;
        self
    }

    /// Trace every request and response body at `debug` level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<Client> {
        let parsed = Url::parse(&self.base_url).map_err(|e| Error::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl {
                url: self.base_url,
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let mut http = reqwest::Client::builder().danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(Client {
            http: http.build()?,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            task_timeout: self.task_timeout,
            task_poll_interval: self.task_poll_interval,
            debug: self.debug,
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Unauthenticated Proxmox VE API client.
///
/// Call [`login()`](Self::login) to obtain a [`Session`].
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    task_timeout: Duration,
    task_poll_interval: Duration,
    debug: bool,
}

impl Client {
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate and return a session carrying the ticket and CSRF token.
    ///
    /// An empty `otp` is treated as absent.
    pub async fn login(&self, username: &str, password: &str, otp: Option<&str>) -> Result<Session> {
        let path = "/access/ticket";
        let mut form = vec![("username", username), ("password", password)];
        if let Some(otp) = otp.filter(|otp| !otp.is_empty()) {
            form.push(("otp", otp));
        }

        let request = self.http.post(self.url(path)).form(&form);
        let ticket: Ticket = self.execute(request, &Method::POST, path).await?;
        debug!(user = %ticket.username, "authenticated against proxmox api");

        Ok(Session {
            client: self.clone(),
            ticket,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<T> {
        if self.debug {
            debug!(%method, path, "proxmox api request");
        }

        let response = request.send().await?;
        let status = response.status();
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
            .map(str::to_owned);
        let body = response.text().await?;

        if self.debug {
            debug!(%method, path, status = status.as_u16(), %body, "proxmox api response");
        }

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(status, reason.as_deref(), &body),
            });
        }

        let envelope: ResponseBase<T> =
            serde_json::from_str(&body).map_err(|source| Error::Decode {
                path: path.to_owned(),
                source,
            })?;
        Ok(envelope.data)
    }
}

/// Extract a readable message from an error response.
///
/// Proxmox puts the reason in the status line and usually answers with
/// `{"data":null}`, optionally adding per-parameter `errors`. `reason` is the
/// status line text when it differs from the canonical one.
fn error_message(status: StatusCode, reason: Option<&str>, body: &str) -> String {
    let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());
    let fallback = || {
        reason
            .or_else(|| status.canonical_reason())
            .unwrap_or("unknown error")
            .to_owned()
    };

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            if let Some(errors) = value.get("errors").filter(|e| !e.is_null()) {
                match reason {
                    Some(reason) => format!("{reason}: {errors}"),
                    None => errors.to_string(),
                }
            } else if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                message.trim().to_owned()
            } else {
                fallback()
            }
        }
        Err(_) if reason.is_some() => fallback(),
        Err(_) if !body.trim().is_empty() => body.trim().to_owned(),
        Err(_) => fallback(),
    }
}

// =============================================================================
// Session
// =============================================================================

/// Authenticated Proxmox VE API session.
///
/// The ticket is never refreshed; once it expires remotely every call fails
/// with the error the API returns.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    ticket: Ticket,
}

impl Session {
    /// The authenticated principal as reported by the API.
    pub fn username(&self) -> &str {
        &self.ticket.username
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .http
            .request(method.clone(), self.client.url(path))
            .header(COOKIE, format!("PVEAuthCookie={}", self.ticket.ticket));
        if method == Method::GET {
            request
        } else {
            request.header(CSRF_HEADER, &self.ticket.csrf_prevention_token)
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path);
        self.client.execute(request, &Method::GET, path).await
    }

    async fn post<T: DeserializeOwned, F: Serialize + ?Sized>(&self, path: &str, form: &F) -> Result<T> {
        let request = self.request(Method::POST, path).form(form);
        self.client.execute(request, &Method::POST, path).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::DELETE, path);
        self.client.execute(request, &Method::DELETE, path).await
    }

    // =========================================================================
    // Cluster
    // =========================================================================

    /// Allocate the next free VM id. A `hint` of 0 means no preference.
    pub async fn next_id(&self, hint: u32) -> Result<u32> {
        let path = "/cluster/nextid";
        let mut request = self.request(Method::GET, path);
        if hint > 0 {
            request = request.query(&[("vmid", hint)]);
        }
        let id: NextId = self.client.execute(request, &Method::GET, path).await?;
        Ok(id.0)
    }

    /// List all QEMU VMs known to the cluster.
    pub async fn cluster_vms(&self) -> Result<Vec<ClusterResource>> {
        let path = "/cluster/resources";
        let request = self.request(Method::GET, path).query(&[("type", "vm")]);
        self.client.execute(request, &Method::GET, path).await
    }

    /// Find the first VM whose display name equals `name`.
    pub async fn find_vm_by_name(&self, name: &str) -> Result<Option<VmRef>> {
        let vms = self.cluster_vms().await?;
        Ok(vms.into_iter().find_map(|vm| match (vm.vmid, vm.node, vm.name) {
            (Some(vmid), Some(node), Some(vm_name)) if vm.kind == "qemu" && vm_name == name => {
                Some(VmRef::new(vmid, node))
            }
            _ => None,
        }))
    }

    // =========================================================================
    // VM Lifecycle
    // =========================================================================

    /// Create a VM and wait for the creation task to finish.
    pub async fn create_vm(&self, vm: &VmRef, config: &QemuConfig) -> Result<()> {
        let path = format!("/nodes/{}/qemu", vm.node);
        let upid: Option<String> = self.post(&path, &config.to_params(vm.vmid)).await?;
        self.wait_for_upid(&vm.node, upid).await
    }

    pub async fn start_vm(&self, vm: &VmRef) -> Result<()> {
        self.status_action(vm, "start").await
    }

    /// Ask the guest to power off via ACPI.
    pub async fn shutdown_vm(&self, vm: &VmRef) -> Result<()> {
        self.status_action(vm, "shutdown").await
    }

    /// Stop the VM immediately, without guest cooperation.
    pub async fn stop_vm(&self, vm: &VmRef) -> Result<()> {
        self.status_action(vm, "stop").await
    }

    pub async fn delete_vm(&self, vm: &VmRef) -> Result<()> {
        let path = format!("/nodes/{}/qemu/{}", vm.node, vm.vmid);
        let upid: Option<String> = self.delete(&path).await?;
        self.wait_for_upid(&vm.node, upid).await
    }

    async fn status_action(&self, vm: &VmRef, action: &str) -> Result<()> {
        let path = format!("/nodes/{}/qemu/{}/status/{action}", vm.node, vm.vmid);
        let upid: Option<String> = self.post(&path, &[] as &[(&str, &str)]).await?;
        self.wait_for_upid(&vm.node, upid).await
    }

    pub async fn vm_status(&self, vm: &VmRef) -> Result<VmStatus> {
        self.get(&format!("/nodes/{}/qemu/{}/status/current", vm.node, vm.vmid))
            .await
    }

    // =========================================================================
    // Guest Agent
    // =========================================================================

    /// Query the guest agent for the network interfaces the guest reports.
    ///
    /// Fails while the agent inside the guest is not running yet.
    pub async fn agent_network_interfaces(&self, vm: &VmRef) -> Result<Vec<NetworkInterface>> {
        let info: AgentNetworkInterfaces = self
            .get(&format!(
                "/nodes/{}/qemu/{}/agent/network-get-interfaces",
                vm.node, vm.vmid
            ))
            .await?;
        Ok(info.result)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub async fn task_status(&self, task: &TaskId) -> Result<TaskStatus> {
        self.get(&format!("/nodes/{}/tasks/{}/status", task.node, task.upid))
            .await
    }

    /// Poll a task until it stops. A non-`OK` exit status is an error.
    pub async fn wait_for_task(&self, task: &TaskId) -> Result<TaskStatus> {
        let deadline = Instant::now() + self.client.task_timeout;
        loop {
            let status = self.task_status(task).await?;
            if status.is_finished() {
                if status.is_success() {
                    return Ok(status);
                }
                return Err(Error::Task {
                    upid: task.upid.clone(),
                    exit_status: status.exit_status.unwrap_or_else(|| "unknown".to_owned()),
                });
            }
            if Instant::now() >= deadline {
                return Err(Error::TaskTimeout(task.upid.clone()));
            }
            sleep(self.client.task_poll_interval).await;
        }
    }

    async fn wait_for_upid(&self, node: &str, upid: Option<String>) -> Result<()> {
        if let Some(upid) = upid {
            self.wait_for_task(&TaskId {
                upid,
                node: node.to_owned(),
            })
            .await?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
