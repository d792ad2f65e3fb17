//! Seam between the driver and the Proxmox VE API.
//!
//! [`HttpConnector`] talks to a real cluster through [`pve_api`]; tests plug
//! in in-memory implementations of [`Connector`] and [`ProxmoxSession`].

use async_trait::async_trait;
use pve_api::{Client, NetworkInterface, QemuConfig, Session, VmRef, VmStatus};

/// Log verbosity requested by the host tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    /// Also trace every API request and response body.
    Debug,
}

/// Everything needed to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub api_url: String,
    pub user: String,
    pub password: String,
    /// One-time password; empty when not used.
    pub otp: String,
    pub verbosity: Verbosity,
}

/// Opens authenticated sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: ProxmoxSession;

    async fn connect(&self, settings: &ConnectionSettings) -> pve_api::Result<Self::Session>;
}

/// Remote operations the driver issues against an authenticated session.
#[async_trait]
pub trait ProxmoxSession: Send + Sync {
    async fn next_id(&self, hint: u32) -> pve_api::Result<u32>;

    async fn create_vm(&self, vm: &VmRef, config: &QemuConfig) -> pve_api::Result<()>;

    async fn start_vm(&self, vm: &VmRef) -> pve_api::Result<()>;

    async fn shutdown_vm(&self, vm: &VmRef) -> pve_api::Result<()>;

    async fn stop_vm(&self, vm: &VmRef) -> pve_api::Result<()>;

    async fn delete_vm(&self, vm: &VmRef) -> pve_api::Result<()>;

    async fn vm_status(&self, vm: &VmRef) -> pve_api::Result<VmStatus>;

    async fn find_vm_by_name(&self, name: &str) -> pve_api::Result<Option<VmRef>>;

    async fn agent_network_interfaces(&self, vm: &VmRef) -> pve_api::Result<Vec<NetworkInterface>>;
}

// =============================================================================
// HTTP backend
// =============================================================================

/// Connector backed by the Proxmox VE HTTP API.
///
/// Certificate verification is always disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for HttpConnector {
    type Session = Session;

    async fn connect(&self, settings: &ConnectionSettings) -> pve_api::Result<Session> {
        let otp = Some(settings.otp.as_str()).filter(|otp| !otp.is_empty());
        Client::builder(&settings.api_url)
            .accept_invalid_certs(true)
            .debug(settings.verbosity == Verbosity::Debug)
            .build()?
            .login(&settings.user, &settings.password, otp)
            .await
    }
}

#[async_trait]
impl ProxmoxSession for Session {
    async fn next_id(&self, hint: u32) -> pve_api::Result<u32> {
        Session::next_id(self, hint).await
    }

    async fn create_vm(&self, vm: &VmRef, config: &QemuConfig) -> pve_api::Result<()> {
        Session::create_vm(self, vm, config).await
    }

    async fn start_vm(&self, vm: &VmRef) -> pve_api::Result<()> {
        Session::start_vm(self, vm).await
    }

    async fn shutdown_vm(&self, vm: &VmRef) -> pve_api::Result<()> {
        Session::shutdown_vm(self, vm).await
    }

    async fn stop_vm(&self, vm: &VmRef) -> pve_api::Result<()> {
        Session::stop_vm(self, vm).await
    }

    async fn delete_vm(&self, vm: &VmRef) -> pve_api::Result<()> {
        Session::delete_vm(self, vm).await
    }

    async fn vm_status(&self, vm: &VmRef) -> pve_api::Result<VmStatus> {
        Session::vm_status(self, vm).await
    }

    async fn find_vm_by_name(&self, name: &str) -> pve_api::Result<Option<VmRef>> {
        Session::find_vm_by_name(self, name).await
    }

    async fn agent_network_interfaces(&self, vm: &VmRef) -> pve_api::Result<Vec<NetworkInterface>> {
        Session::agent_network_interfaces(self, vm).await
    }
}
