use std::time::Duration;

use async_trait::async_trait;
use pve_api::VmRef;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::backend::{ConnectionSettings, Connector, HttpConnector, ProxmoxSession, Verbosity};
use crate::contract::MachineDriver;
use crate::error::{Error, Result};
use crate::flags::{
    self, DEFAULT_NODE, DEFAULT_USER, DriverOptions, FLAG_API_URL, FLAG_NODE, FLAG_OTP, FLAG_PASS,
    FLAG_USER, Flag,
};
use crate::state::State;
use crate::template::machine_template;

pub const DRIVER_NAME: &str = "proxmoxve";
pub const DOCKER_PORT: u16 = 2376;
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Interface whose first address is reported as the machine IP.
const PRIMARY_INTERFACE: &str = "eth0";

// =============================================================================
// MachineDescriptor
// =============================================================================

/// Persistent configuration of one machine.
///
/// Serialized with the field names the host tool stores for its drivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MachineDescriptor {
    pub machine_name: String,
    pub store_path: String,
    /// Static IP supplied by the host, or the address discovered through the
    /// guest agent.
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    #[serde(rename = "SSHUser")]
    pub ssh_user: String,
    #[serde(rename = "SSHPort")]
    pub ssh_port: u16,
    pub api_url: String,
    pub user: String,
    #[serde(rename = "Pass")]
    pub password: String,
    #[serde(rename = "OTP")]
    pub otp: String,
    pub node: String,
    /// Carried for compatibility; the creation template uses its own image.
    pub iso_path: String,
}

impl MachineDescriptor {
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            store_path: store_path.into(),
            ip_address: String::new(),
            ssh_user: DEFAULT_SSH_USER.to_owned(),
            ssh_port: DEFAULT_SSH_PORT,
            api_url: String::new(),
            user: DEFAULT_USER.to_owned(),
            password: String::new(),
            otp: String::new(),
            node: DEFAULT_NODE.to_owned(),
            iso_path: String::new(),
        }
    }
}

impl Default for MachineDescriptor {
    fn default() -> Self {
        Self::new("", "")
    }
}

// =============================================================================
// ReadinessPoll
// =============================================================================

/// How [`create()`](MachineDriver::create) waits for a booted machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoll {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReadinessPoll {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(240),
        }
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Proxmox VE machine driver.
///
/// The API session and the VM reference are resolved on first use and then
/// kept for the lifetime of the driver. Neither is refreshed, so a driver
/// must only be used for the one VM it was created for.
pub struct Driver<C: Connector = HttpConnector> {
    descriptor: MachineDescriptor,
    verbosity: Verbosity,
    poll: ReadinessPoll,
    connector: C,
    session: Option<C::Session>,
    vm_ref: Option<VmRef>,
}

impl Driver<HttpConnector> {
    /// Create a driver for machine `machine_name` talking to the HTTP API.
    pub fn new(
        machine_name: impl Into<String>,
        store_path: impl Into<String>,
        verbosity: Verbosity,
    ) -> Self {
        Self::with_connector(
            MachineDescriptor::new(machine_name, store_path),
            verbosity,
            HttpConnector::new(),
        )
    }
}

impl<C: Connector> Driver<C> {
    /// Create a driver from a stored descriptor using `connector` for sessions.
    pub fn with_connector(descriptor: MachineDescriptor, verbosity: Verbosity, connector: C) -> Self {
        Self {
            descriptor,
            verbosity,
            poll: ReadinessPoll::default(),
            connector,
            session: None,
            vm_ref: None,
        }
    }

    /// Override how long and how often `create` polls for readiness.
    pub fn readiness_poll(mut self, poll: ReadinessPoll) -> Self {
        self.poll = poll;
        self
    }

    pub fn descriptor(&self) -> &MachineDescriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut MachineDescriptor {
        &mut self.descriptor
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// The cached VM reference, if one has been resolved.
    pub fn vm_ref(&self) -> Option<&VmRef> {
        self.vm_ref.as_ref()
    }

    /// Query the state, reporting [`State::Error`] instead of failing.
    pub async fn state_or_error(&mut self) -> State {
        match self.state().await {
            Ok(state) => state,
            Err(err) => {
                warn!(machine = %self.descriptor.machine_name, error = %err, "failed to query state");
                State::Error
            }
        }
    }

    fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            api_url: self.descriptor.api_url.clone(),
            user: self.descriptor.user.clone(),
            password: self.descriptor.password.clone(),
            otp: self.descriptor.otp.clone(),
            verbosity: self.verbosity,
        }
    }

    async fn ensure_session(&mut self) -> Result<&C::Session> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                let settings = self.connection_settings();
                debug!(api_url = %settings.api_url, user = %settings.user, "opening proxmox session");
                self.connector
                    .connect(&settings)
                    .await
                    .map_err(Error::Authentication)?
            }
        };
        Ok(self.session.insert(session))
    }

    async fn ensure_vm_ref(&mut self) -> Result<VmRef> {
        if let Some(vm) = &self.vm_ref {
            return Ok(vm.clone());
        }

        let name = self.descriptor.machine_name.clone();
        let session = self.ensure_session().await?;
        let found = session.find_vm_by_name(&name).await?;
        let vm = found.ok_or(Error::NotFound(name))?;
        debug!(vm = %vm, "resolved vm by name");
        self.vm_ref = Some(vm.clone());
        Ok(vm)
    }

    /// Resolve both the session and the VM reference.
    async fn resolve(&mut self) -> Result<(&C::Session, VmRef)> {
        let vm = self.ensure_vm_ref().await?;
        let session = self.ensure_session().await?;
        Ok((session, vm))
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.poll.timeout;
        while Instant::now() < deadline {
            let state = self.state().await?;
            let ip = self.ip().await?;
            if state == State::Running && !ip.is_empty() {
                info!(machine = %self.descriptor.machine_name, %ip, "machine is ready");
                return Ok(());
            }
            debug!(%state, %ip, "waiting for machine to become ready");
            sleep(self.poll.interval).await;
        }
        Err(Error::Timeout(self.poll.timeout))
    }
}

#[async_trait]
impl<C: Connector> MachineDriver for Driver<C> {
    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn machine_name(&self) -> &str {
        &self.descriptor.machine_name
    }

    fn create_flags(&self) -> Vec<Flag> {
        flags::create_flags()
    }

    fn set_config_from_flags(&mut self, flags: &mut dyn DriverOptions) -> Result<()> {
        self.descriptor.api_url = flags.string(FLAG_API_URL);
        self.descriptor.user = flags.string(FLAG_USER);
        self.descriptor.password = flags.string(FLAG_PASS);
        self.descriptor.otp = flags.string(FLAG_OTP);
        self.descriptor.node = flags.string(FLAG_NODE);
        Ok(())
    }

    fn ssh_username(&self) -> &str {
        &self.descriptor.ssh_user
    }

    fn ssh_port(&self) -> u16 {
        self.descriptor.ssh_port
    }

    /// Allocate an id, create the VM from the fixed template, start it and
    /// wait until it is running with a discovered IP.
    ///
    /// Nothing is cleaned up on failure; a VM created before the error stays
    /// on the node.
    async fn create(&mut self) -> Result<()> {
        let node = self.descriptor.node.clone();
        let template = machine_template(&self.descriptor.machine_name);

        let session = self.ensure_session().await?;
        let vmid = session.next_id(0).await?;
        let vm = VmRef::new(vmid, node);
        info!(vm = %vm, name = %template.name, "creating vm");
        session.create_vm(&vm, &template).await?;

        self.vm_ref = Some(vm);
        self.start().await?;
        self.wait_until_ready().await
    }

    async fn state(&mut self) -> Result<State> {
        let (session, vm) = self.resolve().await?;
        let status = session.vm_status(&vm).await?;
        Ok(State::from_remote_status(status.status.as_deref()))
    }

    /// A failing guest agent query counts as "no IP yet" rather than an
    /// error: the agent only answers once the guest has booted.
    async fn ip(&mut self) -> Result<String> {
        if !self.descriptor.ip_address.is_empty() {
            return Ok(self.descriptor.ip_address.clone());
        }

        let (session, vm) = self.resolve().await?;
        let interfaces = match session.agent_network_interfaces(&vm).await {
            Ok(interfaces) => interfaces,
            Err(err) => {
                debug!(vm = %vm, error = %err, "guest agent not answering yet");
                return Ok(String::new());
            }
        };

        let ip = interfaces
            .iter()
            .find(|iface| iface.name == PRIMARY_INTERFACE)
            .and_then(|iface| iface.ip_addresses.first())
            .map(|addr| addr.ip_address.to_string());

        match ip {
            Some(ip) => {
                debug!(vm = %vm, %ip, "discovered ip");
                self.descriptor.ip_address = ip.clone();
                Ok(ip)
            }
            None => Ok(String::new()),
        }
    }

    async fn url(&mut self) -> Result<String> {
        let ip = self.ip().await?;
        if ip.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("tcp://{ip}:{DOCKER_PORT}"))
    }

    async fn ssh_hostname(&mut self) -> Result<String> {
        self.ip().await
    }

    async fn start(&mut self) -> Result<()> {
        let (session, vm) = self.resolve().await?;
        info!(vm = %vm, "starting vm");
        session.start_vm(&vm).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let (session, vm) = self.resolve().await?;
        info!(vm = %vm, "shutting down vm");
        session.shutdown_vm(&vm).await?;
        Ok(())
    }

    async fn kill(&mut self) -> Result<()> {
        let (session, vm) = self.resolve().await?;
        info!(vm = %vm, "stopping vm");
        session.stop_vm(&vm).await?;
        Ok(())
    }

    /// Shut down, then start. If the start fails the VM stays stopped.
    async fn restart(&mut self) -> Result<()> {
        let (session, vm) = self.resolve().await?;
        info!(vm = %vm, "restarting vm");
        session.shutdown_vm(&vm).await?;
        session.start_vm(&vm).await?;
        Ok(())
    }

    async fn remove(&mut self) -> Result<()> {
        let (session, vm) = self.resolve().await?;
        info!(vm = %vm, "removing vm");
        session.delete_vm(&vm).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
