use async_trait::async_trait;

use crate::error::Result;
use crate::flags::{DriverOptions, Flag};
use crate::state::State;

/// Lifecycle contract a machine driver exposes to the host provisioning tool.
///
/// Methods take `&mut self`: a driver instance manages exactly one machine
/// and is driven by one caller at a time.
#[async_trait]
pub trait MachineDriver: Send {
    /// Short identifier of the driver.
    fn driver_name(&self) -> &'static str;

    fn machine_name(&self) -> &str;

    /// Flags the host tool should offer when creating a machine.
    fn create_flags(&self) -> Vec<Flag>;

    /// Copy configuration values from the host's flag layer.
    fn set_config_from_flags(&mut self, flags: &mut dyn DriverOptions) -> Result<()>;

    fn ssh_username(&self) -> &str;

    fn ssh_port(&self) -> u16;

    /// Provision the machine and wait until it is reachable.
    async fn create(&mut self) -> Result<()>;

    async fn state(&mut self) -> Result<State>;

    /// Address of the machine, or an empty string while none is known.
    async fn ip(&mut self) -> Result<String>;

    /// Docker endpoint URL, or an empty string while no IP is known.
    async fn url(&mut self) -> Result<String>;

    async fn ssh_hostname(&mut self) -> Result<String>;

    async fn start(&mut self) -> Result<()>;

    /// Gracefully stop the machine.
    async fn stop(&mut self) -> Result<()>;

    /// Forcefully stop the machine.
    async fn kill(&mut self) -> Result<()>;

    async fn restart(&mut self) -> Result<()>;

    async fn remove(&mut self) -> Result<()>;
}
