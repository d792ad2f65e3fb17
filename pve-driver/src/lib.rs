//! Machine driver that provisions and manages Proxmox VE virtual machines.
//!
//! A [`Driver`] owns the configuration of one machine and translates the host
//! tool's lifecycle calls into Proxmox VE API calls. The API session and the
//! VM reference are resolved on demand and cached for the driver's lifetime.
//!
//! # Quick Start
//!
//! ```no_run
//! use pve_driver::{Driver, MachineDriver, State, Verbosity};
//!
//! # async fn example() -> pve_driver::Result<()> {
//! let mut driver = Driver::new("docker-host-1", "/var/lib/machines", Verbosity::Normal);
//! let descriptor = driver.descriptor_mut();
//! descriptor.api_url = "https://pve.example.com:8006/api2/json".into();
//! descriptor.password = "secret".into();
//!
//! // Allocate an id, create the VM, start it and wait for an address.
//! driver.create().await?;
//! assert_eq!(driver.state().await?, State::Running);
//! println!("docker endpoint: {}", driver.url().await?);
//!
//! driver.stop().await?;
//! driver.remove().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuring from flags
//!
//! ```
//! use pve_driver::flags::{CheckDriverOptions, FLAG_API_URL, FLAG_PASS};
//! use pve_driver::{Driver, MachineDriver, Verbosity};
//!
//! let mut driver = Driver::new("docker-host-1", "", Verbosity::Normal);
//! let mut options = CheckDriverOptions::new(driver.create_flags())
//!     .value(FLAG_API_URL, "https://pve:8006/api2/json")
//!     .value(FLAG_PASS, "secret");
//! driver.set_config_from_flags(&mut options).unwrap();
//!
//! assert!(options.invalid_flags.is_empty());
//! assert_eq!(driver.descriptor().user, "root@pam");
//! ```

pub mod backend;
pub mod contract;
pub mod driver;
pub mod error;
pub mod flags;
pub mod state;
pub mod template;

pub use backend::{ConnectionSettings, Connector, HttpConnector, ProxmoxSession, Verbosity};
pub use contract::MachineDriver;
pub use driver::{Driver, MachineDescriptor, ReadinessPoll};
pub use error::{Error, Result};
pub use flags::{CheckDriverOptions, DriverOptions, Flag, create_flags};
pub use state::State;

/// Re-export API types for convenience.
pub use pve_api::{VmRef, VmStatus};
