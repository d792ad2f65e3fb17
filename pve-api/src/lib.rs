//! Low-level typed async client for the Proxmox VE REST API.
//!
//! Covers the endpoints needed to provision and operate a single QEMU VM:
//! ticket login, id allocation, VM creation and deletion, power actions,
//! status queries and guest agent network discovery. Operations that spawn a
//! background task on the node wait for that task to finish.
//!
//! # Example
//!
//! ```no_run
//! use pve_api::{Client, VmRef};
//!
//! # async fn example() -> pve_api::Result<()> {
//! let client = Client::builder("https://pve.example.com:8006/api2/json").build()?;
//! let session = client.login("root@pam", "secret", None).await?;
//!
//! let vm = VmRef::new(session.next_id(0).await?, "pve");
//! let status = session.vm_status(&vm).await?;
//! println!("{vm}: {:?}", status.status);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{Client, ClientBuilder, Session};
pub use error::{Error, Result};
pub use types::{
    ClusterResource, DiskBus, IpAddressInfo, NetworkInterface, QemuConfig, QemuDisk, QemuNetwork,
    TaskId, TaskStatus, VmRef, VmStatus,
};
