//! Rust client and machine driver for Proxmox VE.
//!
//! This crate provides two modules:
//!
//! - [`api`] — Low-level typed client for the Proxmox VE REST API
//! - [`driver`] — Machine driver that provisions and manages one VM per machine
//!
//! # Quick Start
//!
//! ```no_run
//! use proxmoxve::driver::{Driver, MachineDriver, Verbosity};
//!
//! # async fn example() -> proxmoxve::driver::Result<()> {
//! let mut driver = Driver::new("docker-host-1", "/var/lib/machines", Verbosity::Normal);
//! driver.descriptor_mut().api_url = "https://pve.example.com:8006/api2/json".into();
//! driver.descriptor_mut().password = "secret".into();
//!
//! // Allocates an id, creates the VM, boots it and waits for an IP.
//! driver.create().await?;
//! println!("docker endpoint: {}", driver.url().await?);
//! # Ok(())
//! # }
//! ```

/// Low-level typed client for the Proxmox VE API.
///
/// Use this for direct access to the endpoints the driver relies on: ticket
/// login, id allocation, VM creation, power actions and guest agent queries.
pub use pve_api as api;

/// Machine driver for Proxmox VE.
///
/// This module provides:
/// - [`driver::Driver`] — The machine descriptor and lifecycle operations
/// - [`driver::MachineDriver`] — The lifecycle contract expected by the host tool
/// - [`driver::create_flags`] — Configuration flags and their defaults
pub use pve_driver as driver;
