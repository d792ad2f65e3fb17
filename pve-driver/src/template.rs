//! Fixed hardware template for machines created by the driver.

use pve_api::{DiskBus, QemuConfig, QemuDisk, QemuNetwork};

pub const DESCRIPTION: &str = "Docker Machine VM";
pub const MEMORY_MB: u32 = 2048;
/// Legacy boot order: disk first, then CD-ROM.
pub const BOOT_ORDER: &str = "cd";
pub const CPU_TYPE: &str = "host";
pub const OS_TYPE: &str = "l26";
pub const INSTALL_ISO: &str = "NFS:iso/rancheros-proxmoxve-autoformat.iso";
pub const DISK_STORAGE: &str = "local";
pub const DISK_SIZE_GB: u32 = 30;
pub const DISK_FORMAT: &str = "qcow2";
pub const BRIDGE: &str = "vmbr0";

/// Build the VM configuration for machine `name`.
///
/// The configured ISO path of the machine is not used here.
pub fn machine_template(name: &str) -> QemuConfig {
    QemuConfig {
        name: name.to_owned(),
        description: DESCRIPTION.to_owned(),
        memory_mb: MEMORY_MB,
        boot: BOOT_ORDER.to_owned(),
        on_boot: true,
        cpu: CPU_TYPE.to_owned(),
        os_type: OS_TYPE.to_owned(),
        sockets: 1,
        cores: 1,
        vcpus: 1,
        iso: Some(INSTALL_ISO.to_owned()),
        agent: true,
        disks: vec![QemuDisk {
            bus: DiskBus::Virtio,
            storage: DISK_STORAGE.to_owned(),
            size_gb: DISK_SIZE_GB,
            format: DISK_FORMAT.to_owned(),
            cache: "none".to_owned(),
            backup: true,
        }],
        networks: vec![QemuNetwork {
            model: "virtio".to_owned(),
            bridge: BRIDGE.to_owned(),
        }],
    }
}
