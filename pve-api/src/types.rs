//! Request and response types for the subset of the Proxmox VE API used here.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope wrapping every Proxmox VE API response.
#[derive(Debug, Deserialize)]
pub struct ResponseBase<T> {
    pub data: T,
}

/// Reference to a QEMU VM: numeric id plus the node hosting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmRef {
    pub vmid: u32,
    pub node: String,
}

impl VmRef {
    pub fn new(vmid: u32, node: impl Into<String>) -> Self {
        Self {
            vmid,
            node: node.into(),
        }
    }
}

impl fmt::Display for VmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node, self.vmid)
    }
}

/// Ticket returned by `POST /access/ticket`.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticket {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_prevention_token: String,
    pub username: String,
}

/// Reference to a background task (UPID) running on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskId {
    pub upid: String,
    pub node: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    pub status: String,
    #[serde(rename = "exitstatus")]
    pub exit_status: Option<String>,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        self.status == "stopped"
    }

    pub fn is_success(&self) -> bool {
        self.is_finished() && self.exit_status.as_deref() == Some("OK")
    }
}

/// Current runtime status of a VM (`/status/current`).
///
/// Every field is optional: the driver treats a missing `status` as an
/// unknown state rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmStatus {
    pub status: Option<String>,
    #[serde(rename = "qmpstatus")]
    pub qmp_status: Option<String>,
    pub name: Option<String>,
    pub uptime: Option<u64>,
}

/// One entry of `/cluster/resources?type=vm`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub vmid: Option<u32>,
    pub name: Option<String>,
    pub node: Option<String>,
    pub status: Option<String>,
}

/// Payload of the guest agent `network-get-interfaces` command.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentNetworkInterfaces {
    #[serde(default)]
    pub result: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    #[serde(rename = "hardware-address")]
    pub hardware_address: Option<String>,
    #[serde(rename = "ip-addresses", default)]
    pub ip_addresses: Vec<IpAddressInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IpAddressInfo {
    #[serde(rename = "ip-address")]
    pub ip_address: IpAddr,
    #[serde(rename = "ip-address-type")]
    pub ip_address_type: Option<String>,
    pub prefix: Option<u8>,
}

/// Deserialize an id that the API may encode as either a string or a number.
pub(crate) fn flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NextId(#[serde(deserialize_with = "flexible_u32")] pub u32);

// =============================================================================
// VM Configuration
// =============================================================================

/// Disk bus type for a QEMU disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskBus {
    Virtio,
    Scsi,
    Sata,
    Ide,
}

impl DiskBus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Virtio => "virtio",
            Self::Scsi => "scsi",
            Self::Sata => "sata",
            Self::Ide => "ide",
        }
    }
}

/// A disk allocated on a storage pool at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QemuDisk {
    pub bus: DiskBus,
    pub storage: String,
    pub size_gb: u32,
    pub format: String,
    pub cache: String,
    pub backup: bool,
}

impl QemuDisk {
    fn to_param(&self) -> String {
        format!(
            "{}:{},format={},cache={},backup={}",
            self.storage,
            self.size_gb,
            self.format,
            self.cache,
            u8::from(self.backup)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QemuNetwork {
    pub model: String,
    pub bridge: String,
}

impl QemuNetwork {
    fn to_param(&self) -> String {
        format!("{},bridge={}", self.model, self.bridge)
    }
}

/// Hardware configuration for `POST /nodes/{node}/qemu`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QemuConfig {
    pub name: String,
    pub description: String,
    pub memory_mb: u32,
    pub boot: String,
    pub on_boot: bool,
    pub cpu: String,
    pub os_type: String,
    pub sockets: u32,
    pub cores: u32,
    pub vcpus: u32,
    /// Installation image attached as a CD-ROM on `ide2`.
    pub iso: Option<String>,
    pub agent: bool,
    pub disks: Vec<QemuDisk>,
    pub networks: Vec<QemuNetwork>,
}

impl QemuConfig {
    /// Encode the configuration as form parameters for VM `vmid`.
    pub fn to_params(&self, vmid: u32) -> Vec<(String, String)> {
        let mut params = vec![
            ("vmid".to_owned(), vmid.to_string()),
            ("name".to_owned(), self.name.clone()),
            ("description".to_owned(), self.description.clone()),
            ("memory".to_owned(), self.memory_mb.to_string()),
            ("boot".to_owned(), self.boot.clone()),
            ("onboot".to_owned(), u8::from(self.on_boot).to_string()),
            ("cpu".to_owned(), self.cpu.clone()),
            ("ostype".to_owned(), self.os_type.clone()),
            ("sockets".to_owned(), self.sockets.to_string()),
            ("cores".to_owned(), self.cores.to_string()),
            ("vcpus".to_owned(), self.vcpus.to_string()),
            ("agent".to_owned(), u8::from(self.agent).to_string()),
        ];

        if let Some(iso) = &self.iso {
            params.push(("ide2".to_owned(), format!("{iso},media=cdrom")));
        }

        // Each bus numbers its own devices from zero.
        let mut bus_index: Vec<(DiskBus, u32)> = Vec::new();
        for disk in &self.disks {
            let index = match bus_index.iter_mut().find(|(bus, _)| *bus == disk.bus) {
                Some((_, next)) => {
                    *next += 1;
                    *next
                }
                None => {
                    bus_index.push((disk.bus, 0));
                    0
                }
            };
            params.push((format!("{}{index}", disk.bus.as_str()), disk.to_param()));
        }

        for (index, net) in self.networks.iter().enumerate() {
            params.push((format!("net{index}"), net.to_param()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_qemu_config_params() {
        let config = QemuConfig {
            name: "vm1".into(),
            description: "test".into(),
            memory_mb: 1024,
            boot: "cd".into(),
            on_boot: true,
            cpu: "host".into(),
            os_type: "l26".into(),
            sockets: 1,
            cores: 2,
            vcpus: 2,
            iso: Some("local:iso/boot.iso".into()),
            agent: true,
            disks: vec![
                QemuDisk {
                    bus: DiskBus::Virtio,
                    storage: "local".into(),
                    size_gb: 30,
                    format: "qcow2".into(),
                    cache: "none".into(),
                    backup: true,
                },
                QemuDisk {
                    bus: DiskBus::Virtio,
                    storage: "fast".into(),
                    size_gb: 10,
                    format: "raw".into(),
                    cache: "writeback".into(),
                    backup: false,
                },
            ],
            networks: vec![QemuNetwork {
                model: "virtio".into(),
                bridge: "vmbr0".into(),
            }],
        };

        let params = config.to_params(105);
        assert_eq!(param(&params, "vmid"), Some("105"));
        assert_eq!(param(&params, "memory"), Some("1024"));
        assert_eq!(param(&params, "onboot"), Some("1"));
        assert_eq!(param(&params, "agent"), Some("1"));
        assert_eq!(param(&params, "ide2"), Some("local:iso/boot.iso,media=cdrom"));
        assert_eq!(
            param(&params, "virtio0"),
            Some("local:30,format=qcow2,cache=none,backup=1")
        );
        assert_eq!(
            param(&params, "virtio1"),
            Some("fast:10,format=raw,cache=writeback,backup=0")
        );
        assert_eq!(param(&params, "net0"), Some("virtio,bridge=vmbr0"));
    }

    #[test]
    fn test_next_id_accepts_string_and_number() {
        let from_text: ResponseBase<NextId> = serde_json::from_str(r#"{"data":"104"}"#).unwrap();
        assert_eq!(from_text.data.0, 104);

        let from_number: ResponseBase<NextId> = serde_json::from_str(r#"{"data":104}"#).unwrap();
        assert_eq!(from_number.data.0, 104);

        assert!(serde_json::from_str::<ResponseBase<NextId>>(r#"{"data":"abc"}"#).is_err());
    }

    #[test]
    fn test_agent_interfaces_decode() {
        let body = r#"{
            "result": [
                {"name": "lo", "hardware-address": "00:00:00:00:00:00",
                 "ip-addresses": [{"ip-address": "127.0.0.1", "ip-address-type": "ipv4", "prefix": 8}]},
                {"name": "eth0", "hardware-address": "bc:24:11:00:00:01",
                 "ip-addresses": [
                    {"ip-address": "10.0.0.5", "ip-address-type": "ipv4", "prefix": 24},
                    {"ip-address": "fe80::1", "ip-address-type": "ipv6", "prefix": 64}
                 ]},
                {"name": "docker0"}
            ]
        }"#;
        let parsed: AgentNetworkInterfaces = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.result.len(), 3);
        assert_eq!(parsed.result[1].name, "eth0");
        assert_eq!(
            parsed.result[1].ip_addresses[0].ip_address,
            "10.0.0.5".parse::<IpAddr>().unwrap()
        );
        assert!(parsed.result[2].ip_addresses.is_empty());
    }

    #[test]
    fn test_vm_status_tolerates_missing_status() {
        let status: VmStatus = serde_json::from_str(r#"{"name":"vm1"}"#).unwrap();
        assert!(status.status.is_none());
        assert_eq!(status.name.as_deref(), Some("vm1"));
    }

    #[test]
    fn test_task_status_success() {
        let ok: TaskStatus =
            serde_json::from_str(r#"{"status":"stopped","exitstatus":"OK"}"#).unwrap();
        assert!(ok.is_success());

        let running: TaskStatus = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert!(!running.is_finished());

        let failed: TaskStatus =
            serde_json::from_str(r#"{"status":"stopped","exitstatus":"command failed"}"#).unwrap();
        assert!(failed.is_finished());
        assert!(!failed.is_success());
    }
}
