//! Configuration flags declared to the host tool.

use std::collections::HashMap;

pub const FLAG_API_URL: &str = "proxmoxve-api-url";
pub const FLAG_USER: &str = "proxmoxve-user";
pub const FLAG_PASS: &str = "proxmoxve-pass";
pub const FLAG_OTP: &str = "proxmoxve-otp";
pub const FLAG_NODE: &str = "proxmoxve-node";

pub const DEFAULT_USER: &str = "root@pam";
pub const DEFAULT_NODE: &str = "pve";

/// A string flag with its environment variable and default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub name: &'static str,
    pub usage: &'static str,
    pub env_var: &'static str,
    pub default: &'static str,
}

/// Flags accepted when creating a machine with this driver.
pub fn create_flags() -> Vec<Flag> {
    vec![
        Flag {
            name: FLAG_API_URL,
            usage: "Proxmox VE API URL (example: https://hostname:8006/api2/json)",
            env_var: "PROXMOXVE_API_URL",
            default: "",
        },
        Flag {
            name: FLAG_USER,
            usage: "Proxmox VE connection user (default: root@pam)",
            env_var: "PROXMOXVE_USER",
            default: DEFAULT_USER,
        },
        Flag {
            name: FLAG_PASS,
            usage: "Proxmox VE connection password",
            env_var: "PROXMOXVE_PASS",
            default: "",
        },
        Flag {
            name: FLAG_OTP,
            usage: "Proxmox VE OTP Token (optional)",
            env_var: "PROXMOXVE_OTP",
            default: "",
        },
        Flag {
            name: FLAG_NODE,
            usage: "Proxmox VE node (default: pve)",
            env_var: "PROXMOXVE_NODE",
            default: DEFAULT_NODE,
        },
    ]
}

/// Source of flag values supplied by the host tool.
pub trait DriverOptions {
    fn string(&mut self, key: &str) -> String;
}

/// In-memory [`DriverOptions`] that checks lookups against declared flags.
///
/// Reading a key that is not declared in `create_flags` records it in
/// `invalid_flags` and yields an empty string. Declared keys without an
/// explicit value yield the flag's default.
#[derive(Debug, Clone, Default)]
pub struct CheckDriverOptions {
    pub flag_values: HashMap<String, String>,
    pub create_flags: Vec<Flag>,
    pub invalid_flags: Vec<String>,
}

impl CheckDriverOptions {
    pub fn new(create_flags: Vec<Flag>) -> Self {
        Self {
            flag_values: HashMap::new(),
            create_flags,
            invalid_flags: Vec::new(),
        }
    }

    /// Set an explicit value for `key`.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flag_values.insert(key.into(), value.into());
        self
    }
}

impl DriverOptions for CheckDriverOptions {
    fn string(&mut self, key: &str) -> String {
        match self.create_flags.iter().find(|flag| flag.name == key) {
            Some(flag) => self
                .flag_values
                .get(key)
                .cloned()
                .unwrap_or_else(|| flag.default.to_owned()),
            None => {
                self.invalid_flags.push(key.to_owned());
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_flags_defaults_and_env() {
        let flags = create_flags();
        let names: Vec<_> = flags.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            [FLAG_API_URL, FLAG_USER, FLAG_PASS, FLAG_OTP, FLAG_NODE]
        );

        let user = flags.iter().find(|f| f.name == FLAG_USER).unwrap();
        assert_eq!(user.default, "root@pam");
        assert_eq!(user.env_var, "PROXMOXVE_USER");

        let node = flags.iter().find(|f| f.name == FLAG_NODE).unwrap();
        assert_eq!(node.default, "pve");
        assert_eq!(node.env_var, "PROXMOXVE_NODE");

        for flag in flags.iter().filter(|f| f.name != FLAG_USER && f.name != FLAG_NODE) {
            assert_eq!(flag.default, "", "{} should default to empty", flag.name);
        }
    }

    #[test]
    fn test_check_options_falls_back_to_default() {
        let mut options = CheckDriverOptions::new(create_flags()).value(FLAG_PASS, "secret");
        assert_eq!(options.string(FLAG_PASS), "secret");
        assert_eq!(options.string(FLAG_NODE), "pve");
        assert!(options.invalid_flags.is_empty());
    }

    #[test]
    fn test_check_options_records_undeclared_flags() {
        let mut options = CheckDriverOptions::new(create_flags());
        assert_eq!(options.string("proxmoxve-storage"), "");
        assert_eq!(options.invalid_flags, ["proxmoxve-storage"]);
    }
}
