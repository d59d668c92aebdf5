//! Device attributes reported next to telemetry.
//!
//! T085: Implement AttributesCollector (device name, IPv4 address, MAC address)

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};

/// Default sysfs directory listing network interfaces.
pub const DEFAULT_NET_DIR: &str = "/sys/class/net";

/// Address used to select the outbound interface. Nothing is sent to it.
const ROUTE_TARGET: &str = "8.8.8.8:80";

/// Attribute snapshot for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    /// Configured device name
    pub device_name: String,
    /// Primary IPv4 address, if one could be determined
    pub ip_address: Option<String>,
    /// MAC address in colon format, if one could be determined
    pub mac_address: Option<String>,
}

/// Gathers [`DeviceAttributes`] on demand.
#[derive(Debug, Clone)]
pub struct AttributesCollector {
    device_name: String,
    net_dir: PathBuf,
    route_target: String,
}

impl AttributesCollector {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            net_dir: PathBuf::from(DEFAULT_NET_DIR),
            route_target: ROUTE_TARGET.to_string(),
        }
    }

    /// Read interfaces from another sysfs directory.
    pub fn with_net_dir(mut self, net_dir: impl Into<PathBuf>) -> Self {
        self.net_dir = net_dir.into();
        self
    }

    /// Choose the interface that routes to another address.
    pub fn with_route_target(mut self, target: impl Into<String>) -> Self {
        self.route_target = target.into();
        self
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Gather a fresh snapshot. Lookups that fail are logged and reported as `None`.
    pub fn collect(&self) -> DeviceAttributes {
        DeviceAttributes {
            device_name: self.device_name.clone(),
            ip_address: self.ip_address(),
            mac_address: self.mac_address(),
        }
    }

    /// Local address of a UDP socket connected toward the route target.
    fn ip_address(&self) -> Option<String> {
        let lookup = || -> std::io::Result<SocketAddr> {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            socket.connect(self.route_target.as_str())?;
            socket.local_addr()
        };

        match lookup() {
            Ok(addr) => Some(addr.ip().to_string()),
            Err(e) => {
                tracing::error!("Error getting IP address: {}", e);
                None
            }
        }
    }

    fn mac_address(&self) -> Option<String> {
        let mac = first_hardware_address(&self.net_dir);
        if mac.is_none() {
            tracing::error!("Error getting MAC address: no interface under {}", self.net_dir.display());
        }
        mac
    }
}

/// First non-loopback interface (by name) with a non-zero hardware address.
pub fn first_hardware_address(net_dir: &Path) -> Option<String> {
    let mut interfaces: Vec<PathBuf> = std::fs::read_dir(net_dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name() != "lo")
        .map(|entry| entry.path())
        .collect();
    interfaces.sort();

    interfaces.into_iter().find_map(|iface| {
        let address = std::fs::read_to_string(iface.join("address")).ok()?;
        let address = address.trim().to_lowercase();
        let valid = address.len() == 17 && address != "00:00:00:00:00:00";
        valid.then_some(address)
    })
}
