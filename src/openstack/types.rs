//! Wire types for the OpenStack service APIs.

use serde::{Deserialize, Serialize};

use crate::backend::{ImageSummary, StackDetail};
use crate::flavor::FlavorSpec;

/// Services the backend talks to, keyed by catalog type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ServiceType {
    Compute,
    Image,
    Network,
    Orchestration,
}

impl ServiceType {
    pub(crate) const fn catalog_type(self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Image => "image",
            Self::Network => "network",
            Self::Orchestration => "orchestration",
        }
    }

    /// Version segment the catalog URL may omit.
    pub(crate) const fn api_version(self) -> Option<&'static str> {
        match self {
            Self::Image => Some("v2"),
            Self::Network => Some("v2.0"),
            Self::Compute | Self::Orchestration => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlavorList {
    #[serde(default)]
    pub(crate) flavors: Vec<NovaFlavor>,
    #[serde(default)]
    pub(crate) flavors_links: Vec<PageLink>,
}

/// Pagination link as returned by Nova collection listings.
#[derive(Debug, Deserialize)]
pub(crate) struct PageLink {
    pub(crate) href: String,
    pub(crate) rel: String,
}

impl FlavorList {
    pub(crate) fn next_href(&self) -> Option<&str> {
        self.flavors_links
            .iter()
            .find(|link| link.rel == "next")
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NovaFlavor {
    pub(crate) name: String,
    pub(crate) vcpus: u32,
    pub(crate) ram: u64,
    #[serde(default)]
    pub(crate) disk: u64,
}

impl From<NovaFlavor> for FlavorSpec {
    fn from(value: NovaFlavor) -> Self {
        Self::new(value.name, value.vcpus, value.ram, value.disk)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerEnvelope {
    pub(crate) server: ServerRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerList {
    #[serde(default)]
    pub(crate) servers: Vec<ServerRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerRef {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConsoleAction {
    #[serde(rename = "os-getVNCConsole")]
    pub(crate) get_vnc_console: ConsoleType,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConsoleType {
    #[serde(rename = "type")]
    pub(crate) console_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsoleEnvelope {
    pub(crate) console: Console,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Console {
    pub(crate) url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageList {
    #[serde(default)]
    pub(crate) images: Vec<ImageSummary>,
    #[serde(default)]
    pub(crate) next: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageCreate<'a> {
    pub(crate) name: &'a str,
    pub(crate) disk_format: &'a str,
    pub(crate) container_format: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NetworkList {
    #[serde(default)]
    pub(crate) networks: Vec<NetworkRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NetworkEnvelope {
    pub(crate) network: NetworkRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NetworkRef {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortList {
    #[serde(default)]
    pub(crate) ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Port {
    #[serde(default)]
    pub(crate) fixed_ips: Vec<FixedIp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixedIp {
    pub(crate) ip_address: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StackCreate<'a> {
    pub(crate) stack_name: &'a str,
    pub(crate) template: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StackCreated {
    pub(crate) stack: StackCreatedRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StackCreatedRef {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StackEnvelope {
    pub(crate) stack: StackDetail,
}
