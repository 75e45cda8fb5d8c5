//! Networking (Neutron) helpers.

use tracing::{debug, warn};

use crate::backend::ManagementIp;

use super::session::Session;
use super::types::{NetworkEnvelope, NetworkList, PortList, ServiceType};
use super::{HTTP_CLIENT, OpenStackBackend, OpenStackBackendError};

impl OpenStackBackend {
    async fn find_network_id(
        session: &Session,
        name_or_id: &str,
    ) -> Result<Option<String>, OpenStackBackendError> {
        let mut by_name = Self::endpoint(session, ServiceType::Network, &["networks"])?;
        by_name.query_pairs_mut().append_pair("name", name_or_id);
        let list: Option<NetworkList> =
            Self::fetch_optional(session, ServiceType::Network, HTTP_CLIENT.get(by_name)).await?;
        if let Some(network) = list.and_then(|found| found.networks.into_iter().next()) {
            return Ok(Some(network.id));
        }

        let by_id = Self::endpoint(session, ServiceType::Network, &["networks", name_or_id])?;
        let direct: Option<NetworkEnvelope> =
            Self::fetch_optional(session, ServiceType::Network, HTTP_CLIENT.get(by_id)).await?;
        Ok(direct.map(|envelope| envelope.network.id))
    }

    /// Collects every fixed IP of every port on `network`. A missing network
    /// yields an empty list.
    pub(in crate::openstack) async fn network_fixed_ips(
        session: &Session,
        network: &str,
    ) -> Result<Vec<ManagementIp>, OpenStackBackendError> {
        let Some(network_id) = Self::find_network_id(session, network).await? else {
            warn!(network, "management network not found");
            return Ok(Vec::new());
        };

        let mut url = Self::endpoint(session, ServiceType::Network, &["ports"])?;
        url.query_pairs_mut().append_pair("network_id", &network_id);
        let ports: PortList =
            Self::fetch(session, ServiceType::Network, HTTP_CLIENT.get(url)).await?;

        let addresses: Vec<ManagementIp> = ports
            .ports
            .into_iter()
            .flat_map(|port| port.fixed_ips)
            .map(|fixed| ManagementIp {
                ip_address: fixed.ip_address,
            })
            .collect();
        debug!(network, count = addresses.len(), "collected management addresses");
        Ok(addresses)
    }
}
