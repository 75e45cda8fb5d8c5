//! Compute (Nova) helpers: flavors, server lookup and consoles.

use reqwest::Url;
use tracing::{debug, error, warn};

use crate::flavor::FlavorSpec;

use super::session::Session;
use super::types::{
    ConsoleAction, ConsoleEnvelope, ConsoleType, FlavorList, ServerEnvelope, ServerList, ServerRef,
    ServiceType,
};
use super::{HTTP_CLIENT, OpenStackBackend, OpenStackBackendError};

const CONSOLE_TYPE: &str = "novnc";

impl OpenStackBackend {
    /// Lists every flavor, following Nova's `next` links.
    pub(in crate::openstack) async fn fetch_flavors(
        session: &Session,
        project: &str,
    ) -> Result<Vec<FlavorSpec>, OpenStackBackendError> {
        // Flavors are scoped by the token; the project name is informational.
        debug!(project, "listing flavors");
        let mut flavors = Vec::new();
        let mut next = Some(Self::endpoint(session, ServiceType::Compute, &["flavors", "detail"])?);
        while let Some(url) = next.take() {
            let page: FlavorList =
                Self::fetch(session, ServiceType::Compute, HTTP_CLIENT.get(url)).await?;
            if let Some(href) = page.next_href() {
                next = Some(Self::link_url(href)?);
            }
            flavors.extend(page.flavors.into_iter().map(FlavorSpec::from));
        }
        debug!(count = flavors.len(), "listed flavors");
        Ok(flavors)
    }

    fn link_url(href: &str) -> Result<Url, OpenStackBackendError> {
        Url::parse(href).map_err(|err| OpenStackBackendError::InvalidUrl {
            url: href.to_owned(),
            message: err.to_string(),
        })
    }

    /// Resolves a server by identifier first, then by exact name.
    pub(in crate::openstack) async fn find_server(
        session: &Session,
        name_or_id: &str,
    ) -> Result<Option<ServerRef>, OpenStackBackendError> {
        let by_id = Self::endpoint(session, ServiceType::Compute, &["servers", name_or_id])?;
        let direct: Option<ServerEnvelope> =
            Self::fetch_optional(session, ServiceType::Compute, HTTP_CLIENT.get(by_id)).await?;
        if let Some(envelope) = direct {
            return Ok(Some(envelope.server));
        }

        let mut by_name = Self::endpoint(session, ServiceType::Compute, &["servers"])?;
        by_name.query_pairs_mut().append_pair("name", name_or_id);
        let list: Option<ServerList> =
            Self::fetch_optional(session, ServiceType::Compute, HTTP_CLIENT.get(by_name)).await?;
        // Nova treats the name filter as a regex, so keep exact matches only.
        Ok(list.and_then(|found| {
            found
                .servers
                .into_iter()
                .find(|server| server.name == name_or_id)
        }))
    }

    pub(in crate::openstack) async fn console_url(
        session: &Session,
        instance_name: &str,
    ) -> Result<Option<String>, OpenStackBackendError> {
        let Some(server) = Self::find_server(session, instance_name).await? else {
            warn!(instance = instance_name, "server not found");
            return Ok(None);
        };

        let url = Self::endpoint(
            session,
            ServiceType::Compute,
            &["servers", &server.id, "action"],
        )?;
        let body = ConsoleAction {
            get_vnc_console: ConsoleType {
                console_type: CONSOLE_TYPE,
            },
        };
        let request = HTTP_CLIENT.post(url).json(&body);
        match Self::fetch::<ConsoleEnvelope>(session, ServiceType::Compute, request).await {
            Ok(envelope) => Ok(Some(envelope.console.url)),
            Err(err) => {
                error!(
                    instance = instance_name,
                    server = %server.id,
                    error = %err,
                    "console request failed"
                );
                Ok(None)
            }
        }
    }
}
