//! Orchestration (Heat) helpers.

use tracing::{info, warn};

use crate::backend::{NewStack, StackDetail, StackHandle};

use super::session::Session;
use super::types::{ServiceType, StackCreate, StackCreated, StackEnvelope};
use super::{HTTP_CLIENT, OpenStackBackend, OpenStackBackendError};

impl OpenStackBackend {
    pub(in crate::openstack) async fn post_stack(
        session: &Session,
        stack: &NewStack,
    ) -> Result<StackHandle, OpenStackBackendError> {
        let url = Self::endpoint(session, ServiceType::Orchestration, &["stacks"])?;
        let body = StackCreate {
            stack_name: &stack.name,
            template: &stack.template,
        };
        let created: StackCreated = Self::fetch(
            session,
            ServiceType::Orchestration,
            HTTP_CLIENT.post(url).json(&body),
        )
        .await?;
        info!(stack = %stack.name, id = %created.stack.id, "stack accepted");
        Ok(StackHandle {
            id: created.stack.id,
        })
    }

    /// Heat redirects `/stacks/{name}` to the canonical name/id path; the
    /// client follows the redirect.
    pub(in crate::openstack) async fn fetch_stack(
        session: &Session,
        stack_name: &str,
    ) -> Result<Option<StackDetail>, OpenStackBackendError> {
        let url = Self::endpoint(session, ServiceType::Orchestration, &["stacks", stack_name])?;
        let envelope: Option<StackEnvelope> =
            Self::fetch_optional(session, ServiceType::Orchestration, HTTP_CLIENT.get(url)).await?;
        Ok(envelope.map(|found| found.stack))
    }

    pub(in crate::openstack) async fn remove_stack(
        session: &Session,
        stack_name: &str,
    ) -> Result<bool, OpenStackBackendError> {
        let Some(stack) = Self::fetch_stack(session, stack_name).await? else {
            warn!(stack = stack_name, "stack not found");
            return Ok(false);
        };

        let url = Self::endpoint(
            session,
            ServiceType::Orchestration,
            &["stacks", &stack.stack_name, &stack.id],
        )?;
        let deleted = Self::execute(session, ServiceType::Orchestration, HTTP_CLIENT.delete(url))
            .await?
            .is_some();
        if deleted {
            info!(stack = stack_name, id = %stack.id, "stack delete requested");
        }
        Ok(deleted)
    }
}
