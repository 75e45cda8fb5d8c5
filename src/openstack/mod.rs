//! OpenStack backend implementation of the cloud facade.
//!
//! Every operation authenticates afresh against Keystone, resolves the
//! service endpoint from the returned catalog, and issues one or two REST
//! calls. No session, connection pool or retry state is kept between calls.

mod compute;
mod error;
mod image;
mod network;
mod orchestration;
mod session;
mod types;

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{
    BackendFuture, CloudBackend, ImageSummary, ImageUpload, ManagementIp, NewStack, StackDetail,
    StackHandle,
};
use crate::config::{Credentials, OpenStackConfig};
use crate::flavor::FlavorSpec;
use session::Session;
use types::ServiceType;

pub use error::OpenStackBackendError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

// Idle connections are not pooled: calls are sparse and each re-authenticates.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .pool_max_idle_per_host(0)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Backend that proxies facade calls to an OpenStack cloud.
#[derive(Clone, Debug)]
pub struct OpenStackBackend {
    config: OpenStackConfig,
    credentials: Credentials,
}

impl OpenStackBackend {
    /// Constructs a new backend from configuration, resolving credentials
    /// from `clouds.yaml` in auto mode.
    ///
    /// # Errors
    ///
    /// Returns [`OpenStackBackendError::Config`] when the configuration fails
    /// validation or credentials cannot be resolved.
    pub fn new(config: OpenStackConfig) -> Result<Self, OpenStackBackendError> {
        let credentials = config.credentials()?;
        Ok(Self {
            config,
            credentials,
        })
    }

    /// Credentials the backend authenticates with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn connect(&self) -> Result<Session, OpenStackBackendError> {
        Session::authenticate(&self.credentials).await
    }

    fn endpoint(
        session: &Session,
        service: ServiceType,
        segments: &[&str],
    ) -> Result<Url, OpenStackBackendError> {
        let base = session.service_url(service)?;
        let mut url = Url::parse(&base).map_err(|err| OpenStackBackendError::InvalidUrl {
            url: base.clone(),
            message: err.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|()| OpenStackBackendError::InvalidUrl {
                url: base.clone(),
                message: String::from("URL cannot carry a path"),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends an authenticated request. A 404 yields `None`; any other
    /// non-success status is an [`OpenStackBackendError::Api`] error.
    /// Requests keep the client's timeout unless they set their own.
    async fn execute(
        session: &Session,
        service: ServiceType,
        request: RequestBuilder,
    ) -> Result<Option<Response>, OpenStackBackendError> {
        let response = request
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenStackBackendError::Api {
                service: service.catalog_type().to_owned(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(Some(response))
    }

    async fn decode<T: DeserializeOwned>(
        service: ServiceType,
        response: Response,
    ) -> Result<T, OpenStackBackendError> {
        response
            .json::<T>()
            .await
            .map_err(|err| OpenStackBackendError::Decode {
                context: service.catalog_type().to_owned(),
                message: err.to_string(),
            })
    }

    async fn fetch_optional<T: DeserializeOwned>(
        session: &Session,
        service: ServiceType,
        request: RequestBuilder,
    ) -> Result<Option<T>, OpenStackBackendError> {
        let Some(response) = Self::execute(session, service, request).await? else {
            return Ok(None);
        };
        Self::decode(service, response).await.map(Some)
    }

    async fn fetch<T: DeserializeOwned>(
        session: &Session,
        service: ServiceType,
        request: RequestBuilder,
    ) -> Result<T, OpenStackBackendError> {
        Self::fetch_optional(session, service, request)
            .await?
            .ok_or_else(|| OpenStackBackendError::Api {
                service: service.catalog_type().to_owned(),
                status: StatusCode::NOT_FOUND.as_u16(),
                message: String::from("resource not found"),
            })
    }
}

impl CloudBackend for OpenStackBackend {
    type Error = OpenStackBackendError;

    fn authorize(&self) -> BackendFuture<'_, bool, Self::Error> {
        Box::pin(async move {
            debug!("checking credentials");
            match self.connect().await {
                Ok(_) => Ok(true),
                Err(OpenStackBackendError::Unauthorized) => Ok(false),
                Err(other) => Err(other),
            }
        })
    }

    fn list_flavors<'a>(
        &'a self,
        project: &'a str,
    ) -> BackendFuture<'a, Vec<FlavorSpec>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::fetch_flavors(&session, project).await
        })
    }

    fn list_images(&self) -> BackendFuture<'_, Vec<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::fetch_active_images(&session).await
        })
    }

    fn image_detail<'a>(
        &'a self,
        image_id: &'a str,
    ) -> BackendFuture<'a, Option<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::fetch_image(&session, image_id).await
        })
    }

    fn find_image<'a>(
        &'a self,
        name_or_id: &'a str,
    ) -> BackendFuture<'a, Option<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::lookup_image(&session, name_or_id).await
        })
    }

    fn image_id_for_name<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Ok(Self::lookup_image(&session, name)
                .await?
                .map(|image| image.id))
        })
    }

    fn upload_image<'a>(
        &'a self,
        upload: &'a ImageUpload,
    ) -> BackendFuture<'a, ImageSummary, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::create_and_upload_image(&session, upload).await
        })
    }

    fn serial_console_url<'a>(
        &'a self,
        instance_name: &'a str,
    ) -> BackendFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::console_url(&session, instance_name).await
        })
    }

    fn current_project_id(&self) -> BackendFuture<'_, String, Self::Error> {
        Box::pin(async move { Ok(self.connect().await?.project_id) })
    }

    fn consumed_management_ips(&self) -> BackendFuture<'_, Vec<ManagementIp>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::network_fixed_ips(&session, &self.config.mgmt_network).await
        })
    }

    fn create_stack<'a>(
        &'a self,
        stack: &'a NewStack,
    ) -> BackendFuture<'a, StackHandle, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::post_stack(&session, stack).await
        })
    }

    fn stack_details<'a>(
        &'a self,
        stack_name: &'a str,
    ) -> BackendFuture<'a, Option<StackDetail>, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::fetch_stack(&session, stack_name).await
        })
    }

    fn delete_stack<'a>(&'a self, stack_name: &'a str) -> BackendFuture<'a, bool, Self::Error> {
        Box::pin(async move {
            let session = self.connect().await?;
            Self::remove_stack(&session, stack_name).await
        })
    }
}
