//! Image service (Glance v2) helpers.

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Url};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::backend::{ImageSummary, ImageUpload};

use super::session::Session;
use super::types::{ImageCreate, ImageList, ServiceType};
use super::{HTTP_CLIENT, OpenStackBackend, OpenStackBackendError};

const OCTET_STREAM: &str = "application/octet-stream";
// Image data can run to several gigabytes.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

impl OpenStackBackend {
    /// Lists every active image, following Glance's `next` links.
    pub(in crate::openstack) async fn fetch_active_images(
        session: &Session,
    ) -> Result<Vec<ImageSummary>, OpenStackBackendError> {
        let mut images = Vec::new();
        let mut next = Some(Self::endpoint(session, ServiceType::Image, &["images"])?);
        while let Some(url) = next.take() {
            let page: ImageList =
                Self::fetch(session, ServiceType::Image, HTTP_CLIENT.get(url)).await?;
            images.extend(page.images.into_iter().filter(ImageSummary::is_active));
            if let Some(link) = page.next {
                next = Some(Self::next_page_url(session, &link)?);
            }
        }
        debug!(count = images.len(), "listed active images");
        Ok(images)
    }

    /// `next` links are rooted at the endpoint without its version segment.
    fn next_page_url(session: &Session, link: &str) -> Result<Url, OpenStackBackendError> {
        let base = session.service_url(ServiceType::Image)?;
        let root = base.strip_suffix("/v2").unwrap_or(&base);
        let joined = format!("{root}{link}");
        Url::parse(&joined).map_err(|err| OpenStackBackendError::InvalidUrl {
            url: joined.clone(),
            message: err.to_string(),
        })
    }

    pub(in crate::openstack) async fn fetch_image(
        session: &Session,
        image_id: &str,
    ) -> Result<Option<ImageSummary>, OpenStackBackendError> {
        let url = Self::endpoint(session, ServiceType::Image, &["images", image_id])?;
        Self::fetch_optional(session, ServiceType::Image, HTTP_CLIENT.get(url)).await
    }

    /// Resolves an image by identifier first, then by exact name.
    pub(in crate::openstack) async fn lookup_image(
        session: &Session,
        name_or_id: &str,
    ) -> Result<Option<ImageSummary>, OpenStackBackendError> {
        if let Some(image) = Self::fetch_image(session, name_or_id).await? {
            return Ok(Some(image));
        }

        let mut url = Self::endpoint(session, ServiceType::Image, &["images"])?;
        url.query_pairs_mut().append_pair("name", name_or_id);
        let list: Option<ImageList> =
            Self::fetch_optional(session, ServiceType::Image, HTTP_CLIENT.get(url)).await?;
        Ok(list.and_then(|found| found.images.into_iter().next()))
    }

    /// Opens the image file, creates the record and streams the data.
    ///
    /// The file is opened before anything is created so that an unreadable
    /// path leaves no queued image behind.
    pub(in crate::openstack) async fn create_and_upload_image(
        session: &Session,
        upload: &ImageUpload,
    ) -> Result<ImageSummary, OpenStackBackendError> {
        let read_error = |err: std::io::Error| OpenStackBackendError::Io {
            path: upload.path.clone(),
            message: err.to_string(),
        };
        let file = File::open(upload.path.as_std_path())
            .await
            .map_err(read_error)?;
        let size = file.metadata().await.map_err(read_error)?.len();

        let create_url = Self::endpoint(session, ServiceType::Image, &["images"])?;
        let body = ImageCreate {
            name: &upload.name,
            disk_format: &upload.disk_format,
            container_format: &upload.container_format,
        };
        let created: ImageSummary = Self::fetch(
            session,
            ServiceType::Image,
            HTTP_CLIENT.post(create_url).json(&body),
        )
        .await?;
        info!(image = %created.id, name = %upload.name, bytes = size, "uploading image data");

        let file_url =
            Self::endpoint(session, ServiceType::Image, &["images", &created.id, "file"])?;
        let request = HTTP_CLIENT
            .put(file_url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .header(CONTENT_LENGTH, size)
            .timeout(UPLOAD_TIMEOUT)
            .body(Body::wrap_stream(ReaderStream::new(file)));
        if Self::execute(session, ServiceType::Image, request)
            .await?
            .is_none()
        {
            return Err(OpenStackBackendError::Api {
                service: ServiceType::Image.catalog_type().to_owned(),
                status: reqwest::StatusCode::NOT_FOUND.as_u16(),
                message: format!("image {} vanished before upload", created.id),
            });
        }

        Ok(Self::fetch_image(session, &created.id)
            .await?
            .unwrap_or(created))
    }
}
