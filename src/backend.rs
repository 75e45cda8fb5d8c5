//! Backend abstraction over the cloud services the facade proxies.
//!
//! Every operation maps to one or two remote calls. Lookups that may miss
//! return `Option` (or `bool` for deletions) rather than an error.

use std::future::Future;
use std::pin::Pin;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flavor::FlavorSpec;

/// Image summary as reported by the image service.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ImageSummary {
    /// Provider image identifier.
    pub id: String,
    /// Image name, when one was given.
    #[serde(default)]
    pub name: Option<String>,
    /// Lifecycle status (for example `active` or `queued`).
    pub status: String,
    /// Disk format such as `qcow2`.
    #[serde(default)]
    pub disk_format: Option<String>,
    /// Container format such as `bare`.
    #[serde(default)]
    pub container_format: Option<String>,
    /// Size of the image data in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Visibility (`public`, `private`, `shared` or `community`).
    #[serde(default)]
    pub visibility: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ImageSummary {
    /// Returns `true` when the image is usable for booting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// A fixed IP consumed on the management network.
///
/// Serialises in the dnsmasq DHCP reservation shape, `{"ip-address": "…"}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ManagementIp {
    /// The reserved address.
    #[serde(rename = "ip-address")]
    pub ip_address: String,
}

/// Handle returned once a stack has been accepted by the orchestration
/// service.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StackHandle {
    /// Provider stack identifier.
    pub id: String,
}

/// Stack details as reported by the orchestration service.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StackDetail {
    /// Provider stack identifier.
    pub id: String,
    /// Stack name.
    pub stack_name: String,
    /// Current status (for example `CREATE_COMPLETE`).
    #[serde(default)]
    pub stack_status: Option<String>,
    /// Reason attached to the current status.
    #[serde(default)]
    pub stack_status_reason: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub creation_time: Option<String>,
    /// Template description.
    #[serde(default)]
    pub description: Option<String>,
    /// Stack outputs, passed through untouched.
    #[serde(default)]
    pub outputs: Vec<serde_json::Value>,
}

/// Parameters required to create a stack.
#[derive(Clone, Debug, PartialEq)]
pub struct NewStack {
    /// Stack name.
    pub name: String,
    /// Parsed template document.
    pub template: serde_json::Value,
}

impl NewStack {
    /// Builds a stack request from a name and a JSON template string.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when the name is blank and
    /// [`BackendError::InvalidTemplate`] when the template is not valid JSON.
    pub fn from_template_str(
        name: impl Into<String>,
        template: &str,
    ) -> Result<Self, BackendError> {
        let trimmed = name.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(BackendError::Validation(String::from("stack_name")));
        }
        let parsed = serde_json::from_str(template)
            .map_err(|err| BackendError::InvalidTemplate(err.to_string()))?;
        Ok(Self {
            name: trimmed,
            template: parsed,
        })
    }

    /// Builds a stack request from a template file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] when the file cannot be read, otherwise
    /// the errors of [`NewStack::from_template_str`].
    pub fn from_template_file(
        name: impl Into<String>,
        path: &Utf8Path,
    ) -> Result<Self, BackendError> {
        let io_error = |err: std::io::Error| BackendError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| BackendError::Io {
            path: path.to_path_buf(),
            message: String::from("path is missing a filename"),
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        let contents = dir.read_to_string(file_name).map_err(io_error)?;
        Self::from_template_str(name, &contents)
    }
}

/// Parameters required to upload an image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageUpload {
    /// Name of the image to create.
    pub name: String,
    /// Local file holding the image data.
    pub path: Utf8PathBuf,
    /// Disk format recorded on the image (defaults to `qcow2`).
    pub disk_format: String,
    /// Container format recorded on the image (defaults to `bare`).
    pub container_format: String,
}

impl ImageUpload {
    /// Creates a `qcow2`/`bare` upload request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when the name or path is blank.
    pub fn qcow2(
        name: impl Into<String>,
        path: impl AsRef<Utf8Path>,
    ) -> Result<Self, BackendError> {
        let trimmed = name.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(BackendError::Validation(String::from("image_name")));
        }
        let file = path.as_ref();
        if file.as_str().trim().is_empty() {
            return Err(BackendError::Validation(String::from("image_path")));
        }
        Ok(Self {
            name: trimmed,
            path: file.to_owned(),
            disk_format: String::from("qcow2"),
            container_format: String::from("bare"),
        })
    }
}

/// Errors raised while building backend requests.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum BackendError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// Raised when a stack template cannot be parsed.
    #[error("invalid stack template: {0}")]
    InvalidTemplate(String),
    /// Raised when a local input file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Remote operations offered by a cloud backend.
pub trait CloudBackend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Authenticates, returning `false` when the credentials are rejected.
    fn authorize(&self) -> BackendFuture<'_, bool, Self::Error>;

    /// Lists every compute flavor visible to `project`. An empty list is not
    /// an error.
    fn list_flavors<'a>(&'a self, project: &'a str)
    -> BackendFuture<'a, Vec<FlavorSpec>, Self::Error>;

    /// Lists images whose status is `active`.
    fn list_images(&self) -> BackendFuture<'_, Vec<ImageSummary>, Self::Error>;

    /// Fetches an image by identifier.
    fn image_detail<'a>(
        &'a self,
        image_id: &'a str,
    ) -> BackendFuture<'a, Option<ImageSummary>, Self::Error>;

    /// Finds an image by identifier or exact name.
    fn find_image<'a>(
        &'a self,
        name_or_id: &'a str,
    ) -> BackendFuture<'a, Option<ImageSummary>, Self::Error>;

    /// Resolves an image name to its identifier.
    fn image_id_for_name<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, Option<String>, Self::Error>;

    /// Creates an image record and uploads the file contents into it.
    fn upload_image<'a>(
        &'a self,
        upload: &'a ImageUpload,
    ) -> BackendFuture<'a, ImageSummary, Self::Error>;

    /// Returns the browser console URL for a server, or `None` when the
    /// server does not exist or no console could be obtained.
    fn serial_console_url<'a>(
        &'a self,
        instance_name: &'a str,
    ) -> BackendFuture<'a, Option<String>, Self::Error>;

    /// Returns the project identifier of the authenticated scope.
    fn current_project_id(&self) -> BackendFuture<'_, String, Self::Error>;

    /// Lists every fixed IP on the management network.
    fn consumed_management_ips(&self) -> BackendFuture<'_, Vec<ManagementIp>, Self::Error>;

    /// Creates a stack from a template.
    fn create_stack<'a>(
        &'a self,
        stack: &'a NewStack,
    ) -> BackendFuture<'a, StackHandle, Self::Error>;

    /// Fetches stack details by name.
    fn stack_details<'a>(
        &'a self,
        stack_name: &'a str,
    ) -> BackendFuture<'a, Option<StackDetail>, Self::Error>;

    /// Deletes a stack by name, returning `false` when it does not exist.
    fn delete_stack<'a>(&'a self, stack_name: &'a str) -> BackendFuture<'a, bool, Self::Error>;
}
