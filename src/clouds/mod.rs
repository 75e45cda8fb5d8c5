//! `clouds.yaml` discovery and parsing for auto connection mode.
//!
//! Only the password-auth subset of the file format is understood: the
//! `auth` block plus `region_name` and `interface` for each cloud.

use std::collections::BTreeMap;
use std::env;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{Credentials, OpenStackConfig};

/// Environment variable naming an explicit `clouds.yaml` path.
pub const CLOUDS_FILE_ENV: &str = "OS_CLIENT_CONFIG_FILE";

const CLOUDS_FILE_NAME: &str = "clouds.yaml";

/// Errors raised while locating or reading `clouds.yaml`.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CloudsError {
    /// Raised when no candidate file exists.
    #[error("no clouds.yaml found (searched: {searched})")]
    NotFound {
        /// Comma-separated list of searched paths.
        searched: String,
    },
    /// Raised when a file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when YAML parsing fails.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
    /// Raised when the requested cloud is not defined.
    #[error("cloud '{cloud}' not defined in {path}")]
    UnknownCloud {
        /// Requested cloud name.
        cloud: String,
        /// File that was searched.
        path: Utf8PathBuf,
    },
    /// Raised when a cloud entry lacks a required auth field.
    #[error("cloud '{cloud}' is missing auth.{field}")]
    MissingField {
        /// Cloud name.
        cloud: String,
        /// Missing field within the `auth` block.
        field: String,
    },
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
struct CloudAuth {
    auth_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    project_name: Option<String>,
    user_domain_name: Option<String>,
    project_domain_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
struct CloudEntry {
    #[serde(default)]
    auth: CloudAuth,
    region_name: Option<String>,
    interface: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
struct CloudsDocument {
    #[serde(default)]
    clouds: BTreeMap<String, CloudEntry>,
}

/// A parsed `clouds.yaml` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CloudsFile {
    path: Utf8PathBuf,
    document: CloudsDocument,
}

impl CloudsFile {
    /// Parses `contents` as if read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudsError::Parse`] when the YAML is malformed.
    pub fn parse(path: impl Into<Utf8PathBuf>, contents: &str) -> Result<Self, CloudsError> {
        let file_path = path.into();
        let document = serde_yaml::from_str::<CloudsDocument>(contents).map_err(|err| {
            CloudsError::Parse {
                path: file_path.clone(),
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            path: file_path,
            document,
        })
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudsError::Io`] or [`CloudsError::Parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, CloudsError> {
        let contents = read_file(path)?;
        Self::parse(path, &contents)
    }

    /// Loads the first existing file among `candidates`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudsError::NotFound`] when none exist, otherwise any error
    /// from [`CloudsFile::load`].
    pub fn discover(candidates: &[Utf8PathBuf]) -> Result<Self, CloudsError> {
        for candidate in candidates {
            if path_exists(candidate)? {
                debug!(path = %candidate, "using clouds.yaml");
                return Self::load(candidate);
            }
        }
        Err(CloudsError::NotFound {
            searched: candidates
                .iter()
                .map(|candidate| candidate.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Path the file was read from.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Names of the clouds defined in the file.
    #[must_use]
    pub fn cloud_names(&self) -> Vec<&str> {
        self.document.clouds.keys().map(String::as_str).collect()
    }

    /// Builds credentials for `cloud`. Domains, region and interface fall
    /// back to the values in `defaults` when the entry omits them.
    ///
    /// # Errors
    ///
    /// Returns [`CloudsError::UnknownCloud`] or [`CloudsError::MissingField`].
    pub fn credentials(
        &self,
        cloud: &str,
        defaults: &OpenStackConfig,
    ) -> Result<Credentials, CloudsError> {
        let entry = self
            .document
            .clouds
            .get(cloud)
            .ok_or_else(|| CloudsError::UnknownCloud {
                cloud: cloud.to_owned(),
                path: self.path.clone(),
            })?;
        let require = |value: Option<&String>, field: &str| {
            value
                .map(|present| present.trim().to_owned())
                .filter(|present| !present.is_empty())
                .ok_or_else(|| CloudsError::MissingField {
                    cloud: cloud.to_owned(),
                    field: field.to_owned(),
                })
        };
        let auth = &entry.auth;
        Ok(Credentials {
            auth_url: require(auth.auth_url.as_ref(), "auth_url")?,
            username: require(auth.username.as_ref(), "username")?,
            password: require(auth.password.as_ref(), "password")?,
            project_name: require(auth.project_name.as_ref(), "project_name")?,
            user_domain_name: auth
                .user_domain_name
                .clone()
                .unwrap_or_else(|| defaults.user_domain_name.clone()),
            project_domain_name: auth
                .project_domain_name
                .clone()
                .unwrap_or_else(|| defaults.project_domain_name.clone()),
            region_name: entry
                .region_name
                .clone()
                .or_else(|| defaults.region_name.clone()),
            interface: entry
                .interface
                .clone()
                .unwrap_or_else(|| defaults.interface.clone()),
        })
    }
}

/// Standard `clouds.yaml` search order: `$OS_CLIENT_CONFIG_FILE`, the
/// working directory, the user config directory, then `/etc/openstack`.
#[must_use]
pub fn default_search_paths() -> Vec<Utf8PathBuf> {
    let mut paths = Vec::new();
    if let Some(explicit) = env::var(CLOUDS_FILE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        paths.push(Utf8PathBuf::from(explicit));
    }
    paths.push(Utf8PathBuf::from(CLOUDS_FILE_NAME));
    let config_home = env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Utf8PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|home| Utf8PathBuf::from(home).join(".config"))
        });
    if let Some(dir) = config_home {
        paths.push(dir.join("openstack").join(CLOUDS_FILE_NAME));
    }
    paths.push(Utf8PathBuf::from("/etc/openstack").join(CLOUDS_FILE_NAME));
    paths
}

fn split_path(path: &Utf8Path) -> Result<(&Utf8Path, &str), CloudsError> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| CloudsError::Io {
        path: path.to_path_buf(),
        message: String::from("path is missing a filename"),
    })?;
    Ok((parent, file_name))
}

fn path_exists(path: &Utf8Path) -> Result<bool, CloudsError> {
    let (parent, file_name) = split_path(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name).map_err(|err| CloudsError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(CloudsError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn read_file(path: &Utf8Path) -> Result<String, CloudsError> {
    let (parent, file_name) = split_path(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| CloudsError::Io {
        path: parent.to_path_buf(),
        message: err.to_string(),
    })?;
    dir.read_to_string(file_name).map_err(|err| CloudsError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
