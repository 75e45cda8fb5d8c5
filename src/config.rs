//! Configuration loading via `ortho-config`.
//!
//! Connection parameters are carried in an explicit [`OpenStackConfig`] value
//! handed to the backend; nothing reads process-wide state after loading.

use std::str::FromStr;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::clouds::{CloudsError, CloudsFile};

/// How the backend obtains its credentials.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionMode {
    /// Read a named cloud from `clouds.yaml`.
    Auto,
    /// Use the credentials given directly in [`OpenStackConfig`].
    Explicit,
}

impl FromStr for ConnectionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "explicit" => Ok(Self::Explicit),
            _ => Err(ConfigError::InvalidMode(value.to_owned())),
        }
    }
}

/// OpenStack configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "OS",
    discovery(
        app_name = "hmara",
        env_var = "HMARA_CONFIG_PATH",
        config_file_name = "hmara.toml",
        dotfile_name = ".hmara.toml",
        project_file_name = "hmara.toml"
    )
)]
pub struct OpenStackConfig {
    /// Either `auto` (read `clouds.yaml`) or `explicit`. Defaults to `auto`.
    #[ortho_config(default = "auto".to_owned())]
    pub mode: String,
    /// Cloud entry to read from `clouds.yaml` in auto mode.
    #[ortho_config(default = "default".to_owned())]
    pub cloud: String,
    /// Identity service URL, for example `https://keystone.example.com:5000`.
    pub auth_url: Option<String>,
    /// User name for password authentication.
    pub username: Option<String>,
    /// Password for password authentication.
    pub password: Option<String>,
    /// Project to scope the token to.
    pub project_name: Option<String>,
    /// Domain owning the user. Defaults to `Default`.
    #[ortho_config(default = "Default".to_owned())]
    pub user_domain_name: String,
    /// Domain owning the project. Defaults to `Default`.
    #[ortho_config(default = "Default".to_owned())]
    pub project_domain_name: String,
    /// Region used to pick service endpoints; any region when unset.
    pub region_name: Option<String>,
    /// Endpoint interface (`public`, `internal` or `admin`). Defaults to
    /// `public`.
    #[ortho_config(default = "public".to_owned())]
    pub interface: String,
    /// Name or id of the management network whose addresses are reported as
    /// consumed.
    #[ortho_config(default = "mgmt".to_owned())]
    pub mgmt_network: String,
}

/// Resolved password credentials for the identity service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    /// Identity service URL.
    pub auth_url: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Project to scope the token to.
    pub project_name: String,
    /// Domain owning the user.
    pub user_domain_name: String,
    /// Domain owning the project.
    pub project_domain_name: String,
    /// Region used to pick endpoints.
    pub region_name: Option<String>,
    /// Endpoint interface.
    pub interface: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl OpenStackConfig {
    fn require_field<'a>(
        value: Option<&'a str>,
        metadata: &FieldMetadata,
    ) -> Result<&'a str, ConfigError> {
        match value.map(str::trim) {
            Some(present) if !present.is_empty() => Ok(present),
            _ => Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to hmara.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            ))),
        }
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("hmara")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Parses the configured connection mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMode`] for anything other than `auto` or
    /// `explicit`.
    pub fn connection_mode(&self) -> Result<ConnectionMode, ConfigError> {
        self.mode.parse()
    }

    /// Performs semantic validation. In explicit mode every credential is
    /// required; error messages name the environment variable and the
    /// configuration key that would supply it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMode`] or [`ConfigError::MissingField`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.connection_mode()? {
            ConnectionMode::Auto => {
                Self::require_field(
                    Some(self.cloud.as_str()),
                    &FieldMetadata::new("clouds.yaml entry name", "OS_CLOUD", "cloud"),
                )?;
            }
            ConnectionMode::Explicit => {
                self.explicit_credentials()?;
            }
        }
        Self::require_field(
            Some(self.interface.as_str()),
            &FieldMetadata::new("endpoint interface", "OS_INTERFACE", "interface"),
        )?;
        Ok(())
    }

    /// Builds credentials from the explicitly configured fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a credential is absent.
    pub fn explicit_credentials(&self) -> Result<Credentials, ConfigError> {
        let auth_url = Self::require_field(
            self.auth_url.as_deref(),
            &FieldMetadata::new("identity service URL", "OS_AUTH_URL", "auth_url"),
        )?;
        let username = Self::require_field(
            self.username.as_deref(),
            &FieldMetadata::new("user name", "OS_USERNAME", "username"),
        )?;
        let password = Self::require_field(
            self.password.as_deref(),
            &FieldMetadata::new("password", "OS_PASSWORD", "password"),
        )?;
        let project_name = Self::require_field(
            self.project_name.as_deref(),
            &FieldMetadata::new("project name", "OS_PROJECT_NAME", "project_name"),
        )?;
        Ok(Credentials {
            auth_url: auth_url.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            project_name: project_name.to_owned(),
            user_domain_name: self.user_domain_name.clone(),
            project_domain_name: self.project_domain_name.clone(),
            region_name: self.region_name.clone(),
            interface: self.interface.clone(),
        })
    }

    /// Resolves credentials for the configured mode. Auto mode searches the
    /// standard `clouds.yaml` locations for the configured cloud.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or `clouds.yaml` cannot
    /// supply the cloud.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.validate()?;
        match self.connection_mode()? {
            ConnectionMode::Explicit => self.explicit_credentials(),
            ConnectionMode::Auto => {
                let clouds = CloudsFile::discover(&crate::clouds::default_search_paths())?;
                Ok(clouds.credentials(&self.cloud, self)?)
            }
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Raised when the connection mode is not recognised.
    #[error("unknown connection mode '{0}': expected auto or explicit")]
    InvalidMode(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when `clouds.yaml` cannot supply credentials.
    #[error(transparent)]
    Clouds(#[from] CloudsError),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
