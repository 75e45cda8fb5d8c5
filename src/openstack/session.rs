//! Keystone v3 password authentication and service catalog lookup.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Credentials;

use super::types::ServiceType;
use super::{HTTP_CLIENT, HTTP_TIMEOUT, OpenStackBackendError};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// An authenticated token together with the catalog it was issued with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Session {
    pub(crate) token: String,
    pub(crate) project_id: String,
    catalog: Vec<CatalogEntry>,
    interface: String,
    region: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
struct CatalogEndpoint {
    interface: String,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    url: String,
}

impl CatalogEndpoint {
    fn in_region(&self, wanted: Option<&str>) -> bool {
        wanted.is_none_or(|region| {
            self.region_id.as_deref() == Some(region) || self.region.as_deref() == Some(region)
        })
    }
}

#[derive(Deserialize)]
struct TokenEnvelope {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
    project: Option<NamedRef>,
}

#[derive(Deserialize)]
struct NamedRef {
    id: String,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    auth: AuthBlock<'a>,
}

#[derive(Serialize)]
struct AuthBlock<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Serialize)]
struct Identity<'a> {
    methods: [&'a str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Serialize)]
struct PasswordMethod<'a> {
    user: UserRef<'a>,
}

#[derive(Serialize)]
struct UserRef<'a> {
    name: &'a str,
    domain: DomainRef<'a>,
    password: &'a str,
}

#[derive(Serialize)]
struct Scope<'a> {
    project: ProjectRef<'a>,
}

#[derive(Serialize)]
struct ProjectRef<'a> {
    name: &'a str,
    domain: DomainRef<'a>,
}

#[derive(Serialize)]
struct DomainRef<'a> {
    name: &'a str,
}

impl<'a> AuthRequest<'a> {
    fn password(credentials: &'a Credentials) -> Self {
        Self {
            auth: AuthBlock {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: UserRef {
                            name: credentials.username.as_str(),
                            domain: DomainRef {
                                name: credentials.user_domain_name.as_str(),
                            },
                            password: credentials.password.as_str(),
                        },
                    },
                },
                scope: Scope {
                    project: ProjectRef {
                        name: credentials.project_name.as_str(),
                        domain: DomainRef {
                            name: credentials.project_domain_name.as_str(),
                        },
                    },
                },
            },
        }
    }
}

/// Builds the token endpoint, accepting auth URLs with or without `/v3`.
pub(crate) fn token_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}

impl Session {
    /// Authenticates with a project-scoped password token.
    pub(crate) async fn authenticate(
        credentials: &Credentials,
    ) -> Result<Self, OpenStackBackendError> {
        let url = token_url(&credentials.auth_url);
        debug!(%url, user = %credentials.username, "requesting token");

        let response = HTTP_CLIENT
            .post(&url)
            .json(&AuthRequest::password(credentials))
            .timeout(HTTP_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(OpenStackBackendError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenStackBackendError::Api {
                service: String::from("identity"),
                status: status.as_u16(),
                message,
            });
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or(OpenStackBackendError::MissingToken)?;

        let envelope =
            response
                .json::<TokenEnvelope>()
                .await
                .map_err(|err| OpenStackBackendError::Decode {
                    context: String::from("token"),
                    message: err.to_string(),
                })?;

        let project = envelope
            .token
            .project
            .ok_or_else(|| OpenStackBackendError::Decode {
                context: String::from("token"),
                message: String::from("token is not scoped to a project"),
            })?;

        Ok(Self {
            token,
            project_id: project.id,
            catalog: envelope.token.catalog,
            interface: credentials.interface.clone(),
            region: credentials.region_name.clone(),
        })
    }

    /// Returns the base URL for `service`, with the service's API version
    /// appended when the catalog URL does not already carry it.
    pub(crate) fn service_url(
        &self,
        service: ServiceType,
    ) -> Result<String, OpenStackBackendError> {
        let url = self
            .catalog
            .iter()
            .filter(|entry| entry.service_type == service.catalog_type())
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| {
                endpoint.interface == self.interface && endpoint.in_region(self.region.as_deref())
            })
            .map(|endpoint| endpoint.url.trim_end_matches('/').to_owned())
            .ok_or_else(|| OpenStackBackendError::MissingEndpoint {
                service: service.catalog_type().to_owned(),
                interface: self.interface.clone(),
            })?;

        Ok(match service.api_version() {
            Some(version) if !url.ends_with(&format!("/{version}")) => format!("{url}/{version}"),
            _ => url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn endpoint(interface: &str, region: Option<&str>, url: &str) -> CatalogEndpoint {
        CatalogEndpoint {
            interface: interface.to_owned(),
            region_id: region.map(str::to_owned),
            region: None,
            url: url.to_owned(),
        }
    }

    fn session(interface: &str, region: Option<&str>, catalog: Vec<CatalogEntry>) -> Session {
        Session {
            token: String::from("token"),
            project_id: String::from("project"),
            catalog,
            interface: interface.to_owned(),
            region: region.map(str::to_owned),
        }
    }

    fn entry(service_type: &str, endpoints: Vec<CatalogEndpoint>) -> CatalogEntry {
        CatalogEntry {
            service_type: service_type.to_owned(),
            endpoints,
        }
    }

    #[rstest]
    #[case("http://keystone:5000", "http://keystone:5000/v3/auth/tokens")]
    #[case("http://keystone:5000/", "http://keystone:5000/v3/auth/tokens")]
    #[case("http://keystone:5000/v3", "http://keystone:5000/v3/auth/tokens")]
    #[case("http://keystone/identity/v3/", "http://keystone/identity/v3/auth/tokens")]
    fn token_url_handles_version_suffix(#[case] auth_url: &str, #[case] expected: &str) {
        assert_eq!(token_url(auth_url), expected);
    }

    #[rstest]
    fn service_url_prefers_configured_interface_and_region() {
        let catalog = vec![entry(
            "image",
            vec![
                endpoint("internal", Some("RegionOne"), "http://internal:9292"),
                endpoint("public", Some("RegionTwo"), "http://two:9292"),
                endpoint("public", Some("RegionOne"), "http://one:9292/"),
            ],
        )];
        let session = session("public", Some("RegionOne"), catalog);

        let url = session
            .service_url(ServiceType::Image)
            .expect("image endpoint");

        assert_eq!(url, "http://one:9292/v2");
    }

    #[rstest]
    fn service_url_keeps_existing_version_suffix() {
        let catalog = vec![entry(
            "network",
            vec![endpoint("public", None, "http://neutron:9696/v2.0")],
        )];
        let session = session("public", None, catalog);

        let url = session
            .service_url(ServiceType::Network)
            .expect("network endpoint");

        assert_eq!(url, "http://neutron:9696/v2.0");
    }

    #[rstest]
    fn service_url_reports_missing_endpoint() {
        let catalog = vec![entry(
            "compute",
            vec![endpoint("internal", None, "http://nova:8774/v2.1")],
        )];
        let session = session("public", None, catalog);

        let err = session
            .service_url(ServiceType::Compute)
            .expect_err("no public compute endpoint");

        assert_eq!(
            err,
            OpenStackBackendError::MissingEndpoint {
                service: String::from("compute"),
                interface: String::from("public"),
            }
        );
    }
}
