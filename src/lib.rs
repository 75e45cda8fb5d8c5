//! Core library for the Hmara OpenStack facade.
//!
//! The crate exposes a [`CloudBackend`] abstraction over the handful of
//! compute, image, network and orchestration calls a lab topology manager
//! needs, an OpenStack implementation of it, and the minimum-flavor
//! heuristic that picks the smallest flavor satisfying a resource request.

pub mod backend;
pub mod clouds;
pub mod config;
pub mod flavor;
pub mod openstack;
pub mod test_support;

pub use backend::{
    BackendError, BackendFuture, CloudBackend, ImageSummary, ImageUpload, ManagementIp, NewStack,
    StackDetail, StackHandle,
};
pub use clouds::{CloudsError, CloudsFile};
pub use config::{ConfigError, ConnectionMode, Credentials, OpenStackConfig};
pub use flavor::{
    FALLBACK_FLAVOR_NAME, FlavorSelection, FlavorSpec, MatchReason, ResourceRequirement,
    minimum_flavor_for_specs, select_flavor,
};
pub use openstack::{OpenStackBackend, OpenStackBackendError};
