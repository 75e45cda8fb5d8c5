//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard as StdMutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::backend::{
    BackendFuture, CloudBackend, ImageSummary, ImageUpload, ManagementIp, NewStack, StackDetail,
    StackHandle,
};
use crate::config::OpenStackConfig;
use crate::flavor::FlavorSpec;

/// Error returned by [`StubBackend`] when it has been told to fail.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("stub backend failure: {0}")]
pub struct StubBackendError(pub String);

#[derive(Debug, Default)]
struct StubState {
    flavors: Vec<FlavorSpec>,
    images: Vec<ImageSummary>,
    stacks: Vec<StackDetail>,
    management_ips: Vec<ManagementIp>,
    consoles: BTreeMap<String, String>,
    project_id: String,
    rejected: bool,
    failure: Option<String>,
    flavor_projects: Vec<String>,
    uploads: Vec<ImageUpload>,
}

/// In-memory [`CloudBackend`] seeded with canned resources.
///
/// Clones share state, so a test can keep a handle for assertions after
/// passing the backend into the code under test.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    state: Arc<Mutex<StubState>>,
}

impl StubBackend {
    /// Creates an empty backend that accepts credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StdMutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds the flavor listing.
    #[must_use]
    pub fn with_flavors(self, flavors: Vec<FlavorSpec>) -> Self {
        self.state().flavors = flavors;
        self
    }

    /// Seeds the image catalogue, active or not.
    #[must_use]
    pub fn with_images(self, images: Vec<ImageSummary>) -> Self {
        self.state().images = images;
        self
    }

    /// Seeds existing stacks.
    #[must_use]
    pub fn with_stacks(self, stacks: Vec<StackDetail>) -> Self {
        self.state().stacks = stacks;
        self
    }

    /// Seeds the management network addresses.
    #[must_use]
    pub fn with_management_ips(self, addresses: &[&str]) -> Self {
        self.state().management_ips = addresses
            .iter()
            .map(|address| ManagementIp {
                ip_address: (*address).to_owned(),
            })
            .collect();
        self
    }

    /// Registers a console URL for a server name.
    #[must_use]
    pub fn with_console(self, instance: &str, url: &str) -> Self {
        self.state()
            .consoles
            .insert(instance.to_owned(), url.to_owned());
        self
    }

    /// Sets the project identifier returned by the token scope.
    #[must_use]
    pub fn with_project_id(self, project_id: &str) -> Self {
        self.state().project_id = project_id.to_owned();
        self
    }

    /// Makes [`CloudBackend::authorize`] report rejected credentials.
    #[must_use]
    pub fn rejecting_credentials(self) -> Self {
        self.state().rejected = true;
        self
    }

    /// Makes every operation fail with `message`.
    #[must_use]
    pub fn failing(self, message: &str) -> Self {
        self.state().failure = Some(message.to_owned());
        self
    }

    /// Projects passed to [`CloudBackend::list_flavors`], in call order.
    #[must_use]
    pub fn flavor_projects(&self) -> Vec<String> {
        self.state().flavor_projects.clone()
    }

    /// Upload requests received so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<ImageUpload> {
        self.state().uploads.clone()
    }

    /// Names of the stacks currently held.
    #[must_use]
    pub fn stack_names(&self) -> Vec<String> {
        self.state()
            .stacks
            .iter()
            .map(|stack| stack.stack_name.clone())
            .collect()
    }

    fn check(&self) -> Result<StdMutexGuard<'_, StubState>, StubBackendError> {
        let guard = self.state();
        if let Some(message) = guard.failure.clone() {
            return Err(StubBackendError(message));
        }
        Ok(guard)
    }

    fn find_image_in(state: &StubState, name_or_id: &str) -> Option<ImageSummary> {
        state
            .images
            .iter()
            .find(|image| image.id == name_or_id)
            .or_else(|| {
                state
                    .images
                    .iter()
                    .find(|image| image.name.as_deref() == Some(name_or_id))
            })
            .cloned()
    }
}

impl CloudBackend for StubBackend {
    type Error = StubBackendError;

    fn authorize(&self) -> BackendFuture<'_, bool, Self::Error> {
        Box::pin(async move { Ok(!self.check()?.rejected) })
    }

    fn list_flavors<'a>(
        &'a self,
        project: &'a str,
    ) -> BackendFuture<'a, Vec<FlavorSpec>, Self::Error> {
        Box::pin(async move {
            let mut state = self.check()?;
            state.flavor_projects.push(project.to_owned());
            Ok(state.flavors.clone())
        })
    }

    fn list_images(&self) -> BackendFuture<'_, Vec<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let state = self.check()?;
            Ok(state
                .images
                .iter()
                .filter(|image| image.is_active())
                .cloned()
                .collect())
        })
    }

    fn image_detail<'a>(
        &'a self,
        image_id: &'a str,
    ) -> BackendFuture<'a, Option<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let state = self.check()?;
            Ok(state.images.iter().find(|image| image.id == image_id).cloned())
        })
    }

    fn find_image<'a>(
        &'a self,
        name_or_id: &'a str,
    ) -> BackendFuture<'a, Option<ImageSummary>, Self::Error> {
        Box::pin(async move {
            let state = self.check()?;
            Ok(Self::find_image_in(&state, name_or_id))
        })
    }

    fn image_id_for_name<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move {
            let state = self.check()?;
            Ok(Self::find_image_in(&state, name).map(|image| image.id))
        })
    }

    fn upload_image<'a>(
        &'a self,
        upload: &'a ImageUpload,
    ) -> BackendFuture<'a, ImageSummary, Self::Error> {
        Box::pin(async move {
            let mut state = self.check()?;
            let image = ImageSummary {
                id: format!("image-{}", state.uploads.len() + 1),
                name: Some(upload.name.clone()),
                status: String::from("active"),
                disk_format: Some(upload.disk_format.clone()),
                container_format: Some(upload.container_format.clone()),
                ..ImageSummary::default()
            };
            state.uploads.push(upload.clone());
            state.images.push(image.clone());
            Ok(image)
        })
    }

    fn serial_console_url<'a>(
        &'a self,
        instance_name: &'a str,
    ) -> BackendFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move {
            let state = self.check()?;
            Ok(state.consoles.get(instance_name).cloned())
        })
    }

    fn current_project_id(&self) -> BackendFuture<'_, String, Self::Error> {
        Box::pin(async move { Ok(self.check()?.project_id.clone()) })
    }

    fn consumed_management_ips(&self) -> BackendFuture<'_, Vec<ManagementIp>, Self::Error> {
        Box::pin(async move { Ok(self.check()?.management_ips.clone()) })
    }

    fn create_stack<'a>(
        &'a self,
        stack: &'a NewStack,
    ) -> BackendFuture<'a, StackHandle, Self::Error> {
        Box::pin(async move {
            let mut state = self.check()?;
            let id = format!("stack-{}", state.stacks.len() + 1);
            state.stacks.push(StackDetail {
                id: id.clone(),
                stack_name: stack.name.clone(),
                stack_status: Some(String::from("CREATE_IN_PROGRESS")),
                stack_status_reason: None,
                creation_time: None,
                description: None,
                outputs: Vec::new(),
            });
            Ok(StackHandle { id })
        })
    }

    fn stack_details<'a>(
        &'a self,
        stack_name: &'a str,
    ) -> BackendFuture<'a, Option<StackDetail>, Self::Error> {
        Box::pin(async move {
            let state = self.check()?;
            Ok(state
                .stacks
                .iter()
                .find(|stack| stack.stack_name == stack_name)
                .cloned())
        })
    }

    fn delete_stack<'a>(&'a self, stack_name: &'a str) -> BackendFuture<'a, bool, Self::Error> {
        Box::pin(async move {
            let mut state = self.check()?;
            let before = state.stacks.len();
            state.stacks.retain(|stack| stack.stack_name != stack_name);
            Ok(state.stacks.len() != before)
        })
    }
}

/// Builds an explicit-mode configuration with every default in place.
#[must_use]
pub fn sample_config() -> OpenStackConfig {
    OpenStackConfig {
        mode: String::from("explicit"),
        cloud: String::from("default"),
        auth_url: Some(String::from("http://keystone.example.test:5000/v3")),
        username: Some(String::from("demo")),
        password: Some(String::from("secret")),
        project_name: Some(String::from("demo")),
        user_domain_name: String::from("Default"),
        project_domain_name: String::from("Default"),
        region_name: None,
        interface: String::from("public"),
        mgmt_network: String::from("mgmt"),
    }
}

/// Builds an image summary with the given status.
#[must_use]
pub fn image(id: &str, name: &str, status: &str) -> ImageSummary {
    ImageSummary {
        id: id.to_owned(),
        name: Some(name.to_owned()),
        status: status.to_owned(),
        ..ImageSummary::default()
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
