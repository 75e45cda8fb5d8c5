//! Shared fixtures for flavor selection behavioural tests.

use hmara::test_support::StubBackend;
use hmara::{FlavorSelection, FlavorSpec, ResourceRequirement, minimum_flavor_for_specs};
use rstest::fixture;

pub const PROJECT: &str = "lab";

/// Cloud the scenario selects against.
#[derive(Clone, Debug)]
pub struct CloudContext {
    pub backend: StubBackend,
}

/// Result of one selection request.
#[derive(Clone, Debug)]
pub enum SelectionOutcome {
    Pending,
    Selected(FlavorSelection),
    Failed(String),
}

#[fixture]
pub fn cloud_context() -> CloudContext {
    CloudContext {
        backend: StubBackend::new(),
    }
}

#[fixture]
pub fn outcome() -> SelectionOutcome {
    SelectionOutcome::Pending
}

pub fn standard_flavors() -> Vec<FlavorSpec> {
    vec![
        FlavorSpec::new("m1.tiny", 1, 512, 1),
        FlavorSpec::new("m1.small", 1, 2048, 20),
        FlavorSpec::new("m1.medium", 2, 4096, 40),
        FlavorSpec::new("m1.large", 4, 8192, 80),
        FlavorSpec::new("m1.xlarge", 8, 16384, 160),
    ]
}

pub fn select(context: &CloudContext, requirement: &ResourceRequirement) -> SelectionOutcome {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap_or_else(|err| panic!("failed to build runtime: {err}"));
    match runtime.block_on(minimum_flavor_for_specs(&context.backend, PROJECT, requirement)) {
        Ok(selection) => SelectionOutcome::Selected(selection),
        Err(err) => SelectionOutcome::Failed(err.to_string()),
    }
}
