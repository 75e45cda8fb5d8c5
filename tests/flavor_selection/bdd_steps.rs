//! BDD step definitions for minimum flavor selection.

use hmara::ResourceRequirement;
use hmara::test_support::StubBackend;
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{CloudContext, SelectionOutcome, select, standard_flavors};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("the cloud offers the standard flavors")]
fn standard_cloud() -> CloudContext {
    CloudContext {
        backend: StubBackend::new().with_flavors(standard_flavors()),
    }
}

#[given("the cloud offers no flavors")]
fn empty_cloud() -> CloudContext {
    CloudContext {
        backend: StubBackend::new(),
    }
}

#[given("the compute service is unavailable")]
fn unavailable_cloud() -> CloudContext {
    CloudContext {
        backend: StubBackend::new().failing("compute unavailable"),
    }
}

#[when("I request {cpu:u32} vcpus, {ram} MB of RAM and {disk} GB of disk")]
fn request_flavor(cloud_context: &CloudContext, cpu: u32, ram: u64, disk: u64) -> SelectionOutcome {
    select(cloud_context, &ResourceRequirement::new(cpu, ram, disk))
}

fn selected(outcome: &SelectionOutcome) -> Result<&hmara::FlavorSelection, StepError> {
    match outcome {
        SelectionOutcome::Selected(selection) => Ok(selection),
        other => Err(StepError::Assertion(format!(
            "expected a selection, got {other:?}"
        ))),
    }
}

#[then("the selected flavor is \"{name}\"")]
fn selected_flavor_is(outcome: &SelectionOutcome, name: String) -> Result<(), StepError> {
    let selection = selected(outcome)?;
    if selection.is_fallback() {
        return Err(StepError::Assertion(format!(
            "expected {name}, got the fallback"
        )));
    }
    if selection.name() == name {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {name}, got {}",
            selection.name()
        )))
    }
}

#[then("the selection reason is \"{reason}\"")]
fn selection_reason_is(outcome: &SelectionOutcome, reason: String) -> Result<(), StepError> {
    let selection = selected(outcome)?;
    match selection.reason() {
        Some(actual) if actual.as_str() == reason => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected reason {reason}, got {other:?}"
        ))),
    }
}

#[then("the fallback flavor \"{name}\" is returned")]
fn fallback_returned(outcome: &SelectionOutcome, name: String) -> Result<(), StepError> {
    let selection = selected(outcome)?;
    if selection.is_fallback() && selection.name() == name {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected fallback {name}, got {selection:?}"
        )))
    }
}

#[then("the selection fails with \"{snippet}\"")]
fn selection_fails(outcome: &SelectionOutcome, snippet: String) -> Result<(), StepError> {
    let SelectionOutcome::Failed(message) = outcome else {
        return Err(StepError::Assertion(format!(
            "expected failure, got {outcome:?}"
        )));
    };
    if message.contains(&snippet) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected error containing '{snippet}', got: {message}"
        )))
    }
}
