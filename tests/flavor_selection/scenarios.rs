//! BDD scenarios for minimum flavor selection.

use rstest_bdd_macros::scenario;

use super::test_helpers::{CloudContext, SelectionOutcome, cloud_context, outcome};

#[scenario(
    path = "tests/features/flavor_selection.feature",
    name = "Exact match is returned verbatim"
)]
fn scenario_exact_match(cloud_context: CloudContext, outcome: SelectionOutcome) {
    let _ = (cloud_context, outcome);
}

#[scenario(
    path = "tests/features/flavor_selection.feature",
    name = "Smallest satisfying flavor is chosen"
)]
fn scenario_smallest_satisfying(cloud_context: CloudContext, outcome: SelectionOutcome) {
    let _ = (cloud_context, outcome);
}

#[scenario(
    path = "tests/features/flavor_selection.feature",
    name = "Unsatisfiable request falls back"
)]
fn scenario_unsatisfiable(cloud_context: CloudContext, outcome: SelectionOutcome) {
    let _ = (cloud_context, outcome);
}

#[scenario(
    path = "tests/features/flavor_selection.feature",
    name = "Empty flavor listing falls back"
)]
fn scenario_empty_listing(cloud_context: CloudContext, outcome: SelectionOutcome) {
    let _ = (cloud_context, outcome);
}

#[scenario(
    path = "tests/features/flavor_selection.feature",
    name = "Listing failures are reported"
)]
fn scenario_listing_failure(cloud_context: CloudContext, outcome: SelectionOutcome) {
    let _ = (cloud_context, outcome);
}
