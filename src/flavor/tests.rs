//! Unit tests for flavor selection.

use rstest::{fixture, rstest};

use super::*;
use crate::test_support::StubBackend;

fn flavor(name: &str, vcpus: u32, ram: u64, disk: u64) -> FlavorSpec {
    FlavorSpec::new(name, vcpus, ram, disk)
}

#[fixture]
fn stock_flavors() -> Vec<FlavorSpec> {
    vec![
        flavor("m1.tiny", 1, 512, 1),
        flavor("m1.small", 1, 2048, 20),
        flavor("m1.medium", 2, 4096, 40),
        flavor("m1.large", 4, 8192, 80),
        flavor("m1.xlarge", 8, 16384, 160),
    ]
}

fn matched_name(selection: &FlavorSelection) -> Option<&str> {
    selection.flavor().map(|chosen| chosen.name.as_str())
}

#[rstest]
fn exact_match_is_returned_verbatim() {
    let flavors = vec![flavor("A", 2, 4096, 20), flavor("B", 4, 8192, 40)];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(2, 4096, 20));

    assert_eq!(
        selection,
        FlavorSelection::Matched {
            flavor: flavor("A", 2, 4096, 20),
            reason: MatchReason::Exact,
        }
    );
}

#[rstest]
fn exact_match_short_circuits_smaller_candidates(stock_flavors: Vec<FlavorSpec>) {
    let selection = select_flavor(&stock_flavors, &ResourceRequirement::new(4, 8192, 80));

    assert_eq!(matched_name(&selection), Some("m1.large"));
    assert_eq!(selection.reason(), Some(MatchReason::Exact));
}

#[rstest]
fn first_exact_match_wins_over_duplicates() {
    let flavors = vec![
        flavor("first", 2, 2048, 20),
        flavor("second", 2, 2048, 20),
    ];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(2, 2048, 20));

    assert_eq!(matched_name(&selection), Some("first"));
}

#[rstest]
fn empty_flavor_list_returns_fallback() {
    let selection = select_flavor(&[], &ResourceRequirement::new(1, 512, 1));

    assert!(selection.is_fallback());
    assert_eq!(selection.name(), FALLBACK_FLAVOR_NAME);
    assert_eq!(selection.flavor(), None);
}

#[rstest]
#[case::disk(ResourceRequirement::new(1, 512, 500))]
#[case::ram(ResourceRequirement::new(1, 65536, 1))]
#[case::cpu(ResourceRequirement::new(64, 512, 1))]
fn unsatisfiable_requirement_returns_fallback(
    stock_flavors: Vec<FlavorSpec>,
    #[case] requirement: ResourceRequirement,
) {
    let selection = select_flavor(&stock_flavors, &requirement);

    assert_eq!(selection, FlavorSelection::Fallback);
}

#[rstest]
fn single_candidate_is_returned() {
    let flavors = vec![flavor("small", 1, 1024, 10), flavor("big", 8, 16384, 100)];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(4, 4096, 50));

    assert_eq!(matched_name(&selection), Some("big"));
    assert_eq!(selection.reason(), Some(MatchReason::SingleCandidate));
}

#[rstest]
fn lowest_on_all_axes_wins() {
    let flavors = vec![flavor("A", 4, 8192, 40), flavor("B", 8, 16384, 80)];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(2, 2048, 10));

    assert_eq!(matched_name(&selection), Some("A"));
    assert_eq!(selection.reason(), Some(MatchReason::LowestOnAllAxes));
}

#[rstest]
fn lowest_flavor_found_regardless_of_position(stock_flavors: Vec<FlavorSpec>) {
    let mut reversed = stock_flavors;
    reversed.reverse();

    let selection = select_flavor(&reversed, &ResourceRequirement::new(2, 3000, 30));

    assert_eq!(matched_name(&selection), Some("m1.medium"));
    assert_eq!(selection.reason(), Some(MatchReason::LowestOnAllAxes));
}

#[rstest]
fn lowest_cpu_and_ram_wins_when_disk_minimum_is_elsewhere() {
    let flavors = vec![
        flavor("big-disk", 2, 4096, 100),
        flavor("small-disk", 4, 8192, 20),
    ];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(1, 1024, 10));

    assert_eq!(matched_name(&selection), Some("big-disk"));
    assert_eq!(selection.reason(), Some(MatchReason::LowestCpuAndRam));
}

#[rstest]
fn requested_cpu_tie_break_picks_flavor_with_requested_vcpus() {
    let flavors = vec![
        flavor("ram-low", 8, 4096, 50),
        flavor("under-cpu", 4, 8192, 40),
        flavor("requested", 6, 8192, 40),
    ];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(6, 2048, 10));

    assert_eq!(matched_name(&selection), Some("requested"));
    assert_eq!(selection.reason(), Some(MatchReason::RequestedCpu));
}

/// Pins the tie-break that compares vcpus against the requested cpu rather
/// than the candidate minimum. Every survivor has at least the requested
/// cpu, so the two readings only diverge when no survivor has exactly it.
#[rstest]
fn requested_cpu_tie_break_ignores_candidate_minimum() {
    let flavors = vec![
        flavor("ram-low", 4, 4096, 40),
        flavor("cpu-low", 2, 8192, 40),
        flavor("cpu-low-again", 2, 16384, 20),
    ];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(1, 1024, 10));

    // cpu_low is 2 but the requested cpu of 1 matches nothing.
    assert_eq!(matched_name(&selection), Some("ram-low"));
    assert_eq!(selection.reason(), Some(MatchReason::FirstCandidate));
}

#[rstest]
fn split_minimums_fall_through_to_first_candidate() {
    let flavors = vec![
        flavor("too-small", 1, 512, 5),
        flavor("ram-heavy", 8, 4096, 80),
        flavor("cpu-heavy", 4, 16384, 40),
    ];

    let selection = select_flavor(&flavors, &ResourceRequirement::new(2, 2048, 10));

    assert_eq!(matched_name(&selection), Some("ram-heavy"));
    assert_eq!(selection.reason(), Some(MatchReason::FirstCandidate));
}

#[rstest]
fn selection_does_not_mutate_input(stock_flavors: Vec<FlavorSpec>) {
    let before = stock_flavors.clone();

    let _selection = select_flavor(&stock_flavors, &ResourceRequirement::new(3, 3000, 30));

    assert_eq!(stock_flavors, before);
}

#[rstest]
fn fallback_serialises_as_name_only() {
    let rendered =
        serde_json::to_value(FlavorSelection::Fallback).expect("fallback should serialise");

    assert_eq!(rendered, serde_json::json!({ "name": "m1.large" }));
}

#[rstest]
fn matched_selection_serialises_as_flavor_record() {
    let selection = FlavorSelection::Matched {
        flavor: flavor("m1.small", 1, 2048, 20),
        reason: MatchReason::SingleCandidate,
    };

    let rendered = serde_json::to_value(&selection).expect("selection should serialise");

    assert_eq!(
        rendered,
        serde_json::json!({ "name": "m1.small", "vcpus": 1, "ram": 2048, "disk": 20 })
    );
}

#[rstest]
#[tokio::test]
async fn minimum_flavor_for_specs_selects_from_listing(stock_flavors: Vec<FlavorSpec>) {
    let backend = StubBackend::new().with_flavors(stock_flavors);

    let selection =
        minimum_flavor_for_specs(&backend, "demo", &ResourceRequirement::new(2, 4096, 40))
            .await
            .expect("listing should succeed");

    assert_eq!(matched_name(&selection), Some("m1.medium"));
    assert_eq!(backend.flavor_projects(), vec![String::from("demo")]);
}

#[rstest]
#[tokio::test]
async fn minimum_flavor_for_specs_propagates_listing_errors() {
    let backend = StubBackend::new().failing("compute unavailable");

    let result =
        minimum_flavor_for_specs(&backend, "demo", &ResourceRequirement::new(1, 512, 1)).await;

    assert!(result.is_err(), "expected listing error, got {result:?}");
}
