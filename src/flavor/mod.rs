//! Flavor selection heuristic.
//!
//! Given the flavors a compute service offers and a minimum resource
//! requirement, [`select_flavor`] picks the best-matching flavor. The
//! selector never fails: when nothing satisfies the requirement it degrades
//! to the [`FALLBACK_FLAVOR_NAME`] sentinel.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::CloudBackend;

/// Name returned when no flavor satisfies the requirement. The sentinel is a
/// best-effort emergency choice and carries no resource guarantees.
pub const FALLBACK_FLAVOR_NAME: &str = "m1.large";

/// A named bundle of compute resources offered by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlavorSpec {
    /// Provider flavor name (for example `m1.small`).
    pub name: String,
    /// Virtual CPU count.
    pub vcpus: u32,
    /// Memory in MB.
    pub ram: u64,
    /// Root disk size in GB.
    pub disk: u64,
}

impl FlavorSpec {
    /// Creates a flavor record.
    #[must_use]
    pub fn new(name: impl Into<String>, vcpus: u32, ram: u64, disk: u64) -> Self {
        Self {
            name: name.into(),
            vcpus,
            ram,
            disk,
        }
    }

    const fn matches_exactly(&self, requirement: &ResourceRequirement) -> bool {
        self.vcpus == requirement.cpu
            && self.ram == requirement.ram
            && self.disk == requirement.disk
    }
}

/// Minimum resources a caller needs from a flavor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResourceRequirement {
    /// Number of cores desired.
    pub cpu: u32,
    /// Memory desired in MB.
    pub ram: u64,
    /// Disk desired in GB.
    pub disk: u64,
}

impl ResourceRequirement {
    /// Creates a requirement.
    #[must_use]
    pub const fn new(cpu: u32, ram: u64, disk: u64) -> Self {
        Self { cpu, ram, disk }
    }
}

/// Rule that picked a flavor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchReason {
    /// Flavor equals the requirement on every axis.
    Exact,
    /// Only one flavor satisfied the requirement.
    SingleCandidate,
    /// Flavor holds the minimum cpu, ram and disk among the candidates.
    LowestOnAllAxes,
    /// Flavor holds the minimum cpu and ram among the candidates.
    LowestCpuAndRam,
    /// Flavor's vcpus equal the requested cpu count.
    RequestedCpu,
    /// No tie-break matched; the first candidate in list order was taken.
    FirstCandidate,
}

impl MatchReason {
    /// Short kebab-case label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::SingleCandidate => "single-candidate",
            Self::LowestOnAllAxes => "lowest-on-all-axes",
            Self::LowestCpuAndRam => "lowest-cpu-and-ram",
            Self::RequestedCpu => "requested-cpu",
            Self::FirstCandidate => "first-candidate",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of flavor selection.
///
/// Serialises as the flavor record itself, or as `{"name": "m1.large"}` for
/// the fallback.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FlavorSelection {
    /// A provider flavor satisfied the requirement.
    Matched {
        /// The chosen flavor.
        flavor: FlavorSpec,
        /// Rule that chose it.
        reason: MatchReason,
    },
    /// No flavor satisfied the requirement.
    Fallback,
}

impl FlavorSelection {
    /// Name to place in provisioning requests.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Matched { flavor, .. } => &flavor.name,
            Self::Fallback => FALLBACK_FLAVOR_NAME,
        }
    }

    /// The chosen flavor, or `None` for the fallback sentinel.
    #[must_use]
    pub const fn flavor(&self) -> Option<&FlavorSpec> {
        match self {
            Self::Matched { flavor, .. } => Some(flavor),
            Self::Fallback => None,
        }
    }

    /// Rule that chose the flavor, or `None` for the fallback sentinel.
    #[must_use]
    pub const fn reason(&self) -> Option<MatchReason> {
        match self {
            Self::Matched { reason, .. } => Some(*reason),
            Self::Fallback => None,
        }
    }

    /// Returns `true` when the fallback sentinel was chosen.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    fn matched(flavor: &FlavorSpec, reason: MatchReason) -> Self {
        debug!(flavor = %flavor.name, ?reason, "selected flavor");
        Self::Matched {
            flavor: flavor.clone(),
            reason,
        }
    }
}

#[derive(Serialize)]
struct FallbackRecord<'a> {
    name: &'a str,
}

impl Serialize for FlavorSelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Matched { flavor, .. } => flavor.serialize(serializer),
            Self::Fallback => FallbackRecord {
                name: FALLBACK_FLAVOR_NAME,
            }
            .serialize(serializer),
        }
    }
}

/// Picks the flavor that best matches `requirement`.
///
/// An exact match wins outright. Otherwise flavors are filtered to those
/// meeting the cpu, ram and disk minimums in turn. With several survivors the
/// tie-breaks are, in order: lowest on all three axes, lowest on cpu and ram,
/// vcpus equal to the *requested* cpu, then the first survivor. Every
/// tie-break takes the first flavor in list order.
#[must_use]
pub fn select_flavor(flavors: &[FlavorSpec], requirement: &ResourceRequirement) -> FlavorSelection {
    if let Some(exact) = flavors
        .iter()
        .find(|flavor| flavor.matches_exactly(requirement))
    {
        return FlavorSelection::matched(exact, MatchReason::Exact);
    }
    debug!("no exact flavor match");

    let cpu_candidates: Vec<&FlavorSpec> = flavors
        .iter()
        .filter(|flavor| flavor.vcpus >= requirement.cpu)
        .collect();
    debug!(count = cpu_candidates.len(), "cpu candidates");

    let ram_candidates: Vec<&FlavorSpec> = cpu_candidates
        .into_iter()
        .filter(|flavor| flavor.ram >= requirement.ram)
        .collect();
    debug!(count = ram_candidates.len(), "ram candidates");

    let disk_candidates: Vec<&FlavorSpec> = ram_candidates
        .into_iter()
        .filter(|flavor| flavor.disk >= requirement.disk)
        .collect();
    debug!(count = disk_candidates.len(), "disk candidates");

    match disk_candidates.as_slice() {
        [] => {
            debug!(fallback = FALLBACK_FLAVOR_NAME, "no flavor satisfies requirement");
            FlavorSelection::Fallback
        }
        [only] => FlavorSelection::matched(only, MatchReason::SingleCandidate),
        [first, ..] => break_tie(&disk_candidates, first, requirement),
    }
}

fn break_tie(
    candidates: &[&FlavorSpec],
    first: &FlavorSpec,
    requirement: &ResourceRequirement,
) -> FlavorSelection {
    let cpu_low = candidates.iter().map(|flavor| flavor.vcpus).min();
    let ram_low = candidates.iter().map(|flavor| flavor.ram).min();
    let disk_low = candidates.iter().map(|flavor| flavor.disk).min();

    if let Some(lowest) = first_where(candidates, |flavor| {
        Some(flavor.vcpus) == cpu_low
            && Some(flavor.ram) == ram_low
            && Some(flavor.disk) == disk_low
    }) {
        return FlavorSelection::matched(lowest, MatchReason::LowestOnAllAxes);
    }

    if let Some(lowest) = first_where(candidates, |flavor| {
        Some(flavor.vcpus) == cpu_low && Some(flavor.ram) == ram_low
    }) {
        return FlavorSelection::matched(lowest, MatchReason::LowestCpuAndRam);
    }

    // Compares against the requested cpu, not cpu_low.
    if let Some(requested) = first_where(candidates, |flavor| flavor.vcpus == requirement.cpu) {
        return FlavorSelection::matched(requested, MatchReason::RequestedCpu);
    }

    FlavorSelection::matched(first, MatchReason::FirstCandidate)
}

fn first_where<'a>(
    candidates: &[&'a FlavorSpec],
    predicate: impl Fn(&FlavorSpec) -> bool,
) -> Option<&'a FlavorSpec> {
    candidates.iter().copied().find(|&flavor| predicate(flavor))
}

/// Lists the flavors available to `project` and selects the best match.
///
/// # Errors
///
/// Returns the backend error when the flavor listing fails. Selection itself
/// never fails.
pub async fn minimum_flavor_for_specs<B: CloudBackend>(
    backend: &B,
    project: &str,
    requirement: &ResourceRequirement,
) -> Result<FlavorSelection, B::Error> {
    debug!(project, ?requirement, "determining minimum flavor");
    let flavors = backend.list_flavors(project).await?;
    Ok(select_flavor(&flavors, requirement))
}

#[cfg(test)]
mod tests;
