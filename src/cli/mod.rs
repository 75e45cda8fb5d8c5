//! Command-line interface definitions for the `hmara` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{ArgAction, Parser, Subcommand};

/// Top-level CLI for the `hmara` binary.
#[derive(Debug, Parser)]
#[command(
    name = "hmara",
    about = "Query and drive an OpenStack cloud for lab topologies",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG`
    /// takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Operations exposed by the binary.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Check that the configured credentials are accepted.
    #[command(name = "check")]
    Check,
    /// List every flavor visible to the project.
    #[command(name = "flavors")]
    Flavors(ProjectArgs),
    /// Pick the smallest flavor satisfying a resource requirement.
    #[command(name = "flavor")]
    Flavor(FlavorCommand),
    /// List active images.
    #[command(name = "images")]
    Images,
    /// Inspect or upload images.
    #[command(name = "image", subcommand)]
    Image(ImageCommand),
    /// Print the browser console URL for a server.
    #[command(name = "console")]
    Console {
        /// Server name or identifier.
        instance: String,
    },
    /// Print the identifier of the authenticated project.
    #[command(name = "project-id")]
    ProjectId,
    /// List fixed IPs consumed on the management network.
    #[command(name = "mgmt-ips")]
    MgmtIps,
    /// Create, inspect or delete orchestration stacks.
    #[command(name = "stack", subcommand)]
    Stack(StackCommand),
}

/// Optional project override for flavor queries.
#[derive(Debug, Parser)]
pub(crate) struct ProjectArgs {
    /// Project to list flavors for. Defaults to the authenticated project.
    #[arg(long, value_name = "PROJECT")]
    pub(crate) project: Option<String>,
}

/// Arguments for `hmara flavor`.
#[derive(Debug, Parser)]
pub(crate) struct FlavorCommand {
    /// Required virtual CPUs.
    #[arg(long, value_name = "COUNT")]
    pub(crate) cpu: u32,
    /// Required memory in MB.
    #[arg(long, value_name = "MB")]
    pub(crate) ram: u64,
    /// Required root disk in GB.
    #[arg(long, value_name = "GB")]
    pub(crate) disk: u64,
    #[command(flatten)]
    pub(crate) project: ProjectArgs,
}

/// Image subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum ImageCommand {
    /// Show an image by identifier.
    #[command(name = "show")]
    Show {
        /// Image identifier.
        id: String,
    },
    /// Find an image by identifier or name.
    #[command(name = "find")]
    Find {
        /// Image name or identifier.
        name: String,
    },
    /// Resolve an image name to its identifier.
    #[command(name = "id")]
    Id {
        /// Image name.
        name: String,
    },
    /// Upload a qcow2 image file.
    #[command(name = "upload")]
    Upload {
        /// Name of the new image.
        name: String,
        /// Local image file.
        path: String,
    },
}

/// Stack subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum StackCommand {
    /// Create a stack from a JSON template file.
    #[command(name = "create")]
    Create {
        /// Stack name.
        name: String,
        /// Path to the JSON template.
        #[arg(long, value_name = "PATH")]
        template: String,
    },
    /// Show stack details.
    #[command(name = "show")]
    Show {
        /// Stack name.
        name: String,
    },
    /// Delete a stack.
    #[command(name = "delete")]
    Delete {
        /// Stack name.
        name: String,
    },
}
