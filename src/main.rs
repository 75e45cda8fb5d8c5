//! Binary entry point for the Hmara CLI.

use std::env;
use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hmara::{
    CloudBackend, ImageUpload, NewStack, OpenStackBackend, OpenStackBackendError, OpenStackConfig,
    ResourceRequirement, minimum_flavor_for_specs,
};

mod cli;

use cli::{Cli, Command, ImageCommand, StackCommand};

#[cfg(test)]
mod test_helpers;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid request: {0}")]
    Request(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("failed to render output: {0}")]
    Output(String),
}

impl CliError {
    #[expect(
        clippy::needless_pass_by_value,
        reason = "used directly as a map_err adapter"
    )]
    fn backend(err: impl std::error::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let filter = if env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbose {
            0 => "hmara=warn",
            1 => "hmara=info",
            2 => "hmara=debug",
            _ => "hmara=trace",
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config =
        OpenStackConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let backend = OpenStackBackend::new(config).map_err(|err| match err {
        OpenStackBackendError::Config(message) => CliError::Config(message),
        other => CliError::backend(other),
    })?;
    let project = backend.credentials().project_name.clone();
    let output = execute(&backend, &project, cli.command).await?;
    write_output(io::stdout(), &output)
}

/// Runs one command against `backend`, returning the JSON to print.
async fn execute<B: CloudBackend>(
    backend: &B,
    default_project: &str,
    command: Command,
) -> Result<Value, CliError> {
    debug!(?command, "executing");
    match command {
        Command::Check => {
            let authorized = backend.authorize().await.map_err(CliError::backend)?;
            Ok(json!({ "authorized": authorized }))
        }
        Command::Flavors(args) => {
            let project = args.project.as_deref().unwrap_or(default_project);
            to_json(&backend.list_flavors(project).await.map_err(CliError::backend)?)
        }
        Command::Flavor(args) => {
            let project = args.project.project.as_deref().unwrap_or(default_project);
            let requirement = ResourceRequirement::new(args.cpu, args.ram, args.disk);
            let selection = minimum_flavor_for_specs(backend, project, &requirement)
                .await
                .map_err(CliError::backend)?;
            to_json(&selection)
        }
        Command::Images => to_json(&backend.list_images().await.map_err(CliError::backend)?),
        Command::Image(image) => execute_image(backend, image).await,
        Command::Console { instance } => {
            let url = backend
                .serial_console_url(&instance)
                .await
                .map_err(CliError::backend)?;
            Ok(json!({ "instance": instance, "url": url }))
        }
        Command::ProjectId => {
            let project_id = backend
                .current_project_id()
                .await
                .map_err(CliError::backend)?;
            Ok(json!({ "project_id": project_id }))
        }
        Command::MgmtIps => to_json(
            &backend
                .consumed_management_ips()
                .await
                .map_err(CliError::backend)?,
        ),
        Command::Stack(stack) => execute_stack(backend, stack).await,
    }
}

async fn execute_image<B: CloudBackend>(
    backend: &B,
    command: ImageCommand,
) -> Result<Value, CliError> {
    match command {
        ImageCommand::Show { id } => {
            to_json(&backend.image_detail(&id).await.map_err(CliError::backend)?)
        }
        ImageCommand::Find { name } => {
            to_json(&backend.find_image(&name).await.map_err(CliError::backend)?)
        }
        ImageCommand::Id { name } => {
            let id = backend
                .image_id_for_name(&name)
                .await
                .map_err(CliError::backend)?;
            Ok(json!({ "name": name, "id": id }))
        }
        ImageCommand::Upload { name, path } => {
            let upload =
                ImageUpload::qcow2(name, &path).map_err(|err| CliError::Request(err.to_string()))?;
            to_json(&backend.upload_image(&upload).await.map_err(CliError::backend)?)
        }
    }
}

async fn execute_stack<B: CloudBackend>(
    backend: &B,
    command: StackCommand,
) -> Result<Value, CliError> {
    match command {
        StackCommand::Create { name, template } => {
            let stack = NewStack::from_template_file(name, Utf8Path::new(&template))
                .map_err(|err| CliError::Request(err.to_string()))?;
            to_json(&backend.create_stack(&stack).await.map_err(CliError::backend)?)
        }
        StackCommand::Show { name } => {
            to_json(&backend.stack_details(&name).await.map_err(CliError::backend)?)
        }
        StackCommand::Delete { name } => {
            let deleted = backend.delete_stack(&name).await.map_err(CliError::backend)?;
            Ok(json!({ "stack": name, "deleted": deleted }))
        }
    }
}

fn to_json(value: &impl Serialize) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Output(err.to_string()))
}

fn write_output(mut target: impl Write, value: &Value) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
