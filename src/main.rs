//! Binary entry point for the Open Source Cloud provider CLI.
//!
//! Drives the same provider and resources the plugin host would, one
//! lifecycle call per invocation.

mod cli;

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use terraform_provider_osc::catalog::NAME_ATTRIBUTE;
use terraform_provider_osc::{
    AttrValue, AttributeType, Catalog, CatalogError, ConfigError, Diagnostics, OscConfig,
    Provider, Resource, ResourceState, Schema,
};

use cli::{Cli, Command, CreateCommand, DeleteCommand, SchemaCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("unknown resource type: {0}")]
    UnknownResource(String),
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),
    #[error("failed to write output: {0}")]
    Output(String),
    #[error("{0} reported errors")]
    Diagnostics(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let provider = Provider::new(load_catalog(cli.catalog.as_deref())?);
    match cli.command {
        Command::Resources => list_resources(&provider, io::stdout()),
        Command::Schema(args) => print_schema(&provider, &args, io::stdout()),
        Command::Create(args) => create(&provider, &args).await,
        Command::Delete(args) => delete(&provider, &args).await,
    }
}

fn load_catalog(path: Option<&str>) -> Result<Catalog, CliError> {
    let catalog = Catalog::builtin()?;
    let Some(file) = path else {
        return Ok(catalog);
    };
    Ok(catalog.with_file(Utf8Path::new(file))?)
}

fn list_resources(provider: &Provider, mut out: impl Write) -> Result<(), CliError> {
    for entry in provider.resources() {
        writeln!(out, "{}", entry.type_name).map_err(|err| CliError::Output(err.to_string()))?;
    }
    Ok(())
}

fn print_schema(
    provider: &Provider,
    args: &SchemaCommand,
    out: impl Write,
) -> Result<(), CliError> {
    let resource = lookup(provider, &args.resource_type)?;
    write_json(out, &resource.schema())
}

async fn create(provider: &Provider, args: &CreateCommand) -> Result<(), CliError> {
    let mut resource = lookup(provider, &args.resource_type)?;
    let planned = planned_state(&resource.schema(), &args.name, &args.assignments)?;

    let mut diags = Diagnostics::new();
    configure(provider, resource.as_mut(), &mut diags)?;
    let state = resource.create(&mut diags, planned).await;
    write_diagnostics(io::stderr(), &diags);

    match state {
        Some(created) if !diags.has_error() => write_json(io::stdout(), &created),
        _ => Err(CliError::Diagnostics(format!("create {}", args.resource_type))),
    }
}

async fn delete(provider: &Provider, args: &DeleteCommand) -> Result<(), CliError> {
    let mut resource = lookup(provider, &args.resource_type)?;
    let state = ResourceState::from([(
        NAME_ATTRIBUTE.to_owned(),
        AttrValue::from(args.name.as_str()),
    )]);

    let mut diags = Diagnostics::new();
    configure(provider, resource.as_mut(), &mut diags)?;
    let removed = resource.delete(&mut diags, state).await;
    write_diagnostics(io::stderr(), &diags);

    match removed {
        Some(()) if !diags.has_error() => Ok(()),
        _ => Err(CliError::Diagnostics(format!("delete {}", args.resource_type))),
    }
}

fn lookup(provider: &Provider, resource_type: &str) -> Result<Box<dyn Resource>, CliError> {
    provider
        .resource(resource_type)
        .ok_or_else(|| CliError::UnknownResource(resource_type.to_owned()))
}

fn configure(
    provider: &Provider,
    resource: &mut dyn Resource,
    diags: &mut Diagnostics,
) -> Result<(), CliError> {
    let config = OscConfig::load_without_cli_args()?;
    let data = provider.configure(diags, config);
    if data.is_some() {
        resource.configure(diags, data);
    }
    if diags.has_error() {
        write_diagnostics(io::stderr(), diags);
        return Err(CliError::Diagnostics(String::from("provider configuration")));
    }
    Ok(())
}

/// Builds a plan from `--name` and `--set` pairs, typed by the schema.
///
/// Keys the schema does not declare are kept as strings so the resource
/// reports them.
fn planned_state(
    schema: &Schema,
    name: &str,
    assignments: &[(String, String)],
) -> Result<ResourceState, CliError> {
    let mut planned = ResourceState::new();
    planned.insert(NAME_ATTRIBUTE.to_owned(), AttrValue::from(name));

    for (key, raw) in assignments {
        if key == NAME_ATTRIBUTE {
            return Err(CliError::InvalidAttribute(String::from(
                "set the instance name with --name",
            )));
        }
        let value = match schema.attribute(key) {
            Some(attr) if attr.computed => {
                return Err(CliError::InvalidAttribute(format!(
                    "{key} is computed by the platform and cannot be set"
                )));
            }
            Some(attr) => typed_value(key, attr.kind, raw)?,
            None => AttrValue::from(raw.as_str()),
        };
        planned.insert(key.clone(), value);
    }
    Ok(planned)
}

fn typed_value(key: &str, kind: AttributeType, raw: &str) -> Result<AttrValue, CliError> {
    let invalid = || CliError::InvalidAttribute(format!("{key} expects a {kind} value, got {raw:?}"));
    match kind {
        AttributeType::String => Ok(AttrValue::from(raw)),
        AttributeType::Bool => raw.parse::<bool>().map(AttrValue::from).map_err(|_| invalid()),
        AttributeType::Int32 => raw.parse::<i64>().map(AttrValue::from).map_err(|_| invalid()),
    }
}

fn write_json(mut target: impl Write, value: &impl serde::Serialize) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

fn write_diagnostics(mut target: impl Write, diags: &Diagnostics) {
    for diag in diags.iter() {
        writeln!(target, "{diag}").ok();
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
