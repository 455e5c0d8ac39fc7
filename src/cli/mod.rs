//! Command-line interface definitions for the `terraform-provider-osc` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `terraform-provider-osc` binary.
#[derive(Debug, Parser)]
#[command(
    name = "terraform-provider-osc",
    version,
    about = "Manage Open Source Cloud service instances from the command line",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Merge additional service definitions from a JSON catalog file.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) catalog: Option<String>,
    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, value_name = "FILTER", default_value = "warn")]
    pub(crate) log_level: String,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands exposed by the binary.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List every resource type the provider registers.
    #[command(name = "resources", about = "List registered resource types")]
    Resources,
    /// Print the schema of one resource type as JSON.
    #[command(name = "schema", about = "Print the schema of a resource type")]
    Schema(SchemaCommand),
    /// Create an instance and print its state as JSON.
    #[command(name = "create", about = "Create a service instance")]
    Create(CreateCommand),
    /// Remove an instance by name.
    #[command(name = "delete", about = "Remove a service instance")]
    Delete(DeleteCommand),
}

/// Arguments for the `schema` subcommand.
#[derive(Debug, Args)]
pub(crate) struct SchemaCommand {
    /// Resource type, for example `osc_valkey_instance`.
    #[arg(value_name = "TYPE")]
    pub(crate) resource_type: String,
}

/// Arguments for the `create` subcommand.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Resource type, for example `osc_valkey_instance`.
    #[arg(value_name = "TYPE")]
    pub(crate) resource_type: String,
    /// Name of the instance to create.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
    /// Set a service attribute, converted using the resource schema.
    ///
    /// May be repeated. Values for bool attributes must be `true` or
    /// `false`; int32 attributes take a decimal integer.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub(crate) assignments: Vec<(String, String)>,
}

/// Arguments for the `delete` subcommand.
#[derive(Debug, Args)]
pub(crate) struct DeleteCommand {
    /// Resource type, for example `osc_valkey_instance`.
    #[arg(value_name = "TYPE")]
    pub(crate) resource_type: String,
    /// Name of the instance to remove.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
}

/// Splits `key=value` at the first `=`.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got {raw:?}"));
    };
    let attribute = key.trim();
    if attribute.is_empty() {
        return Err(format!("attribute name must not be empty in {raw:?}"));
    }
    Ok((attribute.to_owned(), value.to_owned()))
}
