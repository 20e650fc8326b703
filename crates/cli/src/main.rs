use clap::{Parser, Subcommand};
use gridcheck_core::config::{
    optional_path_from_env_value, path_from_env_value, remote_use_grid_from_env_value,
};
use gridcheck_core::constants::{
    CATALOG_ENV, DEFAULT_CATALOG_FILENAME, DEFAULT_GRID_ROOT, FEDERATED_GRID_ROOT_ENV,
    GRID_ROOT_ENV, REMOTE_USE_GRID_ENV,
};
use gridcheck_core::{
    paths, CheckOptions, CheckService, CoreConfig, Resource, ResourceCatalog, RunSummary,
};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gridcheck")]
#[command(about = "Check synchronization between the repository database and the data grid")]
struct Cli {
    /// Resource catalog exported from the database (YAML or JSON)
    #[arg(long, global = true, env = CATALOG_ENV)]
    catalog: Option<String>,

    /// Mount directory of the data grid
    #[arg(long, global = true, env = GRID_ROOT_ENV)]
    grid_root: Option<String>,

    /// Mount directory of the federated data grid
    #[arg(long, global = true, env = FEDERATED_GRID_ROOT_ENV)]
    federated_grid_root: Option<String>,

    /// Check federated resources too (true/false)
    #[arg(long, global = true, env = REMOTE_USE_GRID_ENV)]
    remote_use_grid: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check resources, or every resource when no ids are given
    Check {
        /// Short ids of the resources to check
        resource_ids: Vec<String>,
        /// Log errors to the process log instead of printing them
        #[arg(long)]
        log: bool,
        /// Stop checking a resource at its first error
        #[arg(long)]
        stop_on_error: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print database names and data-grid contents of resources
    Dump {
        /// Short ids of the resources to dump
        #[arg(required = true)]
        resource_ids: Vec<String>,
    },
    /// Verify that the root collection of every resource exists
    Roots,
    /// List the resources in the catalog
    List,
}

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gridcheck=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(CoreConfig::new(
        path_from_env_value(cli.grid_root, DEFAULT_GRID_ROOT),
        optional_path_from_env_value(cli.federated_grid_root),
        remote_use_grid_from_env_value(cli.remote_use_grid)?,
        path_from_env_value(cli.catalog, DEFAULT_CATALOG_FILENAME),
    )?);

    tracing::debug!(
        "grid root {}, catalog {}",
        cfg.grid_root().display(),
        cfg.catalog_path().display()
    );
    let catalog = ResourceCatalog::load(cfg.catalog_path())?;

    match cli.command {
        Commands::List => {
            if catalog.is_empty() {
                println!("No resources found.");
            }
            for resource in catalog.iter() {
                println!(
                    "{} ({}): {} files, federation path {}, title '{}'",
                    resource.short_id,
                    resource.resource_type,
                    resource.files.len(),
                    resource
                        .federation_path
                        .as_ref()
                        .map_or("None", |p| p.as_str()),
                    resource.title
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Roots => {
            let service = CheckService::from_config(cfg)?;
            println!("LOOKING FOR MISSING RESOURCE ROOTS");
            let mut missing = 0usize;
            for resource in catalog.iter() {
                let root = paths::root_path(resource);
                match service.root_exists(resource) {
                    Ok(true) => {}
                    Ok(false) => {
                        missing += 1;
                        println!("ERROR: {} does not exist", root);
                    }
                    Err(e) => {
                        missing += 1;
                        println!("ERROR: {} could not be checked: {}", root, e);
                    }
                }
            }
            Ok(exit_code(missing))
        }
        Commands::Dump { resource_ids } => {
            let service = CheckService::from_config(cfg)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for rid in &resource_ids {
                match catalog.require(rid) {
                    Ok(resource) => service.dump(resource, &mut out)?,
                    Err(e) => writeln!(out, "{}", e)?,
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            resource_ids,
            log,
            stop_on_error,
            json,
        } => {
            let service = CheckService::from_config(cfg)?;
            let options = CheckOptions {
                stop_on_error,
                log_errors: log,
                echo_errors: !log && !json,
                return_errors: json,
            };

            let resources = select(&catalog, &resource_ids);
            if resource_ids.is_empty() && !json {
                println!("LOOKING FOR ERRORS FOR ALL RESOURCES");
            }

            let summary = service.check_all(resources, options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(exit_code(summary.total_errors))
        }
    }
}

/// The named resources, or the whole catalog when no names are given.
///
/// Unknown ids are reported and skipped.
fn select<'c>(catalog: &'c ResourceCatalog, resource_ids: &[String]) -> Vec<&'c Resource> {
    if resource_ids.is_empty() {
        return catalog.iter().collect();
    }

    resource_ids
        .iter()
        .filter_map(|rid| match catalog.require(rid) {
            Ok(resource) => Some(resource),
            Err(e) => {
                eprintln!("{}", e);
                None
            }
        })
        .collect()
}

fn print_summary(summary: &RunSummary) {
    println!(
        "checked {} resources: {} errors in {} resources",
        summary.resources_checked,
        summary.total_errors,
        summary.affected.len()
    );
    for short_id in &summary.aborted {
        println!("  {} stopped at its first error", short_id);
    }
}

fn exit_code(errors: usize) -> ExitCode {
    if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
