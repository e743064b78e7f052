/*!
# BSL Metadata CLI

Command-line interface for searching exported 1C:Enterprise configuration metadata.
*/

use anyhow::{Context, Result};
use bsl_metadata::cli_common::{
    self, format_duration, print_error, print_success, print_warning, CommonArgs, OutputFormat,
    OutputWriter, ServiceArgs,
};
use bsl_metadata::{MetadataQuery, MetadataService, SearchError};
use clap::{Parser, Subcommand};
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "bsl-metadata",
    version = env!("CARGO_PKG_VERSION"),
    author = "BSL Analyzer Team",
    about = "Search 1C:Enterprise configuration metadata exported as JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Find metadata objects by full name, name or synonym
    Search {
        /// Query, e.g. "Справочник.Номенклатура", "Documents.Invoice" or "Номенклатура"
        query: String,

        /// Configuration selector: file name, Имя or Синоним
        #[arg(short, long)]
        config: Option<String>,

        /// Maximum number of results
        #[arg(short, long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Reserved: search for usages
        #[arg(long)]
        find_usages: bool,
    },

    /// List loaded configurations and files that failed to load
    Configs,

    /// Build or refresh the configuration index cache
    Index {
        /// Rebuild from source even if the cache is valid
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    cli_common::init_logging(cli.common.log_level())?;

    let format: OutputFormat = cli.common.format.parse()?;
    let settings = cli.service.settings().context("Failed to load settings")?;
    let start = Instant::now();
    let service = MetadataService::open(settings).context("Failed to open metadata service")?;
    info!("Service opened in {}", format_duration(start.elapsed()));

    let mut output = OutputWriter::stdout(format);

    match cli.command {
        Commands::Search {
            query,
            config,
            limit,
            find_usages,
        } => search_command(&service, &mut output, query, config, limit, find_usages)?,
        Commands::Configs => configs_command(&service, &mut output)?,
        Commands::Index { force } => index_command(&service, &mut output, force, start)?,
    }

    output.flush()
}

fn search_command(
    service: &MetadataService,
    output: &mut OutputWriter,
    query: String,
    config: Option<String>,
    limit: Option<i64>,
    find_usages: bool,
) -> Result<()> {
    let mut request = MetadataQuery::new(query).with_find_usages(find_usages);
    request.config = config;
    request.limit = limit;

    match service.search(&request) {
        Ok(result) => output.write_search_result(&result),
        Err(SearchError::NotImplemented(message)) => {
            print_warning(&message);
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            Err(e.into())
        }
    }
}

fn configs_command(service: &MetadataService, output: &mut OutputWriter) -> Result<()> {
    let configs = service.config_summaries();
    let report = service.load_report();
    if configs.is_empty() && output.format() == OutputFormat::Text {
        print_warning(&format!(
            "No configurations found in {}",
            service.settings().input_dir.display()
        ));
    }
    output.write_configs(&configs, &report)
}

fn index_command(
    service: &MetadataService,
    output: &mut OutputWriter,
    force: bool,
    start: Instant,
) -> Result<()> {
    if force {
        service.rebuild().context("Failed to rebuild index")?;
    }

    let snapshot = service.snapshot();
    let report = snapshot.report();

    if output.format() == OutputFormat::Json {
        return output.write_object(&serde_json::json!({
            "index_file": service.cache_file(),
            "configs": snapshot.index().len(),
            "loaded": report.loaded,
            "failed": report.failed,
        }));
    }

    print_success(&format!(
        "Indexed {} configurations in {}",
        snapshot.index().len(),
        format_duration(start.elapsed())
    ));
    output.write_line(&format!(
        "Index file: {}",
        service.cache_file().display()
    ))?;
    for failure in &report.failed {
        print_warning(&failure.to_string());
    }
    Ok(())
}
