//! SUSHI Report CLI Application
//!
//! This is the command-line interface for the SUSHI/COUNTER report converter.
//! It uses the sushi-report-decoder library and adds:
//! - Batch conversion of saved SUSHI responses to CSV (in parallel)
//! - Request document generation from the provider table (sushiconfig.csv)
//! - Inspection of decoded reports, optionally as JSON

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use sushi_report_decoder::{build_request, decode, render, RenderRequest, ReportType, XmlDocument};

mod config;
mod providers;

use config::AppConfig;

/// SUSHI Report - Convert COUNTER R4 usage reports to CSV
#[derive(Parser, Debug)]
#[command(name = "sushi-report")]
#[command(about = "Convert SUSHI/COUNTER R4 usage reports to CSV", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert saved SUSHI response documents to CSV
    Convert {
        /// Response documents (XML)
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        #[command(flatten)]
        range: MonthRange,

        /// Customer code printed in the report header (default: first customer ID)
        #[arg(long, value_name = "CODE")]
        customer: Option<String>,

        /// Layout to render (default: the document's report type)
        #[arg(long, value_name = "CODE")]
        report_type: Option<ReportType>,

        /// Directory for the CSV files
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Write SUSHI request documents for every flagged provider report
    Request {
        /// Provider table (default: [input] providers, or sushiconfig.csv)
        #[arg(short, long, value_name = "FILE")]
        providers: Option<PathBuf>,

        /// Library codes to process, comma separated
        #[arg(short, long, value_name = "CODES", value_delimiter = ',')]
        libraries: Vec<String>,

        #[command(flatten)]
        range: MonthRange,

        /// COUNTER release to request when the provider row names none
        #[arg(long, value_name = "RELEASE")]
        release: Option<String>,

        /// Directory for the request files
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Show a summary of a decoded response document
    Inspect {
        /// Response document (XML)
        file: PathBuf,

        /// Dump the full decoded model as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Reporting months; both default to the previous calendar month
#[derive(clap::Args, Debug, Clone, Copy)]
struct MonthRange {
    /// First month (YYYYMM)
    #[arg(short, long, value_name = "YYYYMM", value_parser = parse_month)]
    start: Option<NaiveDate>,

    /// Last month (YYYYMM)
    #[arg(short, long, value_name = "YYYYMM", value_parser = parse_month)]
    end: Option<NaiveDate>,
}

impl MonthRange {
    fn resolve(&self, today: NaiveDate) -> Result<RenderRequest> {
        let previous = RenderRequest::previous_month(today).start;
        let request = RenderRequest::new(
            self.start.unwrap_or(previous),
            self.end.unwrap_or(previous),
        )?;
        Ok(request.with_run_date(today))
    }
}

fn parse_month(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}01", value.trim()), "%Y%m%d")
        .map_err(|_| format!("'{}' is not a month in YYYYMM form", value))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("SUSHI Report CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", sushi_report_decoder::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let today = Local::now().date_naive();

    match &args.command {
        Command::Convert {
            files,
            range,
            customer,
            report_type,
            output_dir,
        } => {
            let options = ConvertOptions {
                request: range.resolve(today)?,
                customer: customer.clone(),
                report_type: *report_type,
                output_dir: config.output_dir(output_dir.as_deref()),
            };
            convert_mode(files, &options)
        }
        Command::Request {
            providers,
            libraries,
            range,
            release,
            output_dir,
        } => {
            let providers = providers.clone().unwrap_or_else(|| config.input.providers.clone());
            let libraries = if libraries.is_empty() {
                config.filter.libraries.clone()
            } else {
                libraries.clone()
            };
            let release = release.clone().unwrap_or_else(|| config.request.release.clone());
            request_mode(
                &providers,
                &libraries,
                &range.resolve(today)?,
                &release,
                &config.output_dir(output_dir.as_deref()),
            )
        }
        Command::Inspect { file, json } => inspect_mode(file, *json),
    }
}

struct ConvertOptions {
    request: RenderRequest,
    customer: Option<String>,
    report_type: Option<ReportType>,
    output_dir: PathBuf,
}

/// Convert mode - decode and render every file, in parallel
fn convert_mode(files: &[PathBuf], options: &ConvertOptions) -> Result<()> {
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", options.output_dir))?;

    log::info!(
        "Converting {} file(s) for {} to {}",
        files.len(),
        options.request.start.format("%Y-%m"),
        options.request.end.format("%Y-%m")
    );

    let failures = files
        .par_iter()
        .map(|path| {
            convert_file(path, options).map_err(|e| {
                log::error!("{:?}: {:#}", path, e);
                e
            })
        })
        .filter(|result| result.is_err())
        .count();

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed to convert", failures, files.len());
    }
    log::info!("Converted {} file(s)", files.len());
    Ok(())
}

fn convert_file(path: &Path, options: &ConvertOptions) -> Result<PathBuf> {
    let report = load_report(path)?;
    if let Some(exception) = report.remote_exception() {
        anyhow::bail!("SUSHI server returned exception: {}", exception);
    }

    let report_type = options.report_type.unwrap_or(report.report_type);
    let customer = options.customer.clone().unwrap_or_else(|| {
        report
            .first_report()
            .and_then(|r| r.customers.first())
            .map(|c| c.id.clone())
            .unwrap_or_default()
    });

    let request = options.request.clone().with_customer(customer);
    let csv = render(&report, report_type, &request)
        .with_context(|| format!("Failed to render {:?}", path))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| report_type.to_string());
    let out_path = options.output_dir.join(format!("{}.csv", stem));
    fs::write(&out_path, csv).with_context(|| format!("Failed to write {:?}", out_path))?;

    log::info!("Wrote {} to {:?}", report_type, out_path);
    Ok(out_path)
}

/// Request mode - write one request document per flagged provider report
fn request_mode(
    providers_path: &Path,
    libraries: &[String],
    range: &RenderRequest,
    release: &str,
    output_dir: &Path,
) -> Result<()> {
    let table = providers::read_providers(providers_path)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let created = Local::now().naive_local();
    let mut written = 0;
    let mut failures = table.rejected.len();

    for row in table.selected(libraries) {
        if row.reports.is_empty() {
            log::warn!("Line {}: no report types flagged for {}", row.line, row.provider);
        }
        for &report_type in &row.reports {
            let request = row.report_request(report_type, range.start, range.end, created, release);
            let out_path =
                output_dir.join(row.file_name(report_type, range.start, range.end, "xml"));

            let result = build_request(&request)
                .with_context(|| format!("Failed to build {} request", report_type))
                .and_then(|xml| {
                    fs::write(&out_path, xml)
                        .with_context(|| format!("Failed to write {:?}", out_path))
                });

            match result {
                Ok(()) => {
                    log::debug!("Wrote {:?} (endpoint {})", out_path, row.url);
                    written += 1;
                }
                Err(e) => {
                    log::error!(
                        "Line {} report type {}: {:#}",
                        row.line,
                        report_type,
                        e
                    );
                    failures += 1;
                }
            }
        }
    }

    log::info!("Wrote {} request document(s) to {:?}", written, output_dir);
    if failures > 0 {
        anyhow::bail!("{} provider row(s) or report(s) failed", failures);
    }
    Ok(())
}

/// Inspect mode - print a summary or the full model
fn inspect_mode(path: &Path, json: bool) -> Result<()> {
    let report = load_report(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stats = report.stats();
    println!("Report type: {} (release {})", report.report_type, report.release);
    for counter_report in &report.reports {
        println!(
            "Report {} \"{}\" created {}",
            counter_report.id, counter_report.title, counter_report.created
        );
        println!("  Vendor: {} ({})", counter_report.vendor.name, counter_report.vendor.id);
        for customer in &counter_report.customers {
            println!(
                "  Customer {} {}: {} item(s)",
                customer.id,
                customer.name,
                customer.items.len()
            );
        }
    }
    println!(
        "Totals: {} customer(s), {} item(s), {} metric bucket(s)",
        stats.num_customers, stats.num_items, stats.num_metrics
    );
    for exception in &report.exceptions {
        println!("Exception: {}", exception);
    }
    Ok(())
}

fn load_report(path: &Path) -> Result<sushi_report_decoder::SushiReport> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let doc = XmlDocument::parse(&text).with_context(|| format!("Failed to parse {:?}", path))?;
    decode(&doc).with_context(|| format!("Failed to decode {:?}", path))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
