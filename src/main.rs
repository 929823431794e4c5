//! aptui - Terminal client for RNA aptamer design
//!
//! ## Usage
//!
//! ```bash
//! aptui --api-url http://localhost:8000                      # interactive
//! aptui --api-url ... --fasta target.fasta -o aptamers.xlsx  # generate and export
//! aptui --api-url ... --aptamer GGGAGAC... -o - --sort kd    # mutate, TSV to stdout
//! ```
//!
//! ## Navigation
//!
//! - `j/k`: Move selection
//! - `Tab`: Switch between generated and mutated tables
//! - `1-7`: Sort by column
//! - `Enter`: Show structure
//! - `:q`: Quit
//! - `:h`: Help

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use aptui::client::{ApiClient, DEFAULT_TIMEOUT};
use aptui::clipboard::SystemClipboard;
use aptui::controller::{run_app, Executor};
use aptui::export::{export, write_artifact, ExportFormat, WorkbookHandle, DEFAULT_SHEET};
use aptui::fasta::read_reference_file;
use aptui::forms::{Bounds, GenerateForm, MutateForm, MutationKind, DEFAULT_COUNT};
use aptui::model::{AppState, Field};
use aptui::sort::{sort_records, Direction};
use aptui::ui::glyphs;

/// Base name of exported files in CLI mode.
const CLI_FILE_STEM: &str = "aptamers";

/// Export format specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Tab separated text
    Txt,
    /// Quoted comma separated values
    Csv,
    /// Tab separated text with an .xls extension
    Xls,
    /// Excel workbook
    Xlsx,
    /// Guess from the output file extension (TXT for stdout)
    Auto,
}

impl FormatArg {
    fn resolve(self, output: &str) -> ExportFormat {
        match self {
            FormatArg::Txt => ExportFormat::Txt,
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xls => ExportFormat::Xls,
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Auto => ExportFormat::from_path(output).unwrap_or(ExportFormat::Txt),
        }
    }
}

/// aptui - Generate, mutate, sort and export RNA aptamer candidates
///
/// When run without -o/--output, opens an interactive TUI pre-filled with the
/// given inputs. With -o/--output, runs one request in CLI mode and writes the
/// result to a file (or stdout with "-").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the aptamer design service
    #[arg(long = "api-url", env = "APTUI_API_URL")]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Reference FASTA file for aptamer generation
    #[arg(long = "fasta")]
    fasta: Option<PathBuf>,

    /// Aptamer sequence to mutate
    #[arg(long = "aptamer")]
    aptamer: Option<String>,

    /// Minimum GC content (%)
    #[arg(long = "min-gc")]
    min_gc: Option<f64>,

    /// Maximum GC content (%)
    #[arg(long = "max-gc")]
    max_gc: Option<f64>,

    /// Minimum aptamer length
    #[arg(long = "min-length")]
    min_length: Option<u32>,

    /// Maximum aptamer length
    #[arg(long = "max-length")]
    max_length: Option<u32>,

    /// Minimum melting temperature
    #[arg(long = "min-tm")]
    min_tm: Option<f64>,

    /// Maximum melting temperature
    #[arg(long = "max-tm")]
    max_tm: Option<f64>,

    /// Number of aptamers to generate (1-100)
    #[arg(short = 'n', long = "count", default_value_t = DEFAULT_COUNT)]
    count: usize,

    /// Number of mutations to request (1-100)
    #[arg(short = 'm', long = "mutations", default_value_t = DEFAULT_COUNT)]
    mutations: usize,

    /// Use random mutation instead of point mutation
    #[arg(long = "random-mutation")]
    random_mutation: bool,

    /// Sort output by field (sequence, length, gc_content, structure, mfe, tm, kd)
    #[arg(short = 's', long = "sort")]
    sort: Option<Field>,

    /// Sort in descending order
    #[arg(long = "descending", requires = "sort")]
    descending: bool,

    /// Output file (enables CLI mode). Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Export format
    #[arg(short = 'f', long = "export-format", value_enum, default_value = "auto")]
    export_format: FormatArg,

    /// Log file for interactive mode (default: a new file in the temp directory)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Use plain ASCII symbols in the interface
    #[arg(long = "ascii")]
    ascii: bool,
}

impl Args {
    fn forms(&self) -> Result<(GenerateForm, MutateForm)> {
        let reference = match &self.fasta {
            Some(path) => read_reference_file(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            None => String::new(),
        };
        let generate = GenerateForm {
            reference,
            count: self.count,
            gc: Bounds::new(self.min_gc, self.max_gc),
            length: Bounds::new(self.min_length, self.max_length),
            tm: Bounds::new(self.min_tm, self.max_tm),
        };
        let mutate = MutateForm {
            aptamer: self.aptamer.clone().unwrap_or_default(),
            count: self.mutations,
            kind: if self.random_mutation {
                MutationKind::Random
            } else {
                MutationKind::Point
            },
        };
        Ok((generate, mutate))
    }

    fn direction(&self) -> Direction {
        if self.descending {
            Direction::Descending
        } else {
            Direction::Ascending
        }
    }
}

/// Sets up logging. Interactive mode logs to a file so the screen stays clean.
fn init_logging(interactive: bool, log_file: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if !interactive {
        builder.try_init()?;
        return Ok(None);
    }

    let path = match log_file {
        Some(path) => path.clone(),
        None => std::env::temp_dir().join(format!("aptui-{:08x}.log", rand::random::<u32>())),
    };
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    builder
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(Some(path))
}

/// Runs CLI mode: one service request, then sort and write the result.
fn run_cli_mode(args: &Args, output: &str) -> Result<()> {
    let (generate, mutate) = args.forms()?;
    let client = ApiClient::new(args.api_url.clone(), Duration::from_secs(args.timeout))?;

    let records = match (&args.fasta, &args.aptamer) {
        (Some(_), None) => {
            let request = generate.to_request()?;
            log::info!("requesting {} aptamers", request.num_aptamers);
            client.generate(&request)?
        }
        (None, Some(_)) => {
            let request = mutate.to_request()?;
            log::info!("requesting {} {} mutations", request.count, request.kind);
            let records = client.mutate(&request)?;
            if records.len() < request.count {
                log::warn!(
                    "{} of {} requested mutations were usable",
                    records.len(),
                    request.count
                );
            }
            records
        }
        (Some(_), Some(_)) => anyhow::bail!("Give either --fasta or --aptamer, not both"),
        (None, None) => anyhow::bail!("Nothing to do: give --fasta to generate or --aptamer to mutate"),
    };

    let records = sort_records(&records, args.sort, args.direction());
    let format = args.export_format.resolve(output);
    let artifact = export(&records, format, DEFAULT_SHEET, &WorkbookHandle::new())?;
    if let Some(warning) = &artifact.warning {
        log::warn!("{}", warning);
    }

    if output == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&artifact.bytes)?;
        if !artifact.bytes.ends_with(b"\n") && artifact.format != ExportFormat::Xlsx {
            writeln!(handle)?;
        }
    } else {
        let target = artifact.target_path(Some(output), CLI_FILE_STEM);
        write_artifact(&artifact, &target)?;
        eprintln!("Wrote {} records to {}", records.len(), target.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // CLI mode: output to file/stdout
    if let Some(output) = args.output.clone() {
        init_logging(false, None)?;
        return run_cli_mode(&args, &output);
    }

    let log_path = init_logging(true, args.log_file.as_ref())?;
    if let Some(path) = &log_path {
        log::info!("aptui {} logging to {}", env!("CARGO_PKG_VERSION"), path.display());
    }

    let (generate, mutate) = args.forms()?;
    let client = ApiClient::new(args.api_url.clone(), Duration::from_secs(args.timeout))?;
    if client.base_url().is_none() {
        log::warn!("no service URL configured; requests will fail until --api-url is given");
    }
    let executor = Executor::new(client, WorkbookHandle::new(), Box::new(SystemClipboard::new()));
    run_app(AppState::new(generate, mutate), executor, glyphs::select(!args.ascii))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "aptui", "--aptamer", "ACGU", "--sort", "kd", "--descending", "-o", "-",
        ])
        .unwrap();
        assert_eq!(args.sort, Some(Field::Kd));
        assert_eq!(args.direction(), Direction::Descending);
        assert_eq!(args.count, 10);

        assert!(Args::try_parse_from(["aptui", "--descending"]).is_err());
        assert!(Args::try_parse_from(["aptui", "--sort", "weight"]).is_err());
    }

    #[test]
    fn test_format_resolution() {
        assert_eq!(FormatArg::Auto.resolve("out.csv"), ExportFormat::Csv);
        assert_eq!(FormatArg::Auto.resolve("-"), ExportFormat::Txt);
        assert_eq!(FormatArg::Xlsx.resolve("out.txt"), ExportFormat::Xlsx);
    }

    #[test]
    fn test_forms_from_args() {
        let args = Args::try_parse_from([
            "aptui", "--aptamer", "ACGU", "--random-mutation", "--min-gc", "40", "-m", "5",
        ])
        .unwrap();
        let (generate, mutate) = args.forms().unwrap();
        assert_eq!(generate.gc, Bounds::new(Some(40.0), None));
        assert_eq!(mutate.kind, MutationKind::Random);
        assert_eq!(mutate.count, 5);
    }
}
