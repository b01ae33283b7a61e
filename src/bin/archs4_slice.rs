use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use archs4_slice_server::dataset::{Dataset, DatasetSource, FileDatasetSource};
use archs4_slice_server::domain::TableFormat;
use archs4_slice_server::error::{ErrorKind, SliceError};
use archs4_slice_server::resolver::ListingWindow;
use archs4_slice_server::service::SliceService;

#[derive(Parser)]
#[command(name = "archs4-slice")]
#[command(about = "Query filtered slices of an ARCHS4-style gene-expression matrix")]
#[command(version, author)]
struct Cli {
    /// Dataset directory holding genes.txt, samples.tsv and matrix.bin
    #[arg(short = 'd', long, env = "ARCHS4_DATA", global = true)]
    data: Option<Utf8PathBuf>,

    /// More -v = more verbose
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch an expression slice as a buffered table")]
    Expression(ExpressionArgs),
    #[command(about = "Stream an expression slice transposed, one line per sample")]
    Transpose(TransposeArgs),
    #[command(about = "List gene symbols")]
    Genes(ListArgs),
    #[command(about = "List sample accessions, optionally within one series")]
    Samples(SamplesArgs),
    #[command(about = "List series ids")]
    Series(ListArgs),
}

#[derive(Args)]
struct ExpressionArgs {
    /// Gene symbol filter; omit to select every gene
    #[arg(long = "gene")]
    genes: Vec<String>,

    /// Sample accessions to slice (max 100 distinct)
    #[arg(long = "accession", required = true)]
    accessions: Vec<String>,

    /// Content preference; text/tab-separated-values selects TSV, anything
    /// else selects JSON
    #[arg(long)]
    accept: Option<String>,
}

#[derive(Args)]
struct TransposeArgs {
    /// Gene symbol filter; omit to select every gene
    #[arg(long = "gene")]
    genes: Vec<String>,

    /// Sample accessions to stream (max 100 distinct)
    #[arg(long = "accession", required = true)]
    accessions: Vec<String>,
}

#[derive(Args, Clone)]
struct ListArgs {
    /// Case-sensitive substring filter
    #[arg(short = 'q', long)]
    query: Option<String>,

    #[arg(long, default_value_t = 0)]
    skip: usize,

    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[derive(Args)]
struct SamplesArgs {
    /// Restrict to members of this series id
    #[arg(long)]
    series: Option<String>,

    #[command(flatten)]
    list: ListArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SliceError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SliceError) -> u8 {
    match error.kind() {
        ErrorKind::NotFound => 2,
        ErrorKind::TransientStore => 3,
        ErrorKind::Validation => 4,
        ErrorKind::Initialization => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data = cli
        .data
        .ok_or_else(|| miette::Report::msg("dataset directory required (--data or ARCHS4_DATA)"))?;
    let raw = FileDatasetSource::new(data).load().into_diagnostic()?;
    let dataset = Arc::new(Dataset::build(raw).into_diagnostic()?);
    let service = SliceService::new(dataset);

    match cli.command {
        Commands::Expression(args) => {
            let format = TableFormat::from_accept(args.accept.as_deref());
            let table = service
                .expression(gene_filter(&args.genes), &args.accessions, format)
                .into_diagnostic()?;
            eprintln!("Content-Type: {}", table.content_type);
            let mut stdout = io::stdout().lock();
            stdout.write_all(table.body.as_bytes()).into_diagnostic()?;
            if !table.body.ends_with('\n') {
                stdout.write_all(b"\n").into_diagnostic()?;
            }
            Ok(())
        }
        Commands::Transpose(args) => {
            eprintln!("Content-Type: {}", TableFormat::Tsv.content_type());
            service
                .expression_transpose(
                    gene_filter(&args.genes),
                    &args.accessions,
                    io::stdout().lock(),
                )
                .into_diagnostic()
        }
        Commands::Genes(args) => {
            let window = service
                .list_genes(args.query.as_deref(), args.skip, args.limit)
                .into_diagnostic()?;
            print_listing(&window)
        }
        Commands::Samples(args) => {
            let window = service
                .list_accessions(
                    args.series.as_deref(),
                    args.list.query.as_deref(),
                    args.list.skip,
                    args.list.limit,
                )
                .into_diagnostic()?;
            print_listing(&window)
        }
        Commands::Series(args) => {
            let window = service
                .list_series(args.query.as_deref(), args.skip, args.limit)
                .into_diagnostic()?;
            print_listing(&window)
        }
    }
}

fn gene_filter(genes: &[String]) -> Option<&[String]> {
    (!genes.is_empty()).then_some(genes)
}

fn print_listing(window: &ListingWindow) -> miette::Result<()> {
    // Content-range is response metadata, not body.
    eprintln!("Content-Range: {}", window.range);
    let body = serde_json::to_string(&window.items).into_diagnostic()?;
    println!("{body}");
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
