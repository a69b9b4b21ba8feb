use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use styleguide_core::analyzer::index::StyleguideIndex;
use styleguide_core::{Config, Extractor, ParseCache};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "styleguide example source extractor", long_about = None)]
struct Cli {
    /// JSON config file (method, indent_width, extensions)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a template and print its AST as JSON
    Parse(ParseArgs),
    /// Print the literal body of one documentation block
    Extract(ExtractArgs),
    /// List every documentation block under a directory as JSON
    Index(IndexArgs),
}

#[derive(Args, Debug)]
struct ParseArgs {
    file: PathBuf,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    file: PathBuf,
    /// Literal argument of the block, e.g. a section id like 1.1
    argument: String,
    /// Directive name (defaults to the configured method)
    #[arg(long)]
    method: Option<String>,
    /// 0-indexed first body line; located from the template when omitted
    #[arg(long)]
    start_line: Option<usize>,
}

#[derive(Args, Debug)]
struct IndexArgs {
    dir: PathBuf,
    /// Include each block's extracted source
    #[arg(long)]
    with_source: bool,
}

#[derive(Serialize)]
struct ErrorOut {
    error: String,
}

fn init_tracing(verbose: u8) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("styleguide-core: {}", message);
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::from_json_file(path).unwrap_or_else(|err| fail(err)),
        None => Config::default(),
    };
    let cache = Arc::new(ParseCache::default());

    match cli.command {
        Commands::Parse(args) => match cache.get_or_parse(&args.file) {
            Ok(ast) => {
                let json = serde_json::to_string(&*ast).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json);
            }
            Err(err) => {
                // Keep the interface JSON even on failure
                let out = ErrorOut { error: err.to_string() };
                println!("{}", serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string()));
                process::exit(1);
            }
        },
        Commands::Extract(args) => {
            let method = args.method.unwrap_or_else(|| config.method.clone());
            let extractor = Extractor::new(cache, config);
            let source = match args.start_line {
                Some(line) => extractor.extract(&args.file, line, &method, &args.argument),
                None => extractor
                    .extract_call_site(&args.file, &method, &args.argument)
                    .map(|extraction| extraction.source),
            };
            match source {
                Ok(source) => print!("{}", source),
                Err(err) => fail(err),
            }
        }
        Commands::Index(args) => {
            let mut index = StyleguideIndex::build(&args.dir, &config, &cache)
                .unwrap_or_else(|err| fail(err));
            if args.with_source {
                if let Err(err) = index.load_sources(&config, &cache) {
                    fail(err);
                }
            }
            println!("{}", index.to_json());
        }
    }
}
