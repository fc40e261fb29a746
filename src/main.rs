//! jfuzz CLI entrypoint.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use jfuzz::{
    fuzz_factor_from, parse_param_filter, BuiltinOracle, CommandOracle, Config, MutationOracle,
    OracleBackend, Session, SessionOptions, ValueKind,
};

#[derive(Debug, Parser)]
#[command(name = "jfuzz")]
#[command(version)]
#[command(about = "JSON document mutation fuzzer")]
struct Cli {
    /// Path to config file. Missing configs are treated as "defaults".
    #[arg(long, default_value = "jfuzz.toml")]
    config: PathBuf,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, default_value = "warn")]
    log: String,

    /// Original JSON document; `-` reads it from stdin.
    #[arg(short = 'j', long = "json")]
    json: String,

    /// Comma-separated field names to mutate; everything else is left alone.
    #[arg(short = 'p', long = "params")]
    params: Option<String>,

    /// Attack technique letters (C, H, P, T, R, S, X).
    #[arg(short = 't', long)]
    techniques: Option<String>,

    /// Width of the per-kind action menu, 0 to 6.
    #[arg(short = 'f', long, default_value_t = 6, allow_negative_numbers = true)]
    fuzz_factor: i64,

    /// Pretty-print indent; 0 renders compactly.
    #[arg(short = 'i', long, default_value_t = 0)]
    indent: usize,

    /// Percent-encode the final payload.
    #[arg(long = "url-encode")]
    url_encode: bool,

    /// Hand the whole serialized document to the oracle.
    #[arg(short = 's', long)]
    strong: bool,

    /// Gate mutations by per-kind behavior weights.
    #[arg(short = 'b', long)]
    behavior: bool,

    /// Reinforce a value kind before mutating (repeatable).
    #[arg(long, value_name = "KIND")]
    reinforce: Vec<ValueKind>,

    /// Byte mutator backend.
    #[arg(long)]
    oracle: Option<OracleBackend>,

    /// Substitute a placeholder document for malformed input.
    #[arg(long)]
    lenient: bool,

    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args()));

    if let Err(err) = init_tracing(&cli.log) {
        eprintln!("warning: failed to init tracing: {err:#}");
    }

    eprintln!("{}", jfuzz::banner());

    let config = Config::load_optional(&cli.config);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => print_error_and_exit(err),
    }
}

/// Rewrites single-dash long flags the parser cannot express.
fn normalize_legacy_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-ue" => "--url-encode".to_string(),
            _ => arg,
        })
        .collect()
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let options = SessionOptions {
        fuzz_factor: fuzz_factor_from(cli.fuzz_factor)?,
        param_filter: cli.params.as_deref().map(parse_param_filter),
        techniques: cli.techniques.clone(),
        strong_mode: cli.strong,
        behavior_mode: cli.behavior,
        behavior_weights: config.behavior.to_weights()?,
        lenient: cli.lenient || config.lenient,
        seed: cli.seed.or(config.seed),
    };
    let explicit_seed = options.seed;
    let mut session = Session::new(options)?;
    for kind in &cli.reinforce {
        session.behavior_mut().reinforce(*kind);
    }

    let mut oracle = build_oracle(cli, config, explicit_seed, session.seed())?;

    let document = read_document(&cli.json)?;
    session.load(&document)?;
    let mut payload = session.fuzz(oracle.as_mut(), cli.indent)?;
    if cli.url_encode {
        payload = percent_encode(&payload).into_bytes();
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&payload)?;
    stdout.flush()?;
    Ok(())
}

fn build_oracle(
    cli: &Cli,
    config: &Config,
    explicit_seed: Option<u64>,
    session_seed: u64,
) -> anyhow::Result<Box<dyn MutationOracle>> {
    match cli.oracle.unwrap_or(config.oracle) {
        OracleBackend::Command => {
            let mut oracle = CommandOracle::detect(config.oracle_command.clone(), config.oracle_args.clone())?;
            if let Some(seed) = explicit_seed {
                oracle = oracle.with_seed(seed);
            }
            Ok(Box::new(oracle))
        }
        OracleBackend::Builtin => Ok(Box::new(BuiltinOracle::new(session_seed.wrapping_add(1)))),
    }
}

fn read_document(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        return Ok(std::io::read_to_string(std::io::stdin())?);
    }
    Ok(source.to_string())
}

/// Percent-encodes everything but ASCII alphanumerics and `_.-/`.
fn percent_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_alphanumeric() || b"_.-/".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn print_error_and_exit(err: anyhow::Error) -> ExitCode {
    eprintln!("{err:#}");
    ExitCode::from(2)
}
