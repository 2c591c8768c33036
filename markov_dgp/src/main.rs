// src/main.rs
//
// CLI entrypoint for markov_dgp.
//
// Subcommands:
// - generate: build a dataset from a YAML config and/or flags and write it
//   as metadata.json + trajectories.jsonl (+ optional telemetry JSONL)
// - pattern:  print the diagnostics of a k-cycle pattern
//
// Flags override fields of the config file. Every run prints a one-line
// header with the effective settings and the dataset fingerprint.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use markov_dgp::{
    CyclicPattern, DatasetWriter, EncodingMode, GenConfig, JsonlSink, PolicyConfig, Regime,
    Termination, TrajectoryGenerator,
};

#[derive(Debug, Parser)]
#[command(
    name = "markov_dgp",
    about = "Tiger POMDP and k-cycle trajectory generators for Markov-order testing",
    version
)]
struct Cli {
    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a dataset and write it to a directory.
    Generate(GenerateArgs),
    /// Print the diagnostics of a cyclic pattern.
    Pattern {
        /// Cycle length.
        #[arg(long)]
        k: usize,
        /// Explicit pattern, e.g. L,R,R,L.
        #[arg(long)]
        pattern: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct GenerateArgs {
    /// YAML config file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// noisy | cyclic
    #[arg(long)]
    regime: Option<Regime>,

    /// fixed | random | adaptive
    #[arg(long)]
    policy: Option<PolicyConfig>,

    /// raw | hidden-exposed | running-proportion | proportion-and-count
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// fixed-horizon | early-stop
    #[arg(long)]
    termination: Option<Termination>,

    /// Cycle length (cyclic regime).
    #[arg(long)]
    k: Option<usize>,

    /// Explicit cycle pattern, e.g. L,R,R,L.
    #[arg(long)]
    pattern: Option<String>,

    /// Steps per trajectory (T).
    #[arg(long)]
    length: Option<usize>,

    /// Number of trajectories (N).
    #[arg(long)]
    count: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Sensor accuracy (noisy regime).
    #[arg(long)]
    p_correct: Option<f64>,

    /// Record the latent state sequence.
    #[arg(long)]
    record_states: bool,

    /// Drop rewards from the export.
    #[arg(long)]
    no_reward: bool,

    /// Also write one JSON summary line per trajectory to this file.
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

impl GenerateArgs {
    fn resolve(&self) -> Result<GenConfig, Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => GenConfig::from_yaml_file(path)?,
            None => GenConfig::default(),
        };

        if let Some(regime) = self.regime {
            if regime == Regime::Cyclic && cfg.regime != Regime::Cyclic {
                cfg.include_reward = false;
                cfg.record_states = true;
            }
            cfg.regime = regime;
        }
        if let Some(policy) = self.policy {
            cfg.policy = policy;
        }
        if let Some(encoding) = self.encoding {
            cfg.encoding = encoding;
        }
        if let Some(termination) = self.termination {
            cfg.termination = termination;
        }
        if let Some(k) = self.k {
            cfg.k = k;
        }
        if let Some(pattern) = &self.pattern {
            cfg.pattern = Some(CyclicPattern::parse_list(pattern)?);
        }
        if let Some(length) = self.length {
            cfg.trajectory_length = length;
        }
        if let Some(count) = self.count {
            cfg.trajectory_count = count;
        }
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        if let Some(p) = self.p_correct {
            cfg.p_correct = p;
        }
        if self.record_states {
            cfg.record_states = true;
        }
        if self.no_reward {
            cfg.include_reward = false;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run_generate(args: &GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = args.resolve()?;
    let generator = TrajectoryGenerator::new(cfg)?;

    let dataset = match &args.telemetry {
        Some(path) => {
            let mut sink = JsonlSink::create(path)?;
            let dataset = generator.generate_with_sink(&mut sink)?;
            sink.flush()?;
            dataset
        }
        None => generator.generate()?,
    };

    DatasetWriter::new(&args.out).write(&dataset)?;

    let m = &dataset.metadata;
    println!(
        "markov_dgp | regime={} | policy={} | encoding={} | termination={} | N={} | T={} | seed={} | mean_len={:.2} | early={:.3} | {}",
        m.regime,
        m.policy.name(),
        m.encoding,
        m.termination,
        m.trajectory_count,
        m.trajectory_length,
        m.seed,
        m.mean_length,
        m.early_termination_rate,
        m.fingerprint,
    );
    Ok(())
}

fn run_pattern(k: usize, pattern: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let explicit = pattern.map(CyclicPattern::parse_list).transpose()?;
    let pattern = CyclicPattern::new(k, explicit)?;
    println!("k = {}", pattern.k());
    println!("pattern = {}", pattern.describe());
    println!(
        "codes = [{}]",
        pattern
            .codes()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("minimal period = {}", pattern.minimal_period());
    println!("obs accuracy = 1.0");
    if pattern.is_degenerate() {
        println!("warning: pattern repeats every {} steps", pattern.minimal_period());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match &cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Pattern { k, pattern } => run_pattern(*k, pattern.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
