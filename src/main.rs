use adequacy::{
    AdequacyError, LpOptimizer, Optimizer, OptimizerConfig, SolverBackend, SolverConfig, Study,
    StudyResult,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adequacy", version, about = "Multi-scenario network adequacy optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a study locally
    Solve {
        /// Study file (JSON)
        study: PathBuf,
        /// Result file (JSON); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        optimizer: OptimizerArgs,
    },
    /// Serve the optimizer over gRPC
    #[cfg(feature = "remote")]
    Serve {
        #[arg(long, env = "ADEQUACY_ADDR", default_value = "0.0.0.0:50051")]
        addr: std::net::SocketAddr,
        /// Token clients must present
        #[arg(long, env = "ADEQUACY_TOKEN")]
        token: Option<String>,
        #[command(flatten)]
        optimizer: OptimizerArgs,
    },
    /// Solve a study on a remote server
    #[cfg(feature = "remote")]
    Remote {
        /// Study file (JSON)
        study: PathBuf,
        #[arg(long, env = "ADEQUACY_URL", default_value = "http://127.0.0.1:50051")]
        url: String,
        #[arg(long, env = "ADEQUACY_TOKEN", default_value = "")]
        token: String,
        /// Result file (JSON); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct OptimizerArgs {
    /// LP backend (auto, clarabel, cbc, highs)
    #[arg(long, env = "ADEQUACY_BACKEND", default_value = "auto")]
    backend: SolverBackend,
    /// Concurrent scenario solves, 0 for every core
    #[arg(long, env = "ADEQUACY_WORKERS", default_value_t = 0)]
    workers: usize,
    /// Per-scenario solver time limit in seconds
    #[arg(long, env = "ADEQUACY_TIME_LIMIT")]
    time_limit: Option<f64>,
    /// Let the backend print its own log
    #[arg(long)]
    verbose_solver: bool,
}

impl OptimizerArgs {
    fn config(&self) -> OptimizerConfig {
        OptimizerConfig {
            solver: SolverConfig {
                backend: self.backend,
                time_limit: self.time_limit,
                verbose: self.verbose_solver,
            },
            workers: self.workers,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            study,
            output,
            optimizer,
        } => {
            let study = read_study(&study)?;
            let optimizer = LpOptimizer::new(optimizer.config()).context("configuring optimizer")?;
            let result = optimizer.solve(&study).map_err(report)?;
            write_result(&result, output.as_deref())
        }
        #[cfg(feature = "remote")]
        Commands::Serve {
            addr,
            token,
            optimizer,
        } => {
            let mut config = adequacy::ServerConfig::new(addr, optimizer.config());
            config.token = token;
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            runtime
                .block_on(adequacy::start_server(config))
                .map_err(|e| anyhow::anyhow!(e))
        }
        #[cfg(feature = "remote")]
        Commands::Remote {
            study,
            url,
            token,
            output,
        } => {
            let study = read_study(&study)?;
            let optimizer = adequacy::RemoteOptimizer::new(url, token);
            let result = optimizer.solve(&study).map_err(report)?;
            write_result(&result, output.as_deref())
        }
    }
}

fn read_study(path: &Path) -> anyhow::Result<Study> {
    let text = fs::read_to_string(path).with_context(|| format!("reading study '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing study '{}'", path.display()))
}

fn write_result(result: &StudyResult, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing result '{}'", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
            Ok(())
        }
    }
}

/// List every failed scenario before giving up.
fn report(err: AdequacyError) -> anyhow::Error {
    for failure in err.failures() {
        eprintln!("  {}", failure);
    }
    anyhow::Error::new(err)
}
