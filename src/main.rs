/*!
 * report-gateway CLI
 *
 * Uploads generated reports to Odoo and checks server connectivity.
 */

use clap::{Parser, Subcommand, ValueEnum};
use report_gateway::{
    check::{check_connection, ConnectionReport},
    config::{GatewayConfig, LogLevel, DEFAULT_SERVER},
    error::{GatewayError, Result, EXIT_FAILED, EXIT_SUCCESS},
    logging,
    output::OutputWriter,
    upload::{confirm_artifact, ReportArtifact},
    JsonRpcTransport, OutputDir,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "report-gateway")]
#[command(version, about = "Upload generated reports to Odoo", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Server profile used for uploads
    #[arg(short = 's', long = "server", default_value = DEFAULT_SERVER, global = true)]
    server: String,

    /// Output directory (default: output/ next to the executable)
    #[arg(long = "output-dir", value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write logs as JSON lines to this file instead of stderr
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a report file to Odoo
    Upload {
        /// Name of the package that generated the report
        package: String,

        /// Path to the report file
        file: PathBuf,
    },

    /// Copy a report into the output directory, then upload it
    Publish {
        /// Name of the package that generated the report
        package: String,

        /// Path to the generated report
        file: PathBuf,

        /// Store under this file name instead of the source name
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Test connectivity and credentials for configured servers
    Check {
        /// Servers to test (default: all configured)
        servers: Vec<String>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);
    let operation = cli.command.name();

    let code = match run(cli, &output) {
        Ok(code) => code,
        Err(e) => {
            error!(category = %e.category(), "{}", e);
            output.error(operation, &e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Upload { .. } => "upload",
            Commands::Publish { .. } => "publish",
            Commands::Check { .. } => "check",
        }
    }
}

fn run(cli: Cli, output: &OutputWriter) -> Result<i32> {
    let mut config = GatewayConfig::load(cli.config.as_deref())?;

    // CLI flags override the file
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;
    if cli.output_dir.is_some() {
        config.output_dir = cli.output_dir.clone();
    }

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    config.apply_env(&cli.server)?;

    match cli.command {
        Commands::Upload { package, file } => {
            handle_upload(&config, &cli.server, &package, &file, output)
        }
        Commands::Publish {
            package,
            file,
            name,
        } => handle_publish(&config, &cli.server, &package, &file, name.as_deref(), output),
        Commands::Check { servers } => handle_check(&config, servers, output),
    }
}

fn handle_upload(
    config: &GatewayConfig,
    server: &str,
    package: &str,
    file: &Path,
    output: &OutputWriter,
) -> Result<i32> {
    upload_file(config, server, package, file, "upload", output)
}

fn handle_publish(
    config: &GatewayConfig,
    server: &str,
    package: &str,
    file: &Path,
    name: Option<&str>,
    output: &OutputWriter,
) -> Result<i32> {
    // Validate the source before anything lands in the output directory
    ReportArtifact::from_path(package, file)?;

    let output_dir = OutputDir::resolve(config.output_dir.as_deref())?;
    let staged = output_dir.import_report(file, name)?;
    info!(path = %staged.display(), "report placed in output directory");
    output.info(&format!("Staged {}", staged.display()));

    upload_file(config, server, package, &staged, "publish", output)
}

fn upload_file(
    config: &GatewayConfig,
    server: &str,
    package: &str,
    file: &Path,
    operation: &'static str,
    output: &OutputWriter,
) -> Result<i32> {
    let started = Instant::now();

    // Read and validate before touching the network
    let artifact = ReportArtifact::from_path(package, file)?;
    let profile = config.profile(server)?;
    let client = report_gateway::connect(profile)?;

    let summary = confirm_artifact(&client, artifact, file)?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "upload finished");
    output.upload(operation, &summary);
    Ok(EXIT_SUCCESS)
}

fn handle_check(config: &GatewayConfig, servers: Vec<String>, output: &OutputWriter) -> Result<i32> {
    let servers = if servers.is_empty() {
        config.server_names()
    } else {
        servers
    };
    if servers.is_empty() {
        return Err(GatewayError::Config(
            "no servers configured to check".to_string(),
        ));
    }

    let mut failed = 0usize;
    for name in &servers {
        // A broken profile fails its own check only
        let report = match config.profile(name).and_then(|profile| {
            JsonRpcTransport::new(&profile.url, profile.timeout).map(|t| (profile, t))
        }) {
            Ok((profile, transport)) => check_connection(profile, transport),
            Err(e) => ConnectionReport::unresolved(name, &e),
        };
        if !report.succeeded() {
            failed += 1;
        }
        output.connection_report(&report);
    }

    if failed > 0 {
        warn!(failed, total = servers.len(), "connection checks failed");
        Ok(EXIT_FAILED)
    } else {
        info!(total = servers.len(), "all connection checks passed");
        Ok(EXIT_SUCCESS)
    }
}
