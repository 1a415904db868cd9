//! codebox CLI
//!
//! A command-line tool for running a submission against test inputs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codebox::{
    Config, EXAMPLE_CONFIG, ExecutionRequest, ExecutionStatus, ResourceLimits, Runner,
    process::resolve_program,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codebox")]
#[command(about = "A tool for compiling and judging code against test inputs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: codebox.toml)
        #[arg(short, long, default_value = "codebox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Compile a program and run it once per input
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (e.g., java, cpp17, python3)
        #[arg(short, long)]
        language: String,

        /// Input for one run (repeatable)
        #[arg(short, long = "input", value_name = "INPUT")]
        inputs: Vec<String>,

        /// File whose contents are the input for one run (repeatable)
        #[arg(long = "input-file", value_name = "PATH")]
        input_files: Vec<PathBuf>,

        /// Deadline per run in milliseconds
        #[arg(short, long)]
        time_limit: Option<u64>,

        /// Memory limit in MB
        #[arg(short, long)]
        memory_limit: Option<u64>,
    },

    /// List available languages
    Languages,

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // Logs go to stderr so program output on stdout can be piped
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            inputs,
            input_files,
            time_limit,
            memory_limit,
        } => {
            run_submission(
                config,
                &source,
                &language,
                inputs,
                &input_files,
                time_limit,
                memory_limit,
            )
            .await
        }
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_submission(
    config: Config,
    source: &Path,
    language_id: &str,
    mut inputs: Vec<String>,
    input_files: &[PathBuf],
    time_limit: Option<u64>,
    memory_limit: Option<u64>,
) -> Result<()> {
    let language = config
        .get_language(language_id)
        .context("unknown language")?;
    info!(language = %language.name, "running submission");

    let code = tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read source file '{}'", source.display()))?;

    for path in input_files {
        let input = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read input file '{}'", path.display()))?;
        inputs.push(input);
    }

    // Only include explicitly-specified values so they don't override
    // per-language defaults
    let mut request = ExecutionRequest::new(code, language_id, inputs);
    if time_limit.is_some() || memory_limit.is_some() {
        request = request.with_limits(ResourceLimits {
            timeout_ms: time_limit,
            memory_limit,
            max_output: None,
        });
    }

    let runner = Runner::new(config);
    let response = runner.execute(&request).await;

    for output in &response.outputs {
        print!("{output}");
    }
    if let Some(ref message) = response.message {
        eprintln!("{message}");
    }

    // Log execution info via tracing (stderr), keeping stdout clean for piping
    info!(
        status = %response.status,
        passed = response.outputs.len(),
        total = request.inputs.len(),
        max_time = format_args!("{} ms", response.max_time_ms),
        timed_out = response.timed_out(),
        "execution result"
    );

    match response.status {
        ExecutionStatus::Success => Ok(()),
        ExecutionStatus::RuntimeError => std::process::exit(1),
        ExecutionStatus::SandboxError => std::process::exit(2),
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(id, _)| *id);

    for (id, lang) in languages {
        let lang_type = if lang.is_compiled() {
            "compiled"
        } else {
            "interpreted"
        };

        // The toolchain is available when every program the language needs is on PATH
        let programs = lang
            .compile
            .iter()
            .map(|compile| &compile.command)
            .chain(std::iter::once(&lang.run.command))
            .filter_map(|command| command.first())
            .filter(|program| !program.contains('{'));
        let missing: Vec<_> = programs
            .filter(|program| resolve_program(program).is_none())
            .collect();
        let availability = if missing.is_empty() {
            "available".to_owned()
        } else {
            format!(
                "missing {}",
                missing.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
            )
        };

        println!("  {:<15} {} ({}, {})", id, lang.name, lang_type, availability);
    }
}

fn show_config(config: &Config) {
    println!("Workspace root: {}", config.workspace_root.display());
    println!("Parallel runs: {}", config.parallelism());
    println!("Fail on stderr: {}", config.fail_on_stderr);
    println!();
    println!("Default resource limits:");
    println!("  Timeout: {:?} ms", config.default_limits.timeout_ms);
    println!("  Memory limit: {:?} MB", config.default_limits.memory_limit);
    println!("  Max output: {:?} KB", config.default_limits.max_output);
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
