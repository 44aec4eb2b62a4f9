/// ilvalidate - IL validator CLI
/// Reads Tril method IL and runs validation strategies over it.

use clap::Parser as ClapParser;
use jitval_tril::MethodIl;
use jitval_validator::strategy::{self, StrategyEntry};
use jitval_validator::{IlValidator, ValidationPhase, ValidationReport, ValidatorConfig};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(ClapParser)]
#[command(name = "ilvalidate")]
#[command(about = "ilvalidate - structural and semantic checks for method IL")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate every method in a .tril file
    Check {
        /// Path to the .tril file
        file: PathBuf,
        /// Built-in strategy to run (none, post-ilgen, pre-codegen, all)
        #[arg(short, long, default_value = "post-ilgen")]
        phase: ValidationPhase,
        /// JSON strategy file, replaces --phase
        #[arg(short, long)]
        strategy_file: Option<PathBuf>,
        /// JSON validator config (defaults to the platform config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Report strict failures without aborting
        #[arg(long)]
        continue_after_error: bool,
        /// Validate for a 32 bit target
        #[arg(long)]
        target_32bit: bool,
        /// Append diagnostics to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
        /// Trace the live node set (needs -vv)
        #[arg(long)]
        trace_live_nodes: bool,
        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the treetop listing of every method in a .tril file
    Dump {
        /// Path to the .tril file
        file: PathBuf,
    },
    /// List the built-in strategies
    Strategies,
    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Check {
            file,
            phase,
            strategy_file,
            config,
            continue_after_error,
            target_32bit,
            log_file,
            trace_live_nodes,
            json,
        } => {
            let methods = read_methods(&file)?;

            let mut config = ValidatorConfig::resolve(config.as_deref()).map_err(|e| format!("Config error: {}", e))?;
            config.continue_after_error |= continue_after_error;
            config.trace_live_nodes |= trace_live_nodes;
            if target_32bit {
                config.target = jitval_validator::Target::BITS_32;
            }
            if log_file.is_some() {
                config.log_file = log_file;
            }
            // JSON output owns stdout; diagnostics still reach the reports.
            if json {
                config.echo_to_stderr = false;
            }

            let strategy = select_strategy(phase, strategy_file.as_deref())?;
            let reports = check_methods(&methods, config, &strategy)?;

            if json {
                let text = serde_json::to_string_pretty(&reports).map_err(|e| e.to_string())?;
                println!("{}", text);
            } else {
                for report in &reports {
                    println!("{}", report);
                }
            }

            let errors: usize = reports.iter().map(ValidationReport::errors).sum();
            if errors > 0 {
                return Err(format!("{} validation error(s) in {}", errors, file.display()));
            }
        }
        Commands::Dump { file } => {
            for il in read_methods(&file)? {
                print!("{}", il);
            }
        }
        Commands::Strategies => {
            for phase in ValidationPhase::ALL {
                println!("{}:", phase);
                if phase.strategy().is_empty() {
                    println!("  (no rules)");
                }
                for entry in phase.strategy() {
                    println!("  {:<45} {:?}", entry.rule, entry.strictness);
                }
            }
        }
        Commands::Version => {
            println!("ilvalidate v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn read_methods(file: &Path) -> Result<Vec<MethodIl>, String> {
    let source = fs::read_to_string(file).map_err(|e| format!("Error reading {}: {}", file.display(), e))?;
    match jitval_tril::parse_methods(&source) {
        Ok(methods) => Ok(methods),
        Err(errors) => {
            eprintln!("Parser errors:");
            for e in &errors { eprintln!("  - {}", e); }
            Err("Parsing failed".into())
        }
    }
}

fn select_strategy(phase: ValidationPhase, file: Option<&Path>) -> Result<Vec<StrategyEntry>, String> {
    match file {
        Some(path) => strategy::load_strategy(path).map_err(|e| format!("Strategy error: {}", e)),
        None => Ok(phase.strategy().to_vec()),
    }
}

fn check_methods(
    methods: &[MethodIl],
    config: ValidatorConfig,
    strategy: &[StrategyEntry],
) -> Result<Vec<ValidationReport>, String> {
    let mut validator = IlValidator::new(config);
    let mut reports = Vec::with_capacity(methods.len());
    for il in methods {
        let report = validator
            .validate(il, strategy)
            .map_err(|e| format!("{}: {}", il.signature(), e))?;
        log::debug!("{}", report);
        reports.push(report);
    }
    Ok(reports)
}
