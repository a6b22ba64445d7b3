use clap::Parser;
use std::process::ExitCode;

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod physics;
pub mod pipeline;
pub mod scheduler;
pub mod utils;

use cli::{Cli, Commands};
use config::AnalysisConfig;
use error::{OmsError, OmsResult};
use pipeline::Outcome;
use scheduler::{Collection, RunOptions, WorkerPool};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = match cli.command {
        Commands::Worker => utils::logger::init_with_prefix(cli.log_level(), format!("worker {}", std::process::id())),
        _ => utils::logger::init(cli.log_level()),
    };
    if let Err(e) = logger {
        eprintln!("Could not install the logger: {}", e);
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> OmsResult<ExitCode> {
    match &cli.command {
        Commands::Run {
            collection,
            batches,
            max_size,
            overwrite,
            redo_balance,
            config,
        } => {
            let settings = AnalysisConfig::load(config.as_deref())?;
            let coll = Collection::load(&collection.collection, collection.structure_list.as_deref())?;
            let options = RunOptions {
                num_batches: *batches,
                max_size: *max_size,
                overwrite: *overwrite,
                redo_balance: *redo_balance,
            };
            let pool = WorkerPool::current(cli.forwarded_flags())?;

            let started = std::time::Instant::now();
            let report = scheduler::run_collection(&coll, &collection.output, &options, &settings, &pool)?;
            log::info!("Analysis finished in {:.1} s", started.elapsed().as_secs_f64());

            print!("{}", utils::report::run_summary(&report));
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Analyze {
            file,
            output,
            overwrite,
            config,
        } => {
            let settings = AnalysisConfig::load(config.as_deref())?;
            match pipeline::analyze_into_folder(file, output, *overwrite, &settings)? {
                Outcome::Completed { summary, formula } => {
                    print!("{}", utils::report::structure_summary(&summary, &formula));
                }
                Outcome::Skipped => {
                    log::warn!(
                        "Results for {} already exist in {}. Use --overwrite to recompute.",
                        file.display(),
                        output.display()
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status { collection } => {
            let coll = Collection::load(&collection.collection, collection.structure_list.as_deref())?;
            let status = coll.status(&collection.output);
            print!("{}", utils::report::collection_status(&status));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { config, save } => {
            let settings = AnalysisConfig::load(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if *save {
                let path = settings.save(None)?;
                log::info!("Settings saved to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Worker => {
            let stdout = std::io::stdout();
            scheduler::worker::serve(std::io::stdin().lock(), &mut stdout.lock())
                .map_err(|e| OmsError::Worker(e.to_string()))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
