// src/scheduler/worker.rs

use crate::config::AnalysisConfig;
use crate::error::{OmsError, OmsResult};
use crate::pipeline::{analyze_into_folder, Outcome};
use crate::scheduler::batches::Batch;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Everything a worker process needs, sent as JSON on its stdin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerJob {
    pub batch: Batch,
    pub output_folder: PathBuf,
    pub overwrite: bool,
    pub config: AnalysisConfig,
}

/// One line of worker stdout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum WorkerEvent {
    Completed { name: String },
    Skipped { name: String },
    Failed { name: String, message: String },
    Finished { batch: usize },
}

/// Processes the batch sequentially, reporting every structure on `events`.
/// A failing structure is reported and the batch goes on.
pub fn run_batch<W: Write>(job: &WorkerJob, events: &mut W) -> OmsResult<()> {
    let n = job.batch.entries.len();
    for (i, entry) in job.batch.entries.iter().enumerate() {
        log::info!("Structure {}/{}: {}", i + 1, n, entry.name);

        let event = match analyze_into_folder(&entry.path, &job.output_folder, job.overwrite, &job.config) {
            Ok(Outcome::Completed { .. }) => WorkerEvent::Completed {
                name: entry.name.clone(),
            },
            Ok(Outcome::Skipped) => {
                log::info!("Skipping {}, results already exist", entry.name);
                WorkerEvent::Skipped {
                    name: entry.name.clone(),
                }
            }
            Err(e) => {
                log::error!("{}: {}", entry.name, e);
                WorkerEvent::Failed {
                    name: entry.name.clone(),
                    message: e.to_string(),
                }
            }
        };
        emit(events, &event)?;
    }

    log::info!("Finished batch {}", job.batch.id + 1);
    emit(events, &WorkerEvent::Finished { batch: job.batch.id })
}

fn emit<W: Write>(out: &mut W, event: &WorkerEvent) -> OmsResult<()> {
    serde_json::to_writer(&mut *out, event)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Worker process entry point: one job from `input`, events to `output`.
pub fn serve<R: Read, W: Write>(input: R, output: &mut W) -> OmsResult<()> {
    let job: WorkerJob = serde_json::from_reader(input)?;
    run_batch(&job, output)
}

/// Outcome of a collection run, gathered from every worker.
#[derive(Debug, Default, PartialEq)]
pub struct RunReport {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    /// Structure name and error message
    pub failed: Vec<(String, String)>,
    /// Batches whose worker did not finish cleanly
    pub failed_workers: Vec<usize>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.failed_workers.is_empty()
    }

    /// Folds in the events of one worker. Structures the worker never
    /// reported on are counted as failed.
    fn record(&mut self, batch: &Batch, events: Vec<WorkerEvent>, exited_ok: bool) {
        let mut reported = HashSet::new();
        let mut finished = false;

        for event in events {
            match event {
                WorkerEvent::Completed { name } => {
                    reported.insert(name.clone());
                    self.completed.push(name);
                }
                WorkerEvent::Skipped { name } => {
                    reported.insert(name.clone());
                    self.skipped.push(name);
                }
                WorkerEvent::Failed { name, message } => {
                    reported.insert(name.clone());
                    self.failed.push((name, message));
                }
                WorkerEvent::Finished { .. } => finished = true,
            }
        }

        for entry in &batch.entries {
            if !reported.contains(&entry.name) {
                self.failed
                    .push((entry.name.clone(), "worker exited before reporting".to_string()));
            }
        }
        if !(exited_ok && finished) {
            self.failed_workers.push(batch.id);
        }
    }
}

/// Runs batches in separate worker processes.
pub struct WorkerPool {
    program: PathBuf,
    /// Passed before the `worker` subcommand, e.g. verbosity flags
    args: Vec<String>,
}

impl WorkerPool {
    /// Pool running the current executable.
    pub fn current(args: Vec<String>) -> OmsResult<Self> {
        Ok(Self::with_program(std::env::current_exe()?, args))
    }

    pub fn with_program(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Starts one worker per non-empty batch and blocks until all of them
    /// have exited. There is no timeout: a hung worker blocks the run.
    pub fn run(
        &self,
        batches: &[Batch],
        output_folder: &Path,
        overwrite: bool,
        config: &AnalysisConfig,
    ) -> OmsResult<RunReport> {
        let jobs: Vec<WorkerJob> = batches
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| WorkerJob {
                batch: b.clone(),
                output_folder: output_folder.to_path_buf(),
                overwrite,
                config: config.clone(),
            })
            .collect();

        log::info!("Starting {} workers", jobs.len());

        let results: Vec<thread::Result<(Vec<WorkerEvent>, bool)>> = thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|job| scope.spawn(move || self.run_worker(job)))
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut report = RunReport::default();
        for (job, result) in jobs.iter().zip(results) {
            let (events, exited_ok) =
                result.map_err(|_| OmsError::Worker(format!("monitor of batch {} panicked", job.batch.id + 1)))?;
            report.record(&job.batch, events, exited_ok);
        }

        log::info!(
            "Run finished: {} completed, {} skipped, {} failed",
            report.completed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Spawns the worker of one job and collects its events until it exits.
    /// Returns the events and whether the process exited successfully.
    fn run_worker(&self, job: &WorkerJob) -> (Vec<WorkerEvent>, bool) {
        let id = job.batch.id + 1;
        match self.spawn_and_wait(job) {
            Ok((events, true)) => (events, true),
            Ok((events, false)) => {
                log::error!("Worker of batch {} exited with an error", id);
                (events, false)
            }
            Err(e) => {
                log::error!("Worker of batch {} failed: {}", id, e);
                (Vec::new(), false)
            }
        }
    }

    fn spawn_and_wait(&self, job: &WorkerJob) -> OmsResult<(Vec<WorkerEvent>, bool)> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("worker")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        // the worker reads the whole job before writing anything
        let sent = match child.stdin.take() {
            Some(mut stdin) => serde_json::to_writer(&mut stdin, job),
            None => Ok(()),
        };
        if let Err(e) = sent {
            log::error!("Could not send batch {} to its worker: {}", job.batch.id + 1, e);
        }

        let mut events = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                match serde_json::from_str::<WorkerEvent>(&line) {
                    Ok(event) => events.push(event),
                    Err(_) => log::warn!("batch {}: unexpected worker output '{}'", job.batch.id + 1, line),
                }
            }
        }

        // always reaped, whatever happened above
        let status = child.wait()?;
        Ok((events, status.success()))
    }
}
