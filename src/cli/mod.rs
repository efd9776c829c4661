//! CLI module for the cartograph-runner binary
//!
//! A job file is a TOML document naming the input/output schemas, the
//! template library directory, and the payload (plus optional defaults).
//! The runner drives one worker thread per job file; a job with
//! `sleep-afterwards` set repeats until interrupted, which helps when
//! exercising template directory rescans.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::cartography::{Cartography, CartographerWorker, EMPTY_DEFAULTS};
use crate::library::FilesystemLibrary;
use crate::schema::VersionedSchema;

/// One schema triple as written in a job file.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub schema_type: String,
}

impl SchemaConfig {
    fn to_schema(&self) -> Result<VersionedSchema> {
        VersionedSchema::new(&self.name, &self.version, &self.schema_type)
            .context("invalid schema in job file")
    }
}

/// A translation job loaded from one TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobConfig {
    /// Directory holding `<name>-<version>.<type>` template files.
    pub library: PathBuf,
    pub input: SchemaConfig,
    pub output: SchemaConfig,
    pub payload_file: PathBuf,
    #[serde(default)]
    pub defaults_file: Option<PathBuf>,
    /// Seconds to sleep after each translation; the job repeats while set.
    #[serde(default)]
    pub sleep_afterwards: Option<u64>,
}

impl JobConfig {
    /// Load and validate one job file, reporting every problem at once.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read job file {}", path.display()))?;
        let job: JobConfig = toml::from_str(&text)
            .with_context(|| format!("cannot parse job file {}", path.display()))?;

        let mut problems = Vec::new();
        if !job.library.is_dir() {
            problems.push(format!("library directory missing: {}", job.library.display()));
        }
        if !job.payload_file.is_file() {
            problems.push(format!("payload file missing: {}", job.payload_file.display()));
        }
        if let Some(defaults) = &job.defaults_file {
            if !defaults.is_file() {
                problems.push(format!("defaults file missing: {}", defaults.display()));
            }
        }
        if !problems.is_empty() {
            bail!(
                "job file {} has problems: {}",
                path.display(),
                problems.join(", ")
            );
        }
        Ok(job)
    }
}

/// Load every job file, then run each on its own worker thread.
pub fn run(job_files: &[PathBuf]) -> Result<()> {
    let mut jobs = Vec::new();
    for path in job_files {
        jobs.push(JobConfig::load(path)?);
    }

    let mut handles = Vec::new();
    for job in jobs {
        handles.push(thread::spawn(move || run_job(&job)));
    }

    let mut failures = 0usize;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("job failed: {e:#}");
                failures += 1;
            }
            Err(_) => {
                warn!("job thread panicked");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} job(s) failed");
    }
    Ok(())
}

fn run_job(job: &JobConfig) -> Result<()> {
    let input = job.input.to_schema()?;
    let output = job.output.to_schema()?;

    let library = FilesystemLibrary::new(&job.library)?;
    let worker = CartographerWorker::new(Box::new(library)).logged();

    loop {
        let payload = fs::read_to_string(&job.payload_file)
            .with_context(|| format!("cannot read payload {}", job.payload_file.display()))?;
        let defaults = match &job.defaults_file {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("cannot read defaults {}", path.display()))?,
            None => EMPTY_DEFAULTS.to_string(),
        };

        info!("translating {} -> {}", input, output);
        let result = worker.translate_with_defaults(&input, &output, &payload, &defaults)?;
        println!("{result}");

        match job.sleep_afterwards {
            Some(seconds) => {
                info!("sleeping for {seconds} seconds");
                thread::sleep(Duration::from_secs(seconds));
            }
            None => break,
        }
    }

    worker.close();
    Ok(())
}
