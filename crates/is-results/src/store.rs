//! On-disk run cache.
//!
//! Each run lives in its own directory named by run id:
//!
//! ```text
//! <protocol dir>/.istep/runs/<run_id>/trace.jsonl    one TraceRecord per line
//! <protocol dir>/.istep/runs/<run_id>/manifest.json  written after the trace
//! ```
//!
//! A run counts as cached only once its manifest exists, so a run interrupted
//! while streaming its trace is never picked up.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::types::{RunManifest, TraceRecord};
use crate::{ResultsError, ResultsResult};

const MANIFEST_FILE: &str = "manifest.json";
const TRACE_FILE: &str = "trace.jsonl";

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Store next to a protocol file, under `.istep/runs`.
    pub fn for_protocol(protocol_path: &Path) -> ResultsResult<Self> {
        let protocol_dir = protocol_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: format!("{} has no parent directory", protocol_path.display()),
            })?;
        Self::new(protocol_dir.join(".istep").join("runs"))
    }

    fn run_file(&self, run_id: &str, name: &str) -> PathBuf {
        self.root_dir.join(run_id).join(name)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_file(run_id, MANIFEST_FILE).is_file()
    }

    /// Stream `records` to the trace file, then commit the manifest.
    pub fn save_run(&self, manifest: &RunManifest, records: &[TraceRecord]) -> ResultsResult<()> {
        let run_dir = self.root_dir.join(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let mut trace = BufWriter::new(File::create(run_dir.join(TRACE_FILE))?);
        for record in records {
            serde_json::to_writer(&mut trace, record)?;
            trace.write_all(b"\n")?;
        }
        trace.flush()?;

        let mut out = BufWriter::new(File::create(run_dir.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut out, manifest)?;
        out.flush()?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let reader = BufReader::new(self.open(run_id, MANIFEST_FILE)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read a trace back line by line. Blank lines are skipped.
    pub fn load_trace(&self, run_id: &str) -> ResultsResult<Vec<TraceRecord>> {
        let reader = BufReader::new(self.open(run_id, TRACE_FILE)?);
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| {
                ResultsError::CorruptTrace {
                    run_id: run_id.to_string(),
                    line: index + 1,
                    source,
                }
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Completed runs of `protocol_name`, most recent first.
    pub fn list_runs(&self, protocol_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().into_owned();
            if !self.has_run(&run_id) {
                continue;
            }
            let manifest = self.load_manifest(&run_id)?;
            if manifest.protocol_name == protocol_name {
                runs.push(manifest);
            }
        }
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    fn open(&self, run_id: &str, name: &str) -> ResultsResult<File> {
        File::open(self.run_file(run_id, name)).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            },
            _ => ResultsError::Io(err),
        })
    }
}
