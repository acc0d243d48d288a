//! Run execution and caching service.

use std::path::Path;
use std::time::Instant;

use is_project::schema::ProtocolFile;
use is_results::{RunManifest, RunStore, RunType, TraceRecord};

use crate::error::{AppError, AppResult};
use crate::host_loop::HostLoop;
use crate::progress::{RunProgressEvent, RunStage, SimulationProgress};
use crate::protocol_service;

/// Version stamped into manifests and mixed into run ids.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Periods between simulation progress events.
const PROGRESS_INTERVAL: usize = 10_000;

/// How long to drive the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Exactly this many host periods.
    Steps { steps: usize },
    /// Until the protocol is done, giving up after `max_steps` periods.
    UntilDone { max_steps: usize },
}

impl RunMode {
    fn max_steps(&self) -> usize {
        match *self {
            Self::Steps { steps } => steps,
            Self::UntilDone { max_steps } => max_steps,
        }
    }
}

impl From<RunMode> for RunType {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Steps { steps } => RunType::Steps { steps },
            RunMode::UntilDone { max_steps } => RunType::UntilDone { max_steps },
        }
    }
}

/// Options for running protocols.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub generator_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            generator_version: GENERATOR_VERSION.to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub protocol_path: &'a Path,
    pub mode: RunMode,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub simulate_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
    pub steps: usize,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    simulation: Option<SimulationProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            simulation,
        });
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingProtocol,
        started,
        Some("Loading protocol".to_string()),
        None,
    );
    let file = protocol_service::load_protocol(request.protocol_path)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );
    let run_type = RunType::from(request.mode);
    let run_id = is_results::compute_run_id(
        &file.protocol,
        &file.host,
        &run_type,
        &request.options.generator_version,
    );
    let store = RunStore::for_protocol(request.protocol_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            Some("Loading cached run".to_string()),
            None,
        );
        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
        timing.steps = manifest.samples;
        timing.total_time_s = started.elapsed().as_secs_f64();
        tracing::info!(run_id = %run_id, "loaded cached run");

        emit_progress(
            &mut progress_cb,
            RunStage::Completed,
            started,
            Some("Loaded cached run".to_string()),
            None,
        );
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            timing,
        });
    }

    emit_progress(
        &mut progress_cb,
        RunStage::Simulating,
        started,
        Some("Running protocol".to_string()),
        None,
    );
    let sim_started = Instant::now();
    let records = run_host_loop(&file, request.mode, &mut progress_cb)?;
    timing.simulate_time_s = sim_started.elapsed().as_secs_f64();
    timing.steps = records.len();

    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results".to_string()),
        None,
    );
    let save_started = Instant::now();
    let manifest = RunManifest::now(
        run_id.clone(),
        file.name.clone(),
        run_type,
        file.host.period_ms,
        request.options.generator_version.clone(),
        records.len(),
    );
    store.save_run(&manifest, &records)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();
    tracing::info!(
        run_id = %run_id,
        samples = records.len(),
        elapsed_s = timing.total_time_s,
        "run saved"
    );

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

/// Drive a protocol file through the offline host loop.
///
/// `UntilDone` runs fail if the protocol has not finished within
/// `max_steps` periods.
pub fn simulate(
    file: &ProtocolFile,
    mode: RunMode,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<Vec<TraceRecord>> {
    run_host_loop(file, mode, &mut progress_cb)
}

fn run_host_loop(
    file: &ProtocolFile,
    mode: RunMode,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<Vec<TraceRecord>> {
    protocol_service::validate_protocol(file)?;
    let mut host = HostLoop::from_file(file)?;
    let max_steps = mode.max_steps();
    let started = Instant::now();

    let mut records = Vec::with_capacity(max_steps.min(1 << 20));
    for step in 0..max_steps {
        if matches!(mode, RunMode::UntilDone { .. }) && host.is_done() {
            break;
        }
        let record = host.step(0.0);

        if step % PROGRESS_INTERVAL == 0 {
            emit_progress(
                progress_cb,
                RunStage::Simulating,
                started,
                None,
                Some(SimulationProgress {
                    step,
                    max_steps,
                    sim_time_s: record.time_s,
                    cycle_index: record.cycle_index,
                    fraction_complete: step as f64 / max_steps as f64,
                }),
            );
        }
        records.push(record);
    }

    if matches!(mode, RunMode::UntilDone { .. }) && !host.is_done() {
        return Err(AppError::Generator(format!(
            "protocol did not finish within {max_steps} steps"
        )));
    }
    tracing::debug!(samples = records.len(), "simulation finished");
    Ok(records)
}

/// List runs recorded for a protocol file, most recent first.
pub fn list_runs(protocol_path: &Path) -> AppResult<Vec<RunManifest>> {
    let file = protocol_service::load_protocol(protocol_path)?;
    let store = RunStore::for_protocol(protocol_path)?;

    Ok(store.list_runs(&file.name)?)
}

/// Load a specific run.
pub fn load_run(
    protocol_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<TraceRecord>)> {
    let store = RunStore::for_protocol(protocol_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_trace(run_id)?;

    Ok((manifest, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staircase() -> ProtocolFile {
        let mut file = ProtocolFile::new("staircase");
        file.protocol.stim_time_ms = 10.0;
        file.protocol.range_start_pa = 0.0;
        file.protocol.range_end_pa = 100.0;
        file.protocol.increment_pa = 20.0;
        file.protocol.inter_cycle_interval_s = 0.0;
        file.protocol.downtime_s = 0.0;
        file.host.period_ms = 1.0;
        file
    }

    #[test]
    fn fixed_step_run_has_exact_length() {
        let records = simulate(&staircase(), RunMode::Steps { steps: 100 }, None).unwrap();
        assert_eq!(records.len(), 100);
        assert!(records[99].done);
    }

    #[test]
    fn until_done_stops_at_completion() {
        let records =
            simulate(&staircase(), RunMode::UntilDone { max_steps: 1000 }, None).unwrap();
        assert_eq!(records.len(), 60);
        assert!(records.last().unwrap().done);
    }

    #[test]
    fn until_done_reports_unfinished_protocol() {
        let err = simulate(&staircase(), RunMode::UntilDone { max_steps: 30 }, None).unwrap_err();
        assert!(matches!(err, AppError::Generator(_)));
    }

    #[test]
    fn progress_events_are_emitted() {
        let mut events = Vec::new();
        let mut cb = |event: RunProgressEvent| events.push(event);
        simulate(&staircase(), RunMode::Steps { steps: 10 }, Some(&mut cb)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage, RunStage::Simulating);
        assert!(events[0].simulation.is_some());
    }

    #[test]
    fn run_mode_maps_to_run_type() {
        assert_eq!(
            RunType::from(RunMode::Steps { steps: 5 }),
            RunType::Steps { steps: 5 }
        );
        assert_eq!(
            RunType::from(RunMode::UntilDone { max_steps: 9 }),
            RunType::UntilDone { max_steps: 9 }
        );
    }
}
