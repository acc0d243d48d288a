use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use is_app::{
    RunMode, RunOptions, RunProgressEvent, RunRequest, RunStage, query, run_service,
    save_protocol,
};
use is_project::ProtocolFile;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn write_staircase(dir: &std::path::Path) -> PathBuf {
    fs::create_dir_all(dir).expect("failed to create temp dir");
    let mut file = ProtocolFile::new("staircase");
    file.protocol.stim_time_ms = 10.0;
    file.protocol.range_start_pa = 0.0;
    file.protocol.range_end_pa = 100.0;
    file.protocol.increment_pa = 20.0;
    file.protocol.inter_cycle_interval_s = 0.0;
    file.protocol.downtime_s = 0.0;
    file.host.period_ms = 1.0;

    let path = dir.join("staircase.yaml");
    save_protocol(&path, &file).expect("failed to write protocol");
    path
}

#[test]
fn run_is_cached_and_reloaded() {
    let dir = unique_temp_dir("is_app_cache");
    let protocol_path = write_staircase(&dir);

    let request = RunRequest {
        protocol_path: &protocol_path,
        mode: RunMode::Steps { steps: 80 },
        options: RunOptions::default(),
    };

    let first = run_service::ensure_run(&request).expect("first run failed");
    assert!(!first.loaded_from_cache);
    assert_eq!(first.manifest.samples, 80);
    assert_eq!(first.manifest.protocol_name, "staircase");

    let second = run_service::ensure_run(&request).expect("second run failed");
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);

    let runs = run_service::list_runs(&protocol_path).expect("failed to list runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, first.run_id);

    let (manifest, records) =
        run_service::load_run(&protocol_path, &first.run_id).expect("failed to load run");
    assert_eq!(manifest, first.manifest);
    assert_eq!(records.len(), 80);

    let summary = query::get_run_summary(&records).expect("failed to summarize");
    assert_eq!(summary.distinct_levels_pa, vec![20.0, 40.0, 60.0, 80.0, 100.0]);
    assert_eq!(summary.cycles_completed, 1);
    assert_eq!(summary.done_at_s, Some(records[59].time_s));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn different_modes_get_different_run_ids() {
    let dir = unique_temp_dir("is_app_modes");
    let protocol_path = write_staircase(&dir);

    let steps = run_service::ensure_run(&RunRequest {
        protocol_path: &protocol_path,
        mode: RunMode::Steps { steps: 10 },
        options: RunOptions::default(),
    })
    .expect("fixed-step run failed");
    let until_done = run_service::ensure_run(&RunRequest {
        protocol_path: &protocol_path,
        mode: RunMode::UntilDone { max_steps: 1_000 },
        options: RunOptions::default(),
    })
    .expect("until-done run failed");

    assert_ne!(steps.run_id, until_done.run_id);
    assert_eq!(until_done.manifest.samples, 60);
    let runs = run_service::list_runs(&protocol_path).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, until_done.run_id);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn progress_stages_in_order() {
    let dir = unique_temp_dir("is_app_progress");
    let protocol_path = write_staircase(&dir);

    let request = RunRequest {
        protocol_path: &protocol_path,
        mode: RunMode::Steps { steps: 20 },
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    };

    let mut stages = Vec::new();
    let mut cb = |event: RunProgressEvent| {
        if event.simulation.is_none() {
            stages.push(event.stage);
        }
    };
    run_service::ensure_run_with_progress(&request, Some(&mut cb)).expect("run failed");

    assert_eq!(
        stages,
        vec![
            RunStage::LoadingProtocol,
            RunStage::CheckingCache,
            RunStage::Simulating,
            RunStage::SavingResults,
            RunStage::Completed,
        ]
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_protocol_file_is_reported() {
    let dir = unique_temp_dir("is_app_missing");
    let path = dir.join("absent.yaml");
    let request = RunRequest {
        protocol_path: &path,
        mode: RunMode::Steps { steps: 1 },
        options: RunOptions::default(),
    };
    let err = run_service::ensure_run(&request).unwrap_err();
    assert!(matches!(err, is_app::AppError::ProtocolFileRead { .. }));
}

#[test]
fn shipped_protocol_with_pause_window() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../protocols/staircase_two_cycles.yaml");
    let file = is_app::load_protocol(&path).expect("failed to load shipped protocol");

    let records =
        run_service::simulate(&file, RunMode::Steps { steps: 40 }, None).expect("simulate failed");
    let summary = query::get_run_summary(&records).unwrap();
    assert_eq!(summary.paused_samples, 5);
    for record in records.iter().filter(|r| r.paused) {
        assert_eq!(record.command, 0.0);
    }
}
