//! Query helpers for extracting data from loaded runs.

use is_core::{Tolerances, nearly_equal};
use is_results::TraceRecord;

use crate::error::{AppError, AppResult};

/// Summary of a run's time range and emitted levels.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub record_count: usize,
    pub cycles_completed: u32,
    /// Non-zero levels in emission order, consecutive repeats collapsed.
    pub distinct_levels_pa: Vec<f64>,
    pub peak_command: f64,
    /// Time of the first sample taken after the protocol finished.
    pub done_at_s: Option<f64>,
    pub paused_samples: usize,
}

/// Get run summary from trace records.
pub fn get_run_summary(records: &[TraceRecord]) -> AppResult<RunSummary> {
    if records.is_empty() {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    }

    let t_min = records.first().map(|r| r.time_s).unwrap_or(0.0);
    let t_max = records.last().map(|r| r.time_s).unwrap_or(0.0);
    let tol = Tolerances::default();

    let mut distinct_levels_pa: Vec<f64> = Vec::new();
    let mut previous = 0.0;
    for record in records.iter().filter(|r| !r.paused) {
        let level = record.level_pa;
        if !nearly_equal(level, 0.0, tol) && !nearly_equal(level, previous, tol) {
            distinct_levels_pa.push(level);
        }
        previous = level;
    }

    Ok(RunSummary {
        time_range: (t_min, t_max),
        record_count: records.len(),
        cycles_completed: records.iter().map(|r| r.cycle_index).max().unwrap_or(0),
        distinct_levels_pa,
        peak_command: records
            .iter()
            .map(|r| r.command)
            .fold(0.0, |peak: f64, c| if c.abs() > peak.abs() { c } else { peak }),
        done_at_s: records.iter().find(|r| r.done).map(|r| r.time_s),
        paused_samples: records.iter().filter(|r| r.paused).count(),
    })
}

/// Extract a `(time_s, value)` series for one trace variable.
pub fn extract_series(records: &[TraceRecord], variable: &str) -> AppResult<Vec<(f64, f64)>> {
    let pick: fn(&TraceRecord) -> f64 = match variable {
        "command" => |r: &TraceRecord| r.command,
        "level_pa" | "level" => |r: &TraceRecord| r.level_pa,
        "input" => |r: &TraceRecord| r.input,
        "cycle_index" | "cycle" => |r: &TraceRecord| f64::from(r.cycle_index),
        "current_step_pa" | "step" => |r: &TraceRecord| r.current_step_pa,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unknown trace variable: {}",
                variable
            )));
        }
    };

    Ok(records.iter().map(|r| (r.time_s, pick(r))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: usize, level_pa: f64, cycle_index: u32) -> TraceRecord {
        TraceRecord {
            step,
            time_s: step as f64 * 0.001,
            input: 0.0,
            command: level_pa * 0.5e-3,
            level_pa,
            cycle_index,
            current_step_pa: 0.0,
            paused: false,
            done: false,
        }
    }

    #[test]
    fn summary_collapses_repeated_levels() {
        let mut records = vec![
            record(0, -20.0, 0),
            record(1, -20.0, 0),
            record(2, 0.0, 0),
            record(3, 20.0, 0),
            record(4, 20.0, 1),
        ];
        records[4].done = true;

        let summary = get_run_summary(&records).unwrap();
        assert_eq!(summary.record_count, 5);
        assert_eq!(summary.distinct_levels_pa, vec![-20.0, 20.0]);
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(summary.done_at_s, Some(0.004));
        assert_eq!(summary.peak_command, records[0].command);
        assert_eq!(summary.paused_samples, 0);
    }

    #[test]
    fn empty_run_is_rejected() {
        assert!(get_run_summary(&[]).is_err());
    }

    #[test]
    fn series_by_alias() {
        let records = vec![record(0, 10.0, 0), record(1, 30.0, 0)];
        let series = extract_series(&records, "level").unwrap();
        assert_eq!(series, vec![(0.0, 10.0), (0.001, 30.0)]);
        assert_eq!(
            extract_series(&records, "cycle").unwrap(),
            vec![(0.0, 0.0), (0.001, 0.0)]
        );
        assert!(extract_series(&records, "pressure").is_err());
    }
}
