use clap::{Parser, Subcommand};
use is_app::{
    AppResult, RunMode, RunOptions, RunProgressEvent, RunRequest, RunStage, protocol_service,
    query, run_service,
};
use is_project::ProtocolFile;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "istep")]
#[command(about = "istep - Stepped current-injection protocol tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a protocol file with the default I-step parameters
    Init {
        /// Path of the protocol file to create (.yaml or .json)
        protocol_path: PathBuf,
        /// Protocol name
        #[arg(long, default_value = "Default I-step")]
        name: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate protocol file syntax and structure
    Validate {
        /// Path to the protocol file
        protocol_path: PathBuf,
    },
    /// Show entered and effective parameters with the planned ramp
    Params {
        /// Path to the protocol file
        protocol_path: PathBuf,
    },
    /// Run a protocol through the offline host loop
    Run {
        /// Path to the protocol file
        protocol_path: PathBuf,
        /// Run exactly this many host periods
        #[arg(long, conflicts_with = "max_steps")]
        steps: Option<usize>,
        /// Run until done, failing after this many host periods
        #[arg(long, default_value_t = 10_000_000)]
        max_steps: usize,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for a protocol
    Runs {
        /// Path to the protocol file
        protocol_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the protocol file
        protocol_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export one trace variable from a run as CSV
    ExportSeries {
        /// Path to the protocol file
        protocol_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Variable name (command, level_pa, input, cycle_index, current_step_pa)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Validate { .. } => "validate",
            Commands::Params { .. } => "params",
            Commands::Run { .. } => "run",
            Commands::Runs { .. } => "runs",
            Commands::ShowRun { .. } => "show-run",
            Commands::ExportSeries { .. } => "export-series",
        }
    }
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    tracing::debug!(command = cli.command.name(), "dispatching");

    match cli.command {
        Commands::Init {
            protocol_path,
            name,
            force,
        } => cmd_init(&protocol_path, &name, force),
        Commands::Validate { protocol_path } => cmd_validate(&protocol_path),
        Commands::Params { protocol_path } => cmd_params(&protocol_path),
        Commands::Run {
            protocol_path,
            steps,
            max_steps,
            no_cache,
        } => {
            let mode = match steps {
                Some(steps) => RunMode::Steps { steps },
                None => RunMode::UntilDone { max_steps },
            };
            cmd_run(&protocol_path, mode, !no_cache)
        }
        Commands::Runs { protocol_path } => cmd_runs(&protocol_path),
        Commands::ShowRun {
            protocol_path,
            run_id,
        } => cmd_show_run(&protocol_path, &run_id),
        Commands::ExportSeries {
            protocol_path,
            run_id,
            variable,
            output,
        } => cmd_export_series(&protocol_path, &run_id, &variable, output.as_deref()),
    }
}

fn cmd_init(protocol_path: &Path, name: &str, force: bool) -> AppResult<()> {
    if protocol_path.exists() && !force {
        return Err(is_app::AppError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            protocol_path.display()
        )));
    }
    protocol_service::save_protocol(protocol_path, &ProtocolFile::new(name))?;
    println!("✓ Wrote protocol: {}", protocol_path.display());
    Ok(())
}

fn cmd_validate(protocol_path: &Path) -> AppResult<()> {
    println!("Validating protocol: {}", protocol_path.display());
    let file = protocol_service::load_protocol(protocol_path)?;
    protocol_service::validate_protocol(&file)?;

    let summary = protocol_service::summarize_protocol(&file);
    for adjustment in &summary.adjustments {
        println!("  ! {}", adjustment);
    }
    println!("✓ Protocol is valid");
    Ok(())
}

fn cmd_params(protocol_path: &Path) -> AppResult<()> {
    let file = protocol_service::load_protocol(protocol_path)?;
    let summary = protocol_service::summarize_protocol(&file);

    println!("Protocol: {}", summary.name);
    println!("  Host period: {} ms", summary.period_ms);
    println!("\nParameters:");
    for param in &summary.parameters {
        let marker = if param.adjusted() { "*" } else { " " };
        println!(
            " {} {:<26} {:>12}  (entered {})",
            marker,
            param.id.name(),
            param.effective,
            param.entered
        );
    }
    for adjustment in &summary.adjustments {
        println!("  * {}", adjustment);
    }

    println!(
        "\nRamp ({} steps per cycle):",
        summary.first_cycle_levels_pa.len()
    );
    let later = &summary.later_cycle_levels_pa;
    if later.is_empty() || *later == summary.first_cycle_levels_pa {
        println!("  {} pA", format_levels(&summary.first_cycle_levels_pa));
    } else {
        println!(
            "  first cycle:  {} pA",
            format_levels(&summary.first_cycle_levels_pa)
        );
        println!("  later cycles: {} pA", format_levels(later));
    }
    println!("  Cycles: {}", summary.cycles);
    println!(
        "  Nominal duration: {:.3} s",
        summary.nominal_total_duration_s
    );
    Ok(())
}

fn format_levels(levels: &[f64]) -> String {
    levels
        .iter()
        .map(|l| format!("{}", l))
        .collect::<Vec<_>>()
        .join(", ")
}

fn cmd_run(protocol_path: &Path, mode: RunMode, use_cache: bool) -> AppResult<()> {
    println!("Running protocol: {}", protocol_path.display());

    let request = RunRequest {
        protocol_path,
        mode,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    tracing::info!(
        run_id = %response.run_id,
        cached = response.loaded_from_cache,
        steps = response.timing.steps,
        "run ready"
    );
    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Run completed: {}", response.run_id);
    }

    print_timing_summary(&response.timing);

    let (_manifest, records) = run_service::load_run(protocol_path, &response.run_id)?;
    print_run_summary(&records)?;
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, &event.simulation) {
        (RunStage::Simulating, Some(sim)) => {
            let width = 28usize;
            let filled = ((sim.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.3}s  step={}/{}  cycle={}  elapsed={:.1}s",
                bar,
                sim.fraction_complete * 100.0,
                sim.sim_time_s,
                sim.step,
                sim.max_steps,
                sim.cycle_index,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn print_timing_summary(timing: &is_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);

    println!("\nTiming summary:");
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    } else {
        println!(
            "  Simulate: {:.3}s ({:.1}%)",
            timing.simulate_time_s,
            100.0 * timing.simulate_time_s / total
        );
        println!(
            "  Save:     {:.3}s ({:.1}%)",
            timing.save_time_s,
            100.0 * timing.save_time_s / total
        );
    }
    println!("  Total:    {:.3}s", timing.total_time_s);
    println!("  Periods:  {}", timing.steps);
}

fn print_run_summary(records: &[is_app::TraceRecord]) -> AppResult<()> {
    let summary = query::get_run_summary(records)?;
    println!("  Samples: {}", summary.record_count);
    println!(
        "  Time range: {:.4} - {:.4} s",
        summary.time_range.0, summary.time_range.1
    );
    println!("  Cycles completed: {}", summary.cycles_completed);
    match summary.done_at_s {
        Some(t) => println!("  Done at: {:.4} s", t),
        None => println!("  Done at: (still running)"),
    }
    if summary.paused_samples > 0 {
        println!("  Paused samples: {}", summary.paused_samples);
    }
    println!("  Peak command: {}", summary.peak_command);
    println!(
        "  Levels: {} pA",
        format_levels(&summary.distinct_levels_pa)
    );
    Ok(())
}

fn cmd_runs(protocol_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(protocol_path)?;

    if runs.is_empty() {
        println!("No cached runs found for: {}", protocol_path.display());
    } else {
        println!("Cached runs for '{}':", protocol_path.display());
        for manifest in runs {
            println!(
                "  {} ({}, {} samples)",
                manifest.run_id, manifest.timestamp, manifest.samples
            );
        }
    }
    Ok(())
}

fn cmd_show_run(protocol_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(protocol_path, run_id)?;

    println!("\nRun Summary:");
    println!("  Protocol: {}", manifest.protocol_name);
    println!("  Recorded: {}", manifest.timestamp);
    println!("  Host period: {} ms", manifest.period_ms);
    println!("  Generator: {}", manifest.generator_version);
    print_run_summary(&records)
}

fn cmd_export_series(
    protocol_path: &Path,
    run_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = run_service::load_run(protocol_path, run_id)?;
    let series = query::extract_series(&records, variable)?;

    // Build CSV
    let mut csv = String::from("time_s,value\n");
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    // Write to file or stdout
    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
