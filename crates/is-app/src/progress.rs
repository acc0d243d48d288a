#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingProtocol,
    CheckingCache,
    LoadingCachedResult,
    Simulating,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoadingProtocol => "loading protocol",
            Self::CheckingCache => "checking cache",
            Self::LoadingCachedResult => "loading cached run",
            Self::Simulating => "simulating",
            Self::SavingResults => "saving results",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationProgress {
    pub step: usize,
    pub max_steps: usize,
    pub sim_time_s: f64,
    pub cycle_index: u32,
    pub fraction_complete: f64,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub simulation: Option<SimulationProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            simulation: None,
        }
    }
}
