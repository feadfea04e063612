use fixflow_domain::{DispatchError, RegistryError};
use fixflow_types::report::RunReport;

/// The only error that crosses the orchestrator boundary.
///
/// Everything recoverable (plug-in failures, provider failures for one unit, conflicts)
/// is report data instead. Exit code 1 = fatal tool error, 130 = cancelled.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Projects could not be enumerated or read.
    #[error("load units: {0:#}")]
    UnitSource(anyhow::Error),

    /// The run observed cancellation; the report holds what completed before that.
    #[error("run cancelled")]
    Cancelled { report: Box<RunReport> },
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Cancelled { .. } => 130,
            _ => 1,
        }
    }

    /// Report accumulated before cancellation, if any.
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            PipelineError::Cancelled { report } => Some(report),
            _ => None,
        }
    }
}
