use std::fmt;

/// Stages reported while an ablation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AblationProgressStage {
    GroupEvaluation,
}

impl AblationProgressStage {
    pub fn describe(self) -> &'static str {
        match self {
            Self::GroupEvaluation => "feature-group ablation",
        }
    }
}

impl fmt::Display for AblationProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Observer for reporting progress across feature groups.
///
/// Groups are evaluated on the rayon pool, so notifications arrive from worker threads
/// and in completion order rather than registry order.
pub trait AblationProgressObserver: Sync {
    fn on_stage_start(&self, stage: AblationProgressStage, total_groups: usize) {
        let _ = (stage, total_groups);
    }
    fn on_group_finish(&self, stage: AblationProgressStage, group: &str) {
        let _ = (stage, group);
    }
    fn on_stage_finish(&self, stage: AblationProgressStage) {
        let _ = stage;
    }
}

#[derive(Default)]
pub struct NoopAblationProgress;

impl AblationProgressObserver for NoopAblationProgress {}
