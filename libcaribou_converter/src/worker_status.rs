/// The stage a conversion worker is in, used by front ends to style progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerStage {
    #[default]
    Starting,
    Converting,
    Finished,
}

/// Progress report sent from a conversion worker to whoever is watching it
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub events_processed: u64,
    pub stage: WorkerStage,
}

impl WorkerStatus {
    pub fn new(progress: f32, events_processed: u64, stage: WorkerStage) -> Self {
        Self {
            progress,
            events_processed,
            stage,
        }
    }
}
