use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::PhaseMonitor;

pub struct DraftEngine<P: Pipeline> {
    pipeline: P,
    monitor: PhaseMonitor,
}

impl<P: Pipeline> DraftEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor: bool) -> Self {
        Self {
            pipeline,
            monitor: PhaseMonitor::new(monitor),
        }
    }

    /// Extract → transform → load. Nothing is written unless every earlier phase succeeded.
    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting draft");

        tracing::info!("📥 Reading roster...");
        let roster = self.pipeline.extract().await?;
        tracing::info!("Read {} players", roster.len());
        self.monitor.finish_phase("extract");

        tracing::info!("🧩 Assigning countries...");
        let result = self.pipeline.transform(roster).await?;
        tracing::info!(
            "Assigned {} players to {} game(s): {} preferred, {} scrap",
            result.assignments.len(),
            result.session_count(),
            result.preferred_count(),
            result.fallback_count()
        );
        self.monitor.finish_phase("transform");

        tracing::info!("💾 Writing results...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.finish_phase("load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
