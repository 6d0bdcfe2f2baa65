use crate::core::compatibility::{CompatibilityReport, CompatibilityResolver};
use crate::core::interpreter::SolutionInterpreter;
use crate::core::model_builder::{AssignmentModel, ModelBuilder};
use crate::core::roster::{apply_forced_roles, warn_unranked_roles, RosterReader};
use crate::core::sizing::{SessionPlan, SessionPlanner};
use crate::core::solver::{solve_with_limit, GoodLpSolver};
use crate::core::{ConfigProvider, DraftResult, Pipeline, Roster, Solver, Storage};
use crate::domain::model::Role;
use crate::utils::error::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Roster after resolution, padding and shuffling, with the model built from it.
pub struct PreparedDraft {
    pub roster: Roster,
    pub plan: SessionPlan,
    pub model: Arc<AssignmentModel>,
    pub compatibility: CompatibilityReport,
    pub fillers: usize,
}

pub struct DraftPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    solver: Arc<dyn Solver>,
}

impl<S: Storage, C: ConfigProvider> DraftPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self::with_solver(storage, config, Arc::new(GoodLpSolver))
    }

    pub fn with_solver(storage: S, config: C, solver: Arc<dyn Solver>) -> Self {
        Self {
            storage,
            config,
            solver,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Everything up to (not including) the solve. Also backs `--dry-run`.
    pub fn prepare(&self, mut roster: Roster) -> Result<PreparedDraft> {
        let compatibility = CompatibilityResolver::resolve(&mut roster)?;

        let planner = SessionPlanner::new(Role::COUNT);
        let fillers = planner.pad_roster(&mut roster)?;
        let plan = planner.plan(&roster)?;

        // 打亂順序，避免名冊前面的玩家佔便宜
        let mut rng = match self.config.seed() {
            Some(seed) => {
                tracing::debug!("Shuffling players with seed {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        roster.reorder_with(|participants| participants.shuffle(&mut rng));

        let model = ModelBuilder::assemble(&roster, plan, self.config.pairing_weight());

        Ok(PreparedDraft {
            roster,
            plan,
            model: Arc::new(model),
            compatibility,
            fillers,
        })
    }

    fn assignments_csv(result: &DraftResult) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for assignment in &result.assignments {
            writer.write_record([
                assignment.participant.clone(),
                assignment.session.to_string(),
                assignment.role.name().to_string(),
                assignment.weight.map(|w| w.to_string()).unwrap_or_default(),
            ])?;
        }
        into_bytes(writer)
    }

    fn per_session_csv<F>(result: &DraftResult, row: F) -> Result<Vec<u8>>
    where
        F: Fn(&crate::domain::model::SessionFallbacks) -> Vec<String>,
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        for entry in &result.fallbacks {
            writer.write_record(row(entry))?;
        }
        into_bytes(writer)
    }

    fn summary_json(result: &DraftResult) -> Result<Vec<u8>> {
        let summary = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "games": result.session_count(),
            "session_tiers": result.session_tiers,
            "objective": result.objective,
            "preferred": result.preferred_count(),
            "scrap": result.fallback_count(),
            "merged_groups": result.merged_groups,
            "fallbacks": result.fallbacks,
        });
        Ok(serde_json::to_vec_pretty(&summary)?)
    }

    fn output_file(&self, name: &str) -> String {
        format!("{}/{}", self.config.output_path(), name)
    }

    /// 先寫到暫存檔，全部成功後才改名，避免留下只寫了一半的結果
    async fn write_all(&self, files: &[(&str, &[u8])]) -> Result<()> {
        let mut staged: Vec<(String, String)> = Vec::with_capacity(files.len());
        for (name, data) in files {
            let target = self.output_file(name);
            let temp = format!("{}.tmp", target);
            tracing::debug!("Writing {} ({} bytes)", temp, data.len());
            if let Err(e) = self.storage.write_file(&temp, data).await {
                self.discard(&staged).await;
                return Err(e);
            }
            staged.push((temp, target));
        }

        for (temp, target) in &staged {
            self.storage.rename_file(temp, target).await?;
        }
        Ok(())
    }

    async fn discard(&self, staged: &[(String, String)]) {
        for (temp, _) in staged {
            if let Err(e) = self.storage.remove_file(temp).await {
                tracing::warn!("⚠️ Could not remove {}: {}", temp, e);
            }
        }
    }
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| crate::utils::error::DraftError::IoError(e.into_error()))
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for DraftPipeline<S, C> {
    async fn extract(&self) -> Result<Roster> {
        tracing::debug!("Reading roster from {}", self.config.input_path());
        let data = self.storage.read_file(self.config.input_path()).await?;

        let columns = self.config.columns();
        let mut roster = RosterReader::new(&columns).parse(&data)?;
        apply_forced_roles(&mut roster, self.config.forced_roles())?;
        warn_unranked_roles(&roster);
        Ok(roster)
    }

    async fn transform(&self, roster: Roster) -> Result<DraftResult> {
        let prepared = self.prepare(roster)?;
        if prepared.fillers > 0 {
            tracing::info!("🧍 {} dummy player(s) added", prepared.fillers);
        }

        let outcome = solve_with_limit(
            self.solver.clone(),
            prepared.model.clone(),
            self.config.time_limit(),
        )
        .await?;

        let interpretation =
            SolutionInterpreter::new(&prepared.roster, prepared.model.layout()).interpret(&outcome)?;

        Ok(DraftResult {
            session_tiers: prepared.plan.session_tiers(),
            assignments: interpretation.assignments,
            fallbacks: interpretation.fallbacks,
            objective: outcome.objective,
            merged_groups: prepared.compatibility.group_names(),
        })
    }

    async fn load(&self, result: DraftResult) -> Result<String> {
        let names = self.config.output_filenames();

        // 先全部序列化，任何一個失敗就不寫檔
        let assignments = Self::assignments_csv(&result)?;
        let scrap_countries = Self::per_session_csv(&result, |entry| {
            entry.roles.iter().map(|r| r.name().to_string()).collect()
        })?;
        let unassigned = Self::per_session_csv(&result, |entry| entry.participants.clone())?;
        let summary = match &names.summary {
            Some(_) => Some(Self::summary_json(&result)?),
            None => None,
        };

        let mut files: Vec<(&str, &[u8])> = vec![
            (names.assignments.as_str(), assignments.as_slice()),
            (names.scrap_countries.as_str(), scrap_countries.as_slice()),
            (names.unassigned_players.as_str(), unassigned.as_slice()),
        ];
        if let (Some(name), Some(summary)) = (&names.summary, &summary) {
            files.push((name.as_str(), summary.as_slice()));
        }
        self.write_all(&files).await?;

        tracing::info!("📦 Draft written to {}", self.config.output_path());
        Ok(self.config.output_path().to_string())
    }
}
