use crate::core::model_builder::{AssignmentModel, ConstraintRow, RowKind};
use crate::utils::error::{DraftError, Result};
use good_lp::{constraint, microlp, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    /// One value per model variable, in layout order.
    pub values: Vec<f64>,
    pub objective: f64,
}

impl SolverOutcome {
    /// Rows the returned vector does not satisfy.
    pub fn violated_rows<'m>(&self, model: &'m AssignmentModel) -> Vec<&'m ConstraintRow> {
        model
            .rows()
            .iter()
            .filter(|row| !row.is_satisfied(&self.values))
            .collect()
    }
}

/// Boundary to the integer-programming capability. Implementations must
/// return a 0/1 vector aligned with the model's variable layout, or fail.
pub trait Solver: Send + Sync {
    fn solve(&self, model: &AssignmentModel) -> Result<SolverOutcome>;
}

/// 以 good_lp 的 microlp 後端求解 0/1 整數規劃
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    fn expression(row: &ConstraintRow, vars: &[Variable]) -> Expression {
        let mut expression = Expression::with_capacity(row.terms.len());
        for (index, coefficient) in &row.terms {
            expression.add_mul(*coefficient, vars[*index]);
        }
        expression
    }
}

impl Solver for GoodLpSolver {
    fn solve(&self, model: &AssignmentModel) -> Result<SolverOutcome> {
        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = model
            .upper_bounds()
            .iter()
            .map(|upper| problem.add(variable().binary().max(*upper)))
            .collect();

        let mut objective = Expression::with_capacity(vars.len());
        for (var, cost) in vars.iter().zip(model.costs()) {
            if *cost != 0.0 {
                objective.add_mul(*cost, *var);
            }
        }

        tracing::debug!(
            "Handing {} variables and {} rows to microlp",
            vars.len(),
            model.rows().len()
        );
        let mut lp = problem.minimise(objective).using(microlp);
        for row in model.rows() {
            let lhs = Self::expression(row, &vars);
            let built = match row.kind {
                RowKind::Equal => constraint::eq(lhs, row.rhs),
                RowKind::AtMost => constraint::leq(lhs, row.rhs),
            };
            lp.add_constraint(built);
        }

        let solution = lp.solve().map_err(|e| DraftError::SolverFailed {
            message: e.to_string(),
        })?;

        // every variable is binary; strip solver noise
        let values: Vec<f64> = vars.iter().map(|var| solution.value(*var).round()).collect();
        let objective = model.objective_value(&values);
        tracing::info!("✅ Optimal assignment found (objective {})", objective);
        Ok(SolverOutcome { values, objective })
    }
}

/// Runs the blocking solve off the async executor, bounded by `limit` when set.
///
/// On timeout the worker thread is abandoned; callers are expected to exit.
pub async fn solve_with_limit(
    solver: Arc<dyn Solver>,
    model: Arc<AssignmentModel>,
    limit: Option<Duration>,
) -> Result<SolverOutcome> {
    let task = tokio::task::spawn_blocking(move || solver.solve(&model));

    let joined = match limit {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| DraftError::SolverTimeout {
                seconds: limit.as_secs(),
            })?,
        None => task.await,
    };

    joined.map_err(|e| DraftError::InternalError {
        message: format!("solver task failed: {}", e),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model_builder::{ModelBuilder, DEFAULT_PAIRING_WEIGHT};
    use crate::core::sizing::SessionPlan;
    use crate::domain::model::{Participant, PreferenceWeight, Role, Roster, TierSet};

    fn one_game() -> SessionPlan {
        SessionPlan {
            mixed: 1,
            ..SessionPlan::default()
        }
    }

    fn distinct_roster() -> Roster {
        Role::ALL
            .iter()
            .enumerate()
            .map(|(i, role)| {
                let mut p = Participant::new(format!("p{}", i));
                p.preferences.insert(*role, PreferenceWeight::FirstPick);
                p.fallback_weight = PreferenceWeight::SecondPick;
                p
            })
            .collect()
    }

    struct SlowSolver;

    impl Solver for SlowSolver {
        fn solve(&self, _model: &AssignmentModel) -> Result<SolverOutcome> {
            std::thread::sleep(Duration::from_millis(500));
            Err(DraftError::InternalError {
                message: "should have timed out".to_string(),
            })
        }
    }

    #[test]
    fn test_single_game_gives_everyone_first_pick() {
        let roster = distinct_roster();
        let model = ModelBuilder::assemble(&roster, one_game(), DEFAULT_PAIRING_WEIGHT);

        let outcome = GoodLpSolver.solve(&model).unwrap();

        assert!(outcome.violated_rows(&model).is_empty());
        assert_eq!(outcome.objective, 25.0);
    }

    #[test]
    fn test_infeasible_model_reports_solver_message() {
        // Two beginners who refuse each other, but only one beginner game exists
        let mut roster = distinct_roster();
        roster.get_mut("p0").unwrap().tiers = TierSet::BEGINNER;
        roster.get_mut("p1").unwrap().tiers = TierSet::BEGINNER;
        roster.get_mut("p0").unwrap().play_without = vec!["p1".to_string()];
        let plan = SessionPlan {
            beginner: 1,
            ..SessionPlan::default()
        };
        let model = ModelBuilder::assemble(&roster, plan, DEFAULT_PAIRING_WEIGHT);

        let err = GoodLpSolver.solve(&model).unwrap_err();
        match err {
            DraftError::SolverFailed { message } => assert!(!message.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_solve_with_limit_times_out() {
        let roster = distinct_roster();
        let model = Arc::new(ModelBuilder::assemble(&roster, one_game(), DEFAULT_PAIRING_WEIGHT));

        let err = solve_with_limit(Arc::new(SlowSolver), model, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::SolverTimeout { .. }));
    }

    #[tokio::test]
    async fn test_solve_with_limit_passes_result_through() {
        let roster = distinct_roster();
        let model = Arc::new(ModelBuilder::assemble(&roster, one_game(), DEFAULT_PAIRING_WEIGHT));

        let outcome = solve_with_limit(Arc::new(GoodLpSolver), model.clone(), None)
            .await
            .unwrap();
        assert_eq!(outcome.values.len(), model.layout().total());
    }
}
