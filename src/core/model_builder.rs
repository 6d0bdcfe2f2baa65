use crate::core::sizing::SessionPlan;
use crate::domain::model::{normalize_key, Role, Roster};
use serde::Serialize;
use std::collections::BTreeSet;

/// Objective coefficient on each play-with auxiliary variable.
pub const DEFAULT_PAIRING_WEIGHT: f64 = 10_000.0;

/// Flat variable space: participant slowest, then role, then session fastest,
/// followed by two auxiliary variables per (play-with pair, session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableLayout {
    pub participants: usize,
    pub roles: usize,
    pub sessions: usize,
    pub pairs: usize,
}

impl VariableLayout {
    pub fn assignment_count(&self) -> usize {
        self.participants * self.roles * self.sessions
    }

    pub fn total(&self) -> usize {
        self.assignment_count() + 2 * self.pairs * self.sessions
    }

    pub fn index(&self, participant: usize, role: usize, session: usize) -> usize {
        (participant * self.roles + role) * self.sessions + session
    }

    /// Inverse of [`VariableLayout::index`]; `None` for auxiliary or out-of-range indices.
    pub fn decode(&self, index: usize) -> Option<(usize, usize, usize)> {
        if index >= self.assignment_count() {
            return None;
        }
        let per_participant = self.roles * self.sessions;
        Some((
            index / per_participant,
            (index % per_participant) / self.sessions,
            index % self.sessions,
        ))
    }

    pub fn pairing_index(&self, pair: usize, session: usize, direction: usize) -> usize {
        self.assignment_count() + (pair * self.sessions + session) * 2 + direction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConstraintFamily {
    RoleExclusivity,
    Placement,
    Exclusion,
    Pairing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowKind {
    Equal,
    AtMost,
}

/// Sparse linear row: Σ coefficient·x[index] (= | ≤) rhs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintRow {
    pub family: ConstraintFamily,
    pub terms: Vec<(usize, f64)>,
    pub kind: RowKind,
    pub rhs: f64,
}

impl ConstraintRow {
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs: f64 = self
            .terms
            .iter()
            .map(|(index, coefficient)| coefficient * values.get(*index).copied().unwrap_or(0.0))
            .sum();
        match self.kind {
            RowKind::Equal => (lhs - self.rhs).abs() < 1e-6,
            RowKind::AtMost => lhs <= self.rhs + 1e-6,
        }
    }
}

/// 建好之後不再變動的整數規劃模型，交給求解器使用
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentModel {
    layout: VariableLayout,
    costs: Vec<f64>,
    upper_bounds: Vec<f64>,
    rows: Vec<ConstraintRow>,
    pairs: Vec<(usize, usize)>,
}

impl AssignmentModel {
    pub fn layout(&self) -> VariableLayout {
        self.layout
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// 0 for variables fixed off by tier eligibility, 1 otherwise.
    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn rows_in(&self, family: ConstraintFamily) -> usize {
        self.rows.iter().filter(|row| row.family == family).count()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.costs.iter().zip(values).map(|(c, v)| c * v).sum()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "🧮 Model: {} variables, {} rows ({} exclusivity, {} placement, {} exclusion, {} pairing)",
            self.layout.total(),
            self.rows.len(),
            self.rows_in(ConstraintFamily::RoleExclusivity),
            self.rows_in(ConstraintFamily::Placement),
            self.rows_in(ConstraintFamily::Exclusion),
            self.rows_in(ConstraintFamily::Pairing)
        );
    }
}

pub struct ModelBuilder<'a> {
    roster: &'a Roster,
    plan: SessionPlan,
    layout: VariableLayout,
    pairing_weight: f64,
    pairs: Vec<(usize, usize)>,
    costs: Vec<f64>,
    upper_bounds: Vec<f64>,
    rows: Vec<ConstraintRow>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(roster: &'a Roster, plan: SessionPlan) -> Self {
        let pairs: Vec<(usize, usize)> = roster
            .iter()
            .enumerate()
            .filter_map(|(slot, p)| {
                let partner = roster.position(p.play_with.as_deref()?)?;
                (partner != slot).then_some((slot, partner))
            })
            .collect();

        let layout = VariableLayout {
            participants: roster.len(),
            roles: Role::COUNT,
            sessions: plan.session_count(),
            pairs: pairs.len(),
        };

        let mut costs = vec![0.0; layout.total()];
        for (slot, participant) in roster.iter().enumerate() {
            for role in Role::ALL {
                let weight = f64::from(participant.weight_for(role).value());
                for session in 0..layout.sessions {
                    costs[layout.index(slot, role.index(), session)] = weight;
                }
            }
        }

        let mut builder = Self {
            roster,
            plan,
            layout,
            pairing_weight: DEFAULT_PAIRING_WEIGHT,
            pairs,
            costs,
            upper_bounds: vec![1.0; layout.total()],
            rows: Vec::new(),
        };
        builder.price_pairing_variables();
        builder
    }

    pub fn with_pairing_weight(mut self, weight: f64) -> Self {
        self.pairing_weight = weight;
        self.price_pairing_variables();
        self
    }

    fn price_pairing_variables(&mut self) {
        for pair in 0..self.layout.pairs {
            for session in 0..self.layout.sessions {
                for direction in 0..2 {
                    self.costs[self.layout.pairing_index(pair, session, direction)] =
                        self.pairing_weight;
                }
            }
        }
    }

    /// Σ over roles of x[participant, role, session], scaled.
    fn presence(
        &self,
        participant: usize,
        session: usize,
        coefficient: f64,
    ) -> impl Iterator<Item = (usize, f64)> {
        let layout = self.layout;
        (0..layout.roles).map(move |role| (layout.index(participant, role, session), coefficient))
    }

    /// Every (role, session) slot has exactly one occupant.
    pub fn add_role_exclusivity(&mut self) -> &mut Self {
        for role in 0..self.layout.roles {
            for session in 0..self.layout.sessions {
                let terms = (0..self.layout.participants)
                    .map(|p| (self.layout.index(p, role, session), 1.0))
                    .collect();
                self.rows.push(ConstraintRow {
                    family: ConstraintFamily::RoleExclusivity,
                    terms,
                    kind: RowKind::Equal,
                    rhs: 1.0,
                });
            }
        }
        self
    }

    /// One row per participant: exactly one role in one eligible session.
    /// Ineligible sessions are left out of the row and bounded to zero.
    pub fn add_placement(&mut self) -> &mut Self {
        let roster = self.roster;
        for (slot, participant) in roster.iter().enumerate() {
            let eligible = self.plan.eligibility(participant.tiers);
            let mut terms = Vec::new();
            for role in 0..self.layout.roles {
                for (session, allowed) in eligible.iter().enumerate() {
                    let index = self.layout.index(slot, role, session);
                    if *allowed {
                        terms.push((index, 1.0));
                    } else {
                        self.upper_bounds[index] = 0.0;
                    }
                }
            }
            if terms.is_empty() {
                tracing::warn!(
                    "⚠️ {} ({}) has no eligible game; the model will be infeasible",
                    participant.username,
                    participant.tiers
                );
            }
            self.rows.push(ConstraintRow {
                family: ConstraintFamily::Placement,
                terms,
                kind: RowKind::Equal,
                rhs: 1.0,
            });
        }
        self
    }

    /// Refused pairs never share a session. Names must resolve exactly (ignoring case).
    pub fn add_exclusions(&mut self) -> &mut Self {
        let roster = self.roster;
        let mut pairs = BTreeSet::new();
        for (slot, participant) in roster.iter().enumerate() {
            for name in &participant.play_without {
                match roster.position(name) {
                    Some(other) if other != slot => {
                        pairs.insert((slot.min(other), slot.max(other)));
                    }
                    Some(_) => {}
                    None => tracing::debug!(
                        "No exclusion for {} -> {}: not in roster",
                        participant.username,
                        normalize_key(name)
                    ),
                }
            }
        }

        for (a, b) in pairs {
            for session in 0..self.layout.sessions {
                let terms = self
                    .presence(a, session, 1.0)
                    .chain(self.presence(b, session, 1.0))
                    .collect();
                self.rows.push(ConstraintRow {
                    family: ConstraintFamily::Exclusion,
                    terms,
                    kind: RowKind::AtMost,
                    rhs: 1.0,
                });
            }
        }
        self
    }

    /// Soft pairing: each auxiliary variable must cover the presence difference
    /// in one direction, so splitting a pair across sessions costs the pairing weight.
    pub fn add_pairing_bonus(&mut self) -> &mut Self {
        for (pair, (a, b)) in self.pairs.clone().into_iter().enumerate() {
            for session in 0..self.layout.sessions {
                for (direction, (plus, minus)) in [(a, b), (b, a)].into_iter().enumerate() {
                    let mut terms: Vec<(usize, f64)> = self
                        .presence(plus, session, 1.0)
                        .chain(self.presence(minus, session, -1.0))
                        .collect();
                    terms.push((self.layout.pairing_index(pair, session, direction), -1.0));
                    self.rows.push(ConstraintRow {
                        family: ConstraintFamily::Pairing,
                        terms,
                        kind: RowKind::AtMost,
                        rhs: 0.0,
                    });
                }
            }
        }
        self
    }

    pub fn build(self) -> AssignmentModel {
        AssignmentModel {
            layout: self.layout,
            costs: self.costs,
            upper_bounds: self.upper_bounds,
            rows: self.rows,
            pairs: self.pairs,
        }
    }

    /// All four constraint families, in the usual order.
    pub fn assemble(roster: &'a Roster, plan: SessionPlan, pairing_weight: f64) -> AssignmentModel {
        let mut builder = ModelBuilder::new(roster, plan).with_pairing_weight(pairing_weight);
        builder
            .add_role_exclusivity()
            .add_placement()
            .add_exclusions()
            .add_pairing_bonus();
        let model = builder.build();
        model.log_summary();
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Participant, PreferenceWeight, TierSet};

    fn roster(n: usize) -> Roster {
        (0..n).map(|i| Participant::new(format!("p{}", i))).collect()
    }

    fn two_game_plan() -> SessionPlan {
        SessionPlan {
            mixed: 2,
            ..SessionPlan::default()
        }
    }

    #[test]
    fn test_layout_round_trip() {
        let layout = VariableLayout {
            participants: 50,
            roles: 25,
            sessions: 2,
            pairs: 3,
        };
        for index in [0, 1, 2, 49, 50, 1337, layout.assignment_count() - 1] {
            let (p, r, s) = layout.decode(index).unwrap();
            assert_eq!(layout.index(p, r, s), index);
        }
        assert_eq!(layout.decode(layout.assignment_count()), None);
        assert_eq!(layout.index(1, 0, 1), 51);
        assert_eq!(layout.total(), 2500 + 12);
        assert_eq!(layout.pairing_index(2, 1, 1), 2500 + 11);
    }

    #[test]
    fn test_costs_follow_preferences() {
        let mut roster = roster(50);
        {
            let p = roster.get_mut("p3").unwrap();
            p.preferences.insert(Role::Spain, PreferenceWeight::FirstPick);
            p.fallback_weight = PreferenceWeight::SecondPick;
        }
        let model = ModelBuilder::new(&roster, two_game_plan()).build();
        let layout = model.layout();

        assert_eq!(model.costs()[layout.index(3, Role::Spain.index(), 1)], 1.0);
        assert_eq!(model.costs()[layout.index(3, Role::Mali.index(), 0)], 3.0);
        assert_eq!(model.costs().len(), layout.total());
    }

    #[test]
    fn test_row_counts_per_family() {
        let mut roster = roster(50);
        roster.get_mut("p0").unwrap().play_without = vec!["P1".to_string(), "ghost".to_string()];
        roster.get_mut("p1").unwrap().play_without = vec!["p0".to_string()];
        roster.get_mut("p2").unwrap().play_with = Some("p3".to_string());
        roster.get_mut("p4").unwrap().play_with = Some("nobody".to_string());

        let model = ModelBuilder::assemble(&roster, two_game_plan(), DEFAULT_PAIRING_WEIGHT);

        assert_eq!(model.rows_in(ConstraintFamily::RoleExclusivity), 25 * 2);
        assert_eq!(model.rows_in(ConstraintFamily::Placement), 50);
        // p0/p1 deduplicated, one row per session
        assert_eq!(model.rows_in(ConstraintFamily::Exclusion), 2);
        assert_eq!(model.rows_in(ConstraintFamily::Pairing), 4);
        assert_eq!(model.pairs(), &[(2, 3)]);
        assert_eq!(model.layout().total(), 2500 + 4);
    }

    #[test]
    fn test_pairing_rows_link_auxiliary_variables() {
        let mut roster = roster(25);
        roster.get_mut("p0").unwrap().play_with = Some("p1".to_string());
        let plan = SessionPlan {
            mixed: 1,
            ..SessionPlan::default()
        };
        let model = ModelBuilder::assemble(&roster, plan, 500.0);
        let layout = model.layout();
        let aux = layout.pairing_index(0, 0, 0);
        assert_eq!(model.costs()[aux], 500.0);

        let pairing: Vec<&ConstraintRow> = model
            .rows()
            .iter()
            .filter(|r| r.family == ConstraintFamily::Pairing)
            .collect();
        assert_eq!(pairing.len(), 2);
        assert_eq!(pairing[0].terms.len(), 2 * Role::COUNT + 1);
        assert!(pairing[0].terms.contains(&(layout.index(0, 0, 0), 1.0)));
        assert!(pairing[0].terms.contains(&(layout.index(1, 0, 0), -1.0)));
        assert!(pairing[0].terms.contains(&(aux, -1.0)));
        assert!(pairing[1].terms.contains(&(layout.index(0, 0, 0), -1.0)));
    }

    #[test]
    fn test_placement_bounds_ineligible_sessions() {
        let mut roster = roster(50);
        roster.get_mut("p0").unwrap().tiers = TierSet::BEGINNER;
        roster.get_mut("p1").unwrap().tiers = TierSet::EXPERIENCED;
        let plan = SessionPlan {
            beginner: 1,
            experienced: 1,
            ..SessionPlan::default()
        };
        let model = ModelBuilder::assemble(&roster, plan, DEFAULT_PAIRING_WEIGHT);
        let layout = model.layout();

        for role in 0..Role::COUNT {
            assert_eq!(model.upper_bounds()[layout.index(0, role, 0)], 1.0);
            assert_eq!(model.upper_bounds()[layout.index(0, role, 1)], 0.0);
            assert_eq!(model.upper_bounds()[layout.index(1, role, 0)], 0.0);
            assert_eq!(model.upper_bounds()[layout.index(1, role, 1)], 1.0);
            assert_eq!(model.upper_bounds()[layout.index(2, role, 1)], 1.0);
        }

        let placement = model
            .rows()
            .iter()
            .find(|r| r.family == ConstraintFamily::Placement)
            .unwrap();
        assert_eq!(placement.terms.len(), Role::COUNT);
    }

    #[test]
    fn test_row_satisfaction_check() {
        let row = ConstraintRow {
            family: ConstraintFamily::Exclusion,
            terms: vec![(0, 1.0), (1, 1.0)],
            kind: RowKind::AtMost,
            rhs: 1.0,
        };
        assert!(row.is_satisfied(&[1.0, 0.0]));
        assert!(!row.is_satisfied(&[1.0, 1.0]));
    }
}
