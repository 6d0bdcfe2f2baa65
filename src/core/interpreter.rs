use crate::core::model_builder::VariableLayout;
use crate::core::solver::SolverOutcome;
use crate::domain::model::{Assignment, Role, Roster, SessionFallbacks};
use crate::utils::error::{DraftError, Result};

#[derive(Debug, Clone)]
pub struct Interpretation {
    pub assignments: Vec<Assignment>,
    pub fallbacks: Vec<SessionFallbacks>,
}

/// Turns the flat 0/1 vector back into who plays what, where.
pub struct SolutionInterpreter<'a> {
    roster: &'a Roster,
    layout: VariableLayout,
}

impl<'a> SolutionInterpreter<'a> {
    pub fn new(roster: &'a Roster, layout: VariableLayout) -> Self {
        Self { roster, layout }
    }

    pub fn interpret(&self, outcome: &SolverOutcome) -> Result<Interpretation> {
        let layout = self.layout;
        let mut placed: Vec<Option<Assignment>> = vec![None; layout.participants];
        let mut occupied = vec![false; layout.roles * layout.sessions];

        for (index, value) in outcome.values.iter().enumerate().take(layout.assignment_count()) {
            if *value < 0.5 {
                continue;
            }
            let (slot, role_index, session) = layout
                .decode(index)
                .ok_or_else(|| internal(format!("variable {} outside the assignment block", index)))?;
            let role = Role::from_index(role_index)
                .ok_or_else(|| internal(format!("role index {} out of range", role_index)))?;
            let participant = &self.roster.participants()[slot];

            let seat = role_index * layout.sessions + session;
            if std::mem::replace(&mut occupied[seat], true) {
                return Err(internal(format!("{} in game {} has two occupants", role, session)));
            }
            if placed[slot].is_some() {
                return Err(internal(format!("{} was placed twice", participant.username)));
            }

            placed[slot] = Some(Assignment {
                participant: participant.username.clone(),
                session,
                role,
                weight: participant.ranked_weight(role).map(|w| w.value()),
                filler: participant.filler,
            });
        }

        let mut assignments = Vec::with_capacity(placed.len());
        for (slot, assignment) in placed.into_iter().enumerate() {
            match assignment {
                Some(assignment) => assignments.push(assignment),
                None => {
                    return Err(internal(format!(
                        "{} received no country",
                        self.roster.participants()[slot].username
                    )))
                }
            }
        }
        if occupied.iter().any(|taken| !taken) {
            return Err(internal("some country seats were left empty".to_string()));
        }

        assignments.sort_by(|a, b| a.participant.cmp(&b.participant));
        let fallbacks = self.collect_fallbacks(&assignments);
        Self::report(&assignments, &fallbacks);

        Ok(Interpretation {
            assignments,
            fallbacks,
        })
    }

    /// 每場中沒有被選中的國家，以及拿到這些國家的玩家
    fn collect_fallbacks(&self, assignments: &[Assignment]) -> Vec<SessionFallbacks> {
        let mut fallbacks: Vec<SessionFallbacks> = (0..self.layout.sessions)
            .map(|session| SessionFallbacks {
                session,
                roles: Vec::new(),
                participants: Vec::new(),
            })
            .collect();

        for assignment in assignments.iter().filter(|a| a.is_fallback()) {
            let entry = &mut fallbacks[assignment.session];
            entry.roles.push(assignment.role);
            entry.participants.push(assignment.participant.clone());
        }
        for entry in &mut fallbacks {
            entry.roles.sort_by_key(|role| role.name());
            entry.participants.sort();
        }
        fallbacks
    }

    fn report(assignments: &[Assignment], fallbacks: &[SessionFallbacks]) {
        for assignment in assignments.iter().filter(|a| !a.is_fallback()) {
            tracing::debug!(
                "{} -> {}, game {} (weight: {})",
                assignment.participant,
                assignment.role,
                assignment.session,
                assignment.weight.unwrap_or_default()
            );
        }
        for entry in fallbacks {
            if entry.roles.is_empty() {
                continue;
            }
            let roles: Vec<&str> = entry.roles.iter().map(|r| r.name()).collect();
            tracing::info!(
                "🗂️ Game {}: scrap countries [{}] went to [{}]",
                entry.session,
                roles.join(", "),
                entry.participants.join(", ")
            );
        }
    }
}

fn internal(message: String) -> DraftError {
    DraftError::InternalError { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Participant, PreferenceWeight};

    fn layout(participants: usize, sessions: usize) -> VariableLayout {
        VariableLayout {
            participants,
            roles: Role::COUNT,
            sessions,
            pairs: 0,
        }
    }

    fn roster_of(n: usize) -> Roster {
        (0..n).map(|i| Participant::new(format!("p{:02}", i))).collect()
    }

    /// Participant i gets role i % 25 in game i / 25.
    fn diagonal(layout: VariableLayout) -> SolverOutcome {
        let mut values = vec![0.0; layout.total()];
        for p in 0..layout.participants {
            values[layout.index(p, p % Role::COUNT, p / Role::COUNT)] = 1.0;
        }
        SolverOutcome {
            values,
            objective: 0.0,
        }
    }

    #[test]
    fn test_decodes_and_classifies() {
        let mut roster = roster_of(50);
        roster
            .get_mut("p00")
            .unwrap()
            .preferences
            .insert(Role::Abyssinia, PreferenceWeight::FirstPick);
        roster
            .get_mut("p26")
            .unwrap()
            .preferences
            .insert(Role::Athapasca, PreferenceWeight::ThirdPick);
        let layout = layout(50, 2);

        let result = SolutionInterpreter::new(&roster, layout)
            .interpret(&diagonal(layout))
            .unwrap();

        assert_eq!(result.assignments.len(), 50);
        let p26 = result.assignments.iter().find(|a| a.participant == "p26").unwrap();
        assert_eq!(p26.role, Role::Ajuuran);
        assert_eq!(p26.session, 1);
        assert_eq!(p26.weight, None);

        let p00 = &result.assignments[0];
        assert_eq!(p00.role, Role::Abyssinia);
        assert_eq!(p00.weight, Some(1));

        assert_eq!(result.fallbacks[0].roles.len(), 24);
        assert!(!result.fallbacks[0].participants.contains(&"p00".to_string()));
        assert_eq!(result.fallbacks[1].participants.len(), 25);
        assert_eq!(result.fallbacks[1].roles[0], Role::Abyssinia);
    }

    #[test]
    fn test_unplaced_participant_is_an_internal_error() {
        let roster = roster_of(25);
        let layout = layout(25, 1);
        let mut outcome = diagonal(layout);
        outcome.values[layout.index(3, 3, 0)] = 0.0;

        let err = SolutionInterpreter::new(&roster, layout)
            .interpret(&outcome)
            .unwrap_err();
        assert!(matches!(err, DraftError::InternalError { .. }));
    }

    #[test]
    fn test_double_booked_seat_is_an_internal_error() {
        let roster = roster_of(25);
        let layout = layout(25, 1);
        let mut outcome = diagonal(layout);
        outcome.values[layout.index(4, 4, 0)] = 0.0;
        outcome.values[layout.index(4, 3, 0)] = 1.0;

        assert!(SolutionInterpreter::new(&roster, layout)
            .interpret(&outcome)
            .is_err());
    }
}
