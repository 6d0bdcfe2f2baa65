use crate::domain::model::{Participant, Roster, SessionTier, TierSet};
use crate::utils::error::{DraftError, Result};
use serde::Serialize;

/// Number of sessions of each classification. Sessions are laid out contiguously
/// in field order: beginner first, experienced last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionPlan {
    pub beginner: usize,
    pub beginner_mixed: usize,
    pub mixed: usize,
    pub experienced_mixed: usize,
    pub experienced: usize,
}

impl SessionPlan {
    pub fn session_count(&self) -> usize {
        self.beginner + self.beginner_mixed + self.mixed + self.experienced_mixed + self.experienced
    }

    pub fn session_tiers(&self) -> Vec<SessionTier> {
        [
            (SessionTier::Beginner, self.beginner),
            (SessionTier::BeginnerMixed, self.beginner_mixed),
            (SessionTier::Mixed, self.mixed),
            (SessionTier::ExperiencedMixed, self.experienced_mixed),
            (SessionTier::Experienced, self.experienced),
        ]
        .into_iter()
        .flat_map(|(tier, count)| std::iter::repeat(tier).take(count))
        .collect()
    }

    pub fn tier_of(&self, session: usize) -> Option<SessionTier> {
        self.session_tiers().get(session).copied()
    }

    /// Which sessions a participant with `tiers` may sit in.
    ///
    /// Exclusions are applied first, the "anything goes" override last.
    pub fn eligibility(&self, tiers: TierSet) -> Vec<bool> {
        use crate::domain::model::Tier;

        let total = self.session_count();
        let interior = self.beginner..total - self.experienced;
        let mut eligible = vec![true; total];

        if tiers.contains(Tier::Beginner) {
            let start = total - (self.experienced + self.experienced_mixed);
            eligible[start..].fill(false);
        }
        if !tiers.contains(Tier::Mixed) {
            eligible[interior.clone()].fill(false);
        }
        if tiers.contains(Tier::Experienced) {
            eligible[..self.beginner + self.beginner_mixed].fill(false);
        }
        if tiers == TierSet::MIXED {
            eligible.fill(false);
            eligible[interior].fill(true);
        }
        if tiers == TierSet::ALL || tiers == TierSet::BEGINNER_EXPERIENCED {
            eligible.fill(true);
        }
        eligible
    }

    pub fn log_summary(&self) {
        tracing::info!("🎲 {} game(s) will be run", self.session_count());
        tracing::info!("  {} beginner games", self.beginner);
        tracing::info!("  {} beginner/mixed games", self.beginner_mixed);
        tracing::info!("  {} mixed games", self.mixed);
        tracing::info!("  {} experienced/mixed games", self.experienced_mixed);
        tracing::info!("  {} experienced games", self.experienced);
    }
}

/// 決定各等級場次數量，並補上假玩家讓總人數剛好是國家數的倍數
pub struct SessionPlanner {
    roles: usize,
}

impl SessionPlanner {
    pub fn new(roles: usize) -> Self {
        Self { roles }
    }

    /// Adds filler participants until the roster splits evenly. Returns how many were added.
    pub fn pad_roster(&self, roster: &mut Roster) -> Result<usize> {
        if roster.is_empty() {
            return Err(DraftError::EmptyRoster);
        }

        let remainder = roster.len() % self.roles;
        if remainder == 0 {
            return Ok(0);
        }

        let needed = self.roles - remainder;
        tracing::warn!(
            "⚠️ {} players do not fill {}-country games; adding {} dummy players",
            roster.len(),
            self.roles,
            needed
        );

        let mut suffix = 0;
        for _ in 0..needed {
            while roster.contains(&format!("dummy{}", suffix)) {
                suffix += 1;
            }
            roster.insert(Participant::filler(format!("dummy{}", suffix)));
            suffix += 1;
        }
        Ok(needed)
    }

    pub fn plan(&self, roster: &Roster) -> Result<SessionPlan> {
        let sessions = roster.len() / self.roles;
        if roster.len() % self.roles != 0 {
            return Err(DraftError::InternalError {
                message: format!(
                    "roster of {} is not a multiple of {}",
                    roster.len(),
                    self.roles
                ),
            });
        }

        let mut counts = [0usize; 8];
        for participant in roster.iter() {
            counts[participant.tiers.bits() as usize] += 1;
        }

        let bases = [
            (TierSet::BEGINNER, "beginner"),
            (TierSet::EXPERIENCED, "experienced"),
            (TierSet::BEGINNER_MIXED, "beginner/mixed"),
            (TierSet::EXPERIENCED_MIXED, "experienced/mixed"),
        ];
        for (base, label) in bases {
            let surplus = counts[base.bits() as usize] % self.roles;
            if surplus == 0 {
                continue;
            }
            let mut required = self.roles - surplus;
            for donor in [base.union(TierSet::MIXED), TierSet::ALL, TierSet::MIXED] {
                if donor == base {
                    continue;
                }
                let available = counts[donor.bits() as usize].min(required);
                required -= available;
                counts[base.bits() as usize] += available;
                counts[donor.bits() as usize] -= available;
                if required == 0 {
                    break;
                }
            }
            if required != 0 {
                return Err(DraftError::InsufficientMixed {
                    tier: label.to_string(),
                    missing: required,
                });
            }
        }

        let games = |set: TierSet| counts[set.bits() as usize] / self.roles;
        let beginner = games(TierSet::BEGINNER);
        let beginner_mixed = games(TierSet::BEGINNER_MIXED);
        let experienced_mixed = games(TierSet::EXPERIENCED_MIXED);
        let experienced = games(TierSet::EXPERIENCED);
        let fixed = beginner + beginner_mixed + experienced_mixed + experienced;
        let mixed = sessions
            .checked_sub(fixed)
            .ok_or_else(|| DraftError::InternalError {
                message: format!("{} tiered games exceed {} total games", fixed, sessions),
            })?;

        let plan = SessionPlan {
            beginner,
            beginner_mixed,
            mixed,
            experienced_mixed,
            experienced,
        };
        plan.log_summary();
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: usize = 25;

    fn roster_with(groups: &[(TierSet, usize)]) -> Roster {
        let mut roster = Roster::new();
        let mut n = 0;
        for (tiers, count) in groups {
            for _ in 0..*count {
                let mut p = Participant::new(format!("p{}", n));
                p.tiers = *tiers;
                roster.insert(p);
                n += 1;
            }
        }
        roster
    }

    #[test]
    fn test_pad_adds_single_filler_for_24_players() {
        let mut roster = roster_with(&[(TierSet::MIXED, 24)]);
        let added = SessionPlanner::new(R).pad_roster(&mut roster).unwrap();

        assert_eq!(added, 1);
        assert_eq!(roster.len(), 25);
        let filler = roster.get("dummy0").unwrap();
        assert!(filler.filler);
        assert_eq!(filler.tiers, TierSet::ALL);
        assert!(filler.preferences.is_empty());
        assert!(filler.play_with.is_none());
    }

    #[test]
    fn test_pad_skips_taken_names() {
        let mut roster = roster_with(&[(TierSet::ALL, 3)]);
        roster.insert(Participant::new("Dummy0"));
        SessionPlanner::new(5).pad_roster(&mut roster).unwrap();
        assert_eq!(roster.len(), 5);
        assert!(roster.contains("dummy1"));
        assert!(!roster.get("dummy0").unwrap().filler);
    }

    #[test]
    fn test_empty_roster_is_rejected() {
        let mut roster = Roster::new();
        assert!(matches!(
            SessionPlanner::new(R).pad_roster(&mut roster),
            Err(DraftError::EmptyRoster)
        ));
    }

    #[test]
    fn test_plan_single_all_tier_session() {
        let roster = roster_with(&[(TierSet::ALL, 25)]);
        let plan = SessionPlanner::new(R).plan(&roster).unwrap();
        assert_eq!(plan.session_count(), 1);
        assert_eq!(plan.mixed, 1);
    }

    #[test]
    fn test_plan_borrows_from_mixed_tolerant_buckets() {
        // 20 pure beginners borrow 5 from beginner/mixed; the rest is mixed
        let roster = roster_with(&[
            (TierSet::BEGINNER, 20),
            (TierSet::BEGINNER_MIXED, 8),
            (TierSet::ALL, 22),
        ]);
        let plan = SessionPlanner::new(R).plan(&roster).unwrap();

        assert_eq!(plan.beginner, 1);
        assert_eq!(plan.beginner_mixed, 1);
        assert_eq!(plan.mixed, 0);
        assert_eq!(plan.session_count(), 2);
        assert_eq!(
            plan.session_tiers(),
            vec![SessionTier::Beginner, SessionTier::BeginnerMixed]
        );
    }

    #[test]
    fn test_plan_fails_without_mixed_players() {
        let roster = roster_with(&[(TierSet::BEGINNER, 20), (TierSet::EXPERIENCED, 30)]);
        let err = SessionPlanner::new(R).plan(&roster).unwrap_err();
        assert!(matches!(err, DraftError::InsufficientMixed { .. }));
    }

    #[test]
    fn test_session_ordering_and_eligibility() {
        let plan = SessionPlan {
            beginner: 1,
            beginner_mixed: 1,
            mixed: 1,
            experienced_mixed: 1,
            experienced: 1,
        };
        assert_eq!(plan.tier_of(0), Some(SessionTier::Beginner));
        assert_eq!(plan.tier_of(2), Some(SessionTier::Mixed));
        assert_eq!(plan.tier_of(4), Some(SessionTier::Experienced));
        assert_eq!(plan.tier_of(5), None);

        let t = true;
        let f = false;
        assert_eq!(plan.eligibility(TierSet::BEGINNER), vec![t, f, f, f, f]);
        assert_eq!(plan.eligibility(TierSet::BEGINNER_MIXED), vec![t, t, t, f, f]);
        assert_eq!(plan.eligibility(TierSet::MIXED), vec![f, t, t, t, f]);
        assert_eq!(plan.eligibility(TierSet::EXPERIENCED_MIXED), vec![f, f, t, t, t]);
        assert_eq!(plan.eligibility(TierSet::EXPERIENCED), vec![f, f, f, f, t]);
        assert_eq!(plan.eligibility(TierSet::ALL), vec![t; 5]);
        assert_eq!(plan.eligibility(TierSet::BEGINNER_EXPERIENCED), vec![t; 5]);
    }

    #[test]
    fn test_experienced_only_never_eligible_for_beginner_sessions() {
        let plan = SessionPlan {
            beginner: 2,
            beginner_mixed: 1,
            mixed: 0,
            experienced_mixed: 0,
            experienced: 3,
        };
        let eligible = plan.eligibility(TierSet::EXPERIENCED);
        for (session, tier) in plan.session_tiers().iter().enumerate() {
            if matches!(tier, SessionTier::Beginner | SessionTier::BeginnerMixed) {
                assert!(!eligible[session]);
            }
        }
        assert_eq!(eligible.iter().filter(|e| **e).count(), 3);
    }
}
