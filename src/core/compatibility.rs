use crate::domain::model::{normalize_key, Roster, TierSet};
use crate::utils::error::{DraftError, Result};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompatibilityReport {
    /// Fully mutual play-with groups, members sorted, with their merged tiers.
    pub merged_groups: Vec<(Vec<String>, TierSet)>,
    /// (player, requested partner) pairs where the partner did not sign up.
    pub missing_partners: Vec<(String, String)>,
    /// (player, refused name) pairs that match nobody in the roster.
    pub unresolved_exclusions: Vec<(String, String)>,
}

impl CompatibilityReport {
    pub fn group_names(&self) -> Vec<Vec<String>> {
        self.merged_groups.iter().map(|(names, _)| names.clone()).collect()
    }
}

/// 依照 play-with 鏈合併互相指定的玩家群組的等級。
///
/// 只有鏈條繞回起點（完全互相指定）時才合併；單向的願望不會改變對方的等級。
pub struct CompatibilityResolver;

impl CompatibilityResolver {
    pub fn resolve(roster: &mut Roster) -> Result<CompatibilityReport> {
        let mut report = CompatibilityReport::default();
        let mut recorded: BTreeSet<Vec<String>> = BTreeSet::new();

        for origin in 0..roster.len() {
            let Some(target) = roster.participants()[origin].play_with.clone() else {
                continue;
            };

            let origin_name = roster.participants()[origin].username.clone();
            let mut next = roster.position(&target);
            match next {
                None => {
                    tracing::warn!(
                        "⚠️ {} wanted to play with {} who didn't sign up{}",
                        origin_name,
                        target,
                        suggestion_suffix(roster, &target)
                    );
                    report.missing_partners.push((origin_name, target));
                    continue;
                }
                Some(slot) if slot == origin => {
                    tracing::warn!("⚠️ {} asked to play with themselves; ignoring", origin_name);
                    continue;
                }
                Some(_) => {}
            }

            let first = &roster.participants()[origin];
            let mut seen = vec![origin];
            let mut combined = first.tiers;
            let mut refused: BTreeSet<String> =
                first.play_without.iter().map(|n| normalize_key(n)).collect();

            while let Some(current) = next {
                if let Some(position) = seen.iter().position(|slot| *slot == current) {
                    // A -> B -> C -> B: A only points into someone else's loop
                    if position != 0 {
                        tracing::debug!(
                            "{}'s play-with chain joins a loop it is not part of",
                            origin_name
                        );
                        break;
                    }
                    let names = Self::close_group(roster, &seen, combined, &refused)?;
                    if recorded.insert(names.clone()) {
                        tracing::info!("🤝 Group {:?} plays at {}", names, combined);
                        report.merged_groups.push((names, combined));
                    }
                    break;
                }

                let member = &roster.participants()[current];
                seen.push(current);
                combined = combined.intersection(member.tiers);
                refused.extend(member.play_without.iter().map(|n| normalize_key(n)));
                next = member.play_with.as_deref().and_then(|t| roster.position(t));
            }
        }

        report.unresolved_exclusions = Self::unresolved_exclusions(roster);
        Ok(report)
    }

    fn close_group(
        roster: &mut Roster,
        seen: &[usize],
        combined: TierSet,
        refused: &BTreeSet<String>,
    ) -> Result<Vec<String>> {
        let members: Vec<String> = seen
            .iter()
            .map(|slot| roster.participants()[*slot].username.clone())
            .collect();

        let conflicting: Vec<String> = members
            .iter()
            .filter(|name| refused.contains(&normalize_key(name)))
            .cloned()
            .collect();
        if !conflicting.is_empty() {
            return Err(DraftError::PairingConflict {
                members,
                conflicting,
            });
        }

        if combined.is_empty() {
            return Err(DraftError::EmptyTierIntersection { members });
        }

        for slot in seen {
            roster.participant_mut(*slot).tiers = combined;
        }

        let mut names = members;
        names.sort_by_key(|n| normalize_key(n));
        Ok(names)
    }

    /// play-without 名稱只做精確（不分大小寫）比對；找不到的名稱不會產生限制。
    fn unresolved_exclusions(roster: &Roster) -> Vec<(String, String)> {
        let mut unresolved = Vec::new();
        for participant in roster.iter() {
            for name in &participant.play_without {
                if roster.contains(name) {
                    continue;
                }
                let suffix = suggestion_suffix(roster, name);
                if suffix.is_empty() {
                    tracing::debug!(
                        "{} refuses {} who is not in the roster",
                        participant.username,
                        name
                    );
                } else {
                    tracing::warn!(
                        "⚠️ {} refuses {} who is not in the roster{}",
                        participant.username,
                        name,
                        suffix
                    );
                }
                unresolved.push((participant.username.clone(), name.clone()));
            }
        }
        unresolved
    }
}

fn suggestion_suffix(roster: &Roster, name: &str) -> String {
    match near_miss(roster, name) {
        Some(candidate) => format!(" (did you mean {}?)", candidate),
        None => String::new(),
    }
}

/// Roster name within edit distance 1 of `name`, ignoring case.
pub fn near_miss<'r>(roster: &'r Roster, name: &str) -> Option<&'r str> {
    let wanted = normalize_key(name);
    roster
        .iter()
        .map(|p| p.username.as_str())
        .find(|candidate| strsim::levenshtein(&normalize_key(candidate), &wanted) == 1)
}
