pub use crate::domain::model::ColumnLayout;
use crate::domain::model::{Participant, PreferenceWeight, Role, Roster, Tier, TierSet};
use crate::domain::ports::ForcedRole;
use crate::utils::error::{DraftError, Result};
use std::collections::{BTreeSet, HashMap};

struct ColumnIndex {
    username: usize,
    skill_levels: usize,
    play_with: usize,
    play_without: usize,
    no_preferences: usize,
    ranks: Vec<(Role, usize)>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, layout: &ColumnLayout) -> Result<Self> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();
        let find = |column: &str| {
            positions
                .get(column.trim())
                .copied()
                .ok_or_else(|| DraftError::MissingColumn {
                    column: column.to_string(),
                })
        };

        let ranks = Role::ALL
            .iter()
            .map(|role| find(&layout.rank_column(*role)).map(|i| (*role, i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            username: find(&layout.username)?,
            skill_levels: find(&layout.skill_levels)?,
            play_with: find(&layout.play_with)?,
            play_without: find(&layout.play_without)?,
            no_preferences: find(&layout.no_preferences)?,
            ranks,
        })
    }
}

fn field(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

pub struct RosterReader<'a> {
    layout: &'a ColumnLayout,
}

impl<'a> RosterReader<'a> {
    pub fn new(layout: &'a ColumnLayout) -> Self {
        Self { layout }
    }

    /// 解析 CSV 報名表。排名無法辨識時整個流程中止。
    pub fn parse(&self, data: &[u8]) -> Result<Roster> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);
        let columns = ColumnIndex::resolve(reader.headers()?, self.layout)?;

        let mut roster = Roster::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let username = field(&record, columns.username).trim();
            if username.is_empty() {
                tracing::warn!("⚠️ Skipping roster row {} without a username", row + 2);
                continue;
            }

            let participant = self.parse_participant(username, &record, &columns)?;
            if let Some(previous) = roster.insert(participant) {
                tracing::warn!(
                    "⚠️ {} signed up more than once; keeping the later row",
                    previous.username
                );
            }
        }

        tracing::info!("📋 Parsed {} participants from roster", roster.len());
        Ok(roster)
    }

    fn parse_participant(
        &self,
        username: &str,
        record: &csv::StringRecord,
        columns: &ColumnIndex,
    ) -> Result<Participant> {
        let mut participant = Participant::new(username);
        participant.tiers = parse_tiers(username, field(record, columns.skill_levels));

        let play_with = field(record, columns.play_with).trim();
        participant.play_with = (!play_with.is_empty()).then(|| play_with.to_string());

        let own_key = participant.key();
        for name in field(record, columns.play_without).split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if name.to_lowercase() == own_key {
                tracing::warn!("⚠️ {} refused to play with themselves; ignoring", username);
                continue;
            }
            participant.play_without.push(name.to_string());
        }

        if field(record, columns.no_preferences).trim().is_empty() {
            for (role, index) in &columns.ranks {
                let raw = field(record, *index).trim();
                if raw.is_empty() {
                    continue;
                }
                let weight = PreferenceWeight::from_rank_token(raw).ok_or_else(|| {
                    DraftError::UnrecognizedRank {
                        participant: username.to_string(),
                        role: role.name().to_string(),
                        value: raw.to_string(),
                    }
                })?;
                participant.preferences.insert(*role, weight);
            }
        }
        participant.fallback_weight = PreferenceWeight::fallback_for(participant.preferences.len());

        Ok(participant)
    }
}

/// Skill-level multi-select → tier set. Empty or contradictory answers mean "anything".
pub fn parse_tiers(username: &str, raw: &str) -> TierSet {
    let mut tiers = TierSet::EMPTY;
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match Tier::from_token(token) {
            Some(tier) => tiers.insert(tier),
            None => tracing::debug!("Ignoring unknown skill level '{}' for {}", token, username),
        }
    }

    if tiers == TierSet::BEGINNER_EXPERIENCED {
        tracing::warn!(
            "⚠️ Player {} chose Beginner and Experienced without Mixed; setting them to all",
            username
        );
        return TierSet::ALL;
    }
    if tiers.is_empty() {
        tracing::warn!("⚠️ Player {} chose no game levels; setting them to all", username);
        return TierSet::ALL;
    }
    tiers
}

/// Roles nobody ranked, in declaration order.
pub fn unranked_roles(roster: &Roster) -> Vec<Role> {
    let ranked: BTreeSet<Role> = roster
        .iter()
        .flat_map(|p| p.preferences.keys().copied())
        .collect();
    Role::ALL
        .iter()
        .copied()
        .filter(|role| !ranked.contains(role))
        .collect()
}

/// Advisory typo check. Run it after overrides so forced countries count as chosen.
pub fn warn_unranked_roles(roster: &Roster) -> Vec<Role> {
    let missing = unranked_roles(roster);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|r| r.name()).collect();
        tracing::warn!(
            "⚠️ {} never chosen as a preference -- check for spelling typos!",
            names.join(", ")
        );
    }
    missing
}

/// Applies organiser overrides: the forced country becomes the only acceptable one.
pub fn apply_forced_roles(roster: &mut Roster, forced: &[ForcedRole]) -> Result<()> {
    for entry in forced {
        let role: Role = entry.role.parse().map_err(|_| DraftError::UnknownRole {
            value: entry.role.clone(),
        })?;
        let tiers = match &entry.tiers {
            Some(names) => Some(parse_tier_names(names)?),
            None => None,
        };

        let Some(participant) = roster.get_mut(&entry.participant) else {
            tracing::warn!(
                "⚠️ Override for {} ignored: no such player in the roster",
                entry.participant
            );
            continue;
        };

        participant.preferences.clear();
        participant.preferences.insert(role, PreferenceWeight::FirstPick);
        participant.fallback_weight = PreferenceWeight::No;
        if let Some(tiers) = tiers {
            participant.tiers = tiers;
        }
        tracing::info!("🔒 {} is locked to {}", participant.username, role);
    }
    Ok(())
}

fn parse_tier_names(names: &[String]) -> Result<TierSet> {
    let tiers = names
        .iter()
        .map(|name| {
            Tier::from_token(name).ok_or_else(|| DraftError::InvalidConfigValueError {
                field: "overrides.tiers".to_string(),
                value: name.clone(),
                reason: "Expected Beginner, Mixed or Experienced".to_string(),
            })
        })
        .collect::<Result<TierSet>>()?;
    if tiers.is_empty() {
        return Err(DraftError::InvalidConfigValueError {
            field: "overrides.tiers".to_string(),
            value: String::new(),
            reason: "At least one tier is required".to_string(),
        });
    }
    Ok(tiers)
}
