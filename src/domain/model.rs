use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// 遊戲中的國家（角色）。宣告順序即是變數攤平的順序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Abyssinia,
    Ajuuran,
    Athapasca,
    Austria,
    Aymara,
    Ayutthaya,
    England,
    France,
    Inuit,
    Kongo,
    Mali,
    #[serde(rename = "Mapuche-Tehuelche")]
    MapucheTehuelche,
    Ming,
    Mughal,
    Netherlands,
    Ottoman,
    #[serde(rename = "Poland-Lithuania")]
    PolandLithuania,
    Portugal,
    Qing,
    Russia,
    Safavid,
    Spain,
    Sweden,
    Tokugawa,
    #[serde(rename = "Ute-Shoshone")]
    UteShoshone,
}

impl Role {
    pub const COUNT: usize = 25;

    pub const ALL: [Role; Role::COUNT] = [
        Role::Abyssinia,
        Role::Ajuuran,
        Role::Athapasca,
        Role::Austria,
        Role::Aymara,
        Role::Ayutthaya,
        Role::England,
        Role::France,
        Role::Inuit,
        Role::Kongo,
        Role::Mali,
        Role::MapucheTehuelche,
        Role::Ming,
        Role::Mughal,
        Role::Netherlands,
        Role::Ottoman,
        Role::PolandLithuania,
        Role::Portugal,
        Role::Qing,
        Role::Russia,
        Role::Safavid,
        Role::Spain,
        Role::Sweden,
        Role::Tokugawa,
        Role::UteShoshone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Role::Abyssinia => "Abyssinia",
            Role::Ajuuran => "Ajuuran",
            Role::Athapasca => "Athapasca",
            Role::Austria => "Austria",
            Role::Aymara => "Aymara",
            Role::Ayutthaya => "Ayutthaya",
            Role::England => "England",
            Role::France => "France",
            Role::Inuit => "Inuit",
            Role::Kongo => "Kongo",
            Role::Mali => "Mali",
            Role::MapucheTehuelche => "Mapuche-Tehuelche",
            Role::Ming => "Ming",
            Role::Mughal => "Mughal",
            Role::Netherlands => "Netherlands",
            Role::Ottoman => "Ottoman",
            Role::PolandLithuania => "Poland-Lithuania",
            Role::Portugal => "Portugal",
            Role::Qing => "Qing",
            Role::Russia => "Russia",
            Role::Safavid => "Safavid",
            Role::Spain => "Spain",
            Role::Sweden => "Sweden",
            Role::Tokugawa => "Tokugawa",
            Role::UteShoshone => "Ute-Shoshone",
        }
    }

    /// Position in the flattening order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Role> {
        Role::ALL.get(index).copied()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown country '{}'", wanted))
    }
}

/// 玩家願意參與的經驗等級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Experienced,
    Mixed,
    Beginner,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Experienced, Tier::Mixed, Tier::Beginner];

    fn bit(self) -> u8 {
        match self {
            Tier::Experienced => 1,
            Tier::Mixed => 2,
            Tier::Beginner => 4,
        }
    }

    /// Maps a free-text skill token; the match is exhaustive over the known spellings.
    pub fn from_token(token: &str) -> Option<Tier> {
        match token.trim().to_ascii_lowercase().as_str() {
            "experienced" => Some(Tier::Experienced),
            "mixed" => Some(Tier::Mixed),
            "beginner" => Some(Tier::Beginner),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Experienced => "Experienced",
            Tier::Mixed => "Mixed",
            Tier::Beginner => "Beginner",
        };
        f.write_str(name)
    }
}

/// Tier set stored as a bitmask (Experienced=1, Mixed=2, Beginner=4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TierSet(u8);

impl TierSet {
    pub const EMPTY: TierSet = TierSet(0);
    pub const EXPERIENCED: TierSet = TierSet(1);
    pub const MIXED: TierSet = TierSet(2);
    pub const EXPERIENCED_MIXED: TierSet = TierSet(3);
    pub const BEGINNER: TierSet = TierSet(4);
    pub const BEGINNER_EXPERIENCED: TierSet = TierSet(5);
    pub const BEGINNER_MIXED: TierSet = TierSet(6);
    pub const ALL: TierSet = TierSet(7);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, tier: Tier) -> bool {
        self.0 & tier.bit() != 0
    }

    pub fn insert(&mut self, tier: Tier) {
        self.0 |= tier.bit();
    }

    pub fn intersection(self, other: TierSet) -> TierSet {
        TierSet(self.0 & other.0)
    }

    pub fn union(self, other: TierSet) -> TierSet {
        TierSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn tiers(self) -> Vec<Tier> {
        Tier::ALL.into_iter().filter(|t| self.contains(*t)).collect()
    }
}

impl FromIterator<Tier> for TierSet {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        let mut set = TierSet::EMPTY;
        for tier in iter {
            set.insert(tier);
        }
        set
    }
}

impl fmt::Debug for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tiers()).finish()
    }
}

impl fmt::Display for TierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.tiers().iter().map(|t| t.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl Serialize for TierSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.tiers().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TierSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tiers = Vec::<Tier>::deserialize(deserializer)?;
        Ok(tiers.into_iter().collect())
    }
}

/// 偏好權重。數值越小越偏好，每一級都壓過所有較低等級的總和。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PreferenceWeight {
    FirstPick,
    SecondPick,
    ThirdPick,
    FourthPick,
    FifthPick,
    Unpicked,
    No,
}

impl PreferenceWeight {
    const LADDER: [PreferenceWeight; 6] = [
        PreferenceWeight::FirstPick,
        PreferenceWeight::SecondPick,
        PreferenceWeight::ThirdPick,
        PreferenceWeight::FourthPick,
        PreferenceWeight::FifthPick,
        PreferenceWeight::Unpicked,
    ];

    pub fn value(self) -> u32 {
        match self {
            PreferenceWeight::FirstPick => 1,
            PreferenceWeight::SecondPick => 3,
            PreferenceWeight::ThirdPick => 9,
            PreferenceWeight::FourthPick => 27,
            PreferenceWeight::FifthPick => 81,
            PreferenceWeight::Unpicked => 1000,
            PreferenceWeight::No => 9_999_999,
        }
    }

    pub fn from_rank_token(token: &str) -> Option<PreferenceWeight> {
        match token {
            "1st" => Some(PreferenceWeight::FirstPick),
            "2nd" => Some(PreferenceWeight::SecondPick),
            "3rd" => Some(PreferenceWeight::ThirdPick),
            "4th" => Some(PreferenceWeight::FourthPick),
            "5th" => Some(PreferenceWeight::FifthPick),
            _ => None,
        }
    }

    /// Weight applied to every unranked role of someone who ranked `ranked` roles:
    /// the next tier down the ladder, capped at `Unpicked`.
    pub fn fallback_for(ranked: usize) -> PreferenceWeight {
        Self::LADDER[ranked.min(Self::LADDER.len() - 1)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub username: String,
    pub preferences: BTreeMap<Role, PreferenceWeight>,
    pub fallback_weight: PreferenceWeight,
    pub tiers: TierSet,
    pub play_with: Option<String>,
    pub play_without: Vec<String>,
    pub filler: bool,
}

impl Participant {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            preferences: BTreeMap::new(),
            fallback_weight: PreferenceWeight::fallback_for(0),
            tiers: TierSet::ALL,
            play_with: None,
            play_without: Vec::new(),
            filler: false,
        }
    }

    pub fn filler(username: impl Into<String>) -> Self {
        Self {
            filler: true,
            ..Self::new(username)
        }
    }

    pub fn key(&self) -> String {
        normalize_key(&self.username)
    }

    pub fn weight_for(&self, role: Role) -> PreferenceWeight {
        self.preferences
            .get(&role)
            .copied()
            .unwrap_or(self.fallback_weight)
    }

    pub fn ranked_weight(&self, role: Role) -> Option<PreferenceWeight> {
        self.preferences.get(&role).copied()
    }
}

pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// 玩家名冊，以不分大小寫的名稱做索引
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    index: HashMap<String, usize>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a participant. Returns the replaced entry when the key was taken.
    pub fn insert(&mut self, participant: Participant) -> Option<Participant> {
        let key = participant.key();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.participants[slot], participant)),
            None => {
                self.index.insert(key, self.participants.len());
                self.participants.push(participant);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Participant> {
        self.position(name).map(|i| &self.participants[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Participant> {
        let slot = self.position(name)?;
        Some(&mut self.participants[slot])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize_key(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.participants.iter()
    }

    pub fn participant_mut(&mut self, slot: usize) -> &mut Participant {
        &mut self.participants[slot]
    }

    /// Reorders participants in place; the lookup index follows.
    pub fn reorder_with<F>(&mut self, reorder: F)
    where
        F: FnOnce(&mut Vec<Participant>),
    {
        reorder(&mut self.participants);
        self.index = self
            .participants
            .iter()
            .enumerate()
            .map(|(slot, p)| (p.key(), slot))
            .collect();
    }
}

impl FromIterator<Participant> for Roster {
    fn from_iter<I: IntoIterator<Item = Participant>>(iter: I) -> Self {
        let mut roster = Roster::new();
        for participant in iter {
            roster.insert(participant);
        }
        roster
    }
}

/// 場次分類，順序即場次索引的排列順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionTier {
    Beginner,
    BeginnerMixed,
    Mixed,
    ExperiencedMixed,
    Experienced,
}

impl fmt::Display for SessionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionTier::Beginner => "beginner",
            SessionTier::BeginnerMixed => "beginner/mixed",
            SessionTier::Mixed => "mixed",
            SessionTier::ExperiencedMixed => "experienced/mixed",
            SessionTier::Experienced => "experienced",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub participant: String,
    pub session: usize,
    pub role: Role,
    /// `None` when the role was not one of the participant's ranked picks.
    pub weight: Option<u32>,
    pub filler: bool,
}

impl Assignment {
    pub fn is_fallback(&self) -> bool {
        self.weight.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionFallbacks {
    pub session: usize,
    pub roles: Vec<Role>,
    pub participants: Vec<String>,
}

/// Everything the load phase needs to write the output artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct DraftResult {
    pub session_tiers: Vec<SessionTier>,
    pub assignments: Vec<Assignment>,
    pub fallbacks: Vec<SessionFallbacks>,
    pub objective: f64,
    pub merged_groups: Vec<Vec<String>>,
}

impl DraftResult {
    pub fn session_count(&self) -> usize {
        self.session_tiers.len()
    }

    pub fn preferred_count(&self) -> usize {
        self.assignments.iter().filter(|a| !a.is_fallback()).count()
    }

    pub fn fallback_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_fallback()).count()
    }
}

/// 報名表的欄位名稱。預設值對應問卷匯出的原始標題。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub username: String,
    pub skill_levels: String,
    pub play_with: String,
    pub play_without: String,
    pub no_preferences: String,
    pub rank_prefix: String,
    pub rank_suffix: String,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            username: "Discord Username".to_string(),
            skill_levels: "What skill levels would you like to play in? (Beginner and Experienced will be prioritized)".to_string(),
            play_with: "Is there a person you desperately want to play with? (You may list up to one)".to_string(),
            play_without: "Are there any people you refuse to play with?".to_string(),
            no_preferences: "Select Here If You Have No Preferences".to_string(),
            rank_prefix: "Rank Your Country Choices [".to_string(),
            rank_suffix: "]".to_string(),
        }
    }
}

impl ColumnLayout {
    pub fn rank_column(&self, role: Role) -> String {
        format!("{}{}{}", self.rank_prefix, role.name(), self.rank_suffix)
    }

    /// Header row in the order `RosterReader` expects, handy for writing fixtures.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            self.username.clone(),
            self.skill_levels.clone(),
            self.play_with.clone(),
            self.play_without.clone(),
            self.no_preferences.clone(),
        ];
        headers.extend(Role::ALL.iter().map(|role| self.rank_column(*role)));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_names() {
        for role in Role::ALL {
            assert_eq!(role.name().parse::<Role>().unwrap(), role);
            assert_eq!(Role::from_index(role.index()), Some(role));
        }
        assert_eq!("poland-lithuania".parse::<Role>().unwrap(), Role::PolandLithuania);
        assert!("Prussia".parse::<Role>().is_err());
    }

    #[test]
    fn test_weight_ladder_dominance() {
        let worst_ranked_total = 5 * PreferenceWeight::FifthPick.value();
        assert!(PreferenceWeight::Unpicked.value() > worst_ranked_total);
        assert!(PreferenceWeight::SecondPick.value() > PreferenceWeight::FirstPick.value());
        assert!(PreferenceWeight::No.value() > 1000 * PreferenceWeight::Unpicked.value());
    }

    #[test]
    fn test_fallback_weight_follows_ranked_count() {
        assert_eq!(PreferenceWeight::fallback_for(0), PreferenceWeight::FirstPick);
        assert_eq!(PreferenceWeight::fallback_for(1), PreferenceWeight::SecondPick);
        assert_eq!(PreferenceWeight::fallback_for(4), PreferenceWeight::FifthPick);
        assert_eq!(PreferenceWeight::fallback_for(5), PreferenceWeight::Unpicked);
        assert_eq!(PreferenceWeight::fallback_for(12), PreferenceWeight::Unpicked);
    }

    #[test]
    fn test_tier_set_bits() {
        let set: TierSet = [Tier::Beginner, Tier::Mixed].into_iter().collect();
        assert_eq!(set, TierSet::BEGINNER_MIXED);
        assert_eq!(set.bits(), 6);
        assert!(set.intersection(TierSet::EXPERIENCED).is_empty());
        assert_eq!(set.union(TierSet::EXPERIENCED), TierSet::ALL);
        assert_eq!(Tier::from_token(" mixed "), Some(Tier::Mixed));
        assert_eq!(Tier::from_token("expert"), None);
    }

    #[test]
    fn test_roster_lookup_is_case_insensitive() {
        let mut roster = Roster::new();
        roster.insert(Participant::new("Alice"));
        roster.insert(Participant::new("bob"));

        assert!(roster.contains("ALICE"));
        assert_eq!(roster.position(" Bob "), Some(1));

        let replaced = roster.insert(Participant::new("alice"));
        assert_eq!(replaced.map(|p| p.username), Some("Alice".to_string()));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_roster_reorder_keeps_index() {
        let mut roster: Roster = ["a", "b", "c"].into_iter().map(Participant::new).collect();
        roster.reorder_with(|ps| ps.reverse());
        assert_eq!(roster.position("a"), Some(2));
        assert_eq!(roster.participants()[0].username, "c");
    }
}
