use crate::core::model_builder::DEFAULT_PAIRING_WEIGHT;
use crate::core::ConfigProvider;
use crate::domain::ports::ForcedRole;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "diplo-draft")]
#[command(about = "Assign countries to players across parallel Diplomacy games")]
pub struct CliConfig {
    #[arg(long, short, default_value = "allclean.csv", help = "Signup CSV exported from the form")]
    pub input: String,

    #[arg(long, default_value = "./outputs")]
    pub output_path: String,

    #[arg(long, help = "Seed for the player shuffle; omit for a random order")]
    pub seed: Option<u64>,

    #[arg(long, help = "Give up on the solver after this many seconds")]
    pub time_limit_secs: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_PAIRING_WEIGHT)]
    pub pairing_weight: f64,

    /// `player=Country` or `player=Country@Tier,Tier`, may be repeated
    #[arg(long = "force", value_parser = parse_forced_role)]
    pub forced: Vec<ForcedRole>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Report phase timings and process resource usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

/// 解析 `--force` 參數
pub fn parse_forced_role(raw: &str) -> std::result::Result<ForcedRole, String> {
    let (participant, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected player=Country, got '{}'", raw))?;
    let participant = participant.trim();
    if participant.is_empty() {
        return Err(format!("missing player name in '{}'", raw));
    }

    let (role, tiers) = match rest.split_once('@') {
        Some((role, tiers)) => {
            let tiers: Vec<String> = tiers
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            (role, Some(tiers))
        }
        None => (rest, None),
    };
    let role = role.trim();
    if role.is_empty() {
        return Err(format!("missing country in '{}'", raw));
    }

    Ok(ForcedRole {
        participant: participant.to_string(),
        role: role.to_string(),
        tiers,
    })
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    fn pairing_weight(&self) -> f64 {
        self.pairing_weight
    }

    fn forced_roles(&self) -> &[ForcedRole] {
        &self.forced
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_file_extension("input", &self.input, &["csv"])?;
        validation::validate_path("output_path", &self.output_path)?;

        if let Some(limit) = self.time_limit_secs {
            validation::validate_positive_number("time_limit_secs", limit, 1)?;
        }
        validation::validate_range("pairing_weight", self.pairing_weight, 0.0, 1e9)?;

        for forced in &self.forced {
            validation::validate_non_empty_string("force", &forced.participant)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = CliConfig::parse_from(["diplo-draft"]);

        assert_eq!(config.input, "allclean.csv");
        assert_eq!(config.output_path, "./outputs");
        assert_eq!(config.pairing_weight, DEFAULT_PAIRING_WEIGHT);
        assert!(config.time_limit().is_none());
        assert!(config.forced_roles().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_force_is_repeatable() {
        let config = CliConfig::parse_from([
            "diplo-draft",
            "--force",
            "Captainmeme=Spain@Experienced",
            "--force",
            "Ezio=Spain",
            "--seed",
            "42",
            "--time-limit-secs",
            "30",
        ]);

        assert_eq!(config.forced.len(), 2);
        assert_eq!(config.forced[0].tiers, Some(vec!["Experienced".to_string()]));
        assert_eq!(config.forced[1].participant, "Ezio");
        assert_eq!(config.forced[1].tiers, None);
        assert_eq!(config.seed(), Some(42));
        assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_forced_role_rejects_garbage() {
        assert!(parse_forced_role("nobody").is_err());
        assert!(parse_forced_role("=Spain").is_err());
        assert!(parse_forced_role("someone=").is_err());
    }

    #[test]
    fn test_validation_rejects_non_csv_input() {
        let config = CliConfig::parse_from(["diplo-draft", "--input", "roster.xlsx"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["diplo-draft", "--time-limit-secs", "0"]);
        assert!(config.validate().is_err());
    }
}
