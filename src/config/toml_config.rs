use crate::core::model_builder::DEFAULT_PAIRING_WEIGHT;
use crate::domain::model::ColumnLayout;
use crate::core::ConfigProvider;
use crate::domain::ports::{ForcedRole, OutputFilenames};
use crate::utils::error::{DraftError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub draft: DraftConfig,
    pub roster: RosterConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub overrides: Vec<ForcedRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    pub input: String,
    pub columns: Option<ColumnLayout>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    pub seed: Option<u64>,
    pub time_limit_seconds: Option<u64>,
    pub pairing_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    pub filenames: Option<OutputFilenames>,
    pub write_summary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DraftError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DraftError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ROSTER_CSV})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DraftError::InternalError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("draft.name", &self.draft.name)?;

        validation::validate_path("roster.input", &self.roster.input)?;
        validation::validate_file_extension("roster.input", &self.roster.input, &["csv"])?;

        validation::validate_path("output.output_path", &self.output.output_path)?;

        if let Some(limit) = self.solver.time_limit_seconds {
            validation::validate_positive_number("solver.time_limit_seconds", limit, 1)?;
        }
        if let Some(weight) = self.solver.pairing_weight {
            validation::validate_range("solver.pairing_weight", weight, 0.0, 1e9)?;
        }

        if let Some(filenames) = &self.output.filenames {
            let names = [
                ("output.filenames.assignments", &filenames.assignments),
                ("output.filenames.scrap_countries", &filenames.scrap_countries),
                ("output.filenames.unassigned_players", &filenames.unassigned_players),
            ];
            for (field, name) in names {
                validation::validate_file_extension(field, name, &["csv"])?;
            }
        }

        if let Some(level) = self.log_level() {
            crate::utils::logger::validate_level(level)?;
        }

        for (i, forced) in self.overrides.iter().enumerate() {
            validation::validate_non_empty_string(
                &format!("overrides[{}].participant", i),
                &forced.participant,
            )?;
            validation::validate_non_empty_string(&format!("overrides[{}].role", i), &forced.role)?;
        }

        Ok(())
    }

    pub fn draft_name(&self) -> &str {
        &self.draft.name
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.roster.input
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn seed(&self) -> Option<u64> {
        self.solver.seed
    }

    fn time_limit(&self) -> Option<Duration> {
        self.solver.time_limit_seconds.map(Duration::from_secs)
    }

    fn pairing_weight(&self) -> f64 {
        self.solver.pairing_weight.unwrap_or(DEFAULT_PAIRING_WEIGHT)
    }

    fn forced_roles(&self) -> &[ForcedRole] {
        &self.overrides
    }

    fn columns(&self) -> ColumnLayout {
        self.roster.columns.clone().unwrap_or_default()
    }

    fn output_filenames(&self) -> OutputFilenames {
        let mut names = self.output.filenames.clone().unwrap_or_default();
        if self.output.write_summary == Some(false) {
            names.summary = None;
        }
        names
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
