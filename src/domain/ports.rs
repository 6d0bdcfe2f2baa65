use crate::domain::model::{ColumnLayout, DraftResult, Roster};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn rename_file(&self, from: &str, to: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 強制指定某位玩家的國家（例如主辦方已答應的位置）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedRole {
    pub participant: String,
    pub role: String,
    pub tiers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFilenames {
    pub assignments: String,
    pub scrap_countries: String,
    pub unassigned_players: String,
    pub summary: Option<String>,
}

impl Default for OutputFilenames {
    fn default() -> Self {
        Self {
            assignments: "assignments.csv".to_string(),
            scrap_countries: "scrap_countries.csv".to_string(),
            unassigned_players: "unassigned_players.csv".to_string(),
            summary: Some("summary.json".to_string()),
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn seed(&self) -> Option<u64>;
    fn time_limit(&self) -> Option<Duration>;
    fn pairing_weight(&self) -> f64;
    fn forced_roles(&self) -> &[ForcedRole];
    fn columns(&self) -> ColumnLayout {
        ColumnLayout::default()
    }
    fn output_filenames(&self) -> OutputFilenames {
        OutputFilenames::default()
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Roster>;
    async fn transform(&self, roster: Roster) -> Result<DraftResult>;
    async fn load(&self, result: DraftResult) -> Result<String>;
}
