#![allow(dead_code)]

use diplo_draft::core::roster::ColumnLayout;
use diplo_draft::domain::model::Role;
use diplo_draft::{CliConfig, DraftEngine, DraftPipeline, LocalStorage};
use tempfile::TempDir;

/// One signup row. `first` is the index of the country ranked 1st.
pub struct Signup {
    pub name: String,
    pub levels: &'static str,
    pub play_with: String,
    pub play_without: String,
    pub first: usize,
}

impl Signup {
    pub fn new(name: impl Into<String>, levels: &'static str, first: usize) -> Self {
        Self {
            name: name.into(),
            levels,
            play_with: String::new(),
            play_without: String::new(),
            first,
        }
    }
}

/// `n` signups named Player00.., each ranking country i % 25 first.
pub fn signups(n: usize, levels: &'static str) -> Vec<Signup> {
    (0..n)
        .map(|i| Signup::new(format!("Player{:02}", i), levels, i % Role::COUNT))
        .collect()
}

pub fn roster_csv(rows: &[Signup]) -> Vec<u8> {
    let layout = ColumnLayout::default();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(layout.headers()).unwrap();
    for row in rows {
        let mut record = vec![
            row.name.clone(),
            row.levels.to_string(),
            row.play_with.clone(),
            row.play_without.clone(),
            String::new(),
        ];
        for index in 0..Role::COUNT {
            record.push(if index == row.first { "1st".to_string() } else { String::new() });
        }
        writer.write_record(&record).unwrap();
    }
    writer.into_inner().unwrap()
}

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn with_roster(data: &[u8]) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("roster.csv"), data).unwrap();
        Self { dir }
    }

    pub fn config(&self) -> CliConfig {
        CliConfig {
            input: "roster.csv".to_string(),
            output_path: "out".to_string(),
            seed: Some(11),
            time_limit_secs: Some(120),
            pairing_weight: 10_000.0,
            forced: vec![],
            verbose: false,
            monitor: false,
            json_logs: false,
        }
    }

    pub fn storage(&self) -> LocalStorage {
        LocalStorage::new(self.dir.path().to_str().unwrap().to_string())
    }

    pub async fn run(&self) -> diplo_draft::Result<String> {
        self.run_with(self.config()).await
    }

    pub async fn run_with(&self, config: CliConfig) -> diplo_draft::Result<String> {
        let pipeline = DraftPipeline::new(self.storage(), config);
        DraftEngine::new(pipeline).run().await
    }

    pub fn output(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join("out").join(name)).ok()
    }

    /// assignments.csv as (player, game, country, weight) rows.
    pub fn assignments(&self) -> Vec<(String, usize, String, String)> {
        let data = self.output("assignments.csv").expect("assignments.csv missing");
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes());
        reader
            .records()
            .map(|record| {
                let record = record.unwrap();
                (
                    record[0].to_string(),
                    record[1].parse().unwrap(),
                    record[2].to_string(),
                    record[3].to_string(),
                )
            })
            .collect()
    }
}
