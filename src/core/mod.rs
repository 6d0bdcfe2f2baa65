pub mod compatibility;
pub mod engine;
pub mod interpreter;
pub mod model_builder;
pub mod roster;
pub mod sizing;
pub mod solver;

pub use crate::domain::model::{DraftResult, Roster};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use solver::Solver;
pub use crate::utils::error::Result;
