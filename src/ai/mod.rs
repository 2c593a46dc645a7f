//! CPU対戦機能モジュール
//! 盤面評価、先読み探索、難易度別戦略から構成される。

pub mod evaluation;
pub mod search;
pub mod strategies;

pub use evaluation::{BoardEvaluator, PatternWeights};
pub use search::{CANDIDATE_RADIUS, NODE_BREADTH};
pub use strategies::{
    create_cpu_strategy, CpuStrategy, Difficulty, GreedyCpu, RandomCpu, SearchCpu,
};
