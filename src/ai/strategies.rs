//! CPU戦略の実装モジュール
//! 難易度別の3戦略（ランダム、貪欲評価、先読み探索）を定義し、
//! 統一されたインターフェースで提供する。

use super::evaluation::{BoardEvaluator, PatternWeights};
use super::search::{self, winning_if_place, CANDIDATE_RADIUS, NODE_BREADTH};
use crate::error::AIError;
use crate::game::{Board, Cell, GameState, Piece, Position};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// CPUの難易度を表すenum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 候補からランダムに選ぶ
    Easy,
    /// 1手仮置きの貪欲評価
    Medium,
    /// 深さ2のアルファベータ探索
    Hard,
}

/// CPU戦略の共通インターフェース
/// 読み取り専用のゲーム状態から1手を選ぶ
pub trait CpuStrategy: Send + Sync {
    /// ゲーム状態から次の1手を計算する
    fn choose_move(&self, state: &GameState) -> Result<Position, AIError>;
    /// この戦略の難易度を返す
    fn difficulty(&self) -> Difficulty;
    /// 戦略の名前を返す
    fn name(&self) -> &'static str;
}

/// 全戦略共通の前処理の結果
enum Opening {
    /// 開幕の中央、即勝ち、即ブロックのいずれかで手が確定した
    Forced(Position),
    /// 戦術手なし。絞り込んだ候補から戦略ごとに選ぶ
    Candidates(Vec<Position>),
}

/// 配置可能な（石もブロックも無い）マスを行優先順で列挙する
pub fn legal_empties(state: &GameState) -> Vec<Position> {
    let n = state.board_size();
    let mut empties = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let position = Position::new(row, col);
            if state.is_cell_open(position) {
                empties.push(position);
            }
        }
    }
    empties
}

/// 既存の石の近傍（チェビシェフ距離 radius 以内）の空きマスを集め、
/// 盤中央へのマンハッタン距離の昇順に並べて返す
/// 安定ソートなので距離が同じなら行優先順が保たれる
pub fn candidate_moves(state: &GameState, radius: usize) -> Vec<Position> {
    let n = state.board_size();
    let stones = state.board.stone_positions();
    if stones.is_empty() {
        return Vec::new();
    }

    let radius = radius as i64;
    let mut candidates = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let position = Position::new(row, col);
            if !state.is_cell_open(position) {
                continue;
            }
            let near_stone = stones.iter().any(|s| {
                (s.row as i64 - row as i64).abs() <= radius
                    && (s.col as i64 - col as i64).abs() <= radius
            });
            if near_stone {
                candidates.push(position);
            }
        }
    }

    // 中央までのマンハッタン距離を2倍して整数キーにする（中心は (n-1)/2）
    let center2 = (n - 1) as i64;
    candidates.sort_by_key(|p| {
        (2 * p.row as i64 - center2).abs() + (2 * p.col as i64 - center2).abs()
    });
    candidates
}

/// 指定駒側の即勝ち手を候補の並び順で探す
fn find_tactical_win(
    board: &mut Board,
    empties: &[Position],
    piece: Piece,
    win_length: usize,
) -> Option<Position> {
    empties
        .iter()
        .copied()
        .find(|&position| winning_if_place(board, position, piece, win_length))
}

/// 全難易度共通の前処理
/// 合法手の列挙 → 開幕中央 → 即勝ち → 即ブロック → 候補絞り込み
fn prepare(state: &GameState, cpu_piece: Piece) -> Result<Opening, AIError> {
    if state.is_finished() {
        return Err(AIError::StrategyError {
            message: "Cannot choose a move for a finished game".to_string(),
        });
    }

    let empties = legal_empties(state);
    if empties.is_empty() {
        return Err(AIError::NoValidMoves);
    }

    // 盤上に石が無ければ決め打ちで中央に置く
    if !state.board.has_stones() {
        let n = state.board_size();
        return Ok(Opening::Forced(Position::new(n / 2, n / 2)));
    }

    let win_length = state.win_length();
    let mut scratch = state.board.clone();
    if let Some(position) = find_tactical_win(&mut scratch, &empties, cpu_piece, win_length) {
        return Ok(Opening::Forced(position));
    }
    if let Some(position) =
        find_tactical_win(&mut scratch, &empties, cpu_piece.opposite(), win_length)
    {
        return Ok(Opening::Forced(position));
    }

    let mut candidates = candidate_moves(state, CANDIDATE_RADIUS);
    if candidates.is_empty() {
        candidates = empties;
    }
    Ok(Opening::Candidates(candidates))
}

/// 候補からランダムに選ぶCPU（easy）
#[derive(Debug, Clone)]
pub struct RandomCpu {
    cpu_piece: Piece,
}

impl RandomCpu {
    pub fn new(cpu_piece: Piece) -> Self {
        RandomCpu { cpu_piece }
    }
}

impl CpuStrategy for RandomCpu {
    fn choose_move(&self, state: &GameState) -> Result<Position, AIError> {
        match prepare(state, self.cpu_piece)? {
            Opening::Forced(position) => Ok(position),
            Opening::Candidates(candidates) => candidates
                .choose(&mut rand::thread_rng())
                .copied()
                .ok_or(AIError::NoValidMoves),
        }
    }

    fn difficulty(&self) -> Difficulty {
        Difficulty::Easy
    }

    fn name(&self) -> &'static str {
        "RandomCpu"
    }
}

/// 1手仮置きの静的評価を最大化する貪欲CPU（medium）
#[derive(Debug, Clone)]
pub struct GreedyCpu {
    cpu_piece: Piece,
    weights: PatternWeights,
}

impl GreedyCpu {
    pub fn new(cpu_piece: Piece) -> Self {
        GreedyCpu {
            cpu_piece,
            weights: PatternWeights::default(),
        }
    }
}

impl CpuStrategy for GreedyCpu {
    fn choose_move(&self, state: &GameState) -> Result<Position, AIError> {
        let candidates = match prepare(state, self.cpu_piece)? {
            Opening::Forced(position) => return Ok(position),
            Opening::Candidates(candidates) => candidates,
        };

        let win_length = state.win_length();
        let mut scratch = state.board.clone();
        let mut best: Option<Position> = None;
        let mut best_value = f32::NEG_INFINITY;

        // 比較は厳密な > なので、同点なら先に見た候補（中央寄り）が残る
        for &position in &candidates {
            scratch.set(position, self.cpu_piece.to_cell());
            let value = BoardEvaluator::evaluate(
                &scratch,
                &state.blocked_expiry,
                self.cpu_piece,
                win_length,
                &self.weights,
            );
            scratch.set(position, Cell::Empty);

            if value > best_value {
                best_value = value;
                best = Some(position);
            }
        }

        best.ok_or(AIError::NoValidMoves)
    }

    fn difficulty(&self) -> Difficulty {
        Difficulty::Medium
    }

    fn name(&self) -> &'static str {
        "GreedyCpu"
    }
}

/// アルファベータ探索で先読みするCPU（hard）
#[derive(Debug, Clone)]
pub struct SearchCpu {
    cpu_piece: Piece,
    weights: PatternWeights,
    depth: u32,
    breadth: usize,
}

impl SearchCpu {
    pub fn new(cpu_piece: Piece, depth: u32, breadth: usize) -> Self {
        SearchCpu {
            cpu_piece,
            weights: PatternWeights::default(),
            depth,
            breadth,
        }
    }
}

impl CpuStrategy for SearchCpu {
    fn choose_move(&self, state: &GameState) -> Result<Position, AIError> {
        let candidates = match prepare(state, self.cpu_piece)? {
            Opening::Forced(position) => return Ok(position),
            Opening::Candidates(candidates) => candidates,
        };

        let best = search::search_best(
            &state.board,
            &state.blocked_expiry,
            &candidates,
            self.cpu_piece,
            state.win_length(),
            &self.weights,
            self.depth,
            self.breadth,
        );

        match best {
            Some(position) => Ok(position),
            // 全候補が同値で弾かれた場合のフォールバック
            None => candidates
                .choose(&mut rand::thread_rng())
                .copied()
                .ok_or(AIError::NoValidMoves),
        }
    }

    fn difficulty(&self) -> Difficulty {
        Difficulty::Hard
    }

    fn name(&self) -> &'static str {
        "SearchCpu"
    }
}

/// 難易度に応じたCPU戦略を生成するファクトリ関数
pub fn create_cpu_strategy(difficulty: Difficulty, cpu_piece: Piece) -> Box<dyn CpuStrategy> {
    match difficulty {
        Difficulty::Easy => Box::new(RandomCpu::new(cpu_piece)),
        Difficulty::Medium => Box::new(GreedyCpu::new(cpu_piece)),
        Difficulty::Hard => Box::new(SearchCpu::new(cpu_piece, 2, NODE_BREADTH)),
    }
}
