//! CPUの先読み探索モジュール
//! アルファベータ枝刈り付きネガマックス探索と、探索を実用的な
//! 規模に抑えるための候補手の絞り込み・並べ替えを提供する。

use super::evaluation::{BoardEvaluator, PatternWeights};
use crate::game::{Board, Cell, Piece, Position};
use std::collections::HashMap;

/// 1ノードあたりに展開する候補手の上限
pub const NODE_BREADTH: usize = 12;

/// 既存の石からこの距離（チェビシェフ距離）以内のマスだけを候補にする
pub const CANDIDATE_RADIUS: usize = 2;

/// ルート局面から最善手を探索する
///
/// 候補手を「即勝ち → 即ブロック → 浅い評価の降順」に並べ、
/// 上位 breadth 手だけをアルファベータ付きネガマックスで展開する。
pub fn search_best(
    board: &Board,
    blocked: &HashMap<Position, u32>,
    candidates: &[Position],
    cpu_piece: Piece,
    win_length: usize,
    weights: &PatternWeights,
    depth: u32,
    breadth: usize,
) -> Option<Position> {
    let mut scratch = board.clone();
    let opponent = cpu_piece.opposite();
    let ordered = order_moves(&mut scratch, blocked, candidates, cpu_piece, win_length, weights);

    let mut alpha = f32::NEG_INFINITY;
    let beta = f32::INFINITY;
    let mut best_move = None;
    let mut best_value = f32::NEG_INFINITY;

    for &position in ordered.iter().take(breadth) {
        scratch.set(position, cpu_piece.to_cell());
        let value = -negamax(
            &mut scratch,
            blocked,
            depth.saturating_sub(1),
            -beta,
            -alpha,
            opponent,
            win_length,
            weights,
        );
        scratch.set(position, Cell::Empty);

        if value > best_value {
            best_value = value;
            best_move = Some(position);
        }
        if value > alpha {
            alpha = value;
        }
        if alpha >= beta {
            break;
        }
    }

    best_move
}

/// 符号反転で2人零和を1本の再帰にまとめたミニマックス
/// 戻り値は手番側（me）から見た評価値
fn negamax(
    board: &mut Board,
    blocked: &HashMap<Position, u32>,
    depth: u32,
    mut alpha: f32,
    beta: f32,
    me: Piece,
    win_length: usize,
    weights: &PatternWeights,
) -> f32 {
    let opponent = me.opposite();

    // 盤上に完成済みの連があれば即終端
    if has_win_anywhere(board, me, win_length) {
        return weights.five;
    }
    if has_win_anywhere(board, opponent, win_length) {
        return -weights.five;
    }
    if depth == 0 {
        return BoardEvaluator::evaluate(board, blocked, me, win_length, weights);
    }

    let mut moves = pruned_moves(board, blocked, CANDIDATE_RADIUS);
    if moves.is_empty() {
        return 0.0;
    }
    sort_by_shallow_score(board, blocked, &mut moves, me, win_length, weights);

    let mut best = f32::NEG_INFINITY;
    for &position in moves.iter().take(NODE_BREADTH) {
        board.set(position, me.to_cell());
        let value = -negamax(board, blocked, depth - 1, -beta, -alpha, opponent, win_length, weights);
        board.set(position, Cell::Empty);

        if value > best {
            best = value;
        }
        if best > alpha {
            alpha = best;
        }
        if alpha >= beta {
            break;
        }
    }
    best
}

/// 指定位置に駒を置いたら勝ちになるかを仮置きでチェックする
pub(crate) fn winning_if_place(
    board: &mut Board,
    position: Position,
    piece: Piece,
    win_length: usize,
) -> bool {
    if !board.is_empty_at(position) {
        return false;
    }
    board.set(position, piece.to_cell());
    let won = board.is_win_from(position, piece, win_length);
    board.set(position, Cell::Empty);
    won
}

/// 盤上のどこかに完成済みの連があるかチェックする
pub(crate) fn has_win_anywhere(board: &Board, piece: Piece, win_length: usize) -> bool {
    board
        .stone_positions()
        .into_iter()
        .filter(|&p| board.get(p) == Some(piece.to_cell()))
        .any(|p| board.is_win_from(p, piece, win_length))
}

/// 探索ノード用の候補手生成
/// 既存の石の近傍にある空きマス（ブロック除外）を行優先順で返す。
/// 石が1つも無ければ中央の1手のみを返す
fn pruned_moves(board: &Board, blocked: &HashMap<Position, u32>, radius: usize) -> Vec<Position> {
    let n = board.size();
    let stones = board.stone_positions();
    if stones.is_empty() {
        return vec![Position::new(n / 2, n / 2)];
    }

    let radius = radius as i64;
    let mut moves = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let position = Position::new(row, col);
            if !board.is_empty_at(position) || blocked.contains_key(&position) {
                continue;
            }
            let near_stone = stones.iter().any(|s| {
                (s.row as i64 - row as i64).abs() <= radius
                    && (s.col as i64 - col as i64).abs() <= radius
            });
            if near_stone {
                moves.push(position);
            }
        }
    }
    moves
}

/// 仮置き1手ぶんの浅い評価値を返す
fn shallow_score(
    board: &mut Board,
    blocked: &HashMap<Position, u32>,
    position: Position,
    piece: Piece,
    win_length: usize,
    weights: &PatternWeights,
) -> f32 {
    board.set(position, piece.to_cell());
    let value = BoardEvaluator::evaluate(board, blocked, piece, win_length, weights);
    board.set(position, Cell::Empty);
    value
}

/// 候補手を浅い評価値の降順に並べ替える（安定ソート）
fn sort_by_shallow_score(
    board: &mut Board,
    blocked: &HashMap<Position, u32>,
    moves: &mut [Position],
    piece: Piece,
    win_length: usize,
    weights: &PatternWeights,
) {
    let mut scored: Vec<(Position, f32)> = moves
        .iter()
        .map(|&p| (p, shallow_score(board, blocked, p, piece, win_length, weights)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (slot, (position, _)) in moves.iter_mut().zip(scored) {
        *slot = position;
    }
}

/// ルート用の並べ替え: 即勝ち → 相手の即勝ちブロック → 浅い評価の降順
fn order_moves(
    board: &mut Board,
    blocked: &HashMap<Position, u32>,
    moves: &[Position],
    me: Piece,
    win_length: usize,
    weights: &PatternWeights,
) -> Vec<Position> {
    let opponent = me.opposite();
    let mut wins = Vec::new();
    let mut blocks = Vec::new();
    let mut rest = Vec::new();

    for &position in moves {
        if winning_if_place(board, position, me, win_length) {
            wins.push(position);
        } else if winning_if_place(board, position, opponent, win_length) {
            blocks.push(position);
        } else {
            rest.push(position);
        }
    }

    sort_by_shallow_score(board, blocked, &mut rest, me, win_length, weights);

    let mut ordered = wins;
    ordered.extend(blocks);
    ordered.extend(rest);
    ordered
}
