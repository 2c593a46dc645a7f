//! CPUの盤面評価システム
//! 盤面の行・列・両斜めを1次元の並びとして走査し、連の長さと
//! 両端の開き具合から点数を付けるパターン評価を提供する。

use crate::game::{Board, Cell, Piece, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// パターン評価の重みテーブル
/// 値を調整することでCPUの性格を変えられる
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternWeights {
    /// 勝利確定（win_length 以上の連）
    pub five: f32,
    /// 両端の開いた4連
    pub open_four: f32,
    /// 片端以下しか開いていない4連
    pub closed_four: f32,
    pub open_three: f32,
    pub closed_three: f32,
    pub open_two: f32,
    pub closed_two: f32,
    /// 孤立した1石
    pub single: f32,
    /// 相手の脅威をやや重く見る係数（ブロック寄りの性格になる）
    pub opponent_factor: f32,
    /// 中央寄りの石に与えるボーナスの強さ
    pub centrality: f32,
}

impl Default for PatternWeights {
    fn default() -> Self {
        Self {
            five: 1_000_000.0,
            open_four: 100_000.0,
            closed_four: 40_000.0,
            open_three: 5_000.0,
            closed_three: 800.0,
            open_two: 200.0,
            closed_two: 60.0,
            single: 10.0,
            opponent_factor: 1.15,
            centrality: 0.3,
        }
    }
}

/// 1次元走査用のセル表現
/// ブロックと盤端は壁として扱い、連を途切れさせ開端にも数えない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineCell {
    Empty,
    Wall,
    Stone(Piece),
}

/// 盤面評価を行うスタティックメソッド集
pub struct BoardEvaluator;

impl BoardEvaluator {
    /// 指定した駒側から見た盤面の総合評価値を計算する
    /// 正の値が有利。自分の得点 − opponent_factor × 相手の得点 に
    /// 中央寄りボーナスを加えた値を返す
    pub fn evaluate(
        board: &Board,
        blocked: &HashMap<Position, u32>,
        me: Piece,
        win_length: usize,
        weights: &PatternWeights,
    ) -> f32 {
        let opponent = me.opposite();
        let lines = Self::collect_lines(board, blocked);

        let mut my_score = 0.0;
        let mut opponent_score = 0.0;
        for line in &lines {
            my_score += Self::score_line(line, me, win_length, weights);
            opponent_score += Self::score_line(line, opponent, win_length, weights);
        }

        my_score - weights.opponent_factor * opponent_score
            + Self::centrality_bias(board, me, weights)
    }

    fn encode(board: &Board, blocked: &HashMap<Position, u32>, row: usize, col: usize) -> LineCell {
        let position = Position::new(row, col);
        if blocked.contains_key(&position) {
            return LineCell::Wall;
        }
        match board.get(position) {
            Some(Cell::X) => LineCell::Stone(Piece::X),
            Some(Cell::O) => LineCell::Stone(Piece::O),
            _ => LineCell::Empty,
        }
    }

    /// 行・列・斜め（／と＼の両ファミリ）を独立した1次元の並びとして集める
    fn collect_lines(board: &Board, blocked: &HashMap<Position, u32>) -> Vec<Vec<LineCell>> {
        let n = board.size();
        let mut lines = Vec::new();

        // 行
        for row in 0..n {
            lines.push((0..n).map(|col| Self::encode(board, blocked, row, col)).collect());
        }
        // 列
        for col in 0..n {
            lines.push((0..n).map(|row| Self::encode(board, blocked, row, col)).collect());
        }
        // 斜め（／方向）: 左端の各行から右上へ
        for start in 0..n {
            let mut line = Vec::new();
            let (mut r, mut c) = (start as i64, 0i64);
            while r >= 0 && (c as usize) < n {
                line.push(Self::encode(board, blocked, r as usize, c as usize));
                r -= 1;
                c += 1;
            }
            lines.push(line);
        }
        // 斜め（／方向）: 最下行の2列目以降から右上へ
        for start in 1..n {
            let mut line = Vec::new();
            let (mut r, mut c) = ((n - 1) as i64, start as i64);
            while r >= 0 && (c as usize) < n {
                line.push(Self::encode(board, blocked, r as usize, c as usize));
                r -= 1;
                c += 1;
            }
            lines.push(line);
        }
        // 斜め（＼方向）: 左端の各行から右下へ
        for start in 0..n {
            let mut line = Vec::new();
            let (mut r, mut c) = (start, 0);
            while r < n && c < n {
                line.push(Self::encode(board, blocked, r, c));
                r += 1;
                c += 1;
            }
            lines.push(line);
        }
        // 斜め（＼方向）: 最上行の2列目以降から右下へ
        for start in 1..n {
            let mut line = Vec::new();
            let (mut r, mut c) = (0, start);
            while r < n && c < n {
                line.push(Self::encode(board, blocked, r, c));
                r += 1;
                c += 1;
            }
            lines.push(line);
        }

        lines
    }

    /// 1次元の並びの中で指定駒の極大連を探し、(長さ, 開端数) で採点する
    fn score_line(line: &[LineCell], piece: Piece, win_length: usize, w: &PatternWeights) -> f32 {
        let target = LineCell::Stone(piece);
        let n = line.len();
        let mut score = 0.0;
        let mut i = 0;

        while i < n {
            if line[i] != target {
                i += 1;
                continue;
            }
            let mut j = i;
            while j < n && line[j] == target {
                j += 1;
            }
            let run_length = j - i;
            let left = if i > 0 { line[i - 1] } else { LineCell::Wall };
            let right = if j < n { line[j] } else { LineCell::Wall };
            let open_ends =
                (left == LineCell::Empty) as usize + (right == LineCell::Empty) as usize;

            score += if run_length >= win_length {
                w.five
            } else {
                match (run_length, open_ends == 2) {
                    (4, true) => w.open_four,
                    (4, false) => w.closed_four,
                    (3, true) => w.open_three,
                    (3, false) => w.closed_three,
                    (2, true) => w.open_two,
                    (2, false) => w.closed_two,
                    _ => w.single,
                }
            };
            i = j;
        }

        score
    }

    /// 中央に近い石ほど効果が大きくなる小さなバイアス
    /// 自分の石は加点、相手の石は減点
    fn centrality_bias(board: &Board, me: Piece, w: &PatternWeights) -> f32 {
        let n = board.size();
        let center = (n as f32 - 1.0) / 2.0;
        let mut bias = 0.0;

        for position in board.stone_positions() {
            let distance =
                (position.row as f32 - center).abs() + (position.col as f32 - center).abs();
            let value = w.centrality / (1.0 + distance);
            match board.get(position) {
                Some(cell) if cell == me.to_cell() => bias += value,
                Some(_) => bias -= value,
                None => {}
            }
        }

        bias
    }
}
