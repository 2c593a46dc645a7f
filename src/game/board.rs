//! 盤面状態を管理するモジュール
//! N×Nグリッドの石の配置と、置いたマスからの勝利判定スキャンを担当する。

use super::types::{Cell, Piece, Position};
use serde::{Deserialize, Serialize};

/// 勝利判定でスキャンする4軸（縦、横、斜め、逆斜め）
const AXES: [(i64, i64); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// N×N盤面を表現する構造体
/// セルは row * N + col でインデックスするフラット配列で保持する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// 指定サイズの空盤面を作成する
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 指定した位置のセル状態を取得する
    /// 範囲外の場合はNoneを返す
    pub fn get(&self, position: Position) -> Option<Cell> {
        if position.in_bounds(self.size) {
            Some(self.cells[position.row * self.size + position.col])
        } else {
            None
        }
    }

    /// 指定した位置にセル状態を設定する
    /// 範囲外の場合はfalseを返す
    pub fn set(&mut self, position: Position, cell: Cell) -> bool {
        if position.in_bounds(self.size) {
            self.cells[position.row * self.size + position.col] = cell;
            true
        } else {
            false
        }
    }

    /// 指定した位置に石が無いかチェックする
    pub fn is_empty_at(&self, position: Position) -> bool {
        matches!(self.get(position), Some(Cell::Empty))
    }

    /// 盤面上のX石とO石の数を数える
    /// 戻り値: (X石数, O石数)
    pub fn count_pieces(&self) -> (u32, u32) {
        let mut x_count = 0;
        let mut o_count = 0;

        for &cell in &self.cells {
            match cell {
                Cell::X => x_count += 1,
                Cell::O => o_count += 1,
                Cell::Empty => {}
            }
        }

        (x_count, o_count)
    }

    /// 盤面に石が1つでも置かれているかチェックする
    pub fn has_stones(&self) -> bool {
        self.cells.iter().any(|&cell| cell != Cell::Empty)
    }

    /// 石の置かれている座標を行優先順で全て返す
    pub fn stone_positions(&self) -> Vec<Position> {
        let mut positions = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                if self.cells[row * self.size + col] != Cell::Empty {
                    positions.push(Position::new(row, col));
                }
            }
        }
        positions
    }

    /// (r, c) から (dr, dc) 方向に同じ駒が連続する数を数える
    /// 盤端または異なるセルで停止する
    fn count_run(&self, mut r: i64, mut c: i64, dr: i64, dc: i64, piece: Piece) -> usize {
        let n = self.size as i64;
        let target = piece.to_cell();
        let mut count = 0;
        while r >= 0 && r < n && c >= 0 && c < n && self.cells[(r * n + c) as usize] == target {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// 置いたマスを起点に4軸をスキャンして勝利判定する
    /// 各軸で後方と前方（起点を含む）の連続数を合計し、win_length以上なら勝ち
    pub fn is_win_from(&self, position: Position, piece: Piece, win_length: usize) -> bool {
        let (r, c) = (position.row as i64, position.col as i64);
        for &(dr, dc) in &AXES {
            let back = self.count_run(r - dr, c - dc, -dr, -dc, piece);
            let forward = self.count_run(r, c, dr, dc, piece);
            if back + forward >= win_length {
                return true;
            }
        }
        false
    }

    /// デバッグ用の盤面表示文字列を生成する
    /// Xで先手、Oで後手、.で空マスを表現
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..self.size {
            for col in 0..self.size {
                let symbol = match self.cells[row * self.size + col] {
                    Cell::Empty => '.',
                    Cell::X => 'X',
                    Cell::O => 'O',
                };
                result.push(symbol);
                result.push(' ');
            }
            result.push('\n');
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_new_all_empty() {
        let board = Board::new(9);

        assert_eq!(board.size(), 9);
        assert_eq!(board.count_pieces(), (0, 0));
        assert!(!board.has_stones());
        assert_eq!(board.get(Position::new(4, 4)), Some(Cell::Empty));
    }

    #[test]
    fn test_board_get_out_of_bounds() {
        let board = Board::new(5);
        assert_eq!(board.get(Position::new(5, 0)), None);
        assert_eq!(board.get(Position::new(0, 5)), None);
    }

    #[test]
    fn test_board_set_and_get() {
        let mut board = Board::new(5);
        let pos = Position::new(2, 3);

        assert!(board.set(pos, Cell::X));
        assert_eq!(board.get(pos), Some(Cell::X));
        assert!(!board.is_empty_at(pos));
    }

    #[test]
    fn test_board_set_out_of_bounds() {
        let mut board = Board::new(5);
        assert!(!board.set(Position::new(5, 0), Cell::X));
    }

    #[test]
    fn test_board_count_and_positions() {
        let mut board = Board::new(5);
        board.set(Position::new(0, 0), Cell::X);
        board.set(Position::new(1, 1), Cell::O);
        board.set(Position::new(2, 2), Cell::X);

        assert_eq!(board.count_pieces(), (2, 1));
        assert!(board.has_stones());
        assert_eq!(
            board.stone_positions(),
            vec![Position::new(0, 0), Position::new(1, 1), Position::new(2, 2)]
        );
    }

    #[test]
    fn test_is_win_from_horizontal() {
        let mut board = Board::new(9);
        for col in 0..5 {
            board.set(Position::new(3, col), Cell::X);
        }

        // 端の石からでも中央の石からでも同じ列が検出される
        assert!(board.is_win_from(Position::new(3, 0), Piece::X, 5));
        assert!(board.is_win_from(Position::new(3, 2), Piece::X, 5));
        assert!(board.is_win_from(Position::new(3, 4), Piece::X, 5));
        assert!(!board.is_win_from(Position::new(3, 2), Piece::O, 5));
    }

    #[test]
    fn test_is_win_from_four_is_not_enough() {
        let mut board = Board::new(9);
        for col in 0..4 {
            board.set(Position::new(0, col), Cell::O);
        }
        assert!(!board.is_win_from(Position::new(0, 3), Piece::O, 5));
    }

    #[test]
    fn test_is_win_from_diagonals() {
        let mut board = Board::new(9);
        for i in 0..5 {
            board.set(Position::new(i, i), Cell::O);
        }
        assert!(board.is_win_from(Position::new(2, 2), Piece::O, 5));

        let mut board = Board::new(9);
        for i in 0..5 {
            board.set(Position::new(i, 8 - i), Cell::X);
        }
        assert!(board.is_win_from(Position::new(0, 8), Piece::X, 5));
    }

    #[test]
    fn test_is_win_from_interrupted_run() {
        let mut board = Board::new(9);
        board.set(Position::new(5, 0), Cell::X);
        board.set(Position::new(5, 1), Cell::X);
        board.set(Position::new(5, 2), Cell::O);
        board.set(Position::new(5, 3), Cell::X);
        board.set(Position::new(5, 4), Cell::X);
        board.set(Position::new(5, 5), Cell::X);

        assert!(!board.is_win_from(Position::new(5, 1), Piece::X, 5));
        assert!(!board.is_win_from(Position::new(5, 4), Piece::X, 5));
    }

    #[test]
    fn test_is_win_from_tiny_board() {
        // 3x3盤では3連で勝ち（win_length = min(5, 3)）
        let mut board = Board::new(3);
        for i in 0..3 {
            board.set(Position::new(i, 0), Cell::X);
        }
        assert!(board.is_win_from(Position::new(1, 0), Piece::X, 3));
    }

    #[test]
    fn test_board_display() {
        let mut board = Board::new(3);
        board.set(Position::new(0, 0), Cell::X);
        board.set(Position::new(1, 1), Cell::O);

        let display = board.display();
        assert!(display.starts_with("X . . "));
        assert!(display.contains("O"));
    }
}
