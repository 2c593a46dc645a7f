//! ゲーム状態管理モジュール
//! 1ゲーム分の状態（盤面、ブロック期限、履歴、手番、持ち時間など）を管理する。

use super::board::Board;
use super::types::{Move, Piece, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Position をキーに持つマップはJSONのオブジェクトキーにできないため、
/// (座標, 期限) のペア一覧としてシリアライズするモジュール
mod blocked_serde {
    use super::Position;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S>(map: &HashMap<Position, u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut entries: Vec<(Position, u32)> = map.iter().map(|(p, t)| (*p, *t)).collect();
        entries.sort_by_key(|(p, _)| (p.row, p.col));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<Position, u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<(Position, u32)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// 1ゲーム分の全体状態を保持する構造体
/// 所有者はEngineのみで、CPU側には読み取り専用で渡される
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub id: Uuid,
    pub board: Board,
    /// 座標 → ブロックが失効する global_turn 値
    #[serde(with = "blocked_serde")]
    pub blocked_expiry: HashMap<Position, u32>,
    pub history: Vec<Move>,
    /// 手番のプレイヤーインデックス（0 または 1）
    pub current_idx: usize,
    /// 石の配置ごとに1増える通し手番（ブロック・undoでは増えない）
    pub global_turn: u32,
    pub per_move_seconds: f32,
    pub remaining_seconds: f32,
    pub winner_piece: Option<Piece>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl GameState {
    /// 新しいゲーム状態を作成する
    /// 初期状態: 空盤面、プレイヤー0の手番、持ち時間は満タン
    pub fn new(board_size: usize, per_move_seconds: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            board: Board::new(board_size),
            blocked_expiry: HashMap::new(),
            history: Vec::new(),
            current_idx: 0,
            global_turn: 0,
            per_move_seconds,
            remaining_seconds: per_move_seconds,
            winner_piece: None,
            created_at: Utc::now(),
            last_updated: Utc::now(),
        }
    }

    /// 勝利に必要な連続数を返す
    /// 小さい盤面でも決着が付くように min(5, 盤面サイズ) とする
    pub fn win_length(&self) -> usize {
        5.min(self.board.size())
    }

    pub fn board_size(&self) -> usize {
        self.board.size()
    }

    /// 勝者が確定しているかチェックする
    pub fn is_finished(&self) -> bool {
        self.winner_piece.is_some()
    }

    /// 指定した位置に有効なブロックがあるかチェックする
    pub fn is_blocked(&self, position: Position) -> bool {
        self.blocked_expiry.contains_key(&position)
    }

    /// 石もブロックも無い、配置可能なマスかチェックする
    pub fn is_cell_open(&self, position: Position) -> bool {
        self.board.is_empty_at(position) && !self.is_blocked(position)
    }

    /// 手番を交代する
    pub fn switch_player(&mut self) {
        self.current_idx = 1 - self.current_idx;
        self.last_updated = Utc::now();
    }

    /// 履歴に新しいレコードを追加する
    pub fn add_move(&mut self, game_move: Move) {
        self.history.push(game_move);
        self.last_updated = Utc::now();
    }
}
