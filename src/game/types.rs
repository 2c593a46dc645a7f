//! ゲームの基本型定義モジュール
//! 五目並べ（スキル拡張版）で使用される基本的な型とenum、構造体を定義する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 盤面の各マスの状態を表現するenum
/// ブロックはマスの値ではなく、GameState側の期限マップで別管理する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    X,
    O,
}

/// プレイヤーに割り当てられる駒マーカーを表すenum
/// 先手はX、後手はO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    X,
    O,
}

impl Piece {
    /// 相手側の駒マーカーを返す
    pub fn opposite(self) -> Piece {
        match self {
            Piece::X => Piece::O,
            Piece::O => Piece::X,
        }
    }

    /// 駒マーカーを対応するセル状態に変換する
    pub fn to_cell(self) -> Cell {
        match self {
            Piece::X => Cell::X,
            Piece::O => Cell::O,
        }
    }
}

/// 履歴レコードの操作種別を表すenum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// 石の配置
    Stone,
    /// ブロックタイルの設置
    Block,
    /// 自分の直近の石の取り消し
    Undo,
}

/// 盤面上の座標を表す構造体
/// 盤面サイズは可変（3〜19）のため、範囲チェックはサイズを渡して行う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    /// 座標が指定サイズの盤面内かチェックする
    pub fn in_bounds(&self, board_size: usize) -> bool {
        self.row < board_size && self.col < board_size
    }
}

/// 対戦参加者のプロフィールと可変カウンタを保持する構造体
/// 1マッチにつき1回生成され、石の配置に応じてエンジンが更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub pid: String,
    pub full_name: String,
    pub nickname: String,
    pub piece: Piece,
    pub stones_placed: u32,
    pub skill_points: u32,
}

impl Player {
    /// カウンタをゼロに初期化した新しいプレイヤーを作成する
    pub fn new(
        pid: impl Into<String>,
        full_name: impl Into<String>,
        nickname: impl Into<String>,
        piece: Piece,
    ) -> Self {
        Self {
            pid: pid.into(),
            full_name: full_name.into(),
            nickname: nickname.into(),
            piece,
            stones_placed: 0,
            skill_points: 0,
        }
    }

    /// 表示名を返す（ニックネーム優先、未設定ならフルネーム）
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.full_name
        } else {
            &self.nickname
        }
    }
}

/// ゲームの1操作を表現する履歴レコード
/// 状態を変える操作のたびに追記され、undo以外では削除されない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub turn_no: u32,
    pub player_id: String,
    pub player_name: String,
    pub piece: Piece,
    pub position: Position,
    pub action: ActionKind,
    pub timestamp: DateTime<Utc>,
}

impl Move {
    /// 新しい履歴レコードを作成する
    /// タイムスタンプは現在時刻で自動設定される
    pub fn new(
        turn_no: u32,
        player_id: impl Into<String>,
        player_name: impl Into<String>,
        piece: Piece,
        position: Position,
        action: ActionKind,
    ) -> Self {
        Self {
            turn_no,
            player_id: player_id.into(),
            player_name: player_name.into(),
            piece,
            position,
            action,
            timestamp: Utc::now(),
        }
    }
}
