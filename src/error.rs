//! アプリケーション全体のエラー定義モジュール
//! ゲームルール、CPU思考、永続化のエラーを統一管理。

use thiserror::Error;

/// ゲームルールに関連するエラー
/// 不正な操作は全て理由付きでこのenumとして報告される（panicしない）
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },

    #[error("Cell ({row}, {col}) is already occupied")]
    CellOccupied { row: usize, col: usize },

    #[error("Cell ({row}, {col}) is blocked")]
    CellBlocked { row: usize, col: usize },

    #[error("No skill points available")]
    NoSkillPoints,

    #[error("Game already finished")]
    GameFinished,

    #[error("No eligible move to undo")]
    NoEligibleMove,

    #[error("CPU calculation failed: {source}")]
    AIError {
        #[from]
        source: AIError,
    },

    #[error("Persistence error: {source}")]
    PersistenceError {
        #[from]
        source: PersistenceError,
    },
}

/// CPU思考エンジンに関連するエラー
#[derive(Debug, Error)]
pub enum AIError {
    #[error("No valid moves available")]
    NoValidMoves,

    #[error("CPU strategy error: {message}")]
    StrategyError { message: String },
}

/// データ永続化に関連するエラー
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("File I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },
}

/// ゲームエラーをベースとした結果型
pub type Result<T> = std::result::Result<T, GameError>;
