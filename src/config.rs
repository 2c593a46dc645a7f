//! アプリケーション設定管理モジュール
//! 対局ルール、CPU、履歴保存先の設定を
//! 設定ファイルと環境変数から読み込んで管理する。

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::ai::strategies::Difficulty;

/// 対局ルールの設定を管理する構造体
/// 盤サイズ、持ち時間、マッチ形式を含む
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// 選択可能な盤サイズの一覧
    pub allowed_board_sizes: Vec<usize>,
    pub board_size: usize,
    /// 1手あたりの持ち時間（秒）
    pub per_move_seconds: f32,
    /// マッチの総ゲーム数（奇数）
    pub best_of: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            allowed_board_sizes: vec![3, 5, 7, 9, 13, 15, 19],
            board_size: 13,
            per_move_seconds: 20.0,
            best_of: 1,
        }
    }
}

/// CPU対戦の設定を管理する構造体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuConfig {
    pub difficulty: Difficulty,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
        }
    }
}

/// 対戦履歴の保存先設定を管理する構造体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub history_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_dir: "data/match_history".to_string(),
        }
    }
}

/// アプリケーションの全設定を統合するメイン設定構造体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub rules: RulesConfig,
    pub cpu: CpuConfig,
    pub storage: StorageConfig,
}

/// 設定関連のエラーを表すenum
/// ファイル読み込み、パース、検証エラーなどを含む
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("設定ファイル読み込みエラー: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("設定ファイル解析エラー: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("環境変数エラー: {name} = {value}")]
    EnvVarError { name: String, value: String },

    #[error("設定値が無効です: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl Config {
    /// 指定したファイルパスから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 環境変数から設定を読み込む
    /// デフォルト値をベースに環境変数で上書きする
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.override_from_env()?;
        Ok(config)
    }

    fn override_from_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(board_size) = env::var("GOMOKU_BOARD_SIZE") {
            self.rules.board_size = board_size.parse().map_err(|_| ConfigError::EnvVarError {
                name: "GOMOKU_BOARD_SIZE".to_string(),
                value: board_size,
            })?;
        }

        if let Ok(seconds) = env::var("GOMOKU_PER_MOVE_SECONDS") {
            self.rules.per_move_seconds =
                seconds.parse().map_err(|_| ConfigError::EnvVarError {
                    name: "GOMOKU_PER_MOVE_SECONDS".to_string(),
                    value: seconds,
                })?;
        }

        if let Ok(best_of) = env::var("GOMOKU_BEST_OF") {
            self.rules.best_of = best_of.parse().map_err(|_| ConfigError::EnvVarError {
                name: "GOMOKU_BEST_OF".to_string(),
                value: best_of,
            })?;
        }

        if let Ok(difficulty) = env::var("GOMOKU_DIFFICULTY") {
            self.cpu.difficulty = match difficulty.to_lowercase().as_str() {
                "easy" => Difficulty::Easy,
                "medium" => Difficulty::Medium,
                "hard" => Difficulty::Hard,
                _ => {
                    return Err(ConfigError::EnvVarError {
                        name: "GOMOKU_DIFFICULTY".to_string(),
                        value: difficulty,
                    })
                }
            };
        }

        if let Ok(history_dir) = env::var("GOMOKU_HISTORY_DIR") {
            self.storage.history_dir = history_dir;
        }

        Ok(())
    }

    /// 設定ファイルと環境変数を結合して設定を読み込む
    /// 設定ファイルがなくてもデフォルト値で動作する
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Ok(file_config) = Self::from_file("gomoku.json") {
            config = file_config;
        } else if let Ok(file_config) = Self::from_file("config/gomoku.json") {
            config = file_config;
        }

        // 環境変数で設定を上書き
        let _ = config.override_from_env();

        config
    }

    /// 現在の設定を指定したファイルに保存する
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定値の妥当性をチェックする
    /// 不正な値がある場合はConfigErrorを返す
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rules.allowed_board_sizes.contains(&self.rules.board_size) {
            return Err(ConfigError::InvalidValue {
                field: "rules.board_size".to_string(),
                value: self.rules.board_size.to_string(),
            });
        }

        if self.rules.per_move_seconds <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "rules.per_move_seconds".to_string(),
                value: self.rules.per_move_seconds.to_string(),
            });
        }

        if self.rules.best_of == 0 || self.rules.best_of % 2 == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rules.best_of".to_string(),
                value: self.rules.best_of.to_string(),
            });
        }

        Ok(())
    }
}
