//! 対戦履歴の永続化モジュール
//! 勝利確定時にエンジンから引き渡されるレコードを、メタデータヘッダ付きの
//! CSV（1行 = 1手番ペア）として書き出す。コア状態には一切触れない。

use crate::error::PersistenceError;
use crate::game::{ActionKind, Move};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// 勝利確定時にエンジンが組み立てる引き渡しデータ
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub match_id: String,
    pub match_date: DateTime<Utc>,
    pub player1_id: String,
    pub player1_name: String,
    pub player2_id: String,
    pub player2_name: String,
    pub moves: Vec<Move>,
    pub winner: Option<String>,
    pub board_size: usize,
    pub time_per_move: u32,
}

/// 対戦履歴ストアの共通インターフェース
/// テストではインメモリ実装に差し替えられる
pub trait MatchHistoryStore: Send + Sync {
    fn save(&self, record: &MatchRecord) -> Result<(), PersistenceError>;
}

/// CSVフィールドをエスケープする
/// カンマ・引用符・改行を含む場合のみ引用符で囲む
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

/// CSVファイルベースの対戦履歴ストア
#[derive(Debug, Clone)]
pub struct CsvMatchHistoryStore {
    dir: PathBuf,
}

impl CsvMatchHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, match_id: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", match_id))
    }

    /// 保存済みのマッチID一覧を新しい順で返す
    /// マッチIDにはタイムスタンプが埋め込まれているため名前順 = 日付順になる
    pub fn list_matches(&self) -> Result<Vec<String>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut match_ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match_ids.push(stem.to_string());
                }
            }
        }

        match_ids.sort();
        match_ids.reverse();
        Ok(match_ids)
    }

    /// レコードをCSV文字列に変換する
    ///
    /// 形式: メタデータのヘッダブロック、空行、列ヘッダ、
    /// そして手番ごとに両プレイヤーの [通し番号, row, col] を並べた行。
    /// 手番表にはStoneレコードのみ載せる（Block/Undoは石と同じ turn_no を
    /// 共有するため、手番キーの表では衝突する）。
    fn render(record: &MatchRecord) -> String {
        let mut p1_moves: BTreeMap<u32, &Move> = BTreeMap::new();
        let mut p2_moves: BTreeMap<u32, &Move> = BTreeMap::new();
        for mv in record.moves.iter().filter(|m| m.action == ActionKind::Stone) {
            if mv.player_id == record.player1_id {
                p1_moves.insert(mv.turn_no, mv);
            } else {
                p2_moves.insert(mv.turn_no, mv);
            }
        }
        let max_turn = p1_moves
            .keys()
            .chain(p2_moves.keys())
            .copied()
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        out.push_str(&csv_row(&["Match History"]));
        out.push_str(&csv_row(&["Match ID", &record.match_id]));
        out.push_str(&csv_row(&["Date", &record.match_date.to_rfc3339()]));
        out.push_str(&csv_row(&["Player 1", &record.player1_name]));
        out.push_str(&csv_row(&["Player 2", &record.player2_name]));
        out.push_str(&csv_row(&[
            "Board Size",
            &format!("{}x{}", record.board_size, record.board_size),
        ]));
        out.push_str(&csv_row(&["Time per Move", &format!("{}s", record.time_per_move)]));
        if let Some(winner) = &record.winner {
            out.push_str(&csv_row(&["Winner", winner]));
        }
        out.push('\n');

        out.push_str(&csv_row(&[
            "Timestamp",
            &format!("{} Moves", record.player1_name),
            &format!("{} Moves", record.player2_name),
        ]));

        let mut move_count = 0;
        for turn in 1..=max_turn {
            let mut timestamp = String::new();
            let mut p1_cell = String::new();
            let mut p2_cell = String::new();

            if let Some(mv) = p1_moves.get(&turn) {
                timestamp = mv.timestamp.to_rfc3339();
                move_count += 1;
                p1_cell = format!("[{}, {}, {}]", move_count, mv.position.row, mv.position.col);
            }
            if let Some(mv) = p2_moves.get(&turn) {
                if timestamp.is_empty() {
                    timestamp = mv.timestamp.to_rfc3339();
                }
                move_count += 1;
                p2_cell = format!("[{}, {}, {}]", move_count, mv.position.row, mv.position.col);
            }

            if !p1_cell.is_empty() || !p2_cell.is_empty() {
                out.push_str(&csv_row(&[&timestamp, &p1_cell, &p2_cell]));
            }
        }

        out
    }
}

impl MatchHistoryStore for CsvMatchHistoryStore {
    fn save(&self, record: &MatchRecord) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let content = Self::render(record);
        fs::write(self.path_for(&record.match_id), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Piece, Position};
    use tempfile::TempDir;

    fn sample_record() -> MatchRecord {
        let moves = vec![
            Move::new(1, "p1", "Ali", Piece::X, Position::new(4, 4), ActionKind::Stone),
            Move::new(2, "p2", "Bob", Piece::O, Position::new(3, 3), ActionKind::Stone),
            Move::new(2, "p2", "Bob", Piece::O, Position::new(0, 0), ActionKind::Block),
            Move::new(3, "p1", "Ali", Piece::X, Position::new(4, 5), ActionKind::Stone),
        ];
        MatchRecord {
            match_id: "match_20260823_120000".to_string(),
            match_date: Utc::now(),
            player1_id: "p1".to_string(),
            player1_name: "Ali".to_string(),
            player2_id: "p2".to_string(),
            player2_name: "Bob".to_string(),
            moves,
            winner: Some("Ali".to_string()),
            board_size: 9,
            time_per_move: 20,
        }
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("[1, 4, 4]"), "\"[1, 4, 4]\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_metadata_block() {
        let content = CsvMatchHistoryStore::render(&sample_record());

        assert!(content.starts_with("Match History\n"));
        assert!(content.contains("Match ID,match_20260823_120000\n"));
        assert!(content.contains("Player 1,Ali\n"));
        assert!(content.contains("Player 2,Bob\n"));
        assert!(content.contains("Board Size,9x9\n"));
        assert!(content.contains("Time per Move,20s\n"));
        assert!(content.contains("Winner,Ali\n"));
        assert!(content.contains("Timestamp,Ali Moves,Bob Moves\n"));
    }

    #[test]
    fn test_render_turn_rows_skip_non_stone_actions() {
        let content = CsvMatchHistoryStore::render(&sample_record());

        // 石の3手だけが通し番号を持ち、Blockレコードは表に出ない
        assert!(content.contains("\"[1, 4, 4]\""));
        assert!(content.contains("\"[2, 3, 3]\""));
        assert!(content.contains("\"[3, 4, 5]\""));
        assert!(!content.contains("[2, 0, 0]"));
    }

    #[test]
    fn test_render_without_winner() {
        let mut record = sample_record();
        record.winner = None;
        let content = CsvMatchHistoryStore::render(&record);
        assert!(!content.contains("Winner"));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = CsvMatchHistoryStore::new(dir.path());
        let record = sample_record();

        store.save(&record).unwrap();

        let path = store.path_for(&record.match_id);
        assert!(path.exists());
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Match ID,match_20260823_120000"));
    }

    #[test]
    fn test_list_matches_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = CsvMatchHistoryStore::new(dir.path());

        for id in ["match_20260101_090000", "match_20260301_090000", "match_20260201_090000"] {
            let mut record = sample_record();
            record.match_id = id.to_string();
            store.save(&record).unwrap();
        }

        let listed = store.list_matches().unwrap();
        assert_eq!(
            listed,
            vec![
                "match_20260301_090000".to_string(),
                "match_20260201_090000".to_string(),
                "match_20260101_090000".to_string(),
            ]
        );
    }

    #[test]
    fn test_list_matches_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = CsvMatchHistoryStore::new(dir.path().join("nothing_here"));
        assert!(store.list_matches().unwrap().is_empty());
    }
}
