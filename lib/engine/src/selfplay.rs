/*
 * 自对弈评测
 *
 * 每一步都让浅层搜索（depth）预测、深一层搜索（depth + 1）给出标准答案，
 * 记录两者是否一致，然后执行浅层搜索选出的走法。
 * 对局结束后汇总胜负、准确率、混淆矩阵，并可写出两个 CSV 文件。
 */

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use cozy_chess::Color;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::board::{Board, Outcome};
use crate::constant::{ACCURACY_THRESHOLD, BISHOP_HEAVY_FEN, CONFUSION_FILE, MOVE_LOG_FILE};
use crate::error::{EngineError, Result};
use crate::predict::predict;
use crate::search::Window;

#[derive(Clone, Debug)]
pub struct SelfPlayConfig {
    pub depth: u32,
    pub games: u32,
    /// 达到该半回合数仍未结束则判和，None 表示不限
    pub max_plies: Option<u32>,
    pub accuracy_threshold: f64,
    /// 预测一轮使用的窗口策略
    pub window: Window,
    pub start_fen: String,
}

impl SelfPlayConfig {
    pub fn new(depth: u32, games: u32) -> Result<Self> {
        let config = SelfPlayConfig {
            depth,
            games,
            max_plies: None,
            accuracy_threshold: ACCURACY_THRESHOLD,
            window: Window::Threaded,
            start_fen: BISHOP_HEAVY_FEN.to_owned(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_plies(mut self, max_plies: u32) -> Result<Self> {
        self.max_plies = Some(max_plies);
        self.validate()?;
        Ok(self)
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    pub fn with_start_fen(mut self, fen: &str) -> Result<Self> {
        Board::from_fen(fen)?;
        self.start_fen = fen.to_owned();
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> { Err(EngineError::InvalidGameConfiguration(reason.to_owned())) };
        if self.depth == 0 {
            return invalid("search depth must be at least 1");
        }
        if self.games == 0 {
            return invalid("number of games must be at least 1");
        }
        if self.max_plies == Some(0) {
            return invalid("ply limit must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.accuracy_threshold) {
            return invalid("accuracy threshold must be within [0, 1]");
        }
        Ok(())
    }
}

/// 每个半回合一条记录
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionRecord {
    pub game: u32,
    /// 每局从 1 开始的半回合序号
    pub move_number: u32,
    pub player: Color,
    pub predicted: String,
    pub ground_truth: String,
    pub correct: bool,
    pub nodes: u64,
    pub elapsed: Duration,
}

// (标准答案, 预测) -> 次数，按首次出现的顺序保存
#[derive(Clone, Debug, Default)]
pub struct ConfusionMatrix {
    entries: IndexMap<(String, String), u64>,
}

impl ConfusionMatrix {
    pub fn record(&mut self, ground_truth: &str, predicted: &str) {
        *self
            .entries
            .entry((ground_truth.to_owned(), predicted.to_owned()))
            .or_insert(0) += 1;
    }

    pub fn count(&self, ground_truth: &str, predicted: &str) -> u64 {
        self.entries
            .get(&(ground_truth.to_owned(), predicted.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.entries
            .iter()
            .map(|((ground_truth, predicted), &count)| (ground_truth.as_str(), predicted.as_str(), count))
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "ground_truth,predicted,count")?;
        for (ground_truth, predicted, count) in self.iter() {
            writeln!(out, "{},{},{}", ground_truth, predicted, count)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct GameTally {
    pub white_wins: u32,
    pub black_wins: u32,
    pub draws: u32,
}

impl GameTally {
    pub fn record(&mut self, winner: Option<Color>) {
        match winner {
            Some(Color::White) => self.white_wins += 1,
            Some(Color::Black) => self.black_wins += 1,
            None => self.draws += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.white_wins + self.black_wins + self.draws
    }
}

impl fmt::Display for GameTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "1-0: {}, 0-1: {}, 1/2-1/2: {}",
            self.white_wins, self.black_wins, self.draws
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEnd {
    Finished(Outcome),
    /// 达到半回合上限，判和
    PlyLimit,
}

impl GameEnd {
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameEnd::Finished(outcome) => outcome.winner,
            GameEnd::PlyLimit => None,
        }
    }

    pub fn result_text(&self) -> &'static str {
        match self {
            GameEnd::Finished(outcome) => outcome.result_text(),
            GameEnd::PlyLimit => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEnd::Finished(outcome) => write!(f, "{}", outcome.termination),
            GameEnd::PlyLimit => f.write_str("ply limit"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameRecord {
    pub game: u32,
    pub plies: u32,
    pub end: GameEnd,
}

#[derive(Clone, Debug)]
pub struct SelfPlayReport {
    pub records: Vec<PredictionRecord>,
    pub games: Vec<GameRecord>,
    pub tally: GameTally,
    pub confusion: ConfusionMatrix,
    pub accuracy_threshold: f64,
}

impl SelfPlayReport {
    pub fn total_moves(&self) -> usize {
        self.records.len()
    }

    pub fn correct_predictions(&self) -> usize {
        self.records.iter().filter(|r| r.correct).count()
    }

    // 一步都没走时准确率记为 0
    pub fn accuracy(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.correct_predictions() as f64 / self.records.len() as f64
    }

    pub fn below_threshold(&self) -> bool {
        self.accuracy() < self.accuracy_threshold
    }

    pub fn average_nodes(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.records.iter().map(|r| r.nodes as f64).sum::<f64>() / self.records.len() as f64
    }

    pub fn average_time(&self) -> Duration {
        if self.records.is_empty() {
            return Duration::ZERO;
        }
        self.records.iter().map(|r| r.elapsed).sum::<Duration>() / self.records.len() as u32
    }

    pub fn write_move_log<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "game,move,player,predicted,ground_truth,correct,nodes,time_s")?;
        for r in &self.records {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{:.3}",
                r.game,
                r.move_number,
                player_name(r.player),
                r.predicted,
                r.ground_truth,
                r.correct as u8,
                r.nodes,
                r.elapsed.as_secs_f64()
            )?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn write_confusion<W: Write>(&self, out: W) -> Result<()> {
        self.confusion.write_csv(out)
    }

    /// 在 dir 下写出 selfplay_stats.csv 和 confusion_matrix.csv
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.write_move_log(BufWriter::new(File::create(dir.join(MOVE_LOG_FILE))?))?;
        self.write_confusion(BufWriter::new(File::create(dir.join(CONFUSION_FILE))?))?;
        info!(dir = %dir.display(), "self-play logs written");
        Ok(())
    }
}

pub fn player_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

pub fn run_self_play(config: &SelfPlayConfig) -> Result<SelfPlayReport> {
    config.validate()?;
    let mut report = SelfPlayReport {
        records: vec![],
        games: vec![],
        tally: GameTally::default(),
        confusion: ConfusionMatrix::default(),
        accuracy_threshold: config.accuracy_threshold,
    };

    for game in 1..=config.games {
        let record = play_game(config, game, &mut report)?;
        info!(
            game,
            plies = record.plies,
            result = record.end.result_text(),
            end = %record.end,
            "game finished"
        );
        report.tally.record(record.end.winner());
        report.games.push(record);
    }

    if report.below_threshold() {
        warn!(
            accuracy = report.accuracy(),
            threshold = config.accuracy_threshold,
            "prediction accuracy below threshold"
        );
    }
    Ok(report)
}

fn play_game(config: &SelfPlayConfig, game: u32, report: &mut SelfPlayReport) -> Result<GameRecord> {
    let mut board = Board::from_fen(&config.start_fen)?;
    let mut plies = 0;

    let end = loop {
        if let Some(outcome) = board.outcome() {
            break GameEnd::Finished(outcome);
        }
        if config.max_plies.is_some_and(|limit| plies >= limit) {
            break GameEnd::PlyLimit;
        }

        let player = board.side_to_move();
        let prediction = predict(&mut board, config.depth, config.window)?;
        let (Some(predicted), Some(ground_truth)) = (prediction.predicted, prediction.ground_truth) else {
            return Err(EngineError::NoLegalMove);
        };
        let predicted_text = board.move_to_text(predicted);
        let ground_truth_text = board.move_to_text(ground_truth);
        let correct = predicted_text == ground_truth_text;

        plies += 1;
        debug!(
            game,
            ply = plies,
            predicted = %predicted_text,
            ground_truth = %ground_truth_text,
            correct,
            nodes = prediction.nodes,
            "predicted"
        );
        report.confusion.record(&ground_truth_text, &predicted_text);
        report.records.push(PredictionRecord {
            game,
            move_number: plies,
            player,
            predicted: predicted_text,
            ground_truth: ground_truth_text,
            correct,
            nodes: prediction.nodes,
            elapsed: prediction.elapsed,
        });

        board.apply_move(predicted);
    };

    Ok(GameRecord { game, plies, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Termination;

    fn record(game: u32, move_number: u32, predicted: &str, ground_truth: &str, millis: u64) -> PredictionRecord {
        PredictionRecord {
            game,
            move_number,
            player: if move_number % 2 == 1 { Color::White } else { Color::Black },
            predicted: predicted.to_owned(),
            ground_truth: ground_truth.to_owned(),
            correct: predicted == ground_truth,
            nodes: 100 * move_number as u64,
            elapsed: Duration::from_millis(millis),
        }
    }

    fn report_of(records: Vec<PredictionRecord>) -> SelfPlayReport {
        let mut confusion = ConfusionMatrix::default();
        for r in &records {
            confusion.record(&r.ground_truth, &r.predicted);
        }
        SelfPlayReport {
            records,
            games: vec![],
            tally: GameTally::default(),
            confusion,
            accuracy_threshold: ACCURACY_THRESHOLD,
        }
    }

    #[test]
    fn test_single_game() {
        let config = SelfPlayConfig::new(1, 1).unwrap().with_max_plies(200).unwrap();
        let report = run_self_play(&config).unwrap();

        assert_eq!(report.games.len(), 1);
        let game = &report.games[0];
        assert!(game.plies <= 200);
        assert_eq!(report.records.len(), game.plies as usize);
        assert_eq!(report.tally.total(), 1);

        // 按记录重放一遍，每一步都必须合法
        let mut board = Board::init();
        for (i, r) in report.records.iter().enumerate() {
            assert_eq!(r.game, 1);
            assert_eq!(r.move_number, i as u32 + 1);
            assert_eq!(r.player, board.side_to_move());
            assert_eq!(r.correct, r.predicted == r.ground_truth);
            assert!(board.resolve_move(&r.ground_truth).is_ok());
            let mv = board.resolve_move(&r.predicted).unwrap();
            board.apply_move(mv);
        }
        match game.end {
            GameEnd::Finished(outcome) => assert_eq!(board.outcome(), Some(outcome)),
            GameEnd::PlyLimit => {
                assert_eq!(game.plies, 200);
                assert!(!board.is_game_over());
            }
        }

        let counted: u64 = report.confusion.iter().map(|(_, _, count)| count).sum();
        assert_eq!(counted, report.records.len() as u64);
        assert_eq!(report.correct_predictions(), report.records.iter().filter(|r| r.correct).count());
    }

    #[test]
    fn test_game_from_finished_position() {
        let config = SelfPlayConfig::new(2, 2)
            .unwrap()
            .with_start_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1")
            .unwrap();
        let report = run_self_play(&config).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.tally.draws, 2);
        assert_eq!(report.accuracy(), 0.0);
        assert!(report.below_threshold());
        assert_eq!(report.average_time(), Duration::ZERO);
        for game in &report.games {
            assert_eq!(game.end.to_string(), Termination::Stalemate.to_string());
        }
    }

    #[test]
    fn test_ply_limit() {
        let config = SelfPlayConfig::new(1, 1).unwrap().with_max_plies(3).unwrap();
        let report = run_self_play(&config).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.games[0].end, GameEnd::PlyLimit);
        assert_eq!(report.games[0].end.result_text(), "1/2-1/2");
        assert_eq!(report.tally.draws, 1);
        let players: Vec<Color> = report.records.iter().map(|r| r.player).collect();
        assert_eq!(players, vec![Color::White, Color::Black, Color::White]);
    }

    #[test]
    fn test_config_validation() {
        for (depth, games) in [(0, 1), (1, 0), (0, 0)] {
            assert!(matches!(
                SelfPlayConfig::new(depth, games),
                Err(EngineError::InvalidGameConfiguration(_))
            ));
        }
        let config = SelfPlayConfig::new(3, 10).unwrap();
        assert_eq!(config.window, Window::Threaded);
        assert_eq!(config.accuracy_threshold, ACCURACY_THRESHOLD);
        assert!(matches!(
            config.clone().with_max_plies(0),
            Err(EngineError::InvalidGameConfiguration(_))
        ));
        assert!(matches!(
            config.with_start_fen("rbbqkbbn"),
            Err(EngineError::InvalidPosition { .. })
        ));

        let mut config = SelfPlayConfig::new(1, 1).unwrap();
        config.depth = 0;
        assert!(run_self_play(&config).is_err());
    }

    #[test]
    fn test_accuracy_and_averages() {
        let report = report_of(vec![
            record(1, 1, "e2e4", "e2e4", 10),
            record(1, 2, "d7d5", "e7e5", 20),
            record(1, 3, "e4d5", "e4d5", 30),
            record(1, 4, "d8d5", "e7e5", 40),
        ]);
        assert_eq!(report.total_moves(), 4);
        assert_eq!(report.correct_predictions(), 2);
        assert_eq!(report.accuracy(), 0.5);
        assert!(report.below_threshold());
        assert_eq!(report.average_nodes(), 250.0);
        assert_eq!(report.average_time(), Duration::from_millis(25));

        assert_eq!(report.confusion.len(), 3);
        assert_eq!(report.confusion.count("e7e5", "d7d5"), 1);
        assert_eq!(report.confusion.count("e7e5", "e2e4"), 0);
        let first: Vec<(&str, &str, u64)> = report.confusion.iter().take(2).collect();
        assert_eq!(first, vec![("e2e4", "e2e4", 1), ("e7e5", "d7d5", 1)]);
    }

    #[test]
    fn test_move_log_csv() {
        let report = report_of(vec![
            record(1, 1, "e2e4", "e2e4", 1234),
            record(1, 2, "d7d5", "e7e5", 5),
        ]);
        let mut out = Vec::new();
        report.write_move_log(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "game,move,player,predicted,ground_truth,correct,nodes,time_s",
            "1,1,White,e2e4,e2e4,1,100,1.234",
            "1,2,Black,d7d5,e7e5,0,200,0.005",
        ]);
    }

    #[test]
    fn test_confusion_csv() {
        let mut confusion = ConfusionMatrix::default();
        confusion.record("e2e4", "d2d4");
        confusion.record("h1g3", "h1g3");
        confusion.record("e2e4", "d2d4");
        let mut out = Vec::new();
        confusion.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ground_truth,predicted,count\ne2e4,d2d4,2\nh1g3,h1g3,1\n"
        );
    }

    #[test]
    fn test_tally() {
        let mut tally = GameTally::default();
        tally.record(Some(Color::White));
        tally.record(None);
        tally.record(None);
        tally.record(Some(Color::Black));
        assert_eq!(tally, GameTally { white_wins: 1, black_wins: 1, draws: 2 });
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.to_string(), "1-0: 1, 0-1: 1, 1/2-1/2: 2");
    }
}
