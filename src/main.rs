// 命令行对弈：人机对战、自对弈评测
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::bail;
use cozy_chess::Color;
use engine::board::Board;
use engine::constant::{CONFUSION_FILE, MOVE_LOG_FILE};
use engine::error::EngineError;
use engine::search::{root_search, Window};
use engine::selfplay::{run_self_play, SelfPlayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const MENU: &str = "
=== Bishop-Heavy Chess AI ===
1) Human vs AI (single game)
2) AI vs AI (self-play, with full logging)
3) Exit
";

// 读一行并去掉首尾空白；输入结束时报错退出
fn read_line(input: &mut impl BufRead, prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed");
    }
    Ok(line.trim().to_owned())
}

fn ask_int(input: &mut impl BufRead, prompt: &str) -> anyhow::Result<u32> {
    loop {
        match read_line(input, prompt)?.parse::<u32>() {
            Ok(value) if value > 0 => return Ok(value),
            _ => println!("Please enter a positive integer."),
        }
    }
}

fn ask_choice(input: &mut impl BufRead, prompt: &str, choices: &[&str]) -> anyhow::Result<String> {
    loop {
        let choice = read_line(input, prompt)?.to_lowercase();
        if choices.contains(&choice.as_str()) {
            return Ok(choice);
        }
        println!("Please enter one of {:?}.", choices);
    }
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

fn play_human(input: &mut impl BufRead) -> anyhow::Result<()> {
    let depth = ask_int(input, "Enter search depth (e.g. 3): ")?;
    let human = match ask_choice(input, "Play as white or black? (w/b): ", &["w", "b"])?.as_str() {
        "w" => Color::White,
        _ => Color::Black,
    };

    let mut board = Board::init();
    println!("{}", board);
    while !board.is_game_over() {
        let turn = color_name(board.side_to_move());
        if board.side_to_move() == human {
            let text = read_line(input, &format!("{} to move (UCI): ", turn))?;
            match board.resolve_move(&text) {
                Ok(mv) => board.apply_move(mv),
                Err(EngineError::InvalidMoveText(_)) => {
                    println!("Bad UCI format.");
                    continue;
                }
                Err(EngineError::IllegalMove(_)) => {
                    println!("Illegal move.");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            println!("{} (AI) thinking…", turn);
            let result = root_search(&mut board, depth, Window::Isolated)?;
            let Some(mv) = result.best_move else {
                return Err(EngineError::NoLegalMove.into());
            };
            let text = board.move_to_text(mv);
            board.apply_move(mv);
            println!("{} plays {}", turn, text);
            println!(
                "→ nodes={} time={:.3}s eval={:.2}",
                result.nodes,
                result.elapsed.as_secs_f64(),
                result.score
            );
        }
        println!("{}", board);
    }

    if let Some(outcome) = board.outcome() {
        info!(result = outcome.result_text(), "game over");
        match outcome.winner {
            Some(Color::White) => println!("Checkmate! White wins."),
            Some(Color::Black) => println!("Checkmate! Black wins."),
            None => println!("Game drawn by {}.", outcome.termination),
        }
    }
    Ok(())
}

fn play_selfplay(input: &mut impl BufRead) -> anyhow::Result<()> {
    let depth = ask_int(input, "Enter search depth (e.g. 3): ")?;
    let games = ask_int(input, "Number of self-play games: ")?;
    let report = run_self_play(&SelfPlayConfig::new(depth, games)?)?;

    println!("\n=== Self-Play Summary ===");
    println!("Results (W–L–D): {}", report.tally);
    println!(
        "Total moves: {} | Accuracy: {:.2}%",
        report.total_moves(),
        report.accuracy() * 100.0
    );
    if report.below_threshold() {
        println!(
            "[!] Warning: accuracy below {:.0}% threshold.",
            report.accuracy_threshold * 100.0
        );
    }
    println!("Avg nodes/move: {:.1}", report.average_nodes());
    println!("Avg time/move: {:.1} ms", report.average_time().as_secs_f64() * 1000.0);
    println!("\nSample confusion entries (gt → pred : count):");
    for (ground_truth, predicted, count) in report.confusion.iter().take(10) {
        println!("  {} → {} : {}", ground_truth, predicted, count);
    }

    report.save(Path::new("."))?;
    println!("Detailed move logs written to {}", MOVE_LOG_FILE);
    println!("Full confusion matrix written to {}\n", CONFUSION_FILE);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        println!("{}", MENU);
        match read_line(&mut input, "Select [1-3]: ")?.as_str() {
            "1" => play_human(&mut input)?,
            "2" => play_selfplay(&mut input)?,
            "3" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice; please enter 1, 2, or 3."),
        }
    }
    Ok(())
}
