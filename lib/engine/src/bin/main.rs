// 无界面的自对弈评测：engine <depth> <games> [max_plies]
use std::path::PathBuf;

use clap::Parser;
use engine::search::Window;
use engine::selfplay::{run_self_play, SelfPlayConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "engine", about = "Self-play benchmark: depth-N prediction against a depth-N+1 search")]
struct Args {
    /// Prediction search depth; ground truth searches one ply deeper
    depth: u32,

    /// Number of self-play games
    games: u32,

    /// Adjudicate a draw after this many plies
    max_plies: Option<u32>,

    /// Reset the alpha-beta window for every root move of the prediction search
    #[arg(long)]
    isolated: bool,

    /// Directory for selfplay_stats.csv and confusion_matrix.csv
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = SelfPlayConfig::new(args.depth, args.games)?;
    if let Some(max_plies) = args.max_plies {
        config = config.with_max_plies(max_plies)?;
    }
    if args.isolated {
        config = config.with_window(Window::Isolated);
    }

    let report = run_self_play(&config)?;
    report.save(&args.out_dir)?;

    println!("results: {}", report.tally);
    println!(
        "moves: {} | accuracy: {:.2}% | avg nodes/move: {:.1} | avg time/move: {:.1} ms",
        report.total_moves(),
        report.accuracy() * 100.0,
        report.average_nodes(),
        report.average_time().as_secs_f64() * 1000.0
    );
    for game in &report.games {
        println!("game {}: {} after {} plies ({})", game.game, game.end.result_text(), game.plies, game.end);
    }
    Ok(())
}
