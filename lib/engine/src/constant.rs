use cozy_chess::{Piece, Square};

/// 主教加重的开局：b/c/f/g 四个位置都是象，h 线上是马，只保留后翼易位权。
pub const BISHOP_HEAVY_FEN: &str = "rbbqkbbn/pppppppp/8/8/8/8/PPPPPPPP/RBBQKBBN w Qq - 0 1";

pub const PAWN_VALUE: f64 = 1.0;
pub const KNIGHT_VALUE: f64 = 3.5;
pub const BISHOP_VALUE: f64 = 4.0;
pub const ROOK_VALUE: f64 = 6.0;
pub const QUEEN_VALUE: f64 = 9.0;
pub const KING_VALUE: f64 = 0.0;

pub const CENTER_SQUARES: [Square; 4] = [Square::D4, Square::D5, Square::E4, Square::E5];

pub const MOBILITY_WEIGHT: f64 = 0.05;
pub const CENTER_CONTROL_BONUS: f64 = 0.20;
pub const BISHOP_PAIR_BONUS: f64 = 0.5;
pub const BISHOP_ACTIVITY_WEIGHT: f64 = 0.01;
pub const BLOCKED_BISHOP_PENALTY: f64 = 0.2;
pub const OPEN_FILE_BONUS: f64 = 0.25;
pub const SEMI_OPEN_FILE_BONUS: f64 = 0.10;
pub const KNIGHT_OUTPOST_BONUS: f64 = 0.1;
pub const KING_SAFETY_PENALTY: f64 = 0.5;

/// 自对弈预测准确率低于该值时给出警告
pub const ACCURACY_THRESHOLD: f64 = 0.70;

/// 七十五步规则：连续 150 个半回合没有吃子或动兵即和棋
pub const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;
/// 同一局面出现五次即和棋
pub const FIVEFOLD_REPETITION: usize = 5;

pub const MOVE_LOG_FILE: &str = "selfplay_stats.csv";
pub const CONFUSION_FILE: &str = "confusion_matrix.csv";

pub fn piece_value(piece: Piece) -> f64 {
    match piece {
        Piece::Pawn => PAWN_VALUE,
        Piece::Knight => KNIGHT_VALUE,
        Piece::Bishop => BISHOP_VALUE,
        Piece::Rook => ROOK_VALUE,
        Piece::Queen => QUEEN_VALUE,
        Piece::King => KING_VALUE,
    }
}
