/*
 * 局面评估：白方视角的零和分数，一个兵约等于 1.0
 *
 * 每一项先按“单方”用整数特征计数算出分值，再取 白方 - 黑方。
 * 这样把棋盘上下翻转并交换颜色后，分数严格取反。
 * 评估函数不处理将死、逼和，终局判断由搜索负责。
 */

use cozy_chess::{Color, Piece};

use crate::board::Board;
use crate::constant::*;
use crate::search::Score;

/// 单方的评估特征
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct SideFeatures {
    pub piece_counts: [u32; 6],
    pub mobility: u32,
    pub center_squares: u32,
    pub bishop_attacks: u32,
    pub blocked_bishops: u32,
    pub open_file_rooks: u32,
    pub semi_open_file_rooks: u32,
    pub outpost_knights: u32,
    pub king_attacked: bool,
}

impl SideFeatures {
    pub fn collect(board: &Board, color: Color, mobility: u32) -> Self {
        let mut features = SideFeatures {
            mobility,
            ..Default::default()
        };
        for &piece in Piece::ALL.iter() {
            features.piece_counts[piece as usize] = board.pieces_of(piece, color).len();
        }

        for square in CENTER_SQUARES {
            if let Some((owner, _)) = board.piece_at(square) {
                if owner == color {
                    features.center_squares += 1;
                }
            }
        }

        for bishop in board.pieces_of(Piece::Bishop, color) {
            let attacked = board.attacks_from(bishop).len();
            features.bishop_attacks += attacked;
            if attacked == 0 {
                features.blocked_bishops += 1;
            }
        }

        let own_pawns = board.pieces_of(Piece::Pawn, color);
        let enemy_pawns = board.pieces_of(Piece::Pawn, !color);
        for rook in board.pieces_of(Piece::Rook, color) {
            let file = rook.file().bitboard();
            if (own_pawns & file).is_empty() {
                if (enemy_pawns & file).is_empty() {
                    features.open_file_rooks += 1;
                } else {
                    features.semi_open_file_rooks += 1;
                }
            }
        }

        for knight in board.pieces_of(Piece::Knight, color) {
            if CENTER_SQUARES.contains(&knight) {
                features.outpost_knights += 1;
            }
        }

        features.king_attacked = board
            .king_square(color)
            .map_or(false, |king| board.is_attacked(!color, king));
        features
    }

    fn material(&self) -> Score {
        Piece::ALL
            .iter()
            .map(|&piece| self.piece_counts[piece as usize] as Score * piece_value(piece))
            .sum()
    }

    fn mobility(&self) -> Score {
        MOBILITY_WEIGHT * self.mobility as Score
    }

    fn center(&self) -> Score {
        CENTER_CONTROL_BONUS * self.center_squares as Score
    }

    fn bishop_pair(&self) -> Score {
        if self.piece_counts[Piece::Bishop as usize] >= 2 {
            BISHOP_PAIR_BONUS
        } else {
            0.0
        }
    }

    fn bishop_activity(&self) -> Score {
        BISHOP_ACTIVITY_WEIGHT * self.bishop_attacks as Score - BLOCKED_BISHOP_PENALTY * self.blocked_bishops as Score
    }

    fn rook_files(&self) -> Score {
        OPEN_FILE_BONUS * self.open_file_rooks as Score + SEMI_OPEN_FILE_BONUS * self.semi_open_file_rooks as Score
    }

    fn knight_outposts(&self) -> Score {
        KNIGHT_OUTPOST_BONUS * self.outpost_knights as Score
    }

    fn king_safety(&self) -> Score {
        if self.king_attacked {
            -KING_SAFETY_PENALTY
        } else {
            0.0
        }
    }
}

/// 各评估项的 白方 - 黑方 差值
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct EvalTerms {
    pub material: Score,
    pub mobility: Score,
    pub center: Score,
    pub bishop_pair: Score,
    pub bishop_activity: Score,
    pub rook_files: Score,
    pub knight_outposts: Score,
    pub king_safety: Score,
}

impl EvalTerms {
    pub fn between(white: &SideFeatures, black: &SideFeatures) -> Self {
        EvalTerms {
            material: white.material() - black.material(),
            mobility: white.mobility() - black.mobility(),
            center: white.center() - black.center(),
            bishop_pair: white.bishop_pair() - black.bishop_pair(),
            bishop_activity: white.bishop_activity() - black.bishop_activity(),
            rook_files: white.rook_files() - black.rook_files(),
            knight_outposts: white.knight_outposts() - black.knight_outposts(),
            king_safety: white.king_safety() - black.king_safety(),
        }
    }

    pub fn total(&self) -> Score {
        self.material
            + self.mobility
            + self.center
            + self.bishop_pair
            + self.bishop_activity
            + self.rook_files
            + self.knight_outposts
            + self.king_safety
    }
}

pub fn evaluate(board: &Board) -> Score {
    evaluate_terms(board).total()
}

pub fn evaluate_terms(board: &Board) -> EvalTerms {
    let (white_mobility, black_mobility) = mobility(board);
    let white = SideFeatures::collect(board, Color::White, white_mobility);
    let black = SideFeatures::collect(board, Color::Black, black_mobility);
    EvalTerms::between(&white, &black)
}

// 行棋方直接数合法走法，对方通过空着探测来数
fn mobility(board: &Board) -> (u32, u32) {
    let mover = board.legal_move_count() as u32;
    let opponent = board.opponent_move_count() as u32;
    match board.side_to_move() {
        Color::White => (mover, opponent),
        Color::Black => (opponent, mover),
    }
}
