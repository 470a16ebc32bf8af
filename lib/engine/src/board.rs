/*
 * 详细中文注释 - 棋盘模块（规则引擎适配层）
 *
 * 设计要点
 * - 走法生成、将军判定、FEN 解析等国际象棋规则交给 cozy_chess 完成
 * - Board 在 cozy_chess::Board 之上维护一个历史栈，对外提供 apply_move / undo_move，
 *   搜索可以像操作可变棋盘一样成对地落子、悔棋
 * - 终局判定：将死、逼和、子力不足、七十五步规则、五次重复局面
 * - 走法文本统一为标准 UCI；cozy_chess 内部把易位表示为“王吃己方车”，这里负责转换
 */

use std::fmt;
use std::sync::LazyLock;

use cozy_chess::{
    get_between_rays, get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_pawn_quiets,
    get_rook_moves, BitBoard, Color, File, Move, Piece, Rank, Square,
};
use regex::Regex;

use crate::constant::{BISHOP_HEAVY_FEN, FIVEFOLD_REPETITION, SEVENTY_FIVE_MOVE_PLIES};
use crate::error::{EngineError, Result};
use crate::eval;
use crate::search::{Score, SearchPosition};

static MOVE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-h])([1-8])([a-h])([1-8])([qrbn])?$").expect("move text pattern"));

const DARK_SQUARES: BitBoard = BitBoard(0xAA55_AA55_AA55_AA55);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoves,
    FivefoldRepetition,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient material",
            Termination::SeventyFiveMoves => "the seventy-five-move rule",
            Termination::FivefoldRepetition => "fivefold repetition",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Outcome {
    /// None 表示和棋
    pub winner: Option<Color>,
    pub termination: Termination,
}

impl Outcome {
    pub fn result_text(&self) -> &'static str {
        match self.winner {
            Some(Color::White) => "1-0",
            Some(Color::Black) => "0-1",
            None => "1/2-1/2",
        }
    }
}

#[derive(Clone, Debug)]
struct Frame {
    position: cozy_chess::Board,
    reversible_plies: u32,
    mv: Move,
}

#[derive(Clone, Debug)]
pub struct Board {
    position: cozy_chess::Board,
    // 距离上一次吃子或动兵的半回合数，不受 cozy_chess 内部上限影响
    reversible_plies: u32,
    history: Vec<Frame>,
}

impl Board {
    // 主教加重变体的初始局面，白方先行
    pub fn init() -> Self {
        Board::from_fen(BISHOP_HEAVY_FEN).expect("bishop-heavy start position is valid FEN")
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        let position = cozy_chess::Board::from_fen(fen.trim(), false).map_err(|e| EngineError::InvalidPosition {
            fen: fen.to_owned(),
            reason: format!("{:?}", e),
        })?;
        Ok(Board {
            reversible_plies: position.halfmove_clock() as u32,
            position,
            history: vec![],
        })
    }

    pub fn fen(&self) -> String {
        self.position.to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    /// 已经走过的半回合数（从构造时的局面算起）
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    pub fn in_check(&self) -> bool {
        !self.position.checkers().is_empty()
    }

    // 按 cozy_chess 的自然顺序生成全部合法走法；该顺序同时是搜索的剪枝顺序和同分时的取舍依据
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        self.position.generate_moves(|piece_moves| {
            moves.extend(piece_moves);
            false
        });
        moves
    }

    pub fn legal_move_count(&self) -> usize {
        count_moves(&self.position)
    }

    /// 对手的合法走法数：让当前一方“空着”一步再数。
    /// 当前一方被将军时 cozy_chess 不允许空着，改为逐个检查对手的伪合法走法，吃王也算一步。
    pub fn opponent_move_count(&self) -> usize {
        match self.position.null_move() {
            Some(probe) => count_moves(&probe),
            None => self.count_moves_after_pass(),
        }
    }

    // 空着之后对手的走法：走完以后对手自己的王不能被攻击；空着会清除吃过路兵
    fn count_moves_after_pass(&self) -> usize {
        let board = &self.position;
        let us = !self.side_to_move();
        let ours = board.colors(us);
        let theirs = board.colors(!us);
        let occupied = board.occupied();
        let Some(king) = self.king_square(us) else {
            return 0;
        };
        let last_rank = Rank::Eighth.relative_to(us);

        let mut count = 0;
        for from in ours {
            let Some(piece) = board.piece_on(from) else {
                continue;
            };
            let targets = match piece {
                Piece::Pawn => get_pawn_quiets(from, us, occupied) | (get_pawn_attacks(from, us) & theirs),
                _ => self.attacks_from(from) & !ours,
            };
            for to in targets {
                let blockers = (occupied & !from.bitboard()) | to.bitboard();
                let king_after = if piece == Piece::King { to } else { king };
                if self.attacked_with(!us, theirs & !to.bitboard(), king_after, blockers) {
                    continue;
                }
                count += if piece == Piece::Pawn && to.rank() == last_rank { 4 } else { 1 };
            }
        }
        count + self.count_castles(us, king)
    }

    fn count_castles(&self, us: Color, king: Square) -> usize {
        let board = &self.position;
        let rights = board.castle_rights(us);
        let back_rank = Rank::First.relative_to(us);
        [(rights.long, File::C, File::D), (rights.short, File::G, File::F)]
            .into_iter()
            .filter(|&(rook_file, king_file, rook_file_after)| {
                let Some(rook_file) = rook_file else {
                    return false;
                };
                let rook = Square::new(rook_file, back_rank);
                let king_to = Square::new(king_file, back_rank);
                let rook_to = Square::new(rook_file_after, back_rank);
                let king_path = get_between_rays(king, king_to) | king_to.bitboard();
                let must_be_empty = (king_path | get_between_rays(rook, rook_to) | rook_to.bitboard())
                    & !king.bitboard()
                    & !rook.bitboard();
                (board.occupied() & must_be_empty).is_empty()
                    && (king_path | king.bitboard())
                        .into_iter()
                        .all(|square| !self.is_attacked(!us, square))
            })
            .count()
    }

    // 执行走子并压入历史；走法必须来自 legal_moves
    pub fn apply_move(&mut self, mv: Move) {
        let irreversible = self.position.piece_on(mv.from) == Some(Piece::Pawn)
            || self.position.color_on(mv.to) == Some(!self.side_to_move());

        let previous = self.position.clone();
        self.position.play(mv);
        self.history.push(Frame {
            position: previous,
            reversible_plies: self.reversible_plies,
            mv,
        });
        self.reversible_plies = if irreversible { 0 } else { self.reversible_plies + 1 };
    }

    // 撤销最近一步，返回被撤销的走法
    pub fn undo_move(&mut self) -> Option<Move> {
        let frame = self.history.pop()?;
        self.position = frame.position;
        self.reversible_plies = frame.reversible_plies;
        Some(frame.mv)
    }

    pub fn pieces_of(&self, piece: Piece, color: Color) -> BitBoard {
        self.position.colors(color) & self.position.pieces(piece)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(Piece::King, color).into_iter().next()
    }

    pub fn piece_at(&self, square: Square) -> Option<(Color, Piece)> {
        let color = self.position.color_on(square)?;
        let piece = self.position.piece_on(square)?;
        Some((color, piece))
    }

    /// 该格上棋子攻击的所有格子（含己方棋子所在格），空格返回空集
    pub fn attacks_from(&self, square: Square) -> BitBoard {
        let Some((color, piece)) = self.piece_at(square) else {
            return BitBoard::EMPTY;
        };
        let blockers = self.position.occupied();
        match piece {
            Piece::Pawn => get_pawn_attacks(square, color),
            Piece::Knight => get_knight_moves(square),
            Piece::Bishop => get_bishop_moves(square, blockers),
            Piece::Rook => get_rook_moves(square, blockers),
            Piece::Queen => get_bishop_moves(square, blockers) | get_rook_moves(square, blockers),
            Piece::King => get_king_moves(square),
        }
    }

    // 判断 square 是否被 attacker 一方攻击
    pub fn is_attacked(&self, attacker: Color, square: Square) -> bool {
        self.attacked_with(attacker, self.position.colors(attacker), square, self.position.occupied())
    }

    // theirs 为仍在场上的攻击方棋子，blockers 为假设走子之后的占位
    fn attacked_with(&self, attacker: Color, theirs: BitBoard, square: Square, blockers: BitBoard) -> bool {
        let board = &self.position;
        let diagonal = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
        let orthogonal = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);

        let attackers = (get_pawn_attacks(square, !attacker) & board.pieces(Piece::Pawn))
            | (get_knight_moves(square) & board.pieces(Piece::Knight))
            | (get_king_moves(square) & board.pieces(Piece::King))
            | (get_bishop_moves(square, blockers) & diagonal)
            | (get_rook_moves(square, blockers) & orthogonal);
        !(attackers & theirs).is_empty()
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if !has_moves(&self.position) {
            return Some(if self.in_check() {
                Outcome {
                    winner: Some(!self.side_to_move()),
                    termination: Termination::Checkmate,
                }
            } else {
                Outcome {
                    winner: None,
                    termination: Termination::Stalemate,
                }
            });
        }
        let termination = if self.is_insufficient_material() {
            Termination::InsufficientMaterial
        } else if self.reversible_plies >= SEVENTY_FIVE_MOVE_PLIES {
            Termination::SeventyFiveMoves
        } else if self.repetitions() >= FIVEFOLD_REPETITION {
            Termination::FivefoldRepetition
        } else {
            return None;
        };
        Some(Outcome {
            winner: None,
            termination,
        })
    }

    /// 当前局面（含当前）在可逆走法区间内出现的次数
    pub fn repetitions(&self) -> usize {
        let hash = self.position.hash();
        let window = (self.reversible_plies as usize).min(self.history.len());
        1 + self.history[self.history.len() - window..]
            .iter()
            .filter(|frame| frame.position.hash() == hash)
            .count()
    }

    pub fn is_insufficient_material(&self) -> bool {
        Color::ALL
            .iter()
            .all(|&color| self.has_insufficient_material(color))
    }

    fn has_insufficient_material(&self, color: Color) -> bool {
        let board = &self.position;
        let ours = board.colors(color);
        let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
        if !(ours & heavy).is_empty() {
            return false;
        }
        if !(ours & board.pieces(Piece::Knight)).is_empty() {
            // 单马：对方除王和后以外不能有子
            let theirs = board.colors(!color);
            let others = theirs & !board.pieces(Piece::King) & !board.pieces(Piece::Queen);
            return ours.len() <= 2 && others.is_empty();
        }
        let bishops = board.pieces(Piece::Bishop);
        if !(ours & bishops).is_empty() {
            // 所有象同色格，且场上没有兵和马
            let same_color = (bishops & DARK_SQUARES).is_empty() || (bishops & !DARK_SQUARES).is_empty();
            return same_color && board.pieces(Piece::Pawn).is_empty() && board.pieces(Piece::Knight).is_empty();
        }
        true
    }

    /// 把走法转成标准 UCI 文本，需在该走法执行之前调用
    pub fn move_to_text(&self, mv: Move) -> String {
        let mut to = mv.to;
        if self.position.colors(self.side_to_move()).has(mv.to) {
            // 易位：内部表示为王走到己方车的格子
            let file = if (mv.to.file() as usize) < (mv.from.file() as usize) {
                File::C
            } else {
                File::G
            };
            to = Square::new(file, mv.from.rank());
        }
        let mut text = format!("{}{}", mv.from, to);
        if let Some(piece) = mv.promotion {
            text.push(piece_char(piece));
        }
        text
    }

    /// 只做格式解析，不检查合法性；易位按标准写法（如 e1c1）返回
    pub fn parse_move_text(text: &str) -> Result<Move> {
        let text = text.trim();
        let captures = MOVE_TEXT
            .captures(text)
            .ok_or_else(|| EngineError::InvalidMoveText(text.to_owned()))?;
        let square = |file: usize, rank: usize| {
            let file = captures[file].as_bytes()[0] - b'a';
            let rank = captures[rank].as_bytes()[0] - b'1';
            Square::new(File::ALL[file as usize], Rank::ALL[rank as usize])
        };
        let promotion = captures.get(5).map(|m| match m.as_str() {
            "q" => Piece::Queen,
            "r" => Piece::Rook,
            "b" => Piece::Bishop,
            _ => Piece::Knight,
        });
        Ok(Move {
            from: square(1, 2),
            to: square(3, 4),
            promotion,
        })
    }

    // 解析走法文本并在当前局面的合法走法里查找
    pub fn resolve_move(&self, text: &str) -> Result<Move> {
        let parsed = Board::parse_move_text(text)?;
        let mut wanted = format!("{}{}", parsed.from, parsed.to);
        if let Some(piece) = parsed.promotion {
            wanted.push(piece_char(piece));
        }
        self.legal_moves()
            .into_iter()
            .find(|&mv| self.move_to_text(mv) == wanted)
            .ok_or(EngineError::IllegalMove(wanted))
    }
}

impl SearchPosition for Board {
    type Move = Move;

    fn legal_moves(&self) -> Vec<Move> {
        Board::legal_moves(self)
    }

    fn apply_move(&mut self, mv: Move) {
        Board::apply_move(self, mv)
    }

    fn undo_move(&mut self) {
        Board::undo_move(self);
    }

    fn is_game_over(&self) -> bool {
        Board::is_game_over(self)
    }

    fn evaluate(&self) -> Score {
        eval::evaluate(self)
    }

    fn white_to_move(&self) -> bool {
        self.side_to_move() == Color::White
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::ALL.iter().rev() {
            let row = File::ALL
                .iter()
                .map(|&file| match self.piece_at(Square::new(file, *rank)) {
                    Some((Color::White, piece)) => piece_char(piece).to_ascii_uppercase(),
                    Some((Color::Black, piece)) => piece_char(piece),
                    None => '.',
                })
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

fn count_moves(position: &cozy_chess::Board) -> usize {
    let mut count = 0;
    position.generate_moves(|piece_moves| {
        count += piece_moves.into_iter().count();
        false
    });
    count
}

fn has_moves(position: &cozy_chess::Board) -> bool {
    position.generate_moves(|piece_moves| piece_moves.into_iter().next().is_some())
}
