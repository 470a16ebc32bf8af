use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// 输入不是 UCI 格式的走法文本
    #[error("bad move text `{0}`, expected UCI such as e2e4 or a7a8q")]
    InvalidMoveText(String),
    /// 格式正确，但当前局面下不是合法走法
    #[error("illegal move `{0}` in the current position")]
    IllegalMove(String),
    #[error("invalid game configuration: {0}")]
    InvalidGameConfiguration(String),
    #[error("invalid position `{fen}`: {reason}")]
    InvalidPosition { fen: String, reason: String },
    /// 规则引擎报告对局未结束，搜索却选不出走法
    #[error("search selected no move in a position that is not game over")]
    NoLegalMove,
    #[error("input/output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
