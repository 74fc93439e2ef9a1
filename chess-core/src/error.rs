//! 错误类型定义

use thiserror::Error;

use crate::piece::Square;

/// 象棋规则错误
///
/// 所有错误都可恢复，作为拒绝原因返回给调用方，不会留下部分修改的状态。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// 无效的坐标
    #[error("Invalid square: ({file}, {rank})")]
    InvalidSquare { file: i8, rank: i8 },

    /// 棋盘快照的格子数不是 64
    #[error("Invalid board size: {len} squares")]
    InvalidBoardSize { len: usize },

    /// 起始格没有棋子
    #[error("No piece at square {square}")]
    NoPieceAtSquare { square: Square },

    /// 不是该棋子所属方的回合
    #[error("Not the mover's turn")]
    NotMoversTurn,

    /// 目标格不在合法走法中
    #[error("Illegal destination: from {from} to {to}")]
    IllegalDestination { from: Square, to: Square },

    /// 没有待处理的升变
    #[error("No promotion is pending")]
    PromotionNotPending,

    /// 升变未完成时提交了普通走法
    #[error("Promotion pending at {square}, a piece kind must be chosen first")]
    AwaitingPromotion { square: Square },

    /// 提交升变的格子与待升变的格子不一致
    #[error("Promotion pending at {expected}, got {actual}")]
    PromotionSquareMismatch { expected: Square, actual: Square },

    /// 游戏已结束
    #[error("Game is already over")]
    GameAlreadyOver,
}

/// 规则操作结果类型
pub type Result<T> = std::result::Result<T, ChessError>;
