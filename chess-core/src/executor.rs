//! 走法执行
//!
//! 只负责走子机制（吃子、吃过路兵、易位移车、升变挂起、轮次更新），
//! 走法是否合法由调用方事先通过 [`MoveGenerator::legal_moves`] 保证。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::{Board, GameState};
use crate::error::{ChessError, Result};
use crate::moves::MoveGenerator;
use crate::piece::{Piece, PieceKind, Square};

/// 走法执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// 走法已完成，轮到对方
    Applied,
    /// 兵到达底线，等待选择升变类型
    PromotionPending(Square),
}

/// 走法类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    Normal,
    /// 兵从初始行前进两格
    DoubleStep,
    EnPassant,
    CastleKingSide,
    CastleQueenSide,
    /// 兵到达底线（可能同时吃子）
    Promotion,
}

/// 一步走法的执行摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub from: Square,
    pub to: Square,
    /// 走子前的棋子
    pub piece: Piece,
    /// 被吃的棋子（包括过路兵）
    pub captured: Option<Piece>,
    pub kind: MoveKind,
    pub outcome: MoveOutcome,
}

/// 在棋盘上移动棋子，处理吃过路兵与易位移车，并标记走动
///
/// 合法性检测的模拟和正式执行共用这一函数。
pub(crate) fn relocate(
    board: &mut Board,
    piece: Piece,
    from: Square,
    to: Square,
    en_passant_target: Option<Square>,
) -> (Option<Piece>, MoveKind) {
    let mut kind = MoveKind::Normal;
    let mut captured = None;

    if let Some(victim) =
        MoveGenerator::en_passant_capture_square(board, piece, from, to, en_passant_target)
    {
        captured = board.get(victim);
        board.set(victim, None);
        kind = MoveKind::EnPassant;
    }

    if let Some((rook_from, rook_to)) = MoveGenerator::castling_rook_squares(piece, from, to) {
        if board.get(rook_from).is_some() {
            board.move_piece(rook_from, rook_to);
        }
        kind = if to.file > from.file {
            MoveKind::CastleKingSide
        } else {
            MoveKind::CastleQueenSide
        };
    }

    board.set(from, Some(piece));
    if let Some(taken) = board.move_piece(from, to) {
        captured = Some(taken);
    }

    if piece.kind == PieceKind::Pawn {
        if piece.is_promotion_rank(to.rank) {
            kind = MoveKind::Promotion;
        } else if (to.rank as i8 - from.rank as i8).abs() == 2 {
            kind = MoveKind::DoubleStep;
        }
    }

    (captured, kind)
}

impl GameState {
    /// 执行走法
    ///
    /// 兵到达底线时挂起升变并直接返回，不切换走子方；
    /// 否则更新过路兵目标、切换走子方并重新计算将军和终局。
    pub fn apply_move(&mut self, from: Square, to: Square) -> Result<MoveReport> {
        if let Some(square) = self.promotion_pending {
            return Err(ChessError::AwaitingPromotion { square });
        }
        if self.game_over {
            return Err(ChessError::GameAlreadyOver);
        }
        let piece = self
            .board
            .get(from)
            .ok_or(ChessError::NoPieceAtSquare { square: from })?;

        let (captured, kind) = relocate(&mut self.board, piece, from, to, self.en_passant_target);
        debug!("{} {:?} {} -> {} ({:?})", piece.color, piece.kind, from, to, kind);

        if piece.is_promotion_rank(to.rank) {
            self.promotion_pending = Some(to);
            debug!("升变挂起: {}", to);
            return Ok(MoveReport {
                from,
                to,
                piece,
                captured,
                kind,
                outcome: MoveOutcome::PromotionPending(to),
            });
        }

        let en_passant_target = match kind {
            MoveKind::DoubleStep => Some(Square::new_unchecked(from.file, (from.rank + to.rank) / 2)),
            _ => None,
        };
        self.finish_turn(en_passant_target);

        Ok(MoveReport {
            from,
            to,
            piece,
            captured,
            kind,
            outcome: MoveOutcome::Applied,
        })
    }

    /// 完成升变：用所选类型替换待升变的兵，然后切换走子方
    ///
    /// 返回升变后的棋子，非法的类型按后处理。
    pub fn resolve_promotion(&mut self, kind: PieceKind) -> Result<Piece> {
        let square = self.promotion_pending.ok_or(ChessError::PromotionNotPending)?;
        let pawn = self
            .board
            .get(square)
            .ok_or(ChessError::NoPieceAtSquare { square })?;

        let promoted = pawn.promote(kind);
        self.board.set(square, Some(promoted));
        self.promotion_pending = None;
        debug!("{} 升变为 {:?}", square, promoted.kind);

        self.finish_turn(None);
        Ok(promoted)
    }

    /// 设置过路兵目标，切换走子方，刷新状态
    fn finish_turn(&mut self, en_passant_target: Option<Square>) {
        self.en_passant_target = en_passant_target;
        self.current_player = self.current_player.opponent();
        self.refresh_status();
    }

    /// 重新计算当前走子方的将军和终局标记
    pub(crate) fn refresh_status(&mut self) {
        let color = self.current_player;
        self.check = MoveGenerator::is_in_check(&self.board, color, self.en_passant_target);
        self.game_over = !MoveGenerator::has_legal_move(self, color);

        if self.game_over {
            if self.check {
                info!("{} 被将死", color);
            } else {
                info!("{} 无子可动，逼和", color);
            }
        }
    }
}
