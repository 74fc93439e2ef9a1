//! 对局控制
//!
//! 管理走子顺序、选子状态、升变挂起和终局标记，并向表现层提供窄接口。

use std::collections::BTreeSet;

use chess_core::{
    ChessError, Color, GameState, MoveGenerator, MoveKind, MoveOutcome, MoveReport, Piece,
    PieceKind, Result, Square,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::settings::GameSettings;

/// 终局类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    /// 将死
    Checkmate { winner: Color },
    /// 逼和
    Stalemate,
}

/// 对局状态摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub current_player: Color,
    pub in_check: bool,
    pub terminal: Option<Terminal>,
}

/// 走法记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub kind: MoveKind,
    /// 升变结果（升变完成后填入）
    pub promotion: Option<PieceKind>,
}

impl From<MoveReport> for MoveRecord {
    fn from(report: MoveReport) -> Self {
        Self {
            from: report.from,
            to: report.to,
            piece: report.piece,
            captured: report.captured,
            kind: report.kind,
            promotion: None,
        }
    }
}

/// 对局控制器
#[derive(Debug, Clone)]
pub struct GameController {
    /// 棋盘状态
    state: GameState,
    settings: GameSettings,
    /// 选中的棋子位置
    selected: Option<Square>,
    /// 选中棋子的合法走法
    selected_moves: Vec<Square>,
    /// 走法历史
    history: Vec<MoveRecord>,
}

impl GameController {
    /// 创建标准开局
    pub fn new() -> Self {
        Self::with_settings(GameSettings::default())
    }

    /// 使用指定设置创建标准开局
    pub fn with_settings(settings: GameSettings) -> Self {
        Self::from_state(GameState::initial(), settings)
    }

    /// 从已有局面创建
    pub fn from_state(state: GameState, settings: GameSettings) -> Self {
        Self {
            state,
            settings,
            selected: None,
            selected_moves: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn selected_moves(&self) -> &[Square] {
        &self.selected_moves
    }

    /// 是否可以走子（没有待升变且未终局）
    fn accepts_moves(&self) -> bool {
        self.state.promotion_pending.is_none() && !self.state.game_over
    }

    /// 获取指定格子的合法走法
    ///
    /// 只返回当前走子方棋子的走法；升变未完成或终局后返回空。
    pub fn legal_moves_for(&self, square: Square) -> Vec<Square> {
        if !self.accepts_moves() {
            return Vec::new();
        }
        match self.state.board.get(square) {
            Some(piece) if piece.color == self.state.current_player => {
                MoveGenerator::legal_moves(&self.state, square)
            }
            _ => Vec::new(),
        }
    }

    /// 当前走子方在战争迷雾下可见的格子
    pub fn visible_squares(&self) -> BTreeSet<Square> {
        MoveGenerator::visible_squares(
            &self.state.board,
            self.state.current_player,
            self.state.en_passant_target,
        )
    }

    /// 选择棋子并缓存其合法走法
    ///
    /// 选择空格或对方棋子会清除当前选择，返回是否选中。
    pub fn select(&mut self, square: Square) -> bool {
        let is_own = self
            .state
            .board
            .get(square)
            .is_some_and(|piece| piece.color == self.state.current_player);

        if self.accepts_moves() && is_own {
            self.selected = Some(square);
            self.selected_moves = MoveGenerator::legal_moves(&self.state, square);
            true
        } else {
            self.clear_selection();
            false
        }
    }

    /// 清除选择
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.selected_moves.clear();
    }

    /// 提交走法
    pub fn submit_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome> {
        self.try_move(from, to)
            .inspect_err(|e| debug!("走法被拒绝 {} -> {}: {}", from, to, e))
    }

    fn try_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome> {
        if let Some(square) = self.state.promotion_pending {
            return Err(ChessError::AwaitingPromotion { square });
        }
        if self.state.game_over {
            return Err(ChessError::GameAlreadyOver);
        }

        let piece = self
            .state
            .board
            .get(from)
            .ok_or(ChessError::NoPieceAtSquare { square: from })?;
        if piece.color != self.state.current_player {
            return Err(ChessError::NotMoversTurn);
        }

        if self.selected != Some(from) {
            self.select(from);
        }
        if !self.selected_moves.contains(&to) {
            return Err(ChessError::IllegalDestination { from, to });
        }

        let report = self.state.apply_move(from, to)?;
        self.clear_selection();
        if self.settings.record_history {
            self.history.push(MoveRecord::from(report));
        }
        self.log_terminal();

        Ok(report.outcome)
    }

    /// 提交升变选择，非升变类型一律升变为后
    pub fn submit_promotion(&mut self, square: Square, kind: PieceKind) -> Result<MoveOutcome> {
        self.try_promotion(square, kind)
            .inspect_err(|e| debug!("升变被拒绝 {}: {}", square, e))
    }

    /// 以单字母提交升变选择（Q/R/B/N），无法识别的字母升变为后
    pub fn submit_promotion_char(&mut self, square: Square, choice: char) -> Result<MoveOutcome> {
        let kind = PieceKind::from_char(choice).unwrap_or(PieceKind::Queen);
        self.submit_promotion(square, kind)
    }

    fn try_promotion(&mut self, square: Square, kind: PieceKind) -> Result<MoveOutcome> {
        if self.state.game_over {
            return Err(ChessError::GameAlreadyOver);
        }
        let pending = self
            .state
            .promotion_pending
            .ok_or(ChessError::PromotionNotPending)?;
        if pending != square {
            return Err(ChessError::PromotionSquareMismatch {
                expected: pending,
                actual: square,
            });
        }

        let promoted = self.state.resolve_promotion(kind)?;

        if let Some(record) = self.history.last_mut().filter(|record| record.to == square) {
            record.promotion = Some(promoted.kind);
        }
        self.log_terminal();

        Ok(MoveOutcome::Applied)
    }

    /// 获取对局状态摘要
    pub fn status(&self) -> GameStatus {
        let terminal = if !self.state.game_over {
            None
        } else if self.state.check {
            Some(Terminal::Checkmate {
                winner: self.state.current_player.opponent(),
            })
        } else {
            Some(Terminal::Stalemate)
        };

        GameStatus {
            current_player: self.state.current_player,
            in_check: self.state.check,
            terminal,
        }
    }

    fn log_terminal(&self) {
        match self.status().terminal {
            Some(Terminal::Checkmate { winner }) => info!("对局结束: {} 获胜", winner),
            Some(Terminal::Stalemate) => info!("对局结束: 逼和"),
            None => {}
        }
    }
}

impl Default for GameController {
    fn default() -> Self {
        Self::new()
    }
}

/// 创建标准开局
pub fn new_game() -> GameController {
    GameController::new()
}

/// 获取指定格子的合法走法
pub fn legal_moves_for(game: &GameController, square: Square) -> Vec<Square> {
    game.legal_moves_for(square)
}

/// 获取当前走子方可见的格子
pub fn visible_squares_for(game: &GameController) -> BTreeSet<Square> {
    game.visible_squares()
}

/// 提交走法
pub fn submit_move(game: &mut GameController, from: Square, to: Square) -> Result<MoveOutcome> {
    game.submit_move(from, to)
}

/// 提交升变选择
pub fn submit_promotion(
    game: &mut GameController,
    square: Square,
    kind: PieceKind,
) -> Result<MoveOutcome> {
    game.submit_promotion(square, kind)
}

/// 获取对局状态摘要
pub fn status(game: &GameController) -> GameStatus {
    game.status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Board;

    fn sq(file: u8, rank: u8) -> Square {
        Square::new_unchecked(file, rank)
    }

    fn game_from(pieces: &[(u8, u8, PieceKind, Color)], to_move: Color) -> GameController {
        let mut board = Board::empty();
        for &(file, rank, kind, color) in pieces {
            board.set(sq(file, rank), Some(Piece::new(kind, color)));
        }
        GameController::from_state(GameState::from_board(board, to_move), GameSettings::default())
    }

    fn promotion_game(settings: GameSettings) -> GameController {
        let mut board = Board::empty();
        board.set(sq(4, 7), Some(Piece::new(PieceKind::King, Color::White)));
        board.set(sq(7, 2), Some(Piece::new(PieceKind::King, Color::Black)));
        board.set(sq(0, 1), Some(Piece::new(PieceKind::Pawn, Color::White)));
        GameController::from_state(GameState::from_board(board, Color::White), settings)
    }

    #[test]
    fn test_initial_legal_moves() {
        let game = new_game();

        for square in Square::all() {
            let moves = legal_moves_for(&game, square);
            match game.state().board.get(square) {
                Some(piece)
                    if piece.color == Color::White
                        && matches!(piece.kind, PieceKind::Pawn | PieceKind::Knight) =>
                {
                    assert_eq!(moves.len(), 2, "{}", square)
                }
                _ => assert!(moves.is_empty(), "{}", square),
            }
        }
    }

    #[test]
    fn test_black_moves_after_white() {
        let mut game = new_game();
        assert_eq!(submit_move(&mut game, sq(4, 6), sq(4, 4)), Ok(MoveOutcome::Applied));

        assert_eq!(status(&game).current_player, Color::Black);
        for file in 0..8 {
            assert_eq!(legal_moves_for(&game, sq(file, 1)).len(), 2);
        }
        assert_eq!(legal_moves_for(&game, sq(1, 0)).len(), 2);
        assert_eq!(legal_moves_for(&game, sq(6, 0)).len(), 2);
        assert!(legal_moves_for(&game, sq(4, 0)).is_empty());
        // 白方棋子在黑方回合没有可走的
        assert!(legal_moves_for(&game, sq(3, 6)).is_empty());
    }

    #[test]
    fn test_rejections() {
        let mut game = new_game();
        let before = game.state().clone();

        assert_eq!(
            submit_move(&mut game, sq(4, 4), sq(4, 3)),
            Err(ChessError::NoPieceAtSquare { square: sq(4, 4) })
        );
        assert_eq!(
            submit_move(&mut game, sq(4, 1), sq(4, 3)),
            Err(ChessError::NotMoversTurn)
        );
        assert_eq!(
            submit_move(&mut game, sq(4, 6), sq(4, 3)),
            Err(ChessError::IllegalDestination {
                from: sq(4, 6),
                to: sq(4, 3)
            })
        );
        assert_eq!(
            submit_promotion(&mut game, sq(0, 0), PieceKind::Queen),
            Err(ChessError::PromotionNotPending)
        );

        assert_eq!(game.state(), &before);
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_selection() {
        let mut game = new_game();

        assert!(game.select(sq(1, 7)));
        assert_eq!(game.selected(), Some(sq(1, 7)));
        assert_eq!(game.selected_moves().len(), 2);

        // 选对方棋子清除选择
        assert!(!game.select(sq(1, 0)));
        assert_eq!(game.selected(), None);
        assert!(game.selected_moves().is_empty());

        assert!(game.select(sq(1, 7)));
        assert_eq!(submit_move(&mut game, sq(1, 7), sq(2, 5)), Ok(MoveOutcome::Applied));
        assert_eq!(game.selected(), None);
    }

    #[test]
    fn test_promotion_flow() {
        let mut game = promotion_game(GameSettings::default());

        assert_eq!(
            submit_move(&mut game, sq(0, 1), sq(0, 0)),
            Ok(MoveOutcome::PromotionPending(sq(0, 0)))
        );
        assert!(legal_moves_for(&game, sq(4, 7)).is_empty());
        assert!(!game.select(sq(4, 7)));

        assert_eq!(
            submit_move(&mut game, sq(4, 7), sq(4, 6)),
            Err(ChessError::AwaitingPromotion { square: sq(0, 0) })
        );
        assert_eq!(
            submit_promotion(&mut game, sq(1, 0), PieceKind::Knight),
            Err(ChessError::PromotionSquareMismatch {
                expected: sq(0, 0),
                actual: sq(1, 0)
            })
        );

        assert_eq!(
            submit_promotion(&mut game, sq(0, 0), PieceKind::Knight),
            Ok(MoveOutcome::Applied)
        );
        assert_eq!(status(&game).current_player, Color::Black);
        assert_eq!(game.history().len(), 1);
        assert_eq!(game.history()[0].kind, MoveKind::Promotion);
        assert_eq!(game.history()[0].promotion, Some(PieceKind::Knight));

        submit_move(&mut game, sq(7, 2), sq(7, 3)).unwrap();
        let mut moves = legal_moves_for(&game, sq(0, 0));
        moves.sort();
        assert_eq!(moves, vec![sq(2, 1), sq(1, 2)]);
    }

    #[test]
    fn test_promotion_fallback() {
        let mut game = promotion_game(GameSettings::default());
        submit_move(&mut game, sq(0, 1), sq(0, 0)).unwrap();
        game.submit_promotion_char(sq(0, 0), 'x').unwrap();
        assert_eq!(
            game.state().board.get(sq(0, 0)).map(|piece| piece.kind),
            Some(PieceKind::Queen)
        );

        // 王和兵不是升变选项，一律升变为后
        for kind in [PieceKind::King, PieceKind::Pawn] {
            let mut game = promotion_game(GameSettings::default());
            submit_move(&mut game, sq(0, 1), sq(0, 0)).unwrap();
            submit_promotion(&mut game, sq(0, 0), kind).unwrap();
            assert_eq!(
                game.state().board.get(sq(0, 0)).map(|piece| piece.kind),
                Some(PieceKind::Queen)
            );
            assert_eq!(game.history()[0].promotion, Some(PieceKind::Queen));
        }

        let mut game = promotion_game(GameSettings::default());
        submit_move(&mut game, sq(0, 1), sq(0, 0)).unwrap();
        game.submit_promotion_char(sq(0, 0), 'n').unwrap();
        assert_eq!(
            game.state().board.get(sq(0, 0)).map(|piece| piece.kind),
            Some(PieceKind::Knight)
        );
    }

    #[test]
    fn test_visible_squares() {
        let mut game = new_game();
        let white = visible_squares_for(&game);
        assert_eq!(white.len(), 32);
        assert!(white.iter().all(|square| square.rank >= 4));

        submit_move(&mut game, sq(4, 6), sq(4, 4)).unwrap(); // e4
        let black = visible_squares_for(&game);
        assert!(black.iter().all(|square| square.rank <= 3));
        // 双步兵越过的格子不在黑方视野内
        assert!(!black.contains(&sq(4, 5)));

        submit_move(&mut game, sq(3, 1), sq(3, 3)).unwrap(); // d5
        submit_move(&mut game, sq(4, 4), sq(3, 3)).unwrap(); // exd5
        let black = game.visible_squares();
        // d 线打开后黑后能看到吃子的白兵
        assert!(black.contains(&sq(3, 3)));
        assert!(black.contains(&sq(3, 1)));
        assert!(!black.contains(&sq(4, 4)));
    }

    #[test]
    fn test_en_passant_only_immediately() {
        let mut game = new_game();
        submit_move(&mut game, sq(4, 6), sq(4, 4)).unwrap(); // e4
        submit_move(&mut game, sq(0, 1), sq(0, 2)).unwrap(); // a6
        submit_move(&mut game, sq(4, 4), sq(4, 3)).unwrap(); // e5
        submit_move(&mut game, sq(3, 1), sq(3, 3)).unwrap(); // d5

        // 白兵可以立即吃过路兵
        assert!(legal_moves_for(&game, sq(4, 3)).contains(&sq(3, 2)));

        let mut taken = game.clone();
        submit_move(&mut taken, sq(4, 3), sq(3, 2)).unwrap();
        assert!(taken.state().board.get(sq(3, 3)).is_none());
        assert_eq!(taken.history().last().map(|r| r.kind), Some(MoveKind::EnPassant));

        // 错过一步后不再可以
        submit_move(&mut game, sq(7, 6), sq(7, 5)).unwrap(); // h3
        submit_move(&mut game, sq(0, 2), sq(0, 3)).unwrap(); // a5
        assert!(!legal_moves_for(&game, sq(4, 3)).contains(&sq(3, 2)));
        assert_eq!(
            submit_move(&mut game, sq(4, 3), sq(3, 2)),
            Err(ChessError::IllegalDestination {
                from: sq(4, 3),
                to: sq(3, 2)
            })
        );
    }

    #[test]
    fn test_fools_mate() {
        let mut game = new_game();
        submit_move(&mut game, sq(5, 6), sq(5, 5)).unwrap(); // f3
        submit_move(&mut game, sq(4, 1), sq(4, 3)).unwrap(); // e5
        submit_move(&mut game, sq(6, 6), sq(6, 4)).unwrap(); // g4
        submit_move(&mut game, sq(3, 0), sq(7, 4)).unwrap(); // Qh4#

        let status = status(&game);
        assert!(status.in_check);
        assert_eq!(
            status.terminal,
            Some(Terminal::Checkmate {
                winner: Color::Black
            })
        );
        assert_eq!(game.history().len(), 4);

        assert_eq!(
            submit_move(&mut game, sq(0, 6), sq(0, 5)),
            Err(ChessError::GameAlreadyOver)
        );
        assert_eq!(
            submit_promotion(&mut game, sq(0, 0), PieceKind::Queen),
            Err(ChessError::GameAlreadyOver)
        );
        assert!(legal_moves_for(&game, sq(0, 6)).is_empty());
    }

    #[test]
    fn test_stalemate_status() {
        let mut game = game_from(
            &[
                (7, 0, PieceKind::King, Color::Black),
                (5, 1, PieceKind::King, Color::White),
                (6, 3, PieceKind::Queen, Color::White),
            ],
            Color::White,
        );

        submit_move(&mut game, sq(6, 3), sq(6, 2)).unwrap();

        let status = status(&game);
        assert!(!status.in_check);
        assert_eq!(status.terminal, Some(Terminal::Stalemate));
        assert_eq!(status.current_player, Color::Black);
    }

    #[test]
    fn test_castling_through_controller() {
        let mut game = game_from(
            &[
                (4, 7, PieceKind::King, Color::White),
                (7, 7, PieceKind::Rook, Color::White),
                (0, 0, PieceKind::King, Color::Black),
            ],
            Color::White,
        );

        assert_eq!(submit_move(&mut game, sq(4, 7), sq(6, 7)), Ok(MoveOutcome::Applied));
        assert_eq!(
            game.state().board.get(sq(5, 7)).map(|piece| piece.kind),
            Some(PieceKind::Rook)
        );
        assert_eq!(game.history()[0].kind, MoveKind::CastleKingSide);
    }

    #[test]
    fn test_history_disabled() {
        let settings = GameSettings {
            record_history: false,
        };
        let mut game = GameController::with_settings(settings);
        submit_move(&mut game, sq(4, 6), sq(4, 4)).unwrap();
        assert!(game.history().is_empty());
    }
}
