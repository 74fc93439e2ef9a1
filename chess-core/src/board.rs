//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::SQUARE_COUNT;
use crate::error::ChessError;
use crate::piece::{Color, Piece, PieceKind, Square};

/// 底线棋子排列（列 0 到列 7）
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    /// 8x8 棋盘，索引为 rank * 8 + file，长度恒为 64
    squares: Vec<Option<Piece>>,
}

/// 反序列化中间结构，校验格子数后才转换为 [`Board`]
#[derive(Deserialize)]
struct RawBoard {
    squares: Vec<Option<Piece>>,
}

impl TryFrom<RawBoard> for Board {
    type Error = ChessError;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        if raw.squares.len() != SQUARE_COUNT {
            return Err(ChessError::InvalidBoardSize {
                len: raw.squares.len(),
            });
        }
        Ok(Self {
            squares: raw.squares,
        })
    }
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; SQUARE_COUNT],
        }
    }

    /// 创建初始棋盘
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for color in [Color::White, Color::Black] {
            for (file, kind) in BACK_RANK.iter().enumerate() {
                board.set(
                    Square::new_unchecked(file as u8, color.home_rank()),
                    Some(Piece::new(*kind, color)),
                );
                board.set(
                    Square::new_unchecked(file as u8, color.pawn_start_rank()),
                    Some(Piece::new(PieceKind::Pawn, color)),
                );
            }
        }

        board
    }

    /// 获取指定格子的棋子
    pub fn get(&self, square: Square) -> Option<Piece> {
        if square.is_valid() {
            self.squares[square.to_index()]
        } else {
            None
        }
    }

    /// 设置指定格子的棋子
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        if square.is_valid() {
            self.squares[square.to_index()] = piece;
        }
    }

    /// 移动棋子并标记为已走动（不检查规则），返回被吃掉的棋子
    pub fn move_piece(&mut self, from: Square, to: Square) -> Option<Piece> {
        let piece = self.get(from).map(|mut piece| {
            piece.has_moved = true;
            piece
        });
        let captured = self.get(to);
        self.set(from, None);
        self.set(to, piece);
        captured
    }

    /// 查找指定阵营的王
    pub fn king_location(&self, color: Color) -> Option<Square> {
        Square::all().find(|&square| {
            self.get(square)
                .is_some_and(|piece| piece.kind == PieceKind::King && piece.color == color)
        })
    }

    /// 获取指定阵营的所有棋子
    pub fn pieces(&self, color: Color) -> Vec<(Square, Piece)> {
        self.all_pieces()
            .into_iter()
            .filter(|(_, piece)| piece.color == color)
            .collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Square, Piece)> {
        Square::all()
            .filter_map(|square| self.get(square).map(|piece| (square, piece)))
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// 完整的对局状态（棋盘、走子方、过路兵目标等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// 棋盘
    pub board: Board,
    /// 当前走子方
    pub current_player: Color,
    /// 上一步双步兵越过的格子，仅对对方紧接着的一步有效
    pub en_passant_target: Option<Square>,
    /// 当前走子方是否被将军
    pub check: bool,
    /// 是否已将死或逼和
    pub game_over: bool,
    /// 等待选择升变类型的兵所在格
    pub promotion_pending: Option<Square>,
}

impl GameState {
    /// 创建初始状态
    pub fn initial() -> Self {
        Self::from_board(Board::initial(), Color::White)
    }

    /// 从棋盘创建状态，并计算将军与终局标记
    pub fn from_board(board: Board, current_player: Color) -> Self {
        let mut state = Self {
            board,
            current_player,
            en_passant_target: None,
            check: false,
            game_over: false,
            promotion_pending: None,
        };
        state.refresh_status();
        state
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
impl Board {
    /// 从文字棋盘构建（测试用）
    ///
    /// 第一行为 rank 0，白方大写、黑方小写，`.` 为空格。
    pub(crate) fn from_diagram(rows: [&str; 8]) -> Board {
        let mut board = Board::empty();
        for (rank, row) in rows.iter().enumerate() {
            for (file, c) in row.chars().filter(|c| !c.is_whitespace()).enumerate() {
                let Some(kind) = PieceKind::from_char(c) else {
                    continue;
                };
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                let square = Square::try_from((file as i8, rank as i8))
                    .expect("diagram square out of range");
                board.set(square, Some(Piece::new(kind, color)));
            }
        }
        board
    }
}
