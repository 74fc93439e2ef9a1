//! 走法生成和将军检测

use std::collections::{BTreeMap, BTreeSet};

use crate::board::{Board, GameState};
use crate::constants::{
    KING_SIDE_CASTLE_FILE, KING_SIDE_ROOK_FILE, KING_START_FILE, QUEEN_SIDE_CASTLE_FILE,
    QUEEN_SIDE_ROOK_FILE,
};
use crate::executor::relocate;
use crate::piece::{Color, Piece, PieceKind, Square};

/// 马的 8 个跳跃方向
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// 王的 8 个相邻方向
const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成指定格子上棋子的伪合法走法（不考虑是否让己方王被将军）
    pub fn pseudo_legal_moves(
        board: &Board,
        from: Square,
        en_passant_target: Option<Square>,
    ) -> Vec<Square> {
        let mut moves = Vec::with_capacity(32);
        if let Some(piece) = board.get(from) {
            Self::generate_piece_moves(board, from, piece, en_passant_target, &mut moves);
        }
        moves
    }

    /// 生成指定格子上棋子的合法走法
    ///
    /// 对每个伪合法走法在棋盘副本上模拟，过滤掉走后己方王仍被将军的走法。
    /// 易位还要求王当前未被将军、经过的格子未被攻击。
    pub fn legal_moves(state: &GameState, from: Square) -> Vec<Square> {
        let Some(piece) = state.board.get(from) else {
            return Vec::new();
        };
        let en_passant_target = state.en_passant_target;

        Self::pseudo_legal_moves(&state.board, from, en_passant_target)
            .into_iter()
            .filter(|&to| {
                if Self::castling_rook_squares(piece, from, to).is_some()
                    && !Self::castling_path_safe(&state.board, piece.color, from, to, en_passant_target)
                {
                    return false;
                }
                !Self::leaves_king_in_check(&state.board, from, to, en_passant_target)
            })
            .collect()
    }

    /// 生成指定阵营所有棋子的合法走法（每次重新计算）
    pub fn all_legal_moves(state: &GameState, color: Color) -> BTreeMap<Square, Vec<Square>> {
        state
            .board
            .pieces(color)
            .into_iter()
            .map(|(square, _)| (square, Self::legal_moves(state, square)))
            .collect()
    }

    /// 计算指定阵营在战争迷雾下可见的格子
    ///
    /// 包括己方棋子所在格，以及这些棋子一步伪合法走法可到达的格子（含吃过路兵）。
    pub fn visible_squares(
        board: &Board,
        color: Color,
        en_passant_target: Option<Square>,
    ) -> BTreeSet<Square> {
        board
            .pieces(color)
            .into_iter()
            .flat_map(|(square, _)| {
                std::iter::once(square)
                    .chain(Self::pseudo_legal_moves(board, square, en_passant_target))
            })
            .collect()
    }

    /// 指定阵营是否至少有一个合法走法
    pub fn has_legal_move(state: &GameState, color: Color) -> bool {
        state
            .board
            .pieces(color)
            .into_iter()
            .any(|(square, _)| !Self::legal_moves(state, square).is_empty())
    }

    /// 模拟走法后走子方的王是否被将军
    ///
    /// 在棋盘副本上执行（含吃过路兵和易位移车），原棋盘不受影响。
    /// 起始格没有棋子时返回 false。
    pub fn leaves_king_in_check(
        board: &Board,
        from: Square,
        to: Square,
        en_passant_target: Option<Square>,
    ) -> bool {
        let Some(piece) = board.get(from) else {
            return false;
        };
        let mut scratch = board.clone();
        relocate(&mut scratch, piece, from, to, en_passant_target);
        Self::is_in_check(&scratch, piece.color, en_passant_target)
    }

    /// 生成指定棋子的伪合法走法
    fn generate_piece_moves(
        board: &Board,
        from: Square,
        piece: Piece,
        en_passant_target: Option<Square>,
        moves: &mut Vec<Square>,
    ) {
        match piece.kind {
            PieceKind::Pawn => Self::generate_pawn_moves(board, from, piece, en_passant_target, moves),
            PieceKind::Knight => Self::generate_step_moves(board, from, piece.color, &KNIGHT_OFFSETS, moves),
            PieceKind::Bishop => Self::generate_sliding_moves(board, from, piece.color, &BISHOP_DIRECTIONS, moves),
            PieceKind::Rook => Self::generate_sliding_moves(board, from, piece.color, &ROOK_DIRECTIONS, moves),
            PieceKind::Queen => {
                Self::generate_sliding_moves(board, from, piece.color, &ROOK_DIRECTIONS, moves);
                Self::generate_sliding_moves(board, from, piece.color, &BISHOP_DIRECTIONS, moves);
            }
            PieceKind::King => {
                Self::generate_step_moves(board, from, piece.color, &KING_OFFSETS, moves);
                Self::generate_castling_moves(board, from, piece, moves);
            }
        }
    }

    /// 生成兵的走法
    fn generate_pawn_moves(
        board: &Board,
        from: Square,
        piece: Piece,
        en_passant_target: Option<Square>,
        moves: &mut Vec<Square>,
    ) {
        let forward = piece.color.forward();

        // 前进一格，起始行且未走动时可以再进一格
        if let Some(one) = from.offset(0, forward) {
            if board.get(one).is_none() {
                moves.push(one);

                if !piece.has_moved && from.rank == piece.color.pawn_start_rank() {
                    if let Some(two) = from.offset(0, 2 * forward) {
                        if board.get(two).is_none() {
                            moves.push(two);
                        }
                    }
                }
            }
        }

        // 斜前方吃子或吃过路兵
        for df in [-1i8, 1i8] {
            if let Some(to) = from.offset(df, forward) {
                let capture = board
                    .get(to)
                    .is_some_and(|target| target.is_opponent_of(piece.color));
                if capture
                    || Self::en_passant_capture_square(board, piece, from, to, en_passant_target)
                        .is_some()
                {
                    moves.push(to);
                }
            }
        }
    }

    /// 生成固定偏移的走法（马、王）
    fn generate_step_moves(
        board: &Board,
        from: Square,
        color: Color,
        offsets: &[(i8, i8)],
        moves: &mut Vec<Square>,
    ) {
        for &(df, dr) in offsets {
            if let Some(to) = from.offset(df, dr) {
                Self::try_add_move(board, to, color, moves);
            }
        }
    }

    /// 生成沿射线滑行的走法（象、车、后）
    fn generate_sliding_moves(
        board: &Board,
        from: Square,
        color: Color,
        directions: &[(i8, i8)],
        moves: &mut Vec<Square>,
    ) {
        for &(df, dr) in directions {
            let mut current = from;
            while let Some(to) = current.offset(df, dr) {
                if let Some(target) = board.get(to) {
                    // 遇到对方棋子可以吃，遇到己方棋子被挡住
                    if target.is_opponent_of(color) {
                        moves.push(to);
                    }
                    break;
                }
                moves.push(to);
                current = to;
            }
        }
    }

    /// 生成易位候选走法（只检查走动标记和中间格子，不检查安全）
    fn generate_castling_moves(board: &Board, from: Square, king: Piece, moves: &mut Vec<Square>) {
        let rank = king.color.home_rank();
        if king.has_moved || from != Square::new_unchecked(KING_START_FILE, rank) {
            return;
        }

        for (rook_file, king_file) in [
            (KING_SIDE_ROOK_FILE, KING_SIDE_CASTLE_FILE),
            (QUEEN_SIDE_ROOK_FILE, QUEEN_SIDE_CASTLE_FILE),
        ] {
            let rook_ready = board
                .get(Square::new_unchecked(rook_file, rank))
                .is_some_and(|rook| {
                    rook.kind == PieceKind::Rook && rook.color == king.color && !rook.has_moved
                });
            if !rook_ready {
                continue;
            }

            let (low, high) = if rook_file > from.file {
                (from.file, rook_file)
            } else {
                (rook_file, from.file)
            };
            let path_clear = ((low + 1)..high)
                .all(|file| board.get(Square::new_unchecked(file, rank)).is_none());

            if path_clear {
                moves.push(Square::new_unchecked(king_file, rank));
            }
        }
    }

    /// 尝试添加走法（目标为空或为对方棋子）
    fn try_add_move(board: &Board, to: Square, color: Color, moves: &mut Vec<Square>) {
        match board.get(to) {
            Some(target) if !target.is_opponent_of(color) => {}
            _ => moves.push(to),
        }
    }

    /// 易位时王不能正被将军，也不能经过被攻击的格子
    fn castling_path_safe(
        board: &Board,
        color: Color,
        from: Square,
        to: Square,
        en_passant_target: Option<Square>,
    ) -> bool {
        if Self::is_in_check(board, color, en_passant_target) {
            return false;
        }
        let transit = Square::new_unchecked((from.file + to.file) / 2, from.rank);
        !Self::is_attacked(board, transit, color.opponent(), en_passant_target)
    }

    /// 若为王横移两格的易位走法，返回车的起止格
    pub(crate) fn castling_rook_squares(
        piece: Piece,
        from: Square,
        to: Square,
    ) -> Option<(Square, Square)> {
        if piece.kind != PieceKind::King
            || from.rank != to.rank
            || (to.file as i8 - from.file as i8).abs() != 2
        {
            return None;
        }
        if to.file > from.file {
            Some((
                Square::new_unchecked(KING_SIDE_ROOK_FILE, from.rank),
                Square::new_unchecked(to.file - 1, from.rank),
            ))
        } else {
            Some((
                Square::new_unchecked(QUEEN_SIDE_ROOK_FILE, from.rank),
                Square::new_unchecked(to.file + 1, from.rank),
            ))
        }
    }

    /// 若为吃过路兵走法，返回被吃的兵所在格（目标格同列、起始格同行）
    pub(crate) fn en_passant_capture_square(
        board: &Board,
        piece: Piece,
        from: Square,
        to: Square,
        en_passant_target: Option<Square>,
    ) -> Option<Square> {
        if piece.kind != PieceKind::Pawn || en_passant_target != Some(to) || from.file == to.file {
            return None;
        }
        let victim = Square::new_unchecked(to.file, from.rank);
        board
            .get(victim)
            .filter(|target| target.kind == PieceKind::Pawn && target.is_opponent_of(piece.color))
            .map(|_| victim)
    }

    /// 检查指定格子是否被某方攻击
    ///
    /// 按原始可达性计算，被牵制的棋子同样构成攻击。
    pub fn is_attacked(
        board: &Board,
        square: Square,
        by_color: Color,
        en_passant_target: Option<Square>,
    ) -> bool {
        board
            .pieces(by_color)
            .into_iter()
            .any(|(from, piece)| Self::can_attack(board, from, piece, square, en_passant_target))
    }

    /// 检查棋子是否能攻击到目标格
    fn can_attack(
        board: &Board,
        from: Square,
        piece: Piece,
        target: Square,
        en_passant_target: Option<Square>,
    ) -> bool {
        let df = target.file as i8 - from.file as i8;
        let dr = target.rank as i8 - from.rank as i8;
        match piece.kind {
            // 兵斜前方两格无论是否有子都受控制
            PieceKind::Pawn => dr == piece.color.forward() && df.abs() == 1,
            // 易位不构成攻击
            PieceKind::King => df.abs().max(dr.abs()) == 1,
            _ => {
                let mut moves = Vec::new();
                Self::generate_piece_moves(board, from, piece, en_passant_target, &mut moves);
                moves.contains(&target)
            }
        }
    }

    /// 检查指定阵营是否被将军
    pub fn is_in_check(board: &Board, color: Color, en_passant_target: Option<Square>) -> bool {
        match board.king_location(color) {
            Some(king) => Self::is_attacked(board, king, color.opponent(), en_passant_target),
            None => false, // 没有王，视为不被将军
        }
    }

    /// 检查当前走子方是否被将死
    pub fn is_checkmate(state: &GameState) -> bool {
        let color = state.current_player;
        Self::is_in_check(&state.board, color, state.en_passant_target)
            && !Self::has_legal_move(state, color)
    }

    /// 检查当前走子方是否被逼和（未被将军但无子可动）
    pub fn is_stalemate(state: &GameState) -> bool {
        let color = state.current_player;
        !Self::is_in_check(&state.board, color, state.en_passant_target)
            && !Self::has_legal_move(state, color)
    }
}
