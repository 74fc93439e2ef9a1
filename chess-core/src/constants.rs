//! 棋盘常量定义

/// 棋盘边长（行数 = 列数）
pub const BOARD_SIZE: usize = 8;

/// 棋盘格子总数
pub const SQUARE_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// 王翼车所在列
pub const KING_SIDE_ROOK_FILE: u8 = 7;

/// 后翼车所在列
pub const QUEEN_SIDE_ROOK_FILE: u8 = 0;

/// 王的初始列
pub const KING_START_FILE: u8 = 4;

/// 王翼易位后王所在列
pub const KING_SIDE_CASTLE_FILE: u8 = 6;

/// 后翼易位后王所在列
pub const QUEEN_SIDE_CASTLE_FILE: u8 = 2;
