//! 国际象棋规则核心库
//!
//! 包含:
//! - 棋子、棋盘、坐标等核心数据结构
//! - 伪合法/合法走法生成
//! - 将军、将死、逼和检测
//! - 走法执行（吃过路兵、易位、升变）

mod board;
mod constants;
mod error;
mod executor;
mod moves;
mod piece;

pub use board::{Board, GameState};
pub use constants::*;
pub use error::{ChessError, Result};
pub use executor::{MoveKind, MoveOutcome, MoveReport};
pub use moves::MoveGenerator;
pub use piece::{Color, Piece, PieceKind, Square};
