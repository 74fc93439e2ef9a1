//! 国际象棋对局控制
//!
//! 包含:
//! - 对局控制器（走子顺序、选子、升变挂起、终局判定）
//! - 面向表现层的窄接口
//! - 对局设置

pub mod controller;
pub mod settings;

pub use controller::{
    legal_moves_for, new_game, status, submit_move, submit_promotion, visible_squares_for,
    GameController, GameStatus, MoveRecord, Terminal,
};
pub use settings::GameSettings;
