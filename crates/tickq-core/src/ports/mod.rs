//! Ports - 抽象化レイヤー
//!
//! 時刻と ID 生成を trait として切り出し、テストで差し替えられるようにする。

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
