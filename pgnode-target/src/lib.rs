//! pgnode デバッガファサード
//!
//! このクレートは、停止中のプロセスに対する式評価・メンバ列挙を行う
//! デバッガバックエンドとの境界を定義します。
//! 生の評価結果の型、値文字列のパース、ファサードのエラー型を提供します。

pub mod breakpoint;
pub mod error;
pub mod facade;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use breakpoint::Breakpoint;
pub use error::FacadeError;
pub use facade::{DebugValue, DebuggerFacade, FrameId};

/// ファサード呼び出しの結果型
pub type Result<T> = std::result::Result<T, FacadeError>;
