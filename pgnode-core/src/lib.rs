//! pgnode 変数インスペクタ
//!
//! このクレートは、デバッガが返す生の値をPostgreSQLのノード構造として
//! 解釈し、遅延展開できる変数ツリーを構築します。
//! List・Bitmapset・長さ付き配列の展開と、式ノードのSQL風の描画を提供します。

pub mod array;
pub mod bitmapset;
pub mod context;
pub mod error;
pub mod expr;
pub mod factory;
pub mod inspector;
pub mod list;
pub mod tree;
pub mod value_node;
pub mod variable;

pub use context::{Capability, ExecContext, Lazy, SessionState};
pub use error::EvalError;
pub use expr::{placeholder, ExprRenderer};
pub use inspector::Inspector;
pub use list::{ListShape, ListVariant};
pub use tree::TreeItem;
pub use value_node::{ValueKind, ValueLayout};
pub use variable::{VarId, Variable, VariableKind};

/// 評価操作の結果型
pub type Result<T> = std::result::Result<T, EvalError>;
