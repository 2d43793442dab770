//! 評価エラー

use pgnode_target::FacadeError;
use thiserror::Error;

/// 変数モデルの評価エラー
///
/// `Assumption` 以外は回復可能で、呼び出し側で空の子要素や
/// プレースホルダ表示に変換される。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// デバッガ呼び出しの失敗
    #[error(transparent)]
    Facade(#[from] FacadeError),

    /// 評価結果を期待した形式として解釈できない
    #[error("cannot parse '{value}' from '{expr}' as {expected}")]
    Unparseable {
        expr: String,
        value: String,
        expected: &'static str,
    },

    /// ターゲットがこの機能を提供していない
    #[error("{0} is not available in this session")]
    Unavailable(String),

    /// 内部で前提としていた値が存在しない
    #[error("assumption violated: {0}")]
    Assumption(String),
}

impl EvalError {
    pub fn unparseable(expr: &str, value: &str, expected: &'static str) -> Self {
        EvalError::Unparseable {
            expr: expr.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    pub fn assumption(message: impl Into<String>) -> Self {
        EvalError::Assumption(message.into())
    }

    /// 呼び出し側で吸収してよいエラーか
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EvalError::Assumption(_))
    }

    /// ターゲットにシンボルが存在しないことによる失敗か
    pub fn is_unknown_symbol(&self) -> bool {
        matches!(self, EvalError::Facade(e) if e.is_unknown_symbol())
    }
}
