//! ファサードのエラー型

use thiserror::Error;

/// デバッガファサードが返すエラー
///
/// どの呼び出しも、プロセスの状態変化によっていつでも失敗し得ます。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FacadeError {
    /// 式の評価に失敗した（構文エラー、無効なメモリ参照など）
    #[error("failed to evaluate '{expr}': {message}")]
    Evaluation { expr: String, message: String },

    /// 式が参照するシンボル（関数・変数・型）がターゲットに存在しない
    #[error("unknown symbol in '{expr}': {symbol}")]
    UnknownSymbol { expr: String, symbol: String },

    /// セッションの状態が変わった（プロセス再開、フレーム消失など）
    #[error("debug session is not available: {0}")]
    SessionGone(String),
}

impl FacadeError {
    /// 評価エラーを作成する
    pub fn evaluation(expr: impl Into<String>, message: impl Into<String>) -> Self {
        FacadeError::Evaluation {
            expr: expr.into(),
            message: message.into(),
        }
    }

    /// 未知シンボルのエラーを作成する
    pub fn unknown_symbol(expr: impl Into<String>, symbol: impl Into<String>) -> Self {
        FacadeError::UnknownSymbol {
            expr: expr.into(),
            symbol: symbol.into(),
        }
    }

    /// ターゲットにシンボルが存在しないことを示すエラーか
    ///
    /// 関数が存在しないことが確定した機能は、セッション中に再試行しない。
    pub fn is_unknown_symbol(&self) -> bool {
        matches!(self, FacadeError::UnknownSymbol { .. })
    }

    /// セッション自体が失われたことを示すエラーか
    pub fn is_session_gone(&self) -> bool {
        matches!(self, FacadeError::SessionGone(_))
    }
}
