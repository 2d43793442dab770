//! デバッガファサード
//!
//! 停止中のプロセスに対して式の評価や構造体メンバの列挙を要求する。
//! 1回の呼び出しが1往復の通信に相当し、コストが高い点に注意。

use crate::{Breakpoint, Result};
use async_trait::async_trait;

/// スタックフレームの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub i64);

/// デバッガから得た生の値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugValue {
    /// メンバ名・変数名（評価結果の場合は式そのもの）
    pub name: String,
    /// 表示用の値文字列
    pub value: String,
    /// 宣言型の文字列
    pub type_name: String,
    /// 再評価でこの値を得られる式
    pub evaluate_name: String,
    /// 子要素列挙用のハンドル（0なら子を持たない）
    pub variables_reference: i64,
    /// メモリアドレス
    pub memory_reference: Option<String>,
}

impl DebugValue {
    /// 子を持たない値を作成する
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            evaluate_name: name.clone(),
            name,
            value: value.into(),
            type_name: type_name.into(),
            variables_reference: 0,
            memory_reference: None,
        }
    }

    /// 再評価用の式を設定する
    pub fn with_evaluate_name(mut self, evaluate_name: impl Into<String>) -> Self {
        self.evaluate_name = evaluate_name.into();
        self
    }

    /// 子要素列挙用のハンドルを設定する
    pub fn with_reference(mut self, variables_reference: i64) -> Self {
        self.variables_reference = variables_reference;
        self
    }

    /// メモリアドレスを設定する
    pub fn with_memory_reference(mut self, memory_reference: impl Into<String>) -> Self {
        self.memory_reference = Some(memory_reference.into());
        self
    }
}

/// デバッガバックエンドへのファサード
///
/// 実装はDAPセッションなどのトランスポートに依存する。
/// 各呼び出しは1回の要求と1回の応答からなる非同期処理で、
/// すべての呼び出しはプロセス状態の変化によって失敗し得る。
/// 呼び出し側は1つの呼び出し地点につき1つの要求しか同時に出さないが、
/// 異なる変数の展開からの要求が交互に届くことはある。
#[async_trait(?Send)]
pub trait DebuggerFacade {
    /// フレーム内で式を評価する
    async fn evaluate(&self, expr: &str, frame: FrameId) -> Result<DebugValue>;

    /// ハンドルが指す値の子要素を列挙する
    async fn enumerate_children(&self, variables_reference: i64) -> Result<Vec<DebugValue>>;

    /// `expr` が指す連続領域から `count` 個の要素を読み取る
    async fn enumerate_array_children(
        &self,
        expr: &str,
        count: usize,
        frame: FrameId,
    ) -> Result<Vec<DebugValue>>;

    /// フレームが属する関数名を取得する
    async fn current_function_name(&self, frame: FrameId) -> Result<Option<String>>;

    /// 現在設定されているブレークポイント
    fn breakpoints(&self) -> Vec<Breakpoint>;
}
