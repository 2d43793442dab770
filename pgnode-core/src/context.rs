//! 実行コンテキストとセッション状態
//!
//! デバッガファサード、レジストリ、セッション単位で記憶する機能フラグを
//! まとめて各操作に明示的に渡す。

use crate::error::EvalError;
use crate::list::ListShape;
use crate::value_node::ValueLayout;
use crate::Result;
use pgnode_registry::{SpecialMemberRegistry, TypeRegistry};
use pgnode_target::value::{extract_string, is_null_pointer, parse_bool, parse_int, parse_pointer};
use pgnode_target::{DebugValue, DebuggerFacade, FrameId};
use std::cell::Cell;
use tracing::debug;

/// 一度だけ計算する値
///
/// 「まだ試していない」と「試した結果が空だった」を区別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lazy<T> {
    Unset,
    Computed(T),
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Lazy::Unset
    }
}

impl<T> Lazy<T> {
    pub fn is_computed(&self) -> bool {
        matches!(self, Lazy::Computed(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Lazy::Computed(value) => Some(value),
            Lazy::Unset => None,
        }
    }
}

/// ターゲット側関数の利用可否
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    /// まだ確認していない
    #[default]
    Unknown,
    Available,
    Unavailable,
}

/// セッション単位で記憶する機能フラグ
///
/// 値は一方向にしか変化しないため、並行して展開中の変数が同じ確認を
/// 重複して行っても結果は変わらない。
#[derive(Debug, Default)]
pub struct SessionState {
    /// `bms_is_valid_set`
    pub valid_set: Cell<Capability>,
    /// `bms_next_member`
    pub next_member: Cell<Capability>,
    /// `bms_first_member`（`bms_copy` / `bms_free` と組で使う）
    pub first_member: Cell<Capability>,
    /// 補助拡張の `pg_hacker_helper_format_expr`
    pub helper_extension: Cell<Capability>,
    /// 値ノードの構造体レイアウト（判定できなかった場合は `None`）
    pub value_layout: Cell<Lazy<Option<ValueLayout>>>,
    /// 式の描画で使うListの形状
    pub list_shape: Cell<Lazy<ListShape>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 機能が利用不可と確定していないか
    pub fn may_use(flag: &Cell<Capability>) -> bool {
        flag.get() != Capability::Unavailable
    }

    /// 機能の利用可否を記録する
    pub fn record(flag: &Cell<Capability>, name: &str, capability: Capability) {
        if flag.get() != capability {
            debug!("capability {} -> {:?}", name, capability);
            flag.set(capability);
        }
    }
}

/// 1回の操作で使う実行コンテキスト
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    pub debugger: &'a dyn DebuggerFacade,
    pub types: &'a TypeRegistry,
    pub special: &'a SpecialMemberRegistry,
    pub session: &'a SessionState,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        debugger: &'a dyn DebuggerFacade,
        types: &'a TypeRegistry,
        special: &'a SpecialMemberRegistry,
        session: &'a SessionState,
    ) -> Self {
        Self {
            debugger,
            types,
            special,
            session,
        }
    }

    /// 式を評価する
    pub async fn evaluate(&self, expr: &str, frame: FrameId) -> Result<DebugValue> {
        Ok(self.debugger.evaluate(expr, frame).await?)
    }

    /// 式を評価して整数として読む
    pub async fn evaluate_int(&self, expr: &str, frame: FrameId) -> Result<i64> {
        let value = self.evaluate(expr, frame).await?;
        parse_int(&value.value).ok_or_else(|| EvalError::unparseable(expr, &value.value, "integer"))
    }

    /// 式を評価して真偽値として読む
    pub async fn evaluate_bool(&self, expr: &str, frame: FrameId) -> Result<bool> {
        let value = self.evaluate(expr, frame).await?;
        parse_bool(&value.value)
            .or_else(|| parse_int(&value.value).map(|v| v != 0))
            .ok_or_else(|| EvalError::unparseable(expr, &value.value, "boolean"))
    }

    /// `char *` の式を評価して文字列を読む
    pub async fn evaluate_string(&self, expr: &str, frame: FrameId) -> Result<String> {
        let value = self.evaluate(expr, frame).await?;
        if is_null_pointer(&value.value) {
            return Err(EvalError::unparseable(expr, &value.value, "string"));
        }
        extract_string(&value.value).ok_or_else(|| EvalError::unparseable(expr, &value.value, "string"))
    }

    /// ポインタの式を評価する（NULLなら `None`）
    pub async fn evaluate_pointer(&self, expr: &str, frame: FrameId) -> Result<Option<u64>> {
        let value = self.evaluate(expr, frame).await?;
        match parse_pointer(&value.value) {
            Some(0) => Ok(None),
            Some(ptr) => Ok(Some(ptr)),
            None if is_null_pointer(&value.value) => Ok(None),
            None => Err(EvalError::unparseable(expr, &value.value, "pointer")),
        }
    }

    /// 列挙型の値を評価して列挙子名を読む
    pub async fn evaluate_enum(&self, expr: &str, frame: FrameId) -> Result<String> {
        let value = self.evaluate(expr, frame).await?;
        let token = pgnode_target::value::first_token(&value.value);
        if token.is_empty() {
            return Err(EvalError::unparseable(expr, &value.value, "enum"));
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgnode_target::mock::ScriptedDebugger;

    #[tokio::test]
    async fn test_typed_evaluation() {
        let debugger = ScriptedDebugger::new()
            .with_value("n", "3", "int")
            .with_value("flag", "true", "bool")
            .with_value("name", "0x1000 \"pg_class\"", "char *")
            .with_value("nil", "0x0", "char *")
            .with_value("ptr", "(List *) 0x2000", "List *")
            .with_value("kind", "AND_EXPR", "BoolExprType");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let frame = FrameId(0);

        assert_eq!(ctx.evaluate_int("n", frame).await.unwrap(), 3);
        assert!(ctx.evaluate_bool("flag", frame).await.unwrap());
        assert_eq!(ctx.evaluate_string("name", frame).await.unwrap(), "pg_class");
        assert!(ctx.evaluate_string("nil", frame).await.is_err());
        assert_eq!(ctx.evaluate_pointer("ptr", frame).await.unwrap(), Some(0x2000));
        assert_eq!(ctx.evaluate_pointer("nil", frame).await.unwrap(), None);
        assert_eq!(ctx.evaluate_enum("kind", frame).await.unwrap(), "AND_EXPR");
        assert!(ctx.evaluate_int("name", frame).await.is_err());
    }

    #[test]
    fn test_capability_is_recorded() {
        let session = SessionState::new();
        assert!(SessionState::may_use(&session.next_member));
        SessionState::record(&session.next_member, "bms_next_member", Capability::Unavailable);
        assert!(!SessionState::may_use(&session.next_member));
    }
}
