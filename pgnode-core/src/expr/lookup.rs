//! ターゲット側の関数を呼び出して名前や値を引く
//!
//! OIDから名前を得るにはカタログを読む必要があるため、
//! バックエンド自身の関数をデバッガ経由で評価する。

use super::ExprRenderer;
use crate::context::{Capability, SessionState};
use crate::error::EvalError;
use crate::Result;
use pgnode_target::value::{extract_string, is_null_pointer, parse_pointer};
use tracing::debug;

/// 補助拡張のバージョン関数
pub const HELPER_VERSION_FUNCTION: &str = "pg_hacker_helper_version";
/// 補助拡張の式描画関数
pub const HELPER_FORMAT_FUNCTION: &str = "pg_hacker_helper_format_expr";

impl<'c, 'a> ExprRenderer<'c, 'a> {
    /// `char *` を返す関数呼び出しを評価する（NULLなら `invalid`）
    async fn lookup(&self, call: String, invalid: &str) -> Result<String> {
        let value = self.ctx.evaluate(&call, self.frame).await?;
        if is_null_pointer(&value.value) {
            return Ok(invalid.to_string());
        }
        extract_string(&value.value).ok_or_else(|| EvalError::unparseable(&call, &value.value, "string"))
    }

    /// 演算子名
    pub(crate) async fn operator_name(&self, opno: &str) -> Result<String> {
        self.lookup(format!("get_opname({})", opno), "(invalid operator)").await
    }

    /// 関数名
    pub(crate) async fn function_name(&self, funcid: &str) -> Result<String> {
        self.lookup(format!("get_func_name({})", funcid), "(invalid function)").await
    }

    /// 型名
    pub(crate) async fn type_name(&self, type_oid: &str) -> Result<String> {
        self.lookup(format!("format_type_be({})", type_oid), "???").await
    }

    /// 照合順序名
    pub(crate) async fn collation_name(&self, collation: &str) -> Result<String> {
        self.lookup(format!("get_collation_name({})", collation), "???").await
    }

    /// リレーション名
    pub(crate) async fn relation_name(&self, relid: &str) -> Result<String> {
        self.lookup(format!("get_rel_name({})", relid), "???").await
    }

    /// 定数を型の出力関数で文字列にする
    ///
    /// 出力関数のOIDを受け取る領域をターゲット側に確保し、
    /// 呼び出し後に確保した領域をすべて解放する。
    pub(crate) async fn const_output(&self, e: &str) -> Result<String> {
        let scratch = self
            .ctx
            .evaluate_pointer("palloc(sizeof(Oid) + sizeof(bool))", self.frame)
            .await?
            .ok_or_else(|| EvalError::Unavailable("palloc".to_string()))?;

        let result = self.call_output_function(e, scratch).await;
        self.free(scratch).await;
        result
    }

    async fn call_output_function(&self, e: &str, scratch: u64) -> Result<String> {
        let type_oid = self.field("Const", e, "consttype");
        self.ctx.evaluate(
            &format!(
                "getTypeOutputInfo({}, (Oid *) {:#x}, (bool *) ((char *) {:#x} + sizeof(Oid)))",
                type_oid, scratch, scratch
            ),
            self.frame,
        )
        .await?;

        let call = format!(
            "OidOutputFunctionCall(*(Oid *) {:#x}, {})",
            scratch,
            self.field("Const", e, "constvalue")
        );
        let value = self.ctx.evaluate(&call, self.frame).await?;
        let text = extract_string(&value.value).ok_or_else(|| EvalError::unparseable(&call, &value.value, "string"));
        if let Some(output) = parse_pointer(&value.value).filter(|ptr| *ptr != 0) {
            self.free(output).await;
        }
        text
    }

    /// ターゲット側のメモリを解放する（失敗は記録のみ）
    async fn free(&self, ptr: u64) {
        let call = format!("pfree((void *) {:#x})", ptr);
        if let Err(e) = self.ctx.evaluate(&call, self.frame).await {
            debug!("pfree({:#x}) failed: {}", ptr, e);
        }
    }

    /// 補助拡張が読み込まれていれば、それに描画させる
    ///
    /// 拡張の有無はセッションごとに一度だけ確認する。関数が存在しない場合のみ
    /// 利用不可と記憶し、それ以外の失敗は記憶せずにそのまま返す。
    pub(crate) async fn format_with_helper(&self, e: &str) -> Result<Option<String>> {
        let flag = &self.ctx.session.helper_extension;
        match flag.get() {
            Capability::Unavailable => return Ok(None),
            Capability::Available => {}
            Capability::Unknown => {
                let version_call = format!("{}()", HELPER_VERSION_FUNCTION);
                match self.ctx.evaluate(&version_call, self.frame).await {
                    Ok(_) => SessionState::record(flag, HELPER_VERSION_FUNCTION, Capability::Available),
                    Err(e) if e.is_unknown_symbol() => {
                        debug!("helper extension not available: {}", e);
                        SessionState::record(flag, HELPER_VERSION_FUNCTION, Capability::Unavailable);
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let call = format!(
            "{}((Expr *)({}), (List *)({}))",
            HELPER_FORMAT_FUNCTION,
            e,
            self.rtable.as_deref().unwrap_or("0")
        );
        match self.ctx.evaluate(&call, self.frame).await {
            Ok(value) if !is_null_pointer(&value.value) => Ok(extract_string(&value.value)),
            Ok(_) => Ok(None),
            Err(e) => {
                debug!("{} failed: {}", HELPER_FORMAT_FUNCTION, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecContext;
    use pgnode_registry::{SpecialMemberRegistry, TypeRegistry};
    use pgnode_target::mock::ScriptedDebugger;
    use pgnode_target::{FacadeError, FrameId};

    const FRAME: FrameId = FrameId(0);

    #[tokio::test]
    async fn test_const_output_frees_scratch_memory() {
        let debugger = ScriptedDebugger::new()
            .with_value("palloc(sizeof(Oid) + sizeof(bool))", "(void *) 0x100", "void *")
            .with_value(
                "getTypeOutputInfo(((Const *)(c))->consttype, (Oid *) 0x100, (bool *) ((char *) 0x100 + sizeof(Oid)))",
                "",
                "void",
            )
            .with_value(
                "OidOutputFunctionCall(*(Oid *) 0x100, ((Const *)(c))->constvalue)",
                "0x200 \"42\"",
                "char *",
            )
            .with_value("pfree((void *) 0x200)", "", "void")
            .with_value("pfree((void *) 0x100)", "", "void");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let renderer = ExprRenderer::new(&ctx, FRAME, None);

        assert_eq!(renderer.const_output("c").await.unwrap(), "42");
        let evaluated = debugger.evaluated();
        assert_eq!(evaluated[evaluated.len() - 2], "pfree((void *) 0x200)");
        assert_eq!(evaluated[evaluated.len() - 1], "pfree((void *) 0x100)");
    }

    #[tokio::test]
    async fn test_helper_checked_once() {
        let debugger = ScriptedDebugger::new().with_unknown_symbol(
            "pg_hacker_helper_version()",
            "pg_hacker_helper_version",
        );
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let renderer = ExprRenderer::new(&ctx, FRAME, None);

        assert_eq!(renderer.format_with_helper("e").await.unwrap(), None);
        assert_eq!(renderer.format_with_helper("e").await.unwrap(), None);
        assert_eq!(debugger.call_count(), 1);
        assert_eq!(session.helper_extension.get(), Capability::Unavailable);
    }

    #[tokio::test]
    async fn test_invalid_operator() {
        let debugger = ScriptedDebugger::new().with_value("get_opname(7)", "0x0", "char *");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let renderer = ExprRenderer::new(&ctx, FRAME, None);

        assert_eq!(renderer.operator_name("7").await.unwrap(), "(invalid operator)");
    }

    #[tokio::test]
    async fn test_helper_session_error_is_not_remembered() {
        let debugger = ScriptedDebugger::new().with_error(
            "pg_hacker_helper_version()",
            FacadeError::SessionGone("process resumed".into()),
        );
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let renderer = ExprRenderer::new(&ctx, FRAME, None);

        let err = renderer.format_with_helper("e").await.unwrap_err();
        assert!(matches!(err, EvalError::Facade(FacadeError::SessionGone(_))));
        assert_eq!(session.helper_extension.get(), Capability::Unknown);

        // 次の停止で関数がないと分かれば利用不可として記憶する
        let debugger = ScriptedDebugger::new().with_unknown_symbol(
            "pg_hacker_helper_version()",
            "pg_hacker_helper_version",
        );
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let renderer = ExprRenderer::new(&ctx, FRAME, None);

        assert_eq!(renderer.format_with_helper("e").await.unwrap(), None);
        assert_eq!(session.helper_extension.get(), Capability::Unavailable);
    }
}
