//! 変数の生成とタグによる分類
//!
//! 生の値を、宣言型・エイリアス・実行時タグ・特殊メンバのルールに従って
//! 変数モデルのいずれかの種類に振り分ける。

use crate::context::{ExecContext, Lazy};
use crate::error::EvalError;
use crate::inspector::Inspector;
use crate::list::{ListState, ListVariant};
use crate::value_node::{detect_layout, ValueKind, ValueState};
use crate::variable::{ExprState, NodeInfo, RealInfo, SetState, VarId, Variable, VariableKind};
use crate::Result;
use pgnode_registry::type_name::{
    base_type_name, has_struct_keyword, remove_struct_keyword, substitute_base_name,
};
use pgnode_registry::TAG_PREFIX;
use pgnode_target::value::{first_token, is_null_pointer, is_raw_struct, is_valid_pointer};
use pgnode_target::{DebugValue, FrameId};
use tracing::debug;

/// 式をメンバに持つノードと、そのメンバ名
const EXPR_HOLDERS: &[(&str, &str)] = &[("EquivalenceMember", "em_expr"), ("RestrictInfo", "clause")];

/// 実行時タグを読む
///
/// `((Node *)(expr))->type` を評価し、`T_` で始まる識別子であることを確認する。
pub async fn read_tag(ctx: &ExecContext<'_>, expr: &str, frame: FrameId) -> Result<String> {
    let tag_expr = format!("((Node *)({}))->type", expr);
    let value = ctx.evaluate(&tag_expr, frame).await?;
    let token = first_token(&value.value);
    match token.strip_prefix(TAG_PREFIX) {
        Some(tag) if ctx.types.is_valid_tag_name(tag) => Ok(tag.to_string()),
        _ => Err(EvalError::unparseable(&tag_expr, &value.value, "node tag")),
    }
}

/// 宣言型が `List *` そのものか
fn is_list_pointer_type(type_name: &str) -> bool {
    let compact: String = type_name.chars().filter(|c| !c.is_whitespace()).collect();
    compact == "List*"
}

impl<'a> Inspector<'a> {
    /// 生の値から変数を作成する
    ///
    /// 判定は上から順に行い、最初に当てはまったものを採用する。
    /// 1. エイリアスを1段解決して実際の型を得る
    /// 2. 埋め込み構造体・無効なポインタは通常の変数（`List *` のNULLは空のList）
    /// 3. Bitmapset型ならBitmapset
    /// 4. タグ付きノードへのポインタならタグで分類（タグが読めなければ次へ）
    /// 5. 親の配列ルールに一致すれば配列メンバ
    /// 6. それ以外は通常の変数
    pub(crate) async fn create(&self, raw: DebugValue, frame: FrameId, parent: Option<VarId>) -> VarId {
        let ctx = self.ctx;
        let evaluate_name = if raw.evaluate_name.is_empty() {
            raw.name.clone()
        } else {
            raw.evaluate_name
        };
        let mut var = Variable {
            real_type: ctx.types.resolve_alias(&raw.type_name),
            name: raw.name,
            declared_type: raw.type_name,
            value: raw.value,
            parent,
            frame,
            real: Some(RealInfo {
                evaluate_name,
                memory_reference: raw.memory_reference,
                variables_reference: raw.variables_reference,
            }),
            node: None,
            kind: VariableKind::Plain,
            children: Lazy::Unset,
        };

        if is_raw_struct(&var.value) || !is_valid_pointer(&var.value) {
            if is_null_pointer(&var.value) && is_list_pointer_type(&var.declared_type) {
                var.kind = VariableKind::List(ListState::empty());
            }
            return self.push(var);
        }

        if ctx.types.is_bitmapset_type(&var.real_type) {
            var.kind = VariableKind::BitmapSet(SetState::default());
            return self.push(var);
        }

        if ctx.types.is_node_var(&var.real_type) {
            match classify(&ctx, &mut var).await {
                Ok(()) => return self.push(var),
                Err(e) => debug!("tag of '{}' unavailable: {}", var.name, e),
            }
        }

        if let Some(parent) = parent {
            let rule = self.with_var(parent, |parent| {
                if parent.real.is_none() {
                    return None;
                }
                ctx.special.array_rule(&parent.real_type, &var.name).cloned()
            });
            if let Ok(Some(rule)) = rule {
                var.kind = VariableKind::Array(rule);
            }
        }

        self.push(var)
    }

    /// タグが宣言型と異なる場合、実際の型にキャストして子要素のハンドルを得る
    ///
    /// `struct` 付きの型でキャストに失敗した場合は、外して1回だけ再試行する。
    /// どちらも失敗した場合は元のハンドルのまま展開を続ける。
    pub(crate) async fn ensure_cast(&self, id: VarId) -> Result<()> {
        let (expr, candidates, frame) = match self.with_var(id, cast_plan)?? {
            CastPlan::Done => return Ok(()),
            CastPlan::Unneeded => return self.record_cast(id, None),
            CastPlan::Try {
                expr,
                candidates,
                frame,
            } => (expr, candidates, frame),
        };

        let mut handle = None;
        for type_name in candidates {
            match self.ctx.evaluate(&format!("({})({})", type_name, expr), frame).await {
                Ok(value) => {
                    handle = Some(value.variables_reference);
                    break;
                }
                Err(e) => debug!("cast of '{}' to {} failed: {}", expr, type_name, e),
            }
        }

        self.record_cast(id, handle)
    }

    fn record_cast(&self, id: VarId, handle: Option<i64>) -> Result<()> {
        self.update_var(id, |var| {
            if let Some(node) = var.node.as_mut() {
                node.cast = Lazy::Computed(handle);
            }
        })
    }
}

/// キャストの要否
enum CastPlan {
    /// ノードでないか、確認済み
    Done,
    /// 宣言型のままでよい
    Unneeded,
    /// 候補の型を順に試す
    Try {
        expr: String,
        candidates: Vec<String>,
        frame: FrameId,
    },
}

fn cast_plan(var: &Variable) -> Result<CastPlan> {
    let Some(node) = &var.node else {
        return Ok(CastPlan::Done);
    };
    if node.cast.is_computed() {
        return Ok(CastPlan::Done);
    }
    if base_type_name(&var.real_type) == base_type_name(&var.declared_type) {
        return Ok(CastPlan::Unneeded);
    }

    let expr = var
        .evaluate_name()
        .ok_or_else(|| EvalError::assumption(format!("'{}' has no expression", var.name)))?
        .to_string();
    let mut candidates = vec![var.real_type.clone()];
    if has_struct_keyword(&var.real_type) {
        candidates.push(remove_struct_keyword(&var.real_type));
    }
    Ok(CastPlan::Try {
        expr,
        candidates,
        frame: var.frame,
    })
}

/// タグを読み、タグに応じた種類と実際の型を設定する
async fn classify(ctx: &ExecContext<'_>, var: &mut Variable) -> Result<()> {
    let expr = var
        .evaluate_name()
        .ok_or_else(|| EvalError::assumption(format!("'{}' has no expression", var.name)))?
        .to_string();
    let tag = read_tag(ctx, &expr, var.frame).await?;

    let (kind, struct_name) = if let Some(variant) = ListVariant::from_tag(&tag) {
        (VariableKind::List(ListState::new(variant)), "List".to_string())
    } else if tag == "Bitmapset" {
        (VariableKind::BitmapSet(SetState::default()), tag.clone())
    } else if ctx.types.is_expr_tag(&tag) {
        let nested = EXPR_HOLDERS
            .iter()
            .find(|(holder, _)| *holder == tag)
            .map(|(_, member)| *member);
        (VariableKind::Expr(ExprState::new(nested)), tag.clone())
    } else if let Some(kind) = ValueKind::from_tag(&tag) {
        let struct_name = match detect_layout(ctx, kind, &expr, var.frame).await {
            Ok(layout) => kind.struct_name(layout).to_string(),
            Err(e) => {
                debug!("value node layout unknown: {}", e);
                tag.clone()
            }
        };
        (VariableKind::Value(ValueState::new(kind)), struct_name)
    } else {
        (VariableKind::Node, tag.clone())
    };

    var.real_type = substitute_base_name(&var.real_type, &struct_name);
    var.kind = kind;
    var.node = Some(NodeInfo {
        tag,
        cast: Lazy::Unset,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionState;
    use pgnode_registry::{SpecialMemberRegistry, TypeRegistry};
    use pgnode_target::mock::ScriptedDebugger;

    #[tokio::test]
    async fn test_read_tag_grammar() {
        let debugger = ScriptedDebugger::new()
            .with_value("((Node *)(a))->type", "T_OpExpr", "NodeTag")
            .with_value("((Node *)(b))->type", "1234", "NodeTag")
            .with_value("((Node *)(c))->type", "T_A_Expr", "NodeTag");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let frame = FrameId(0);

        assert_eq!(read_tag(&ctx, "a", frame).await.unwrap(), "OpExpr");
        assert!(read_tag(&ctx, "b", frame).await.is_err());
        assert_eq!(read_tag(&ctx, "c", frame).await.unwrap(), "A_Expr");
        assert!(read_tag(&ctx, "d", frame).await.is_err());
    }

    #[test]
    fn test_list_pointer_type() {
        assert!(is_list_pointer_type("List *"));
        assert!(is_list_pointer_type("List*"));
        assert!(!is_list_pointer_type("List **"));
        assert!(!is_list_pointer_type("const List *"));
    }

    #[tokio::test]
    async fn test_classification_kinds() {
        let debugger = ScriptedDebugger::new()
            .with_value("((Node *)(n))->type", "T_IntList", "NodeTag")
            .with_value("((Node *)(e))->type", "T_RestrictInfo", "NodeTag")
            .with_value("((Node *)(p))->type", "T_RelOptInfo", "NodeTag");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let inspector = Inspector::new(ctx);
        let frame = FrameId(0);

        let list = inspector.add_root(DebugValue::new("n", "0x10", "Node *"), frame).await;
        let holder = inspector.add_root(DebugValue::new("e", "0x20", "Node *"), frame).await;
        let rel = inspector.add_root(DebugValue::new("p", "0x30", "RelOptInfo *"), frame).await;
        let int = inspector.add_root(DebugValue::new("i", "5", "int"), frame).await;

        let list = inspector.variable(list).unwrap();
        assert!(matches!(list.kind, VariableKind::List(_)));
        assert_eq!(list.real_type, "List *");
        assert_eq!(list.tag(), Some("IntList"));

        let holder = inspector.variable(holder).unwrap();
        assert!(matches!(
            holder.kind,
            VariableKind::Expr(ExprState { nested: Some("clause"), .. })
        ));

        let rel = inspector.variable(rel).unwrap();
        assert_eq!(rel.kind, VariableKind::Node);
        assert_eq!(rel.real_type, "RelOptInfo *");

        assert_eq!(inspector.variable(int).unwrap().kind, VariableKind::Plain);
    }

    #[tokio::test]
    async fn test_tag_failure_falls_through() {
        let debugger = ScriptedDebugger::new();
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let inspector = Inspector::new(ctx);

        let id = inspector.add_root(DebugValue::new("node", "0x40", "Node *"), FrameId(0)).await;
        let var = inspector.variable(id).unwrap();
        assert_eq!(var.kind, VariableKind::Plain);
        assert!(var.node.is_none());
    }

    #[tokio::test]
    async fn test_cast_retries_without_struct_keyword() {
        let debugger = ScriptedDebugger::new()
            .with_value("((Node *)(n))->type", "T_OpExpr", "NodeTag")
            .with_value_ref("(OpExpr *)(n)", "0x50", "OpExpr *", 9);
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);
        let inspector = Inspector::new(ctx);

        let id = inspector.add_root(DebugValue::new("n", "0x50", "struct Node *"), FrameId(0)).await;
        debugger.clear_calls();
        inspector.ensure_cast(id).await.unwrap();

        assert_eq!(
            debugger.evaluated(),
            vec!["(struct OpExpr *)(n)", "(OpExpr *)(n)"]
        );
        assert_eq!(inspector.member_handle(id).unwrap(), 9);

        debugger.clear_calls();
        inspector.ensure_cast(id).await.unwrap();
        assert_eq!(debugger.call_count(), 0);
    }
}
