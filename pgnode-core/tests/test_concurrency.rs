//! 並行した展開に関するテスト

use async_trait::async_trait;
use pgnode_core::{Capability, ExecContext, Inspector, SessionState, VarId};
use pgnode_registry::{SpecialMemberRegistry, TypeRegistry};
use pgnode_target::mock::ScriptedDebugger;
use pgnode_target::{Breakpoint, DebugValue, DebuggerFacade, FrameId, Result};

const FRAME: FrameId = FrameId(0);

/// 要求のたびに一度スケジューラへ戻るデバッガ
///
/// 兄弟の展開の要求を実際に交互に処理させる。
struct YieldingDebugger(ScriptedDebugger);

#[async_trait(?Send)]
impl DebuggerFacade for YieldingDebugger {
    async fn evaluate(&self, expr: &str, frame: FrameId) -> Result<DebugValue> {
        tokio::task::yield_now().await;
        self.0.evaluate(expr, frame).await
    }

    async fn enumerate_children(&self, variables_reference: i64) -> Result<Vec<DebugValue>> {
        tokio::task::yield_now().await;
        self.0.enumerate_children(variables_reference).await
    }

    async fn enumerate_array_children(
        &self,
        expr: &str,
        count: usize,
        frame: FrameId,
    ) -> Result<Vec<DebugValue>> {
        tokio::task::yield_now().await;
        self.0.enumerate_array_children(expr, count, frame).await
    }

    async fn current_function_name(&self, frame: FrameId) -> Result<Option<String>> {
        tokio::task::yield_now().await;
        self.0.current_function_name(frame).await
    }

    fn breakpoints(&self) -> Vec<Breakpoint> {
        self.0.breakpoints()
    }
}

/// 2つの IntList を持つデバッガ
fn two_int_lists() -> ScriptedDebugger {
    let mut debugger = ScriptedDebugger::new();
    for (name, reference, values) in [("a", 1, ["1", "2"]), ("b", 2, ["30", "40"])] {
        debugger = debugger
            .with_value(&format!("((Node *)({}))->type", name), "T_IntList", "NodeTag")
            .with_children(reference, vec![DebugValue::new("elements", "0x2000", "ListCell *")])
            .with_value(&format!("({})->length", name), "2", "int")
            .with_value(&format!("({})->elements[0].int_value", name), values[0], "int")
            .with_value(&format!("({})->elements[1].int_value", name), values[1], "int");
    }
    debugger
}

/// 要素の値
fn values(inspector: &Inspector<'_>, ids: &[VarId]) -> Vec<String> {
    ids.iter().map(|&id| inspector.variable(id).unwrap().value).collect()
}

/// `name` を含む式だけを評価順に取り出す
fn evaluated_for(debugger: &ScriptedDebugger, name: &str) -> Vec<String> {
    let needle = format!("({})", name);
    debugger
        .evaluated()
        .into_iter()
        .filter(|expr| expr.contains(&needle))
        .collect()
}

#[tokio::test]
async fn test_sibling_lists_expand_concurrently() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();

    // 1つずつ展開したときの評価順
    let sequential = two_int_lists();
    let session = SessionState::new();
    let inspector = Inspector::new(ExecContext::new(&sequential, &types, &special, &session));
    for (name, reference) in [("a", 1), ("b", 2)] {
        let list = inspector
            .add_root(DebugValue::new(name, "0x1000", "List *").with_reference(reference), FRAME)
            .await;
        inspector.list_elements(list).await.unwrap();
    }

    let debugger = YieldingDebugger(two_int_lists());
    let session = SessionState::new();
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));
    let a = inspector
        .add_root(DebugValue::new("a", "0x1000", "List *").with_reference(1), FRAME)
        .await;
    let b = inspector
        .add_root(DebugValue::new("b", "0x1000", "List *").with_reference(2), FRAME)
        .await;
    debugger.0.clear_calls();

    let (left, right) = tokio::join!(inspector.list_elements(a), inspector.list_elements(b));
    assert_eq!(values(&inspector, &left.unwrap()), vec!["1", "2"]);
    assert_eq!(values(&inspector, &right.unwrap()), vec!["30", "40"]);

    // 各展開の中の評価順は1つずつ展開した場合と同じ
    for name in ["a", "b"] {
        let expected: Vec<String> = evaluated_for(&sequential, name)
            .into_iter()
            .filter(|expr| !expr.contains("->type"))
            .collect();
        assert_eq!(evaluated_for(&debugger.0, name), expected);
    }
}

#[tokio::test]
async fn test_children_of_all_keeps_input_order() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();
    let debugger = YieldingDebugger(two_int_lists());
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let a = inspector
        .add_root(DebugValue::new("a", "0x1000", "List *").with_reference(1), FRAME)
        .await;
    let b = inspector
        .add_root(DebugValue::new("b", "0x1000", "List *").with_reference(2), FRAME)
        .await;

    let results = inspector.children_of_all(&[b, a]).await;
    assert_eq!(results.len(), 2);
    let b_elements = inspector.children(results[0].as_ref().unwrap()[0]).await.unwrap();
    let a_elements = inspector.children(results[1].as_ref().unwrap()[0]).await.unwrap();
    assert_eq!(values(&inspector, &b_elements), vec!["30", "40"]);
    assert_eq!(values(&inspector, &a_elements), vec!["1", "2"]);

    // 同じ変数を同時に展開しても結果は1つに収束する
    let again = inspector.children_of_all(&[a, a]).await;
    assert_eq!(again[0], again[1]);
    assert_eq!(again[0], results[1]);
}

#[tokio::test]
async fn test_shared_session_capability_converges() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();
    let scripted = |name: &str| {
        let set = format!("((Bitmapset *)({}))", name);
        YieldingDebugger(
            ScriptedDebugger::new()
                .with_unknown_symbol(&format!("bms_is_valid_set({})", set), "bms_is_valid_set")
                .with_value(&format!("({})->nwords", set), "1", "int")
                .with_value(&format!("({})->type", set), "T_Bitmapset", "NodeTag")
                .with_value(&format!("bms_next_member({}, -1)", set), "4", "int")
                .with_value(&format!("bms_next_member({}, 4)", set), "-2", "int"),
        )
    };
    let left_debugger = scripted("outer_relids");
    let right_debugger = scripted("inner_relids");
    let left = Inspector::new(ExecContext::new(&left_debugger, &types, &special, &session));
    let right = Inspector::new(ExecContext::new(&right_debugger, &types, &special, &session));

    let outer = left
        .add_root(DebugValue::new("outer_relids", "0x1000", "Relids"), FRAME)
        .await;
    let inner = right
        .add_root(DebugValue::new("inner_relids", "0x2000", "Relids"), FRAME)
        .await;

    let (outer_members, inner_members) =
        tokio::join!(left.set_elements(outer), right.set_elements(inner));
    assert_eq!(outer_members.unwrap(), Some(vec![4]));
    assert_eq!(inner_members.unwrap(), Some(vec![4]));
    assert_eq!(session.valid_set.get(), Capability::Unavailable);
    assert_eq!(session.next_member.get(), Capability::Available);
}
