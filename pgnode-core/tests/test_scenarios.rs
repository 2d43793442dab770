//! スクリプト化したデバッガを使った展開と描画のシナリオテスト

use pgnode_core::{ExecContext, Inspector, SessionState, VariableKind};
use pgnode_registry::{ArrayMemberRule, SpecialMemberRegistry, TypeRegistry};
use pgnode_target::mock::{Call, ScriptedDebugger};
use pgnode_target::{DebugValue, FrameId};

const FRAME: FrameId = FrameId(1);

#[tokio::test]
async fn test_derived_tag_casts_once_before_members() {
    let mut types = TypeRegistry::new();
    types.add_tags(["BaseHandle", "DerivedFoo"]);
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();
    let debugger = ScriptedDebugger::new()
        .with_value("((Node *)(h))->type", "T_DerivedFoo", "NodeTag")
        .with_value_ref("(DerivedFoo *)(h)", "(DerivedFoo *) 0x1000", "DerivedFoo *", 7)
        .with_children(7, vec![DebugValue::new("flags", "3", "int")]);
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let h = inspector
        .add_root(DebugValue::new("h", "0x1000", "BaseHandle *").with_reference(3), FRAME)
        .await;
    let var = inspector.variable(h).unwrap();
    assert_eq!(var.kind, VariableKind::Node);
    assert_eq!(var.real_type, "DerivedFoo *");

    let item = inspector.tree_item(h).await.unwrap();
    assert_eq!(item.label, "h: BaseHandle * [DerivedFoo *] = ");
    assert!(item.expandable);

    debugger.clear_calls();
    let children = inspector.children(h).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(
        debugger.calls(),
        vec![
            Call::Evaluate("(DerivedFoo *)(h)".to_string()),
            Call::EnumerateChildren(7),
        ]
    );

    // 2回目はキャッシュから返す
    inspector.children(h).await.unwrap();
    assert_eq!(debugger.call_count(), 2);
}

#[tokio::test]
async fn test_int_list_elements() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();
    let debugger = ScriptedDebugger::new()
        .with_value("((Node *)(ids))->type", "T_IntList", "NodeTag")
        .with_children(
            4,
            vec![
                DebugValue::new("type", "T_IntList", "NodeTag"),
                DebugValue::new("length", "3", "int"),
                DebugValue::new("elements", "0x2000", "ListCell *"),
            ],
        )
        .with_value("(ids)->length", "3", "int")
        .with_value("(ids)->elements[0].int_value", "10", "int")
        .with_value("(ids)->elements[1].int_value", "-5", "int")
        .with_value("(ids)->elements[2].int_value", "0", "int");
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let ids = inspector
        .add_root(DebugValue::new("ids", "0x1000", "List *").with_reference(4), FRAME)
        .await;
    let elements = inspector.list_elements(ids).await.unwrap();
    let rendered: Vec<(String, String, bool)> = elements
        .iter()
        .map(|&id| {
            let var = inspector.variable(id).unwrap();
            (var.name.clone(), var.value.clone(), var.kind == VariableKind::Plain)
        })
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("[0]".to_string(), "10".to_string(), true),
            ("[1]".to_string(), "-5".to_string(), true),
            ("[2]".to_string(), "0".to_string(), true),
        ]
    );
    assert_eq!(
        inspector.watch_expression(elements[1]).as_deref(),
        Some("(ids)->elements[1].int_value")
    );
    assert_eq!(inspector.tree_item(ids).await.unwrap().description, "length = 3");
}

#[tokio::test]
async fn test_invalid_bitmapset_has_no_elements() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();
    let debugger = ScriptedDebugger::new()
        .with_value("bms_is_valid_set(((Bitmapset *)(relids)))", "false", "bool");
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let relids = inspector.add_root(DebugValue::new("relids", "0x1000", "Relids"), FRAME).await;
    assert!(matches!(inspector.variable(relids).unwrap().kind, VariableKind::BitmapSet(_)));

    assert_eq!(inspector.set_elements(relids).await.unwrap(), None);
    let children = inspector.children(relids).await.unwrap();
    assert!(children
        .iter()
        .all(|&id| inspector.variable(id).unwrap().name != "$elements$"));
    assert!(!debugger
        .evaluated()
        .iter()
        .any(|expr| expr.starts_with("bms_next_member")));
}

#[tokio::test]
async fn test_opexpr_under_query_renders_column_and_constant() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();

    let qual = "(query)->qual";
    let args = format!("((OpExpr *)({}))->args", qual);
    let left = format!("({})->elements[0].ptr_value", args);
    let right = format!("({})->elements[1].ptr_value", args);
    let rtable = "(query)->rtable";
    let rte = format!("((RangeTblEntry *)(({})->elements[0].ptr_value))", rtable);
    let colnames = format!("({})->eref->colnames", rte);
    let colname = format!("({})->elements[0].ptr_value", colnames);

    let debugger = ScriptedDebugger::new()
        .with_value("((Node *)(query))->type", "T_Query", "NodeTag")
        .with_children(1, vec![DebugValue::new("qual", "0x2000", "Node *").with_reference(2)])
        .with_value("((Node *)((query)->qual))->type", "T_OpExpr", "NodeTag")
        .with_value(
            &format!("get_opname(((OpExpr *)({}))->opno)", qual),
            "0x3000 \"=\"",
            "char *",
        )
        .with_value(&args, "0x4000", "List *")
        .with_value(&format!("({})->elements", args), "0x4100", "ListCell *")
        .with_value(&format!("({})->length", args), "2", "int")
        // 左辺: a.x
        .with_value(&format!("((Node *)({}))->type", left), "T_Var", "NodeTag")
        .with_value(&format!("((Var *)({}))->varno", left), "1", "int")
        .with_value(&format!("((Var *)({}))->varattno", left), "1", "AttrNumber")
        .with_value(rtable, "0x5000", "List *")
        .with_value(&format!("({})->length", rtable), "1", "int")
        .with_value(&format!("({})->eref->aliasname", rte), "0x6000 \"a\"", "char *")
        .with_value(&colnames, "0x7000", "List *")
        .with_value(&format!("({})->length", colnames), "1", "int")
        .with_value(&format!("((String *)({}))->sval", colname), "0x8000 \"x\"", "char *")
        // 右辺: 5
        .with_value(&format!("((Node *)({}))->type", right), "T_Const", "NodeTag")
        .with_value(&format!("((Const *)({}))->constisnull", right), "false", "bool")
        .with_value("palloc(sizeof(Oid) + sizeof(bool))", "(void *) 0x9000", "void *")
        .with_value(
            &format!(
                "getTypeOutputInfo(((Const *)({}))->consttype, (Oid *) 0x9000, (bool *) ((char *) 0x9000 + sizeof(Oid)))",
                right
            ),
            "",
            "void",
        )
        .with_value(
            &format!("OidOutputFunctionCall(*(Oid *) 0x9000, ((Const *)({}))->constvalue)", right),
            "0xa000 \"5\"",
            "char *",
        )
        .with_value("pfree((void *) 0xa000)", "", "void")
        .with_value("pfree((void *) 0x9000)", "", "void");
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let query = inspector
        .add_root(DebugValue::new("query", "0x1000", "Query *").with_reference(1), FRAME)
        .await;
    let children = inspector.children(query).await.unwrap();
    assert_eq!(children.len(), 1);
    let qual_id = children[0];
    assert!(matches!(
        inspector.variable(qual_id).unwrap().kind,
        VariableKind::Expr(_)
    ));

    let item = inspector.tree_item(qual_id).await.unwrap();
    assert_eq!(item.label, "qual: Node * [OpExpr *] = ");
    assert_eq!(item.description, "a.x = 5");
    assert_eq!(inspector.render_expr(qual_id).await.unwrap(), "a.x = 5");
}

#[tokio::test]
async fn test_zero_length_array_keeps_literal_members() {
    let types = TypeRegistry::new();
    let mut special = SpecialMemberRegistry::new();
    special.add_array_rule(ArrayMemberRule::new("Container", "items", "count"));
    let session = SessionState::new();
    let debugger = ScriptedDebugger::new()
        .with_children(
            5,
            vec![
                DebugValue::new("items", "0x4000", "Item *").with_reference(6),
                DebugValue::new("count", "0", "int"),
            ],
        )
        .with_children(6, vec![DebugValue::new("id", "1", "int")])
        .with_value("(c)->count", "0", "int");
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let c = inspector
        .add_root(DebugValue::new("c", "0x3000", "Container *").with_reference(5), FRAME)
        .await;
    let members = inspector.children(c).await.unwrap();
    let items = members[0];
    assert!(matches!(
        inspector.variable(items).unwrap().kind,
        VariableKind::Array(_)
    ));

    let children = inspector.children(items).await.unwrap();
    assert_eq!(children.len(), 1);
    let id = inspector.variable(children[0]).unwrap();
    assert_eq!(id.name, "id");
    assert_eq!(
        inspector.watch_expression(children[0]).as_deref(),
        Some("((c)->items)->id")
    );
    assert!(!debugger
        .calls()
        .iter()
        .any(|call| matches!(call, Call::EnumerateArray(..))));
}

#[tokio::test]
async fn test_array_member_reads_counted_elements() {
    let types = TypeRegistry::new();
    let special = SpecialMemberRegistry::new();
    let session = SessionState::new();
    let debugger = ScriptedDebugger::new()
        .with_value("((Node *)(root))->type", "T_PlannerInfo", "NodeTag")
        .with_children(
            1,
            vec![DebugValue::new("simple_rel_array", "0x2000", "RelOptInfo **").with_reference(2)],
        )
        .with_value("(root)->simple_rel_array_size", "2", "int")
        .with_array(
            "(root)->simple_rel_array",
            2,
            vec![
                DebugValue::new("[0]", "0x0", "RelOptInfo *"),
                DebugValue::new("[1]", "0x3000", "RelOptInfo *").with_reference(3),
            ],
        )
        .with_value(
            "((Node *)(((root)->simple_rel_array)[1]))->type",
            "T_RelOptInfo",
            "NodeTag",
        );
    let inspector = Inspector::new(ExecContext::new(&debugger, &types, &special, &session));

    let root = inspector
        .add_root(DebugValue::new("root", "0x1000", "PlannerInfo *").with_reference(1), FRAME)
        .await;
    let array = inspector.children(root).await.unwrap()[0];
    let children = inspector.children(array).await.unwrap();
    assert_eq!(children.len(), 3);

    let length = inspector.tree_item(children[0]).await.unwrap();
    assert_eq!(length.label, "$length$ = ");
    assert_eq!(length.description, "2");
    assert!(!length.expandable);
    assert!(inspector.watch_expression(children[0]).is_none());

    let rel = inspector.variable(children[2]).unwrap();
    assert_eq!(rel.name, "[1]");
    assert_eq!(rel.kind, VariableKind::Node);
    assert_eq!(
        inspector.watch_expression(children[2]).as_deref(),
        Some("((root)->simple_rel_array)[1]")
    );
}
