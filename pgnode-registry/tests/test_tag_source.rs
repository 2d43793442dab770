//! タグ定義ソースの取り込みと設定の適用のテスト

use pgnode_registry::{load_registries, JsonConfig, TypeRegistry};

const NODETAGS: &str = "\
typedef enum NodeTag
{
\tT_Invalid = 0,
\tT_ExtensibleNode = 5,
\tT_MyPlanNode,
\tT_MyScanState = 420,
} NodeTag;
";

#[test]
fn test_tag_source_is_merged_once() {
    let mut types = TypeRegistry::empty();
    let added = types.update_from_source(NODETAGS.lines());
    assert_eq!(added, 3);
    assert!(types.is_node_tag("MyPlanNode"));
    assert!(types.is_node_tag("MyScanState"));
    assert!(!types.is_node_tag("Invalid"));

    // 2回目は新しいタグがない
    assert_eq!(types.update_from_source(NODETAGS.lines()), 0);
    assert_eq!(types.tag_count(), 3);
}

#[test]
fn test_config_aliases_follow_one_level() {
    let provider = JsonConfig::new(
        r#"{
            "version": 1,
            "nodeTags": ["T_MyPlanNode"],
            "aliases": [
                {"alias": "MyPlan", "type": "MyPlanNode *"},
                {"alias": "MyPlanRef", "type": "MyPlan"}
            ]
        }"#,
    );
    let (types, _, errors) = load_registries(&provider).unwrap();
    assert!(errors.is_empty(), "{:?}", errors);

    assert!(types.is_node_var("MyPlanNode *"));
    assert!(types.is_node_var("MyPlan"));
    assert!(!types.is_node_var("MyPlan *"));
    // エイリアスは1段しか解決しない
    assert!(!types.is_node_var("MyPlanRef"));
}
