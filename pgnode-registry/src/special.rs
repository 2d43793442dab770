//! 特殊メンバのレジストリ
//!
//! 可変長配列メンバ、`List *` の要素型、Bitmapset要素が指す配列を
//! 宣言的なルールとして保持する。

use crate::builtin;
use crate::type_name::base_type_name;
use regex::Regex;
use std::sync::LazyLock;

/// `lib!name(args)` / `` lib`name `` 形式の関数名
static FUNCTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:.*[!`])?\s*([^(!`\s]+)\s*(?:\(.*\))?\s*$").expect("static regex")
});
use std::collections::HashMap;

/// `List *` の要素型の既定値
pub const DEFAULT_LIST_ELEMENT_TYPE: &str = "Node *";

/// 可変長配列メンバのルール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayMemberRule {
    /// コンテナ構造体の型名
    pub type_name: String,
    /// 配列を指すメンバ名
    pub member: String,
    /// 要素数を求める式
    pub length_expr: String,
}

impl ArrayMemberRule {
    pub fn new(type_name: &str, member: &str, length_expr: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            member: member.to_string(),
            length_expr: length_expr.to_string(),
        }
    }
}

/// List要素型ルールの適用位置
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListLocation {
    /// 構造体のメンバ
    Member { struct_name: String, member: String },
    /// 関数のローカル変数
    Variable { function: String, variable: String },
}

/// List要素型ルール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListElementRule {
    pub location: ListLocation,
    /// 要素のポインタ型
    pub element_type: String,
}

/// 要素型を解決したいListの位置
#[derive(Debug, Clone, Copy)]
pub enum ListPosition<'a> {
    /// トップレベルの変数（関数のローカル変数・引数）
    TopLevel {
        function: Option<&'a str>,
        variable: &'a str,
    },
    /// 構造体のメンバ
    Member {
        parent_type: &'a str,
        member: &'a str,
    },
}

/// Bitmapset参照の起点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapsetAnchor {
    /// Bitmapsetを持つ構造体自身
    SelfVar,
    /// 直接の親
    Parent,
    /// 指定した型を持つ最も近い祖先
    Ancestor(String),
}

/// Bitmapsetの要素が他の配列のインデックスであることの宣言
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapsetReference {
    /// Bitmapsetを持つ構造体の型名
    pub type_name: String,
    /// Bitmapsetのメンバ名
    pub member: String,
    /// 参照先を探す起点
    pub anchor: BitmapsetAnchor,
    /// 起点からのメンバパス（複数指定可）
    pub paths: Vec<Vec<String>>,
    /// 要素値に加算するオフセット
    pub delta: i64,
    /// 起点が見つからない場合にトップレベル変数を探すか
    pub scan_roots: bool,
}

/// フラグ定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmaskFlag {
    pub name: String,
    pub value: u64,
}

/// ビットマスクメンバの表示ルール
///
/// 記録するだけで、変数モデルの描画には使わない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmaskRule {
    pub type_name: String,
    pub member: String,
    pub flags: Vec<BitmaskFlag>,
}

/// 関数名から共有ライブラリ名とシグネチャを取り除く
///
/// # Examples
/// ```
/// use pgnode_registry::special::normalize_function_name;
///
/// assert_eq!(normalize_function_name("postgres!create_plan(PlannerInfo *, Path *)"), "create_plan");
/// assert_eq!(normalize_function_name("postgres`standard_planner"), "standard_planner");
/// assert_eq!(normalize_function_name("make_one_rel"), "make_one_rel");
/// ```
pub fn normalize_function_name(name: &str) -> String {
    match FUNCTION_NAME.captures(name.trim()) {
        Some(caps) => caps[1].to_string(),
        None => name.trim().to_string(),
    }
}

/// 特殊メンバのレジストリ
#[derive(Debug, Clone, Default)]
pub struct SpecialMemberRegistry {
    /// 型名 → メンバ名 → 配列ルール
    arrays: HashMap<String, HashMap<String, ArrayMemberRule>>,
    /// (構造体, メンバ) → 要素型
    list_members: HashMap<(String, String), String>,
    /// (関数, 変数) → 要素型
    list_variables: HashMap<(String, String), String>,
    /// (構造体, メンバ) → Bitmapset参照
    bitmapset_refs: HashMap<(String, String), BitmapsetReference>,
    /// (構造体, メンバ) → ビットマスク定義
    bitmasks: HashMap<(String, String), BitmaskRule>,
}

impl SpecialMemberRegistry {
    /// 組み込みの既定値でレジストリを作成する
    pub fn new() -> Self {
        let mut registry = Self::default();
        for (type_name, member, length_expr) in builtin::ARRAY_MEMBERS {
            registry.add_array_rule(ArrayMemberRule::new(type_name, member, length_expr));
        }
        for (struct_name, member, element_type) in builtin::LIST_MEMBERS {
            registry.add_list_rule(ListElementRule {
                location: ListLocation::Member {
                    struct_name: struct_name.to_string(),
                    member: member.to_string(),
                },
                element_type: element_type.to_string(),
            });
        }
        for (function, variable, element_type) in builtin::LIST_VARIABLES {
            registry.add_list_rule(ListElementRule {
                location: ListLocation::Variable {
                    function: function.to_string(),
                    variable: variable.to_string(),
                },
                element_type: element_type.to_string(),
            });
        }
        for (type_name, member) in builtin::RELIDS_MEMBERS {
            registry.add_bitmapset_reference(relids_reference(
                type_name,
                member,
                BitmapsetAnchor::Ancestor("PlannerInfo".to_string()),
            ));
        }
        for member in builtin::PLANNER_RELIDS_MEMBERS {
            registry.add_bitmapset_reference(relids_reference(
                "PlannerInfo",
                member,
                BitmapsetAnchor::SelfVar,
            ));
        }
        registry
    }

    /// 配列ルールを登録する（同じキーのルールは後勝ち）
    pub fn add_array_rule(&mut self, rule: ArrayMemberRule) {
        let type_name = base_type_name(&rule.type_name).to_string();
        self.arrays
            .entry(type_name)
            .or_default()
            .insert(rule.member.clone(), rule);
    }

    /// 配列ルールを検索する
    ///
    /// コンテナ型はポインタや修飾子を取り除いてから照合する。
    pub fn array_rule(&self, container_type: &str, member: &str) -> Option<&ArrayMemberRule> {
        self.arrays
            .get(base_type_name(container_type))?
            .get(member)
    }

    /// List要素型ルールを登録する
    pub fn add_list_rule(&mut self, rule: ListElementRule) {
        match rule.location {
            ListLocation::Member {
                struct_name,
                member,
            } => {
                self.list_members.insert(
                    (base_type_name(&struct_name).to_string(), member),
                    rule.element_type,
                );
            }
            ListLocation::Variable { function, variable } => {
                self.list_variables.insert(
                    (normalize_function_name(&function), variable),
                    rule.element_type,
                );
            }
        }
    }

    /// Listの要素型を解決する
    ///
    /// ルールがなければ `Node *` を返す。
    pub fn list_element_type(&self, position: ListPosition<'_>) -> &str {
        let found = match position {
            ListPosition::TopLevel { function, variable } => function.and_then(|f| {
                let function = normalize_function_name(f);
                self.list_variables.get(&(function, variable.to_string()))
            }),
            ListPosition::Member {
                parent_type,
                member,
            } => self.list_members.get(&(
                base_type_name(parent_type).to_string(),
                member.to_string(),
            )),
        };
        found.map(String::as_str).unwrap_or(DEFAULT_LIST_ELEMENT_TYPE)
    }

    /// Bitmapset参照を登録する
    pub fn add_bitmapset_reference(&mut self, reference: BitmapsetReference) {
        let key = (
            base_type_name(&reference.type_name).to_string(),
            reference.member.clone(),
        );
        self.bitmapset_refs.insert(key, reference);
    }

    /// Bitmapset参照を検索する
    pub fn bitmapset_reference(&self, container_type: &str, member: &str) -> Option<&BitmapsetReference> {
        self.bitmapset_refs
            .get(&(base_type_name(container_type).to_string(), member.to_string()))
    }

    /// ビットマスク定義を登録する
    pub fn add_bitmask_rule(&mut self, rule: BitmaskRule) {
        let key = (base_type_name(&rule.type_name).to_string(), rule.member.clone());
        self.bitmasks.insert(key, rule);
    }

    /// ビットマスク定義を検索する
    pub fn bitmask_rule(&self, container_type: &str, member: &str) -> Option<&BitmaskRule> {
        self.bitmasks
            .get(&(base_type_name(container_type).to_string(), member.to_string()))
    }

    /// 登録されている配列ルールの数
    pub fn array_rule_count(&self) -> usize {
        self.arrays.values().map(HashMap::len).sum()
    }

    /// 登録されているList要素型ルールの数
    pub fn list_rule_count(&self) -> usize {
        self.list_members.len() + self.list_variables.len()
    }

    /// 登録されているBitmapset参照の数
    pub fn bitmapset_reference_count(&self) -> usize {
        self.bitmapset_refs.len()
    }

    /// 登録されているビットマスク定義の数
    pub fn bitmask_rule_count(&self) -> usize {
        self.bitmasks.len()
    }
}

/// relidsの既定の参照ルール
fn relids_reference(type_name: &str, member: &str, anchor: BitmapsetAnchor) -> BitmapsetReference {
    BitmapsetReference {
        type_name: type_name.to_string(),
        member: member.to_string(),
        anchor,
        paths: builtin::RELIDS_TARGETS
            .iter()
            .map(|target| vec![target.to_string()])
            .collect(),
        delta: 0,
        scan_roots: true,
    }
}
