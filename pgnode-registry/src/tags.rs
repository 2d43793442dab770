//! ノードタグと型エイリアスのレジストリ

use crate::builtin;
use crate::type_name::{base_type_name, pointer_depth, substitute_base_name};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// タグ定義ソースにおけるタグのプレフィックス
pub const TAG_PREFIX: &str = "T_";

/// タグ名を正規化する
///
/// プレフィックス `T_` と前後の空白、末尾の `= 123,` を取り除く。
/// 正規化済みの名前に適用しても変化しない。
///
/// # Examples
/// ```
/// use pgnode_registry::normalize_tag;
///
/// assert_eq!(normalize_tag("T_Foo"), "Foo");
/// assert_eq!(normalize_tag("  T_List = 12,"), "List");
/// assert_eq!(normalize_tag("Foo"), "Foo");
/// ```
pub fn normalize_tag(raw: &str) -> String {
    let mut tag = raw.trim();
    if let Some(pos) = tag.find('=') {
        tag = tag[..pos].trim_end();
    }
    tag = tag.trim_end_matches(',').trim_end();
    tag = tag.strip_prefix(TAG_PREFIX).unwrap_or(tag);
    tag.trim().to_string()
}

/// ノードタグ・型エイリアスのレジストリ
///
/// タグは追加されるだけで削除されない。
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    /// 既知のノードタグ（および基底型名）
    node_tags: HashSet<String>,
    /// 式として表示できるタグ
    expr_tags: HashSet<String>,
    /// 型エイリアス（エイリアス名 → 実際の型）
    aliases: HashMap<String, String>,
    /// タグ名の文法
    tag_grammar: Regex,
    /// タグ定義ソースの行パターン
    source_line: Regex,
}

impl TypeRegistry {
    /// 組み込みの既定値でレジストリを作成する
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.add_tags(builtin::NODE_SUPERTYPES.iter().copied());
        registry.add_tags(builtin::NODE_TAGS.iter().copied());
        registry.add_expr_tags(builtin::EXPR_TAGS.iter().copied());
        for (alias, real) in builtin::ALIASES {
            registry.add_alias(alias, real);
        }
        registry
    }

    /// 何も登録されていないレジストリを作成する
    pub fn empty() -> Self {
        Self {
            node_tags: HashSet::new(),
            expr_tags: HashSet::new(),
            aliases: HashMap::new(),
            tag_grammar: Regex::new(r"^[A-Za-z][A-Za-z_]*$").expect("static regex"),
            source_line: Regex::new(
                r"^\s*T_([A-Za-z][A-Za-z_]*)\s*(?:=\s*\d+\s*)?,?\s*(?:/[/*].*)?$",
            )
            .expect("static regex"),
        }
    }

    /// タグ名が文法に合致するか
    pub fn is_valid_tag_name(&self, name: &str) -> bool {
        self.tag_grammar.is_match(name)
    }

    /// タグを追加する
    ///
    /// 新しく追加された数を返す。文法に合わない名前は無視する。
    pub fn add_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) -> usize {
        let mut added = 0;
        for tag in tags {
            let tag = normalize_tag(tag);
            if !self.is_valid_tag_name(&tag) {
                debug!("ignoring invalid node tag '{}'", tag);
                continue;
            }
            if self.node_tags.insert(tag) {
                added += 1;
            }
        }
        added
    }

    /// 式として表示できるタグを追加する（ノードタグとしても登録される）
    pub fn add_expr_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        for tag in tags {
            let tag = normalize_tag(tag);
            if self.is_valid_tag_name(&tag) {
                self.node_tags.insert(tag.clone());
                self.expr_tags.insert(tag);
            }
        }
    }

    /// 型エイリアスを追加する（既存のエイリアスは上書き）
    pub fn add_alias(&mut self, alias: &str, real_type: &str) {
        self.aliases
            .insert(alias.trim().to_string(), real_type.trim().to_string());
    }

    /// タグ定義ソースの行からタグを取り込む
    ///
    /// `T_` で始まる識別子を抽出してマージし、新しく見つかったタグの数を返す。
    /// 同じソースを2回スキャンした場合、2回目は0を返す。
    pub fn update_from_source<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> usize {
        let mut added = 0;
        for line in lines {
            let Some(caps) = self.source_line.captures(line) else {
                continue;
            };
            let tag = caps[1].to_string();
            if tag == "Invalid" {
                continue;
            }
            if self.node_tags.insert(tag) {
                added += 1;
            }
        }
        debug!("{} new node tags found in tag source", added);
        added
    }

    /// ノードタグとして登録されているか
    pub fn is_node_tag(&self, name: &str) -> bool {
        self.node_tags.contains(name)
    }

    /// 式として表示できるタグか
    pub fn is_expr_tag(&self, name: &str) -> bool {
        self.expr_tags.contains(name)
    }

    /// エイリアスを1段だけ解決した型文字列を返す
    pub fn resolve_alias(&self, type_name: &str) -> String {
        let base = base_type_name(type_name);
        match self.aliases.get(base) {
            Some(real) => substitute_base_name(type_name, real),
            None => type_name.to_string(),
        }
    }

    /// 宣言型がタグ付きノードへのポインタ（1段）かどうか
    ///
    /// 埋め込み構造体（ポインタなし）と多段ポインタは対象外。
    pub fn is_node_var(&self, type_name: &str) -> bool {
        let resolved = self.resolve_alias(type_name);
        pointer_depth(&resolved) == 1 && self.is_node_tag(base_type_name(&resolved))
    }

    /// 型がBitmapsetへのポインタかどうか（エイリアス `Relids` も含む）
    pub fn is_bitmapset_type(&self, type_name: &str) -> bool {
        let resolved = self.resolve_alias(type_name);
        pointer_depth(&resolved) == 1 && base_type_name(&resolved) == "Bitmapset"
    }

    /// 登録されているタグの数
    pub fn tag_count(&self) -> usize {
        self.node_tags.len()
    }

    /// 登録されているエイリアスの数
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_node_var_indirection() {
        let registry = TypeRegistry::new();
        assert!(registry.is_node_var("RelOptInfo *"));
        assert!(registry.is_node_var("const struct OpExpr *"));
        assert!(!registry.is_node_var("RelOptInfo"));
        assert!(!registry.is_node_var("RelOptInfo **"));
        assert!(!registry.is_node_var("int *"));
    }

    #[test]
    fn test_alias_resolution() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.resolve_alias("Relids"), "Bitmapset *");
        assert!(registry.is_bitmapset_type("Relids"));
        assert!(registry.is_bitmapset_type("Bitmapset *"));
        assert!(!registry.is_bitmapset_type("Bitmapset **"));
        assert!(!registry.is_node_var("Relids *"));
    }

    #[test]
    fn test_normalize_tag_idempotent() {
        for raw in ["T_Foo", "T_Foo = 10,", " Foo ", "T_A_Expr,"] {
            let once = normalize_tag(raw);
            assert_eq!(normalize_tag(&once), once);
        }
        assert_eq!(normalize_tag("T_A_Expr,"), "A_Expr");
    }

    #[test]
    fn test_update_from_source() {
        let source = "typedef enum NodeTag\n{\n\tT_Invalid = 0,\n\tT_MyNode = 500,\n\tT_OtherNode,\n\tT_List, /* known */\n} NodeTag;";
        let mut registry = TypeRegistry::new();
        assert!(!registry.is_node_tag("MyNode"));

        let added = registry.update_from_source(source.lines());
        assert_eq!(added, 2);
        assert!(registry.is_node_tag("MyNode"));
        assert!(registry.is_node_tag("OtherNode"));
        assert!(!registry.is_node_tag("Invalid"));

        assert_eq!(registry.update_from_source(source.lines()), 0);
    }

    #[test]
    fn test_invalid_tag_names_rejected() {
        let mut registry = TypeRegistry::empty();
        assert_eq!(registry.add_tags(["Good", "Bad1", "", "T_AlsoGood"]), 2);
        assert!(registry.is_node_tag("AlsoGood"));
        assert!(!registry.is_node_tag("Bad1"));
    }
}
