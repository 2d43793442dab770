//! 型文字列の操作
//!
//! デバッガが返す型文字列（`const struct RelOptInfo *` など）から
//! 基底型名を取り出したり、基底型名だけを差し替えたりする。

use regex::Regex;
use std::sync::LazyLock;

/// `struct` キーワードとそれに続く空白
static STRUCT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bstruct\s+").expect("static regex"));

/// 識別子
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static regex"));

/// 基底型名の前後に付きうる修飾子
const QUALIFIERS: &[&str] = &["const", "volatile", "struct", "union", "enum", "restrict"];

/// 型文字列を `*` と空白で分割したトークン列
fn tokens(type_name: &str) -> impl Iterator<Item = &str> {
    type_name
        .split(|c: char| c.is_whitespace() || c == '*' || c == '&')
        .filter(|t| !t.is_empty())
}

/// ポインタの段数を数える
///
/// # Examples
/// ```
/// use pgnode_registry::type_name::pointer_depth;
///
/// assert_eq!(pointer_depth("List *"), 1);
/// assert_eq!(pointer_depth("RelOptInfo **"), 2);
/// assert_eq!(pointer_depth("Bitmapset"), 0);
/// ```
pub fn pointer_depth(type_name: &str) -> usize {
    type_name.chars().filter(|c| *c == '*').count()
}

/// 修飾子とポインタを除いた基底型名を取得する
///
/// # Examples
/// ```
/// use pgnode_registry::type_name::base_type_name;
///
/// assert_eq!(base_type_name("const struct RelOptInfo *"), "RelOptInfo");
/// assert_eq!(base_type_name("Node*"), "Node");
/// ```
pub fn base_type_name(type_name: &str) -> &str {
    tokens(type_name)
        .find(|t| !QUALIFIERS.contains(t))
        .unwrap_or("")
}

/// 型文字列に `struct` キーワードが含まれるか
pub fn has_struct_keyword(type_name: &str) -> bool {
    tokens(type_name).any(|t| t == "struct")
}

/// `struct` キーワードを取り除く
pub fn remove_struct_keyword(type_name: &str) -> String {
    STRUCT_KEYWORD.replace_all(type_name, "").into_owned()
}

/// 基底型名を別の名前に差し替える（修飾子とポインタはそのまま）
///
/// # Examples
/// ```
/// use pgnode_registry::type_name::substitute_base_name;
///
/// assert_eq!(substitute_base_name("const Node *", "OpExpr"), "const OpExpr *");
/// assert_eq!(substitute_base_name("Relids", "Bitmapset *"), "Bitmapset *");
/// ```
pub fn substitute_base_name(type_name: &str, new_base: &str) -> String {
    let base = base_type_name(type_name);
    if base.is_empty() {
        return type_name.to_string();
    }

    match IDENTIFIER.find_iter(type_name).find(|m| m.as_str() == base) {
        Some(m) => format!("{}{}{}", &type_name[..m.start()], new_base, &type_name[m.end()..]),
        None => type_name.to_string(),
    }
}

/// 型がポインタのとき、メンバアクセスに `->` を使う式を組み立てる
///
/// 埋め込み構造体の場合は `.` になる。
pub fn member_access(expr: &str, type_name: &str, member: &str) -> String {
    if pointer_depth(type_name) > 0 {
        format!("({})->{}", expr, member)
    } else {
        format!("({}).{}", expr, member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("List *"), "List");
        assert_eq!(base_type_name("volatile const Bitmapset*"), "Bitmapset");
        assert_eq!(base_type_name("struct PlannerInfo"), "PlannerInfo");
        assert_eq!(base_type_name("***"), "");
    }

    #[test]
    fn test_substitute_keeps_qualifiers() {
        assert_eq!(
            substitute_base_name("const struct Node *", "RelOptInfo"),
            "const struct RelOptInfo *"
        );
        assert_eq!(substitute_base_name("Expr*", "Var"), "Var*");
        assert_eq!(substitute_base_name("Relids *", "Bitmapset *"), "Bitmapset * *");
    }

    #[test]
    fn test_substitute_matches_whole_identifier() {
        // 修飾子の一部に基底型名が含まれていても置き換えない
        assert_eq!(substitute_base_name("struct st *", "Node"), "struct Node *");
        assert_eq!(substitute_base_name("const con", "Node"), "const Node");
        assert_eq!(substitute_base_name("const Var *", "Var"), "const Var *");
        assert_eq!(substitute_base_name("***", "Node"), "***");
    }

    #[test]
    fn test_struct_keyword() {
        assert!(has_struct_keyword("struct Plan *"));
        assert!(!has_struct_keyword("Plan *"));
        assert_eq!(remove_struct_keyword("const struct Plan *"), "const Plan *");
    }

    #[test]
    fn test_member_access() {
        assert_eq!(member_access("root", "PlannerInfo *", "parse"), "(root)->parse");
        assert_eq!(member_access("rel", "RelOptInfo", "relid"), "(rel).relid");
    }
}
