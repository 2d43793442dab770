//! 変数モデル
//!
//! 変数はアリーナに格納し、親への参照は `VarId` で持つ。
//! 所有関係は根から葉への一方向で、葉から根へは検索のみ行う。

use crate::context::Lazy;
use crate::list::ListState;
use crate::value_node::ValueState;
use pgnode_registry::ArrayMemberRule;
use pgnode_target::FrameId;

/// アリーナ内の変数の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

/// デバッガ上に実体を持つ変数の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealInfo {
    /// 再評価でこの値を得られる式
    pub evaluate_name: String,
    pub memory_reference: Option<String>,
    /// 子要素列挙用のハンドル
    pub variables_reference: i64,
}

/// タグ付きノードの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// 実行時タグ（`T_` なし）
    pub tag: String,
    /// キャスト後の子要素ハンドル（失敗した場合は `None`）
    pub(crate) cast: Lazy<Option<i64>>,
}

/// 合成ノードの種類
///
/// 評価式を持たず、ウォッチ式も作らない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticKind {
    /// `$expr$`: 描画した式
    ExprRepr,
    /// `$elements$`: Listや集合の要素のコンテナ
    Elements,
    /// 情報表示のみの葉
    Info,
    /// Bitmapsetの要素（参照ルールがあれば参照先を子に持つ）
    SetMember { member: i64, set: VarId },
}

/// 式ノードの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprState {
    /// 式そのものではなく、式をメンバに持つノードの場合のメンバ名
    pub nested: Option<&'static str>,
    pub(crate) repr: Lazy<String>,
}

impl ExprState {
    pub fn new(nested: Option<&'static str>) -> Self {
        Self {
            nested,
            repr: Lazy::Unset,
        }
    }

    /// 描画済みの文字列
    pub fn repr(&self) -> Option<&str> {
        self.repr.get().map(String::as_str)
    }
}

/// Bitmapset変数の状態
///
/// 集合は展開のたびに読み直すが、作成したノードは位置ごとに再利用する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetState {
    /// `$elements$` ノード
    pub(crate) elements: Option<VarId>,
    /// 要素ノード（先頭から順に再利用する）
    pub(crate) members: Vec<VarId>,
    /// 構造体のメンバ
    pub(crate) fields: Lazy<Vec<VarId>>,
}

/// 変数の種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    /// 通常の変数
    Plain,
    /// タグ付きノード
    Node,
    /// 式ノード
    Expr(ExprState),
    /// 値ノード（Integer, Float, Boolean, String, BitString）
    Value(ValueState),
    /// List / IntList / OidList / XidList
    List(ListState),
    /// Bitmapset
    BitmapSet(SetState),
    /// 長さを持つ配列メンバ
    Array(ArrayMemberRule),
    Synthetic(SyntheticKind),
}

/// 変数
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// 宣言型
    pub declared_type: String,
    /// エイリアスとタグを反映した型
    pub real_type: String,
    /// 表示値
    pub value: String,
    pub parent: Option<VarId>,
    pub frame: FrameId,
    pub real: Option<RealInfo>,
    pub node: Option<NodeInfo>,
    pub kind: VariableKind,
    pub(crate) children: Lazy<Vec<VarId>>,
}

impl Variable {
    /// 合成ノードを作成する
    pub(crate) fn synthetic(
        name: &str,
        value: String,
        kind: SyntheticKind,
        parent: VarId,
        frame: FrameId,
    ) -> Self {
        Self {
            name: name.to_string(),
            declared_type: String::new(),
            real_type: String::new(),
            value,
            parent: Some(parent),
            frame,
            real: None,
            node: None,
            kind: VariableKind::Synthetic(kind),
            children: Lazy::Unset,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, VariableKind::Synthetic(_))
    }

    /// 評価式（合成ノードは `None`）
    pub fn evaluate_name(&self) -> Option<&str> {
        self.real.as_ref().map(|r| r.evaluate_name.as_str())
    }

    /// 実行時タグ
    pub fn tag(&self) -> Option<&str> {
        self.node.as_ref().map(|n| n.tag.as_str())
    }

    /// 子要素のキャッシュ状態
    pub fn children_state(&self) -> &Lazy<Vec<VarId>> {
        &self.children
    }
}

/// 変数のアリーナ
#[derive(Debug, Default)]
pub struct Arena {
    vars: Vec<Variable>,
}

impl Arena {
    pub fn push(&mut self, var: Variable) -> VarId {
        self.vars.push(var);
        VarId(self.vars.len() - 1)
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.vars.get(id.0)
    }

    pub fn get_mut(&mut self, id: VarId) -> Option<&mut Variable> {
        self.vars.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 親をたどる（自身は含まない）
    pub fn ancestors(&self, id: VarId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.get(id).and_then(|v| v.parent),
        }
    }
}

/// 祖先のイテレータ
pub struct Ancestors<'a> {
    arena: &'a Arena,
    next: Option<VarId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (VarId, &'a Variable);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let var = self.arena.get(id)?;
        self.next = var.parent;
        Some((id, var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(name: &str, parent: Option<VarId>) -> Variable {
        Variable {
            name: name.to_string(),
            declared_type: "int".to_string(),
            real_type: "int".to_string(),
            value: "0".to_string(),
            parent,
            frame: FrameId(0),
            real: Some(RealInfo {
                evaluate_name: name.to_string(),
                memory_reference: None,
                variables_reference: 0,
            }),
            node: None,
            kind: VariableKind::Plain,
            children: Lazy::Unset,
        }
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let mut arena = Arena::default();
        let root = arena.push(plain("root", None));
        let mid = arena.push(plain("mid", Some(root)));
        let leaf = arena.push(plain("leaf", Some(mid)));

        let names: Vec<_> = arena.ancestors(leaf).map(|(_, v)| v.name.as_str()).collect();
        assert_eq!(names, vec!["mid", "root"]);
        assert_eq!(arena.ancestors(root).count(), 0);
    }

    #[test]
    fn test_synthetic_has_no_expression() {
        let mut arena = Arena::default();
        let root = arena.push(plain("root", None));
        let synthetic = Variable::synthetic("$expr$", "a = 1".into(), SyntheticKind::ExprRepr, root, FrameId(0));
        assert!(synthetic.is_synthetic());
        assert!(synthetic.evaluate_name().is_none());
        assert!(!synthetic.children_state().is_computed());
    }
}
