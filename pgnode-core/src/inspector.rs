//! インスペクタ
//!
//! 1回の停止で得た変数をアリーナに保持し、子要素の展開・ツリー表示・
//! ウォッチ式・式の描画をまとめて提供する。
//!
//! 展開は `&self` で行うため、UIは兄弟の変数を同時に展開できる。
//! 1つの変数の展開の中では、評価は常に同じ順序で行われる。
//! 異なる変数の展開どうしの評価の順序は決まっていない。
//! アリーナへの借用は評価の待機をまたいで保持しない。

use crate::context::{ExecContext, Lazy};
use crate::error::EvalError;
use crate::variable::{Arena, SyntheticKind, VarId, Variable, VariableKind};
use crate::Result;
use futures::future::join_all;
use pgnode_registry::type_name::{base_type_name, member_access};
use pgnode_target::{DebugValue, FrameId};
use std::cell::RefCell;
use tracing::debug;

/// 変数インスペクタ
pub struct Inspector<'a> {
    pub(crate) ctx: ExecContext<'a>,
    arena: RefCell<Arena>,
    roots: RefCell<Vec<VarId>>,
}

impl<'a> Inspector<'a> {
    pub fn new(ctx: ExecContext<'a>) -> Self {
        Self {
            ctx,
            arena: RefCell::new(Arena::default()),
            roots: RefCell::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &ExecContext<'a> {
        &self.ctx
    }

    /// 変数を取得する（スナップショット）
    pub fn variable(&self, id: VarId) -> Option<Variable> {
        self.arena.borrow().get(id).cloned()
    }

    /// トップレベルの変数
    pub fn roots(&self) -> Vec<VarId> {
        self.roots.borrow().clone()
    }

    /// アリーナ内の変数の数
    pub fn variable_count(&self) -> usize {
        self.arena.borrow().len()
    }

    /// 変数を参照して値を取り出す
    pub(crate) fn with_var<R>(&self, id: VarId, f: impl FnOnce(&Variable) -> R) -> Result<R> {
        let arena = self.arena.borrow();
        let var = arena
            .get(id)
            .ok_or_else(|| EvalError::assumption(format!("unknown variable {:?}", id)))?;
        Ok(f(var))
    }

    /// 変数を書き換える
    pub(crate) fn update_var<R>(&self, id: VarId, f: impl FnOnce(&mut Variable) -> R) -> Result<R> {
        let mut arena = self.arena.borrow_mut();
        let var = arena
            .get_mut(id)
            .ok_or_else(|| EvalError::assumption(format!("unknown variable {:?}", id)))?;
        Ok(f(var))
    }

    pub(crate) fn push(&self, var: Variable) -> VarId {
        self.arena.borrow_mut().push(var)
    }

    pub(crate) fn frame_of(&self, id: VarId) -> Result<FrameId> {
        self.with_var(id, |v| v.frame)
    }

    pub(crate) fn real_type(&self, id: VarId) -> Result<String> {
        self.with_var(id, |v| v.real_type.clone())
    }

    /// 親をたどる（自身は含まない）
    pub(crate) fn ancestors(&self, id: VarId) -> Vec<(VarId, Variable)> {
        self.arena
            .borrow()
            .ancestors(id)
            .map(|(ancestor, var)| (ancestor, var.clone()))
            .collect()
    }

    /// トップレベルの変数を追加する
    pub async fn add_root(&self, raw: DebugValue, frame: FrameId) -> VarId {
        let id = self.create(raw, frame, None).await;
        self.roots.borrow_mut().push(id);
        id
    }

    /// フレームのスコープに含まれる変数をトップレベルとして追加する
    pub async fn frame_root(&self, frame: FrameId, scope_reference: i64) -> Result<Vec<VarId>> {
        let raws = self.ctx.debugger.enumerate_children(scope_reference).await?;
        let mut roots = Vec::with_capacity(raws.len());
        for raw in raws {
            roots.push(self.add_root(raw, frame).await);
        }
        Ok(roots)
    }

    /// 子要素を取得する
    ///
    /// デバッガ呼び出しの失敗やセッションの消失は空の子要素として扱う。
    /// 内部の前提が崩れた場合のみエラーを返す。
    pub async fn children(&self, id: VarId) -> Result<Vec<VarId>> {
        match self.try_children(id).await {
            Ok(children) => Ok(children),
            Err(e) if e.is_recoverable() => {
                debug!("children of {:?} unavailable: {}", id, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// 複数の変数を同時に展開する
    ///
    /// 結果は `ids` と同じ順に並ぶ。
    pub async fn children_of_all(&self, ids: &[VarId]) -> Vec<Result<Vec<VarId>>> {
        join_all(ids.iter().map(|&id| self.children(id))).await
    }

    /// 子要素を取得する（回復可能なエラーもそのまま返す）
    pub async fn try_children(&self, id: VarId) -> Result<Vec<VarId>> {
        let (cached, cache) = self.with_var(id, |var| {
            // Bitmapsetは展開のたびに妥当性を確認し直す
            let cache = !matches!(var.kind, VariableKind::BitmapSet(_));
            (var.children.get().cloned(), cache)
        })?;
        if let Some(children) = cached {
            return Ok(children);
        }

        let children = self.materialize(id).await?;
        if !cache {
            return Ok(children);
        }
        // 同じ変数の展開が並行して終わった場合は先に記録された方を使う
        self.update_var(id, |var| {
            if let Lazy::Computed(existing) = &var.children {
                return existing.clone();
            }
            var.children = Lazy::Computed(children.clone());
            children
        })
    }

    async fn materialize(&self, id: VarId) -> Result<Vec<VarId>> {
        match self.with_var(id, |v| v.kind.clone())? {
            VariableKind::Synthetic(SyntheticKind::SetMember { member, set }) => {
                self.set_member_references(id, member, set).await
            }
            VariableKind::Synthetic(_) => Ok(Vec::new()),
            VariableKind::Plain => self.literal_members(id).await,
            VariableKind::Node | VariableKind::Value(_) => {
                self.ensure_cast(id).await?;
                self.literal_members(id).await
            }
            VariableKind::Expr(_) => {
                self.ensure_cast(id).await?;
                let mut children = Vec::new();
                match self.try_render(id).await {
                    Ok(repr) => {
                        let frame = self.frame_of(id)?;
                        children.push(self.push(Variable::synthetic(
                            "$expr$",
                            repr,
                            SyntheticKind::ExprRepr,
                            id,
                            frame,
                        )));
                    }
                    Err(e) => debug!("$expr$ of {:?} omitted: {}", id, e),
                }
                children.extend(self.literal_members(id).await?);
                Ok(children)
            }
            VariableKind::List(_) => self.list_children(id).await,
            VariableKind::BitmapSet(_) => self.bitmapset_children(id).await,
            VariableKind::Array(rule) => self.array_children(id, &rule).await,
        }
    }

    /// 構造体のメンバをそのまま子要素にする
    pub(crate) async fn literal_members(&self, id: VarId) -> Result<Vec<VarId>> {
        let handle = self.member_handle(id)?;
        if handle == 0 {
            return Ok(Vec::new());
        }

        let parent_expr = self.typed_expr(id)?;
        let (parent_type, frame) = self.with_var(id, |v| (v.real_type.clone(), v.frame))?;

        let raws = self.ctx.debugger.enumerate_children(handle).await?;
        let mut members = Vec::with_capacity(raws.len());
        for raw in raws {
            let raw = with_member_expression(raw, &parent_expr, &parent_type);
            members.push(self.create(raw, frame, Some(id)).await);
        }
        Ok(members)
    }

    /// メンバ列挙に使うハンドル（キャスト済みならキャスト後のもの）
    pub(crate) fn member_handle(&self, id: VarId) -> Result<i64> {
        self.with_var(id, |var| {
            if let Some(Lazy::Computed(Some(handle))) = var.node.as_ref().map(|n| n.cast) {
                return handle;
            }
            var.real.as_ref().map(|r| r.variables_reference).unwrap_or(0)
        })
    }

    /// 実際の型で参照できる式
    ///
    /// タグが宣言型と異なる場合は実際の型へのキャストを付ける。
    pub(crate) fn typed_expr(&self, id: VarId) -> Result<String> {
        self.with_var(id, typed_expr_of)?
    }

    /// ウォッチ式を組み立てる
    ///
    /// トップレベルは変数名、配列要素は `(<メンバ>)[i]`、List要素は
    /// 要素型へキャストしたセルの式、構造体メンバはデバッガが返した式。
    /// 合成ノードはウォッチ式を持たない。
    pub fn watch_expression(&self, id: VarId) -> Option<String> {
        let arena = self.arena.borrow();
        let var = arena.get(id)?;
        let real = var.real.as_ref()?;
        match var.parent {
            None => Some(var.name.clone()),
            Some(_) => Some(real.evaluate_name.clone()),
        }
    }
}

/// 変数を実際の型で参照する式
pub(crate) fn typed_expr_of(var: &Variable) -> Result<String> {
    let expr = var
        .evaluate_name()
        .ok_or_else(|| EvalError::assumption(format!("'{}' has no expression", var.name)))?;
    if var.node.is_some() && base_type_name(&var.real_type) != base_type_name(&var.declared_type) {
        Ok(format!("(({})({}))", var.real_type, expr))
    } else {
        Ok(expr.to_string())
    }
}

/// デバッガがメンバの完全な式を返さなかった場合に補う
fn with_member_expression(mut raw: DebugValue, parent_expr: &str, parent_type: &str) -> DebugValue {
    if raw.evaluate_name.is_empty() || raw.evaluate_name == raw.name {
        raw.evaluate_name = if raw.name.starts_with('[') {
            format!("({}){}", parent_expr, raw.name)
        } else {
            member_access(parent_expr, parent_type, &raw.name)
        };
    }
    raw
}
