//! 式ノードの描画
//!
//! 式ツリーをデバッガ経由でたどり、SQLに近い文字列を組み立てる。
//! 描画できないノードはタグごとの短いプレースホルダに置き換える。

pub mod column;
pub mod format;
pub mod lookup;
pub mod placeholder;

pub use placeholder::placeholder;

use crate::context::{ExecContext, Lazy};
use crate::error::EvalError;
use crate::factory::read_tag;
use crate::inspector::{typed_expr_of, Inspector};
use crate::list::{checked_length, list_nth_expr, session_list_shape, ListVariant};
use crate::variable::{VarId, Variable, VariableKind};
use crate::Result;
use async_recursion::async_recursion;
use pgnode_registry::type_name::{base_type_name, member_access};
use pgnode_target::value::extract_string;
use pgnode_target::FrameId;
use tracing::debug;

/// 式ノードの描画器
pub struct ExprRenderer<'c, 'a> {
    pub(crate) ctx: &'c ExecContext<'a>,
    pub(crate) frame: FrameId,
    /// 列参照の解決に使うレンジテーブル（`List *` の式）
    pub(crate) rtable: Option<String>,
}

impl<'c, 'a> ExprRenderer<'c, 'a> {
    pub fn new(ctx: &'c ExecContext<'a>, frame: FrameId, rtable: Option<String>) -> Self {
        Self { ctx, frame, rtable }
    }

    /// ノードを指す式を描画する
    pub async fn render(&self, expr: &str) -> Result<String> {
        let tag = read_tag(self.ctx, expr, self.frame).await?;
        self.render_tagged(&tag, expr).await
    }

    /// タグが分かっているノードを描画する
    #[async_recursion(?Send)]
    pub async fn render_tagged(&self, tag: &str, expr: &str) -> Result<String> {
        if let Some(text) = self.format_builtin(tag, expr).await {
            return text;
        }
        if ListVariant::from_tag(tag) == Some(ListVariant::Pointer) {
            return self.render_list(expr, ", ").await;
        }
        if let Some(text) = self.format_with_helper(expr).await? {
            return Ok(text);
        }
        Ok(placeholder(tag).to_string())
    }

    /// `((Type *)(expr))->field`
    pub(crate) fn field(&self, type_name: &str, expr: &str, field: &str) -> String {
        format!("(({} *)({}))->{}", type_name, expr, field)
    }

    pub(crate) async fn int(&self, expr: &str) -> Result<i64> {
        self.ctx.evaluate_int(expr, self.frame).await
    }

    pub(crate) async fn boolean(&self, expr: &str) -> Result<bool> {
        self.ctx.evaluate_bool(expr, self.frame).await
    }

    pub(crate) async fn enumerator(&self, expr: &str) -> Result<String> {
        self.ctx.evaluate_enum(expr, self.frame).await
    }

    pub(crate) async fn is_null(&self, expr: &str) -> Result<bool> {
        Ok(self.ctx.evaluate_pointer(expr, self.frame).await?.is_none())
    }

    /// `char *` を読む（NULLなら `None`）
    pub(crate) async fn optional_string(&self, expr: &str) -> Result<Option<String>> {
        let value = self.ctx.evaluate(expr, self.frame).await?;
        if pgnode_target::value::is_null_pointer(&value.value) {
            return Ok(None);
        }
        extract_string(&value.value)
            .map(Some)
            .ok_or_else(|| EvalError::unparseable(expr, &value.value, "string"))
    }

    /// 子ノードを描画する
    pub(crate) async fn child(&self, expr: &str) -> Result<String> {
        self.render(expr).await
    }

    /// 子ノードを描画する（NULLなら `None`）
    pub(crate) async fn optional_child(&self, expr: &str) -> Result<Option<String>> {
        if self.is_null(expr).await? {
            return Ok(None);
        }
        self.render(expr).await.map(Some)
    }

    /// 子ノードを描画し、タグも返す
    pub(crate) async fn child_with_tag(&self, expr: &str) -> Result<(String, String)> {
        let tag = read_tag(self.ctx, expr, self.frame).await?;
        let text = self.render_tagged(&tag, expr).await?;
        Ok((tag, text))
    }

    /// Listの各要素を指す式
    pub(crate) async fn list_items(&self, list_expr: &str) -> Result<Vec<String>> {
        if self.is_null(list_expr).await? {
            return Ok(Vec::new());
        }
        let shape = session_list_shape(self.ctx, list_expr, self.frame).await?;
        let length_expr = format!("({})->length", list_expr);
        let length = checked_length(&length_expr, self.int(&length_expr).await?)?;
        Ok((0..length).map(|i| list_nth_expr(list_expr, i, shape)).collect())
    }

    /// Listの要素を描画して連結する
    pub(crate) async fn render_list(&self, list_expr: &str, separator: &str) -> Result<String> {
        let mut items = Vec::new();
        for item in self.list_items(list_expr).await? {
            items.push(self.child(&item).await?);
        }
        Ok(items.join(separator))
    }
}

/// 変数がレンジテーブルを持つ構造体なら、その式を返す
fn rtable_of(var: &Variable, expr: &str) -> Option<String> {
    match base_type_name(&var.real_type) {
        "Query" | "PlannedStmt" => Some(member_access(expr, &var.real_type, "rtable")),
        "PlannerInfo" => Some(format!("{}->rtable", member_access(expr, &var.real_type, "parse"))),
        _ => None,
    }
}

impl<'a> Inspector<'a> {
    /// 式ノードを描画する
    ///
    /// 成功した結果は記憶し、2回目以降はデバッガを呼ばない。
    /// 描画に失敗した場合はタグに対応するプレースホルダを返す。
    pub async fn render_expr(&self, id: VarId) -> Result<String> {
        match self.try_render(id).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_recoverable() => {
                debug!("rendering of {:?} failed: {}", id, e);
                self.with_var(id, |var| placeholder(var.tag().unwrap_or_default()).to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// 式ノードを描画する（失敗はそのまま返す）
    pub(crate) async fn try_render(&self, id: VarId) -> Result<String> {
        let plan = self.with_var(id, |var| -> Result<RenderPlan> {
            let VariableKind::Expr(state) = &var.kind else {
                return Err(EvalError::assumption(format!("'{}' is not an expression node", var.name)));
            };
            if let Lazy::Computed(repr) = &state.repr {
                return Ok(RenderPlan::Done(repr.clone()));
            }
            let tag = var
                .tag()
                .ok_or_else(|| EvalError::assumption(format!("'{}' has no tag", var.name)))?;
            let expr = var
                .evaluate_name()
                .ok_or_else(|| EvalError::assumption(format!("'{}' has no expression", var.name)))?;
            Ok(RenderPlan::Render {
                nested: state.nested,
                frame: var.frame,
                tag: tag.to_string(),
                expr: expr.to_string(),
            })
        })??;
        let (nested, frame, tag, expr) = match plan {
            RenderPlan::Done(repr) => return Ok(repr),
            RenderPlan::Render { nested, frame, tag, expr } => (nested, frame, tag, expr),
        };

        let rtable = self.find_rtable(id);
        let renderer = ExprRenderer::new(&self.ctx, frame, rtable);
        let text = match nested {
            Some(member) => renderer.render(&renderer.field(&tag, &expr, member)).await?,
            None => renderer.render_tagged(&tag, &expr).await?,
        };

        self.update_var(id, |var| {
            if let VariableKind::Expr(state) = &mut var.kind {
                state.repr = Lazy::Computed(text.clone());
            }
        })?;
        Ok(text)
    }

    /// 最も近い `Query` / `PlannerInfo` / `PlannedStmt` の祖先からレンジテーブルを探す
    ///
    /// 祖先に見つからなければトップレベルの変数を探す。
    pub(crate) fn find_rtable(&self, id: VarId) -> Option<String> {
        let ancestors = self.ancestors(id).into_iter().map(|(ancestor, _)| ancestor);
        for candidate in ancestors.chain(self.roots()) {
            let Some(var) = self.variable(candidate) else {
                continue;
            };
            if var.is_synthetic() {
                continue;
            }
            if let Ok(expr) = typed_expr_of(&var) {
                if let Some(rtable) = rtable_of(&var, &expr) {
                    return Some(rtable);
                }
            }
        }
        None
    }
}

/// 描画前に変数から取り出す情報
enum RenderPlan {
    Done(String),
    Render {
        nested: Option<&'static str>,
        frame: FrameId,
        tag: String,
        expr: String,
    },
}
