//! 長さを持つ配列メンバの展開
//!
//! `PlannerInfo.simple_rel_array` のように、ポインタメンバが指す配列の長さを
//! 別のメンバや式で求める。

use crate::error::EvalError;
use crate::inspector::Inspector;
use crate::variable::{SyntheticKind, VarId, Variable};
use crate::Result;
use pgnode_registry::type_name::member_access;
use pgnode_registry::ArrayMemberRule;
use tracing::debug;

/// 長さ式から評価する式を組み立てる
///
/// - `!` で始まる式はフレーム内でそのまま評価する
/// - `{}` を含む式は `{}` を親の式に置き換える
/// - それ以外は親からのメンバパスとみなす
///
/// # Examples
/// ```
/// use pgnode_core::array::length_expression;
///
/// assert_eq!(length_expression("simple_rel_array_size", "root", "PlannerInfo *"),
///            "(root)->simple_rel_array_size");
/// assert_eq!(length_expression("{}->max_attr - {}->min_attr + 1", "rel", "RelOptInfo *"),
///            "(rel)->max_attr - (rel)->min_attr + 1");
/// assert_eq!(length_expression("!MaxBackends", "root", "PlannerInfo *"), "MaxBackends");
/// ```
pub fn length_expression(rule_expr: &str, parent_expr: &str, parent_type: &str) -> String {
    let rule_expr = rule_expr.trim();
    if let Some(raw) = rule_expr.strip_prefix('!') {
        raw.trim().to_string()
    } else if rule_expr.contains("{}") {
        rule_expr.replace("{}", &format!("({})", parent_expr))
    } else {
        member_access(parent_expr, parent_type, rule_expr)
    }
}

impl<'a> Inspector<'a> {
    /// 配列メンバの子要素
    ///
    /// 先頭に要素数を示す `$length$` を置く。
    /// 長さが0または数値でない場合はメンバをそのまま返す。
    pub(crate) async fn array_children(&self, id: VarId, rule: &ArrayMemberRule) -> Result<Vec<VarId>> {
        let (parent, frame, member_expr) = self.with_var(id, |var| {
            let parent = var.parent.ok_or_else(|| {
                EvalError::assumption(format!("array member '{}' has no parent", var.name))
            })?;
            let member_expr = var
                .evaluate_name()
                .ok_or_else(|| EvalError::assumption(format!("'{}' has no expression", var.name)))?
                .to_string();
            Ok::<_, EvalError>((parent, var.frame, member_expr))
        })??;

        let parent_expr = self.typed_expr(parent)?;
        let parent_type = self.real_type(parent)?;
        let length_expr = length_expression(&rule.length_expr, &parent_expr, &parent_type);

        let count = match self.ctx.evaluate_int(&length_expr, frame).await {
            Ok(count) if count > 0 => count as usize,
            Ok(_) => return self.literal_members(id).await,
            Err(e) => {
                debug!("length of {}.{} unavailable: {}", rule.type_name, rule.member, e);
                return self.literal_members(id).await;
            }
        };

        let raws = self
            .ctx
            .debugger
            .enumerate_array_children(&member_expr, count, frame)
            .await?;
        let mut children = vec![self.push(Variable::synthetic(
            "$length$",
            count.to_string(),
            SyntheticKind::Info,
            id,
            frame,
        ))];
        for (i, mut raw) in raws.into_iter().enumerate() {
            raw.name = format!("[{}]", i);
            raw.evaluate_name = format!("({})[{}]", member_expr, i);
            children.push(self.create(raw, frame, Some(id)).await);
        }
        Ok(children)
    }
}
