//! ツリー表示用の項目

use crate::bitmapset::format_set;
use crate::context::Lazy;
use crate::error::EvalError;
use crate::inspector::Inspector;
use crate::value_node::display_value;
use crate::variable::{SyntheticKind, VarId, Variable, VariableKind};
use crate::Result;
use pgnode_registry::type_name::base_type_name;
use tracing::debug;

/// UIのツリーに表示する1項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    /// `name: type = ` の形
    pub label: String,
    pub description: String,
    /// 展開可能か
    pub expandable: bool,
}

impl<'a> Inspector<'a> {
    /// ツリー項目を作る
    ///
    /// 表示に必要な評価が失敗した場合は、生の値を展開不可の項目として返す。
    pub async fn tree_item(&self, id: VarId) -> Result<TreeItem> {
        let label = self.with_var(id, label_of)?;
        match self.describe(id).await {
            Ok((description, expandable)) => Ok(TreeItem {
                label,
                description,
                expandable,
            }),
            Err(e) if e.is_recoverable() => {
                debug!("tree item for {:?} degraded: {}", id, e);
                Ok(TreeItem {
                    label,
                    description: self.with_var(id, |var| var.value.clone())?,
                    expandable: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn describe(&self, id: VarId) -> Result<(String, bool)> {
        let var = self.variable(id).ok_or_else(|| EvalError::assumption(format!("unknown variable {:?}", id)))?;
        match var.kind.clone() {
            VariableKind::Synthetic(kind) => {
                let value = var.value.clone();
                let expandable = match kind {
                    SyntheticKind::Elements => true,
                    SyntheticKind::SetMember { set, .. } => self.set_member_has_reference(set),
                    SyntheticKind::ExprRepr | SyntheticKind::Info => false,
                };
                Ok((value, expandable))
            }
            VariableKind::Expr(_) => Ok((self.render_expr(id).await?, true)),
            VariableKind::List(state) => {
                if state.is_empty() {
                    return Ok(("NIL".to_string(), false));
                }
                Ok((format!("length = {}", self.list_length(id).await?), true))
            }
            VariableKind::BitmapSet(_) => {
                let description = match self.set_elements(id).await? {
                    Some(members) => format_set(&members),
                    None => var.value.clone(),
                };
                Ok((description, true))
            }
            VariableKind::Value(state) => {
                if let Lazy::Computed(display) = &state.display {
                    return Ok((display.clone(), true));
                }
                let expr = self.typed_expr(id)?;
                let display = display_value(&self.ctx, state.kind, &expr, var.frame).await?;
                self.update_var(id, |var| {
                    if let VariableKind::Value(state) = &mut var.kind {
                        state.display = Lazy::Computed(display.clone());
                    }
                })?;
                Ok((display, true))
            }
            VariableKind::Array(_) | VariableKind::Node => Ok((var.value.clone(), true)),
            VariableKind::Plain => {
                let expandable = var
                    .real
                    .as_ref()
                    .is_some_and(|real| real.variables_reference != 0);
                Ok((var.value.clone(), expandable))
            }
        }
    }
}

/// `name: type = ` の形のラベル
fn label_of(var: &Variable) -> String {
    if var.is_synthetic() {
        return format!("{} = ", var.name);
    }
    let type_name = if var.node.is_some() && base_type_name(&var.real_type) != base_type_name(&var.declared_type) {
        format!("{} [{}]", var.declared_type, var.real_type)
    } else {
        var.declared_type.clone()
    };
    format!("{}: {} = ", var.name, type_name)
}
