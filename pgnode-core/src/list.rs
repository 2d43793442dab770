//! List の展開
//!
//! 新しいターゲットのListは `elements` が指す連続したセル配列を持ち、
//! 古いターゲットでは `head` から `next` をたどる連結リストになっている。
//! どちらの形状かはメンバの有無で判定する。

use crate::context::{ExecContext, Lazy};
use crate::error::EvalError;
use crate::inspector::Inspector;
use crate::variable::{SyntheticKind, VarId, Variable, VariableKind};
use crate::Result;
use pgnode_registry::{ListPosition, DEFAULT_LIST_ELEMENT_TYPE};
use pgnode_target::{DebugValue, FrameId};
use std::collections::HashSet;
use tracing::debug;

/// Listの種類（セルが保持する値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListVariant {
    /// `ptr_value`
    Pointer,
    /// `int_value`
    Int,
    /// `oid_value`
    Oid,
    /// `xid_value`
    Xid,
}

impl ListVariant {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "List" => Some(ListVariant::Pointer),
            "IntList" => Some(ListVariant::Int),
            "OidList" => Some(ListVariant::Oid),
            "XidList" => Some(ListVariant::Xid),
            _ => None,
        }
    }

    /// セルの共用体のフィールド名
    pub fn cell_field(self) -> &'static str {
        match self {
            ListVariant::Pointer => "ptr_value",
            ListVariant::Int => "int_value",
            ListVariant::Oid => "oid_value",
            ListVariant::Xid => "xid_value",
        }
    }
}

/// Listの形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// NIL
    Empty,
    /// `elements` 配列
    ArrayBacked,
    /// `head` / `next` の連結リスト
    Linked,
}

/// List変数の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    pub variant: ListVariant,
    pub(crate) shape: Lazy<ListShape>,
    /// `$elements$` ノード
    pub(crate) elements: Option<VarId>,
}

impl ListState {
    pub fn new(variant: ListVariant) -> Self {
        Self {
            variant,
            shape: Lazy::Unset,
            elements: None,
        }
    }

    /// NILのList
    pub fn empty() -> Self {
        Self {
            variant: ListVariant::Pointer,
            shape: Lazy::Computed(ListShape::Empty),
            elements: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shape == Lazy::Computed(ListShape::Empty)
    }
}

/// 要素型へのポインタ型（`Path *` → `Path **`）
fn pointer_to(element_type: &str) -> String {
    let element_type = element_type.trim_end();
    if element_type.ends_with('*') {
        format!("{}*", element_type)
    } else {
        format!("{} *", element_type)
    }
}

/// List式の `index` 番目の要素を指す式を組み立てる
///
/// 式の描画でも使う。連結リストの場合は `next` をたどる式になる。
pub fn list_nth_expr(list_expr: &str, index: usize, shape: ListShape) -> String {
    match shape {
        ListShape::Linked => {
            let mut cell = format!("({})->head", list_expr);
            for _ in 0..index {
                cell.push_str("->next");
            }
            format!("{}->data.ptr_value", cell)
        }
        _ => format!("({})->elements[{}].ptr_value", list_expr, index),
    }
}

/// ターゲットから読んだListの長さとして受け付ける上限
///
/// これを超える長さは壊れたListとみなす。
pub const MAX_LIST_LENGTH: i64 = 100_000;

/// ターゲットから読んだListの長さを検証する
pub(crate) fn checked_length(length_expr: &str, length: i64) -> Result<usize> {
    if !(0..=MAX_LIST_LENGTH).contains(&length) {
        return Err(EvalError::unparseable(length_expr, &length.to_string(), "list length"));
    }
    usize::try_from(length).map_err(|_| EvalError::unparseable(length_expr, &length.to_string(), "list length"))
}

/// セッションで使われているListの形状を判定する
///
/// 式の描画用。結果はセッションに記憶する。
pub async fn session_list_shape(ctx: &ExecContext<'_>, list_expr: &str, frame: FrameId) -> Result<ListShape> {
    if let Lazy::Computed(shape) = ctx.session.list_shape.get() {
        return Ok(shape);
    }
    let shape = match ctx.evaluate(&format!("({})->elements", list_expr), frame).await {
        Ok(_) => ListShape::ArrayBacked,
        Err(e) => {
            ctx.evaluate(&format!("({})->head", list_expr), frame)
                .await
                .map_err(|_| e)?;
            ListShape::Linked
        }
    };
    debug!("list shape detected: {:?}", shape);
    ctx.session.list_shape.set(Lazy::Computed(shape));
    Ok(shape)
}

impl<'a> Inspector<'a> {
    fn list_state(&self, id: VarId) -> Result<ListState> {
        self.with_var(id, |var| match &var.kind {
            VariableKind::List(state) => Ok(state.clone()),
            _ => Err(EvalError::assumption(format!("{:?} is not a list", id))),
        })?
    }

    fn set_list_state(&self, id: VarId, update: impl FnOnce(&mut ListState)) -> Result<()> {
        self.update_var(id, |var| match &mut var.kind {
            VariableKind::List(state) => {
                update(state);
                Ok(())
            }
            _ => Err(EvalError::assumption(format!("{:?} is not a list", id))),
        })?
    }

    /// Listの形状を判定する（NILなら評価しない）
    async fn detect_list_shape(&self, id: VarId) -> Result<ListShape> {
        if let Lazy::Computed(shape) = self.list_state(id)?.shape {
            return Ok(shape);
        }

        let handle = self.member_handle(id)?;
        let members = self.ctx.debugger.enumerate_children(handle).await?;
        let shape = if members.iter().any(|m| m.name == "elements") {
            ListShape::ArrayBacked
        } else if members.iter().any(|m| m.name == "head") {
            ListShape::Linked
        } else {
            return Err(EvalError::Unavailable("list layout".into()));
        };
        debug!("list {:?} shape: {:?}", id, shape);
        self.set_list_state(id, |state| state.shape = Lazy::Computed(shape))?;
        Ok(shape)
    }

    /// Listの要素数
    ///
    /// NILのListはデバッガを呼ばずに0を返す。
    pub async fn list_length(&self, id: VarId) -> Result<usize> {
        if self.list_state(id)?.is_empty() {
            return Ok(0);
        }
        let expr = self.typed_expr(id)?;
        let length_expr = format!("({})->length", expr);
        let length = self.ctx.evaluate_int(&length_expr, self.frame_of(id)?).await?;
        checked_length(&length_expr, length)
    }

    /// Listの要素
    ///
    /// NILのListはデバッガを呼ばずに空を返す。
    pub async fn list_elements(&self, id: VarId) -> Result<Vec<VarId>> {
        if self.list_state(id)?.is_empty() {
            return Ok(Vec::new());
        }
        let container = self.list_elements_container(id).await?;
        self.try_children(container).await
    }

    /// Listの子要素: `$elements$` とListのメンバ
    pub(crate) async fn list_children(&self, id: VarId) -> Result<Vec<VarId>> {
        if self.list_state(id)?.is_empty() {
            return Ok(Vec::new());
        }
        let mut children = vec![self.list_elements_container(id).await?];
        children.extend(self.literal_members(id).await?);
        Ok(children)
    }

    /// `$elements$` ノードを作成する（要素も同時に読む）
    async fn list_elements_container(&self, id: VarId) -> Result<VarId> {
        if let Some(container) = self.list_state(id)?.elements {
            return Ok(container);
        }

        self.ensure_cast(id).await?;
        let shape = self.detect_list_shape(id).await?;
        let raws = match shape {
            ListShape::Empty => Vec::new(),
            ListShape::ArrayBacked => self.read_array_cells(id).await?,
            ListShape::Linked => self.read_linked_cells(id).await?,
        };

        let frame = self.frame_of(id)?;
        let container = self.push(Variable::synthetic(
            "$elements$",
            String::new(),
            SyntheticKind::Elements,
            id,
            frame,
        ));
        let mut elements = Vec::with_capacity(raws.len());
        for raw in raws {
            elements.push(self.create(raw, frame, Some(container)).await);
        }
        self.update_var(container, |var| {
            var.value = format!("length = {}", elements.len());
            var.children = Lazy::Computed(elements);
        })?;

        // 要素がそろってから記録する（並行して作成された場合は先に記録された方を使う）
        let mut recorded = container;
        self.set_list_state(id, |state| recorded = *state.elements.get_or_insert(container))?;
        Ok(recorded)
    }

    /// Listの要素型を解決する
    ///
    /// トップレベルの変数は関数名、メンバは親の構造体の型で引く。
    pub(crate) async fn list_element_type(&self, id: VarId) -> Result<String> {
        let (name, parent, frame) = self.with_var(id, |v| (v.name.clone(), v.parent, v.frame))?;
        let special = self.ctx.special;
        let element_type = match parent {
            None => {
                let function = self
                    .ctx
                    .debugger
                    .current_function_name(frame)
                    .await
                    .unwrap_or_else(|e| {
                        debug!("function name unavailable: {}", e);
                        None
                    });
                special.list_element_type(ListPosition::TopLevel {
                    function: function.as_deref(),
                    variable: &name,
                })
            }
            Some(parent) => self.with_var(parent, |parent| {
                if parent.is_synthetic() {
                    DEFAULT_LIST_ELEMENT_TYPE
                } else {
                    special.list_element_type(ListPosition::Member {
                        parent_type: &parent.real_type,
                        member: &name,
                    })
                }
            })?,
        };
        Ok(element_type.to_string())
    }

    /// `elements` 配列から要素を読む
    async fn read_array_cells(&self, id: VarId) -> Result<Vec<DebugValue>> {
        let length = self.list_length(id).await?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let expr = self.typed_expr(id)?;
        let variant = self.list_state(id)?.variant;
        let frame = self.frame_of(id)?;

        match variant {
            ListVariant::Pointer => {
                let element_type = self.list_element_type(id).await?;
                let array_expr = format!("({})(({})->elements)", pointer_to(&element_type), expr);
                let raws = self
                    .ctx
                    .debugger
                    .enumerate_array_children(&array_expr, length, frame)
                    .await?;
                Ok(raws
                    .into_iter()
                    .enumerate()
                    .map(|(i, raw)| {
                        let cell = format!("(({})(({})->elements[{}].ptr_value))", element_type, expr, i);
                        let type_name = if raw.type_name.is_empty() {
                            element_type.clone()
                        } else {
                            raw.type_name
                        };
                        DebugValue::new(format!("[{}]", i), raw.value, type_name)
                            .with_evaluate_name(cell)
                            .with_reference(raw.variables_reference)
                    })
                    .collect())
            }
            // セルは共用体なので、スカラー値は1要素ずつ評価する
            scalar => {
                let mut raws = Vec::with_capacity(length);
                for i in 0..length {
                    let cell = format!("({})->elements[{}].{}", expr, i, scalar.cell_field());
                    let raw = self.ctx.evaluate(&cell, frame).await?;
                    raws.push(
                        DebugValue::new(format!("[{}]", i), raw.value, raw.type_name)
                            .with_evaluate_name(cell)
                            .with_reference(raw.variables_reference),
                    );
                }
                Ok(raws)
            }
        }
    }

    /// `head` から `next` をたどって要素を読む
    async fn read_linked_cells(&self, id: VarId) -> Result<Vec<DebugValue>> {
        let expr = self.typed_expr(id)?;
        let variant = self.list_state(id)?.variant;
        let frame = self.frame_of(id)?;
        let element_type = match variant {
            ListVariant::Pointer => Some(self.list_element_type(id).await?),
            _ => None,
        };

        let mut raws = Vec::new();
        let mut visited = HashSet::new();
        let mut cell = self.ctx.evaluate_pointer(&format!("({})->head", expr), frame).await?;
        while let Some(address) = cell {
            if !visited.insert(address) {
                debug!("cycle in list {:?} at 0x{:x}", id, address);
                break;
            }
            if raws.len() as i64 >= MAX_LIST_LENGTH {
                debug!("list {:?} longer than {} cells, stopping", id, MAX_LIST_LENGTH);
                break;
            }
            let cell_expr = format!("((ListCell *) 0x{:x})", address);
            let value_expr = match &element_type {
                Some(element_type) => format!("(({})({}->data.ptr_value))", element_type, cell_expr),
                None => format!("{}->data.{}", cell_expr, variant.cell_field()),
            };
            let raw = self.ctx.evaluate(&value_expr, frame).await?;
            raws.push(
                DebugValue::new(format!("[{}]", raws.len()), raw.value, raw.type_name)
                    .with_evaluate_name(value_expr)
                    .with_reference(raw.variables_reference),
            );
            cell = self
                .ctx
                .evaluate_pointer(&format!("{}->next", cell_expr), frame)
                .await?;
        }
        Ok(raws)
    }
}
