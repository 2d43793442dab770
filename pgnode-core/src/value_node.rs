//! 値ノード（Integer, Float, Boolean, String, BitString）
//!
//! 古いターゲットでは共通の `Value` 構造体（`val` 共用体）、新しいターゲットでは
//! 種類ごとの構造体になっている。どちらのレイアウトかは最初の値ノードで
//! 確認し、セッション中は記憶した結果を使う。

use crate::context::{ExecContext, Lazy};
use crate::error::EvalError;
use crate::Result;
use pgnode_target::FrameId;
use tracing::debug;

/// 値ノードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    String,
    BitString,
}

/// 値ノードの構造体レイアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueLayout {
    /// `Value` 構造体の `val` 共用体
    Unified,
    /// 種類ごとの構造体
    PerKind,
}

/// 値ノード変数の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueState {
    pub kind: ValueKind,
    pub(crate) display: Lazy<String>,
}

impl ValueState {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            display: Lazy::Unset,
        }
    }
}

impl ValueKind {
    /// タグから値ノードの種類を判定する
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Integer" => Some(ValueKind::Integer),
            "Float" => Some(ValueKind::Float),
            "Boolean" => Some(ValueKind::Boolean),
            "String" => Some(ValueKind::String),
            "BitString" => Some(ValueKind::BitString),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Boolean => "Boolean",
            ValueKind::String => "String",
            ValueKind::BitString => "BitString",
        }
    }

    /// レイアウトに応じた構造体名
    pub fn struct_name(self, layout: ValueLayout) -> &'static str {
        match layout {
            ValueLayout::Unified => "Value",
            ValueLayout::PerKind => self.tag(),
        }
    }

    /// 値を保持するフィールドへのアクセス式
    pub fn field_expr(self, layout: ValueLayout, expr: &str) -> String {
        let field = match (layout, self) {
            (ValueLayout::PerKind, ValueKind::Integer) => "ival",
            (ValueLayout::PerKind, ValueKind::Float) => "fval",
            (ValueLayout::PerKind, ValueKind::Boolean) => "boolval",
            (ValueLayout::PerKind, ValueKind::String) => "sval",
            (ValueLayout::PerKind, ValueKind::BitString) => "bsval",
            (ValueLayout::Unified, ValueKind::Integer | ValueKind::Boolean) => "val.ival",
            (ValueLayout::Unified, _) => "val.str",
        };
        format!("(({} *)({}))->{}", self.struct_name(layout), expr, field)
    }
}

/// 値ノードのレイアウトを判定する
///
/// 判定結果はセッションに記憶し、以降は確認しない。
/// どちらのレイアウトでも読めなかった場合もその結果を記憶する。
/// 一つのセッションで両方のレイアウトが混在しないことを前提とする。
pub async fn detect_layout(
    ctx: &ExecContext<'_>,
    kind: ValueKind,
    expr: &str,
    frame: FrameId,
) -> Result<ValueLayout> {
    if let Lazy::Computed(layout) = ctx.session.value_layout.get() {
        return layout.ok_or_else(|| EvalError::Unavailable("value node layout".into()));
    }

    for layout in [ValueLayout::PerKind, ValueLayout::Unified] {
        match ctx.evaluate(&kind.field_expr(layout, expr), frame).await {
            Ok(_) => {
                debug!("value node layout detected: {:?}", layout);
                ctx.session.value_layout.set(Lazy::Computed(Some(layout)));
                return Ok(layout);
            }
            Err(e) => debug!("value node layout {:?} rejected: {}", layout, e),
        }
    }
    ctx.session.value_layout.set(Lazy::Computed(None));
    Err(EvalError::Unavailable("value node layout".into()))
}

/// 値ノードの表示文字列を読む
pub async fn display_value(
    ctx: &ExecContext<'_>,
    kind: ValueKind,
    expr: &str,
    frame: FrameId,
) -> Result<String> {
    let layout = detect_layout(ctx, kind, expr, frame).await?;
    let field = kind.field_expr(layout, expr);
    match kind {
        ValueKind::Integer => Ok(ctx.evaluate_int(&field, frame).await?.to_string()),
        ValueKind::Boolean => Ok(ctx.evaluate_bool(&field, frame).await?.to_string()),
        ValueKind::String => Ok(format!("\"{}\"", ctx.evaluate_string(&field, frame).await?)),
        ValueKind::Float | ValueKind::BitString => ctx.evaluate_string(&field, frame).await,
    }
}

/// `String` ノードの文字列を読む（列名リストなど）
pub async fn string_value(ctx: &ExecContext<'_>, expr: &str, frame: FrameId) -> Result<String> {
    let layout = detect_layout(ctx, ValueKind::String, expr, frame).await?;
    ctx.evaluate_string(&ValueKind::String.field_expr(layout, expr), frame).await
}
