//! Bitmapset の展開
//!
//! 要素の列挙はターゲット側の `bms_next_member` などを呼び出して行う。
//! 壊れた集合に対して呼ぶとターゲットがクラッシュするため、先に妥当性を確認する。
//! また、列挙関数にブレークポイントがあると評価中に停止してしまうので、
//! その場合は列挙しない。

use crate::context::{Capability, ExecContext, Lazy, SessionState};
use crate::error::EvalError;
use crate::inspector::Inspector;
use crate::variable::{SetState, SyntheticKind, VarId, Variable, VariableKind};
use crate::Result;
use pgnode_registry::type_name::{base_type_name, member_access};
use pgnode_registry::{BitmapsetAnchor, BitmapsetReference};
use pgnode_target::FrameId;
use tracing::debug;

/// Bitmapsetの実装があるソースファイル
const BITMAPSET_SOURCE: &str = "bitmapset.c";

/// 列挙に使う関数
const ENUMERATION_FUNCTIONS: &[&str] = &["bms_next_member", "bms_first_member"];

/// `nwords` の上限（これを超える集合は壊れているとみなす）
const MAX_NWORDS: i64 = 1024;

/// 要素値と要素数の上限（`MAX_NWORDS` 語に収まる範囲）
const MAX_MEMBERS: i64 = MAX_NWORDS * 64;

/// `outBitmapset` と同じ形式で集合を表示する
///
/// # Examples
/// ```
/// use pgnode_core::bitmapset::format_set;
///
/// assert_eq!(format_set(&[1, 3, 5]), "(b 1 3 5)");
/// assert_eq!(format_set(&[]), "(b)");
/// ```
pub fn format_set(members: &[i64]) -> String {
    let mut text = String::from("(b");
    for member in members {
        text.push(' ');
        text.push_str(&member.to_string());
    }
    text.push(')');
    text
}

/// 列挙関数を呼んでも安全か（関係するブレークポイントがないか）
pub fn is_safe_to_enumerate(ctx: &ExecContext<'_>) -> bool {
    !ctx.debugger.breakpoints().iter().any(|bp| {
        bp.is_enabled()
            && (bp.is_in_file(BITMAPSET_SOURCE)
                || ENUMERATION_FUNCTIONS.iter().any(|f| bp.is_on_function(f)))
    })
}

/// 集合が妥当か確認する
///
/// `bms_is_valid_set` があればそれを使い、なければ `nwords` の範囲と
/// （メンバがあれば）タグで判定する。
pub async fn is_valid_set(ctx: &ExecContext<'_>, set_expr: &str, frame: FrameId) -> Result<bool> {
    let flag = &ctx.session.valid_set;
    if SessionState::may_use(flag) {
        match ctx.evaluate_bool(&format!("bms_is_valid_set({})", set_expr), frame).await {
            Ok(valid) => {
                SessionState::record(flag, "bms_is_valid_set", Capability::Available);
                return Ok(valid);
            }
            Err(e) if e.is_unknown_symbol() => {
                SessionState::record(flag, "bms_is_valid_set", Capability::Unavailable);
            }
            Err(e) => debug!("bms_is_valid_set failed: {}", e),
        }
    }

    let nwords = ctx.evaluate_int(&format!("({})->nwords", set_expr), frame).await?;
    if nwords <= 0 || nwords > MAX_NWORDS {
        debug!("bitmapset {} has suspicious nwords {}", set_expr, nwords);
        return Ok(false);
    }

    // 古いターゲットのBitmapsetは `type` メンバを持たない
    match ctx.evaluate_enum(&format!("({})->type", set_expr), frame).await {
        Ok(tag) => Ok(tag == "T_Bitmapset"),
        Err(_) => Ok(true),
    }
}

/// 集合の要素を列挙する
///
/// `bms_next_member` を優先し、使えなければ集合を複製して
/// `bms_first_member` で取り出す。
pub async fn enumerate_members(ctx: &ExecContext<'_>, set_expr: &str, frame: FrameId) -> Result<Vec<i64>> {
    let session = ctx.session;

    if SessionState::may_use(&session.next_member) {
        match next_member_loop(ctx, set_expr, frame).await {
            Ok(members) => {
                SessionState::record(&session.next_member, "bms_next_member", Capability::Available);
                return Ok(members);
            }
            Err(e) if e.is_unknown_symbol() => {
                SessionState::record(&session.next_member, "bms_next_member", Capability::Unavailable);
            }
            Err(e) => return Err(e),
        }
    }

    if SessionState::may_use(&session.first_member) {
        match first_member_loop(ctx, set_expr, frame).await {
            Ok(members) => {
                SessionState::record(&session.first_member, "bms_first_member", Capability::Available);
                return Ok(members);
            }
            Err(e) if e.is_unknown_symbol() => {
                SessionState::record(&session.first_member, "bms_first_member", Capability::Unavailable);
            }
            Err(e) => return Err(e),
        }
    }

    Err(EvalError::Unavailable("bitmapset enumeration".into()))
}

/// 妥当な集合が持ちうる要素数を超えていないか
fn check_member_count(call: &str, members: &[i64]) -> Result<()> {
    if members.len() as i64 >= MAX_MEMBERS {
        return Err(EvalError::unparseable(call, &members.len().to_string(), "member count"));
    }
    Ok(())
}

async fn next_member_loop(ctx: &ExecContext<'_>, set_expr: &str, frame: FrameId) -> Result<Vec<i64>> {
    let mut members = Vec::new();
    let mut previous = -1;
    loop {
        let call = format!("bms_next_member({}, {})", set_expr, previous);
        let next = ctx.evaluate_int(&call, frame).await?;
        if next < 0 {
            return Ok(members);
        }
        if next <= previous || next >= MAX_MEMBERS {
            return Err(EvalError::unparseable(&call, &next.to_string(), "increasing member"));
        }
        check_member_count(&call, &members)?;
        members.push(next);
        previous = next;
    }
}

async fn first_member_loop(ctx: &ExecContext<'_>, set_expr: &str, frame: FrameId) -> Result<Vec<i64>> {
    let Some(copy) = ctx
        .evaluate_pointer(&format!("bms_copy({})", set_expr), frame)
        .await?
    else {
        return Ok(Vec::new());
    };
    let copy_expr = format!("((Bitmapset *) 0x{:x})", copy);

    let mut members = Vec::new();
    let result = loop {
        let call = format!("bms_first_member({})", copy_expr);
        match ctx.evaluate_int(&call, frame).await {
            Ok(member) if member < 0 => break Ok(()),
            Ok(member) => {
                if let Err(e) = check_member_count(&call, &members) {
                    break Err(e);
                }
                members.push(member);
            }
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = ctx.evaluate(&format!("bms_free({})", copy_expr), frame).await {
        debug!("failed to free scratch bitmapset {}: {}", copy_expr, e);
    }
    result.map(|()| members)
}

impl<'a> Inspector<'a> {
    fn set_state(&self, id: VarId) -> Result<SetState> {
        self.with_var(id, |var| match &var.kind {
            VariableKind::BitmapSet(state) => Ok(state.clone()),
            _ => Err(EvalError::assumption(format!("'{}' is not a bitmapset", var.name))),
        })?
    }

    fn set_set_state(&self, id: VarId, update: impl FnOnce(&mut SetState)) -> Result<()> {
        self.update_var(id, |var| match &mut var.kind {
            VariableKind::BitmapSet(state) => {
                update(state);
                Ok(())
            }
            _ => Err(EvalError::assumption(format!("'{}' is not a bitmapset", var.name))),
        })?
    }

    /// Bitmapsetの要素
    ///
    /// 列挙が安全でない場合や集合が妥当でない場合は `None`。
    pub async fn set_elements(&self, id: VarId) -> Result<Option<Vec<i64>>> {
        self.set_state(id)?;
        let frame = self.frame_of(id)?;
        let set_expr = format!("((Bitmapset *)({}))", self.typed_expr(id)?);

        if !is_safe_to_enumerate(&self.ctx) {
            debug!("breakpoint in bitmapset code, skipping enumeration of {}", set_expr);
            return Ok(None);
        }
        if !is_valid_set(&self.ctx, &set_expr, frame).await? {
            return Ok(None);
        }
        enumerate_members(&self.ctx, &set_expr, frame).await.map(Some)
    }

    /// Bitmapsetの子要素: 列挙できれば `$elements$`、続いてメンバ
    ///
    /// 集合は毎回読み直すが、`$elements$` と要素ノードは前回のものを
    /// 書き換えて使う。値が変わらない要素ノードは参照先の子要素も残す。
    pub(crate) async fn bitmapset_children(&self, id: VarId) -> Result<Vec<VarId>> {
        let mut children = Vec::new();
        let members = match self.set_elements(id).await {
            Ok(members) => members,
            Err(e) if e.is_recoverable() => {
                debug!("bitmapset {:?} not enumerated: {}", id, e);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(members) = members {
            children.push(self.set_elements_container(id, &members)?);
        }

        let fields = match self.set_state(id)?.fields {
            Lazy::Computed(fields) => fields,
            Lazy::Unset => {
                let fields = self.literal_members(id).await?;
                let mut recorded = Vec::new();
                self.set_set_state(id, |state| {
                    if !state.fields.is_computed() {
                        state.fields = Lazy::Computed(fields);
                    }
                    recorded = state.fields.get().cloned().unwrap_or_default();
                })?;
                recorded
            }
        };
        children.extend(fields);
        Ok(children)
    }

    /// `$elements$` ノードを今回の要素で更新する
    fn set_elements_container(&self, id: VarId, members: &[i64]) -> Result<VarId> {
        let frame = self.frame_of(id)?;
        let state = self.set_state(id)?;

        let container = match state.elements {
            Some(container) => {
                self.update_var(container, |var| var.value = format_set(members))?;
                container
            }
            None => self.push(Variable::synthetic(
                "$elements$",
                format_set(members),
                SyntheticKind::Elements,
                id,
                frame,
            )),
        };

        let mut slots = state.members.clone();
        let mut elements = Vec::with_capacity(members.len());
        for (i, &member) in members.iter().enumerate() {
            let name = format!("[{}]", i);
            let kind = SyntheticKind::SetMember { member, set: id };
            let element = match slots.get(i).copied() {
                Some(slot) => {
                    self.update_var(slot, |var| {
                        if var.kind != VariableKind::Synthetic(kind.clone()) {
                            *var = Variable::synthetic(&name, member.to_string(), kind, container, frame);
                        }
                    })?;
                    slot
                }
                None => {
                    let slot = self.push(Variable::synthetic(&name, member.to_string(), kind, container, frame));
                    slots.push(slot);
                    slot
                }
            };
            elements.push(element);
        }

        self.update_var(container, |var| var.children = Lazy::Computed(elements))?;
        self.set_set_state(id, |state| {
            state.elements = Some(container);
            state.members = slots;
        })?;
        Ok(container)
    }

    /// Bitmapsetを持つ構造体と参照ルール
    fn set_reference(&self, set: VarId) -> Result<Option<(VarId, BitmapsetReference)>> {
        let (name, container) = self.with_var(set, |v| (v.name.clone(), v.parent))?;
        let Some(container) = container else {
            return Ok(None);
        };
        self.with_var(container, |container_var| {
            if container_var.is_synthetic() {
                return None;
            }
            self.ctx
                .special
                .bitmapset_reference(&container_var.real_type, &name)
                .map(|rule| (container, rule.clone()))
        })
    }

    /// 要素が参照先を持つか（ツリー表示の展開可否用、評価はしない）
    pub(crate) fn set_member_has_reference(&self, set: VarId) -> bool {
        matches!(self.set_reference(set), Ok(Some(_)))
    }

    /// 参照ルールの起点となる変数を探す
    fn resolve_anchor(&self, container: VarId, anchor: &BitmapsetAnchor, scan_roots: bool) -> Option<VarId> {
        let found = match anchor {
            BitmapsetAnchor::SelfVar => Some(container),
            BitmapsetAnchor::Parent => self
                .ancestors(container)
                .into_iter()
                .find(|(_, v)| !v.is_synthetic())
                .map(|(id, _)| id),
            BitmapsetAnchor::Ancestor(type_name) => self
                .ancestors(container)
                .into_iter()
                .find(|(_, v)| !v.is_synthetic() && base_type_name(&v.real_type) == type_name.as_str())
                .map(|(id, _)| id),
        };

        match (found, anchor) {
            (Some(id), _) => Some(id),
            (None, BitmapsetAnchor::Ancestor(type_name)) if scan_roots => {
                self.roots().into_iter().find(|&root| {
                    self.with_var(root, |v| base_type_name(&v.real_type) == type_name.as_str())
                        .unwrap_or(false)
                })
            }
            _ => None,
        }
    }

    /// 要素値が指す参照先を子要素として作成する
    pub(crate) async fn set_member_references(&self, id: VarId, member: i64, set: VarId) -> Result<Vec<VarId>> {
        let Some((container, rule)) = self.set_reference(set)? else {
            return Ok(Vec::new());
        };
        let Some(anchor) = self.resolve_anchor(container, &rule.anchor, rule.scan_roots) else {
            debug!("no anchor for {}.{}", rule.type_name, rule.member);
            return Ok(Vec::new());
        };

        let anchor_expr = self.typed_expr(anchor)?;
        let anchor_type = self.real_type(anchor)?;
        let frame = self.frame_of(id)?;
        let index = member + rule.delta;

        let mut children = Vec::new();
        for path in &rule.paths {
            let mut expr = anchor_expr.clone();
            let mut type_name = anchor_type.clone();
            let mut resolved = true;
            for (i, field) in path.iter().enumerate() {
                expr = member_access(&expr, &type_name, field);
                if i + 1 < path.len() {
                    match self.ctx.evaluate(&expr, frame).await {
                        Ok(value) => type_name = value.type_name,
                        Err(e) => {
                            debug!("reference path {} unavailable: {}", expr, e);
                            resolved = false;
                            break;
                        }
                    }
                }
            }
            if !resolved {
                continue;
            }

            let element_expr = format!("({})[{}]", expr, index);
            match self.ctx.evaluate(&element_expr, frame).await {
                Ok(mut raw) => {
                    raw.name = format!("{}[{}]", path.join("->"), index);
                    raw.evaluate_name = element_expr;
                    children.push(self.create(raw, frame, Some(id)).await);
                }
                Err(e) => debug!("reference {} unavailable: {}", element_expr, e),
            }
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionState;
    use pgnode_registry::{SpecialMemberRegistry, TypeRegistry};
    use pgnode_target::mock::ScriptedDebugger;
    use pgnode_target::Breakpoint;

    #[test]
    fn test_breakpoint_safety() {
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();

        let clean = ScriptedDebugger::new().with_breakpoint(Breakpoint::Source {
            path: "/src/backend/optimizer/path/allpaths.c".into(),
            line: 100,
            enabled: true,
        });
        assert!(is_safe_to_enumerate(&ExecContext::new(&clean, &types, &special, &session)));

        let in_file = ScriptedDebugger::new().with_breakpoint(Breakpoint::Source {
            path: "/src/backend/nodes/bitmapset.c".into(),
            line: 10,
            enabled: true,
        });
        assert!(!is_safe_to_enumerate(&ExecContext::new(&in_file, &types, &special, &session)));

        let disabled = ScriptedDebugger::new().with_breakpoint(Breakpoint::Function {
            name: "bms_next_member".into(),
            enabled: false,
        });
        assert!(is_safe_to_enumerate(&ExecContext::new(&disabled, &types, &special, &session)));
    }

    #[tokio::test]
    async fn test_heuristic_validity() {
        let debugger = ScriptedDebugger::new()
            .with_unknown_symbol("bms_is_valid_set(s)", "bms_is_valid_set")
            .with_value("(s)->nwords", "1", "int")
            .with_value("(s)->type", "T_Bitmapset", "NodeTag")
            .with_value("(t)->nwords", "100000", "int");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);

        assert!(is_valid_set(&ctx, "s", FrameId(0)).await.unwrap());
        assert_eq!(session.valid_set.get(), Capability::Unavailable);

        debugger.clear_calls();
        assert!(!is_valid_set(&ctx, "t", FrameId(0)).await.unwrap());
        assert_eq!(debugger.evaluated(), vec!["(t)->nwords"]);
    }

    #[tokio::test]
    async fn test_first_member_fallback_frees_copy() {
        let debugger = ScriptedDebugger::new()
            .with_unknown_symbol("bms_next_member(s, -1)", "bms_next_member")
            .with_value("bms_copy(s)", "0x900", "Bitmapset *")
            .with_sequence("bms_first_member(((Bitmapset *) 0x900))", &["2", "5", "-1"], "int")
            .with_value("bms_free(((Bitmapset *) 0x900))", "", "void");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);

        assert_eq!(enumerate_members(&ctx, "s", FrameId(0)).await.unwrap(), vec![2, 5]);
        assert_eq!(session.next_member.get(), Capability::Unavailable);
        assert_eq!(session.first_member.get(), Capability::Available);
        assert_eq!(
            debugger.evaluated().last().map(String::as_str),
            Some("bms_free(((Bitmapset *) 0x900))")
        );

        // 利用不可と記憶した関数は再び呼ばない
        debugger.clear_calls();
        let _ = enumerate_members(&ctx, "s", FrameId(0)).await;
        assert!(!debugger.evaluated().iter().any(|e| e.starts_with("bms_next_member")));
    }

    #[tokio::test]
    async fn test_next_member_enumeration() {
        let debugger = ScriptedDebugger::new()
            .with_value("bms_next_member(s, -1)", "1", "int")
            .with_value("bms_next_member(s, 1)", "3", "int")
            .with_value("bms_next_member(s, 3)", "-2", "int");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);

        assert_eq!(enumerate_members(&ctx, "s", FrameId(0)).await.unwrap(), vec![1, 3]);
        assert_eq!(session.next_member.get(), Capability::Available);
        assert_eq!(format_set(&[1, 3]), "(b 1 3)");
    }

    #[tokio::test]
    async fn test_non_increasing_member_is_rejected() {
        // 壊れた集合で同じ値が返り続けても列挙は止まる
        let debugger = ScriptedDebugger::new()
            .with_value("bms_next_member(s, -1)", "4", "int")
            .with_value("bms_next_member(s, 4)", "4", "int")
            .with_value("bms_next_member(t, -1)", "70000", "int");
        let types = TypeRegistry::new();
        let special = SpecialMemberRegistry::new();
        let session = SessionState::new();
        let ctx = ExecContext::new(&debugger, &types, &special, &session);

        let err = enumerate_members(&ctx, "s", FrameId(0)).await.unwrap_err();
        assert!(matches!(err, EvalError::Unparseable { .. }));
        assert_eq!(debugger.call_count(), 2);

        let err = enumerate_members(&ctx, "t", FrameId(0)).await.unwrap_err();
        assert!(matches!(err, EvalError::Unparseable { .. }));
        assert_eq!(session.next_member.get(), Capability::Unknown);
    }

    #[test]
    fn test_member_count_cap() {
        let members: Vec<i64> = (0..MAX_MEMBERS).collect();
        assert!(check_member_count("bms_first_member(c)", &members[..10]).is_ok());
        assert!(check_member_count("bms_first_member(c)", &members).is_err());
    }
}
