//! テスト用のスクリプト化されたデバッガファサード
//!
//! 式ごとに評価結果をあらかじめ登録しておき、呼び出し履歴を記録する。
//! 登録されていない式の評価は `FacadeError::Evaluation` で失敗する。

use crate::{Breakpoint, DebugValue, DebuggerFacade, FacadeError, FrameId, Result};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;

/// 記録された呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Evaluate(String),
    EnumerateChildren(i64),
    EnumerateArray(String, usize),
    FunctionName(FrameId),
}

/// スクリプト化されたデバッガ
#[derive(Debug, Default)]
pub struct ScriptedDebugger {
    evaluations: HashMap<String, Result<DebugValue>>,
    sequences: HashMap<String, Vec<DebugValue>>,
    cursors: RefCell<HashMap<String, usize>>,
    children: HashMap<i64, Vec<DebugValue>>,
    arrays: HashMap<(String, usize), Vec<DebugValue>>,
    functions: HashMap<FrameId, String>,
    breakpoints: Vec<Breakpoint>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedDebugger {
    /// 空のスクリプトを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 式の評価結果を登録する
    pub fn with_value(mut self, expr: &str, value: &str, type_name: &str) -> Self {
        self.evaluations.insert(
            expr.to_string(),
            Ok(DebugValue::new(expr, value, type_name)),
        );
        self
    }

    /// 子要素ハンドル付きの評価結果を登録する
    pub fn with_value_ref(
        mut self,
        expr: &str,
        value: &str,
        type_name: &str,
        variables_reference: i64,
    ) -> Self {
        self.evaluations.insert(
            expr.to_string(),
            Ok(DebugValue::new(expr, value, type_name).with_reference(variables_reference)),
        );
        self
    }

    /// 評価のたびに順に異なる値を返す式を登録する（最後の値は繰り返す）
    pub fn with_sequence(mut self, expr: &str, values: &[&str], type_name: &str) -> Self {
        let values = values
            .iter()
            .map(|value| DebugValue::new(expr, *value, type_name))
            .collect();
        self.sequences.insert(expr.to_string(), values);
        self
    }

    /// 式の評価エラーを登録する
    pub fn with_error(mut self, expr: &str, error: FacadeError) -> Self {
        self.evaluations.insert(expr.to_string(), Err(error));
        self
    }

    /// 式を未知シンボルとして失敗させる
    pub fn with_unknown_symbol(self, expr: &str, symbol: &str) -> Self {
        let error = FacadeError::unknown_symbol(expr, symbol);
        self.with_error(expr, error)
    }

    /// ハンドルに対する子要素を登録する
    pub fn with_children(mut self, variables_reference: i64, children: Vec<DebugValue>) -> Self {
        self.children.insert(variables_reference, children);
        self
    }

    /// 配列読み取りの結果を登録する
    pub fn with_array(mut self, expr: &str, count: usize, elements: Vec<DebugValue>) -> Self {
        self.arrays.insert((expr.to_string(), count), elements);
        self
    }

    /// フレームの関数名を登録する
    pub fn with_function(mut self, frame: FrameId, name: &str) -> Self {
        self.functions.insert(frame, name.to_string());
        self
    }

    /// ブレークポイントを登録する
    pub fn with_breakpoint(mut self, breakpoint: Breakpoint) -> Self {
        self.breakpoints.push(breakpoint);
        self
    }

    /// 記録された呼び出しをすべて取得する
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// 評価された式の一覧を取得する
    pub fn evaluated(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Evaluate(expr) => Some(expr.clone()),
                _ => None,
            })
            .collect()
    }

    /// 呼び出しの総数
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// 呼び出し履歴をクリアする
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

#[async_trait(?Send)]
impl DebuggerFacade for ScriptedDebugger {
    async fn evaluate(&self, expr: &str, _frame: FrameId) -> Result<DebugValue> {
        self.record(Call::Evaluate(expr.to_string()));
        if let Some(values) = self.sequences.get(expr) {
            let mut cursors = self.cursors.borrow_mut();
            let cursor = cursors.entry(expr.to_string()).or_insert(0);
            let index = (*cursor).min(values.len().saturating_sub(1));
            *cursor += 1;
            if let Some(value) = values.get(index) {
                return Ok(value.clone());
            }
        }
        match self.evaluations.get(expr) {
            Some(result) => result.clone(),
            None => Err(FacadeError::evaluation(expr, "no script entry")),
        }
    }

    async fn enumerate_children(&self, variables_reference: i64) -> Result<Vec<DebugValue>> {
        self.record(Call::EnumerateChildren(variables_reference));
        if variables_reference == 0 {
            return Ok(Vec::new());
        }
        self.children
            .get(&variables_reference)
            .cloned()
            .ok_or_else(|| {
                FacadeError::evaluation(
                    format!("<children {}>", variables_reference),
                    "no script entry",
                )
            })
    }

    async fn enumerate_array_children(
        &self,
        expr: &str,
        count: usize,
        _frame: FrameId,
    ) -> Result<Vec<DebugValue>> {
        self.record(Call::EnumerateArray(expr.to_string(), count));
        self.arrays
            .get(&(expr.to_string(), count))
            .cloned()
            .ok_or_else(|| FacadeError::evaluation(expr, "no script entry"))
    }

    async fn current_function_name(&self, frame: FrameId) -> Result<Option<String>> {
        self.record(Call::FunctionName(frame));
        Ok(self.functions.get(&frame).cloned())
    }

    fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_evaluation_and_log() {
        let debugger = ScriptedDebugger::new()
            .with_value("x", "10", "int")
            .with_unknown_symbol("foo()", "foo");

        let frame = FrameId(0);
        assert_eq!(debugger.evaluate("x", frame).await.unwrap().value, "10");
        assert!(debugger.evaluate("foo()", frame).await.unwrap_err().is_unknown_symbol());
        assert!(debugger.evaluate("y", frame).await.is_err());

        assert_eq!(debugger.evaluated(), vec!["x", "foo()", "y"]);
        debugger.clear_calls();
        assert_eq!(debugger.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sequence_repeats_last_value() {
        let debugger = ScriptedDebugger::new().with_sequence("next()", &["1", "2"], "int");
        let frame = FrameId(0);
        assert_eq!(debugger.evaluate("next()", frame).await.unwrap().value, "1");
        assert_eq!(debugger.evaluate("next()", frame).await.unwrap().value, "2");
        assert_eq!(debugger.evaluate("next()", frame).await.unwrap().value, "2");
    }
}
