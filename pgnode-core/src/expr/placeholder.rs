//! 描画できない式ノードの代替表示

/// タグごとのプレースホルダ
const PLACEHOLDERS: &[(&str, &str)] = &[
    ("Var", "VAR"),
    ("Const", "CONST"),
    ("Param", "PARAM"),
    ("Aggref", "AGGREF"),
    ("GroupingFunc", "GROUPINGFUNC"),
    ("WindowFunc", "WINDOWFUNC"),
    ("SubscriptingRef", "SUBSCRIPTINGREF"),
    ("ArrayRef", "ARRAYREF"),
    ("FuncExpr", "FUNCEXPR"),
    ("NamedArgExpr", "NAMEDARGEXPR"),
    ("OpExpr", "OPEXPR"),
    ("DistinctExpr", "DISTINCTEXPR"),
    ("NullIfExpr", "NULLIFEXPR"),
    ("ScalarArrayOpExpr", "SCALARARRAYOPEXPR"),
    ("BoolExpr", "BOOLEXPR"),
    ("SubLink", "SUBLINK"),
    ("SubPlan", "SUBPLAN"),
    ("AlternativeSubPlan", "ALTERNATIVESUBPLAN"),
    ("FieldSelect", "FIELDSELECT"),
    ("FieldStore", "FIELDSTORE"),
    ("RelabelType", "RELABELTYPE"),
    ("CoerceViaIO", "COERCEVIAIO"),
    ("ArrayCoerceExpr", "ARRAYCOERCEEXPR"),
    ("ConvertRowtypeExpr", "CONVERTROWTYPEEXPR"),
    ("CollateExpr", "COLLATEEXPR"),
    ("CaseExpr", "CASEEXPR"),
    ("CaseWhen", "CASEWHEN"),
    ("CaseTestExpr", "CASETESTEXPR"),
    ("ArrayExpr", "ARRAYEXPR"),
    ("RowExpr", "ROWEXPR"),
    ("RowCompareExpr", "ROWCOMPAREEXPR"),
    ("CoalesceExpr", "COALESCEEXPR"),
    ("MinMaxExpr", "MINMAXEXPR"),
    ("SQLValueFunction", "SQLVALUEFUNCTION"),
    ("XmlExpr", "XMLEXPR"),
    ("NullTest", "NULLTEST"),
    ("BooleanTest", "BOOLEANTEST"),
    ("CoerceToDomain", "COERCETODOMAIN"),
    ("CoerceToDomainValue", "COERCETODOMAINVALUE"),
    ("SetToDefault", "SETTODEFAULT"),
    ("CurrentOfExpr", "CURRENTOFEXPR"),
    ("NextValueExpr", "NEXTVALUEEXPR"),
    ("InferenceElem", "INFERENCEELEM"),
    ("TargetEntry", "TARGETENTRY"),
    ("PlaceHolderVar", "PLACEHOLDERVAR"),
    ("RestrictInfo", "RESTRICTINFO"),
    ("EquivalenceMember", "EQUIVALENCEMEMBER"),
    ("Query", "QUERY"),
    ("List", "LIST"),
];

/// タグに対応するプレースホルダを返す（未知のタグは `EXPR`）
///
/// # Examples
/// ```
/// use pgnode_core::expr::placeholder;
///
/// assert_eq!(placeholder("OpExpr"), "OPEXPR");
/// assert_eq!(placeholder("Unknown"), "EXPR");
/// ```
pub fn placeholder(tag: &str) -> &'static str {
    PLACEHOLDERS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, token)| *token)
        .unwrap_or("EXPR")
}
