//! 組み込みのノードタグ・エイリアス・特殊メンバ定義
//!
//! PostgreSQLのソースツリー（nodes.h / nodetags.h、pathnodes.h など）に
//! 対応する既定値。設定ファイルやタグ定義ソースのスキャンで追記される。

/// タグを持つが自身のタグ値を持たない基底型
pub const NODE_SUPERTYPES: &[&str] = &["Node", "Expr", "Plan", "Scan", "Join", "Path", "PlanState"];

/// 既知のノードタグ（`T_` プレフィックスなし）
pub const NODE_TAGS: &[&str] = &[
    // 汎用コンテナ
    "List", "IntList", "OidList", "XidList", "Bitmapset", "ExtensibleNode",
    // 値ノード
    "Integer", "Float", "Boolean", "String", "BitString", "Null",
    // primnodes.h
    "Alias", "RangeVar", "TableFunc", "IntoClause", "Var", "Const", "Param", "Aggref",
    "GroupingFunc", "WindowFunc", "WindowFuncRunCondition", "MergeSupportFunc",
    "SubscriptingRef", "ArrayRef", "FuncExpr", "NamedArgExpr", "OpExpr", "DistinctExpr",
    "NullIfExpr", "ScalarArrayOpExpr", "BoolExpr", "SubLink", "SubPlan", "AlternativeSubPlan",
    "FieldSelect", "FieldStore", "RelabelType", "CoerceViaIO", "ArrayCoerceExpr",
    "ConvertRowtypeExpr", "CollateExpr", "CaseExpr", "CaseWhen", "CaseTestExpr", "ArrayExpr",
    "RowExpr", "RowCompareExpr", "CoalesceExpr", "MinMaxExpr", "SQLValueFunction", "XmlExpr",
    "JsonFormat", "JsonReturning", "JsonValueExpr", "JsonConstructorExpr", "JsonIsPredicate",
    "JsonBehavior", "JsonExpr", "NullTest", "BooleanTest", "MergeAction", "CoerceToDomain",
    "CoerceToDomainValue", "SetToDefault", "CurrentOfExpr", "NextValueExpr", "InferenceElem",
    "TargetEntry", "RangeTblRef", "JoinExpr", "FromExpr", "OnConflictExpr",
    // parsenodes.h
    "Query", "TypeName", "ColumnRef", "ParamRef", "A_Expr", "A_Const", "TypeCast",
    "CollateClause", "RoleSpec", "FuncCall", "A_Star", "A_Indices", "A_Indirection",
    "A_ArrayExpr", "ResTarget", "MultiAssignRef", "SortBy", "WindowDef", "RangeSubselect",
    "RangeFunction", "RangeTableFunc", "RangeTableFuncCol", "RangeTableSample", "ColumnDef",
    "TableLikeClause", "IndexElem", "DefElem", "LockingClause", "XmlSerialize",
    "PartitionElem", "PartitionSpec", "PartitionBoundSpec", "PartitionRangeDatum",
    "PartitionCmd", "RangeTblEntry", "RTEPermissionInfo", "RangeTblFunction",
    "TableSampleClause", "WithCheckOption", "SortGroupClause", "GroupingSet", "WindowClause",
    "RowMarkClause", "WithClause", "InferClause", "OnConflictClause", "CTESearchClause",
    "CTECycleClause", "CommonTableExpr", "MergeWhenClause", "TriggerTransition", "RawStmt",
    "InsertStmt", "DeleteStmt", "UpdateStmt", "MergeStmt", "SelectStmt", "SetOperationStmt",
    "ReturnStmt", "PLAssignStmt", "CreateStmt", "AlterTableStmt", "AlterTableCmd",
    "IndexStmt", "ViewStmt", "ExplainStmt", "CreateTableAsStmt", "TransactionStmt",
    "VariableSetStmt", "CopyStmt", "DropStmt", "TruncateStmt", "VacuumStmt",
    // pathnodes.h
    "PlannerGlobal", "PlannerInfo", "RelOptInfo", "IndexOptInfo", "ForeignKeyOptInfo",
    "StatisticExtInfo", "JoinDomain", "EquivalenceClass", "EquivalenceMember", "PathKey",
    "GroupByOrdering", "PathTarget", "ParamPathInfo", "IndexPath", "IndexClause",
    "BitmapHeapPath", "BitmapAndPath", "BitmapOrPath", "TidPath", "TidRangePath",
    "SubqueryScanPath", "ForeignPath", "CustomPath", "AppendPath", "MergeAppendPath",
    "GroupResultPath", "MaterialPath", "MemoizePath", "UniquePath", "GatherPath",
    "GatherMergePath", "NestPath", "MergePath", "HashPath", "ProjectionPath", "ProjectSetPath",
    "SortPath", "IncrementalSortPath", "GroupPath", "UpperUniquePath", "AggPath",
    "GroupingSetsPath", "MinMaxAggPath", "WindowAggPath", "SetOpPath", "RecursiveUnionPath",
    "LockRowsPath", "ModifyTablePath", "LimitPath", "RestrictInfo", "PlaceHolderVar",
    "SpecialJoinInfo", "OuterJoinClauseInfo", "AppendRelInfo", "RowIdentityVarInfo",
    "PlaceHolderInfo", "MinMaxAggInfo", "PlannerParamItem", "AggInfo", "AggTransInfo",
    // plannodes.h
    "PlannedStmt", "Result", "ProjectSet", "ModifyTable", "Append", "MergeAppend",
    "RecursiveUnion", "BitmapAnd", "BitmapOr", "SeqScan", "SampleScan", "IndexScan",
    "IndexOnlyScan", "BitmapIndexScan", "BitmapHeapScan", "TidScan", "TidRangeScan",
    "SubqueryScan", "FunctionScan", "ValuesScan", "TableFuncScan", "CteScan",
    "NamedTuplestoreScan", "WorkTableScan", "ForeignScan", "CustomScan", "NestLoop",
    "NestLoopParam", "MergeJoin", "HashJoin", "Material", "Memoize", "Sort", "IncrementalSort",
    "Group", "Agg", "WindowAgg", "Unique", "Gather", "GatherMerge", "Hash", "SetOp",
    "LockRows", "Limit", "PlanRowMark", "PartitionPruneInfo", "PartitionedRelPruneInfo",
    "PartitionPruneStepOp", "PartitionPruneStepCombine", "PlanInvalItem",
    // execnodes.h
    "IndexInfo", "ExprContext", "ProjectionInfo", "JunkFilter", "OnConflictSetState",
    "MergeActionState", "ResultRelInfo", "EState", "TupleTableSlot", "ExprState",
    "ResultState", "ProjectSetState", "ModifyTableState", "AppendState", "MergeAppendState",
    "RecursiveUnionState", "BitmapAndState", "BitmapOrState", "SeqScanState",
    "SampleScanState", "IndexScanState", "IndexOnlyScanState", "BitmapIndexScanState",
    "BitmapHeapScanState", "TidScanState", "SubqueryScanState", "FunctionScanState",
    "ValuesScanState", "CteScanState", "WorkTableScanState", "ForeignScanState",
    "CustomScanState", "NestLoopState", "MergeJoinState", "HashJoinState", "MaterialState",
    "MemoizeState", "SortState", "GroupState", "AggState", "WindowAggState", "UniqueState",
    "GatherState", "GatherMergeState", "HashState", "SetOpState", "LockRowsState",
    "LimitState", "SubPlanState", "DomainConstraintState",
    // その他
    "AllocSetContext", "SlabContext", "GenerationContext", "BumpContext", "TIDBitmap",
    "TriggerData", "EventTriggerData", "ReturnSetInfo", "WindowObjectData", "CallContext",
];

/// 式として文字列表現を表示できるタグ
pub const EXPR_TAGS: &[&str] = &[
    "Var", "Const", "Param", "Aggref", "GroupingFunc", "WindowFunc", "SubscriptingRef",
    "ArrayRef", "FuncExpr", "NamedArgExpr", "OpExpr", "DistinctExpr", "NullIfExpr",
    "ScalarArrayOpExpr", "BoolExpr", "SubLink", "SubPlan", "AlternativeSubPlan", "FieldSelect",
    "FieldStore", "RelabelType", "CoerceViaIO", "ArrayCoerceExpr", "ConvertRowtypeExpr",
    "CollateExpr", "CaseExpr", "CaseWhen", "CaseTestExpr", "ArrayExpr", "RowExpr",
    "RowCompareExpr", "CoalesceExpr", "MinMaxExpr", "SQLValueFunction", "XmlExpr", "NullTest",
    "BooleanTest", "CoerceToDomain", "CoerceToDomainValue", "SetToDefault", "CurrentOfExpr",
    "NextValueExpr", "InferenceElem", "TargetEntry", "PlaceHolderVar", "JsonValueExpr",
    "MergeSupportFunc", "WindowFuncRunCondition", "RestrictInfo", "EquivalenceMember",
];

/// 既定の型エイリアス（エイリアス名, 実際の型）
pub const ALIASES: &[(&str, &str)] = &[
    ("Relids", "Bitmapset *"),
    ("PartitionScheme", "PartitionSchemeData *"),
    ("TupleDesc", "TupleDescData *"),
];

/// 既定の可変長配列メンバ（コンテナ型, メンバ, 長さ式）
pub const ARRAY_MEMBERS: &[(&str, &str, &str)] = &[
    ("PlannerInfo", "simple_rel_array", "simple_rel_array_size"),
    ("PlannerInfo", "simple_rte_array", "simple_rel_array_size"),
    ("PlannerInfo", "append_rel_array", "simple_rel_array_size"),
    ("PlannerInfo", "placeholder_array", "placeholder_array_size"),
    ("RelOptInfo", "part_rels", "nparts"),
    ("RelOptInfo", "partexprs", "part_scheme->partnatts"),
    ("RelOptInfo", "nullable_partexprs", "part_scheme->partnatts"),
    ("RelOptInfo", "attr_needed", "{}->max_attr - {}->min_attr + 1"),
    ("RelOptInfo", "attr_widths", "{}->max_attr - {}->min_attr + 1"),
    ("PartitionSchemeData", "partopfamily", "partnatts"),
    ("PartitionSchemeData", "partopcintype", "partnatts"),
    ("PartitionSchemeData", "partcollation", "partnatts"),
    ("PartitionSchemeData", "parttyplen", "partnatts"),
    ("PartitionSchemeData", "parttypbyval", "partnatts"),
    ("PartitionSchemeData", "partsupfunc", "partnatts"),
    ("PathTarget", "sortgrouprefs", "exprs->length"),
    ("IndexOptInfo", "indexkeys", "ncolumns"),
    ("IndexOptInfo", "canreturn", "ncolumns"),
    ("IndexOptInfo", "indexcollations", "nkeycolumns"),
    ("IndexOptInfo", "opfamily", "nkeycolumns"),
    ("IndexOptInfo", "opcintype", "nkeycolumns"),
    ("IndexOptInfo", "sortopfamily", "nkeycolumns"),
    ("IndexOptInfo", "reverse_sort", "nkeycolumns"),
    ("IndexOptInfo", "nulls_first", "nkeycolumns"),
    ("ForeignKeyOptInfo", "conkey", "nkeys"),
    ("ForeignKeyOptInfo", "confkey", "nkeys"),
    ("ForeignKeyOptInfo", "conpfeqop", "nkeys"),
    ("IndexInfo", "ii_IndexAttrNumbers", "ii_NumIndexAttrs"),
    ("TupleDescData", "attrs", "natts"),
    ("EState", "es_relations", "es_range_table_size"),
    ("EState", "es_rowmarks", "es_range_table_size"),
    ("ExprState", "steps", "steps_len"),
    ("AppendState", "appendplans", "as_nplans"),
    ("MergeAppendState", "mergeplans", "ms_nplans"),
    ("BitmapAndState", "bitmapplans", "nplans"),
    ("BitmapOrState", "bitmapplans", "nplans"),
    ("Sort", "sortColIdx", "numCols"),
    ("Sort", "sortOperators", "numCols"),
    ("Sort", "collations", "numCols"),
    ("Sort", "nullsFirst", "numCols"),
    ("MergeAppend", "sortColIdx", "numCols"),
    ("MergeAppend", "sortOperators", "numCols"),
    ("MergeAppend", "collations", "numCols"),
    ("MergeAppend", "nullsFirst", "numCols"),
    ("Agg", "grpColIdx", "numCols"),
    ("Agg", "grpOperators", "numCols"),
    ("Agg", "grpCollations", "numCols"),
    ("Group", "grpColIdx", "numCols"),
    ("Group", "grpOperators", "numCols"),
    ("Group", "grpCollations", "numCols"),
    ("Unique", "uniqColIdx", "numCols"),
    ("Unique", "uniqOperators", "numCols"),
    ("Unique", "uniqCollations", "numCols"),
    ("SetOp", "dupColIdx", "numCols"),
    ("SetOp", "dupOperators", "numCols"),
    ("RecursiveUnion", "dupColIdx", "numCols"),
    ("RecursiveUnion", "dupOperators", "numCols"),
    ("WindowAgg", "partColIdx", "partNumCols"),
    ("WindowAgg", "partOperators", "partNumCols"),
    ("WindowAgg", "ordColIdx", "ordNumCols"),
    ("WindowAgg", "ordOperators", "ordNumCols"),
];

/// 既定のList要素型（構造体, メンバ, 要素型）
pub const LIST_MEMBERS: &[(&str, &str, &str)] = &[
    ("PlannerInfo", "eq_classes", "EquivalenceClass *"),
    ("PlannerInfo", "join_rel_list", "RelOptInfo *"),
    ("PlannerInfo", "join_info_list", "SpecialJoinInfo *"),
    ("PlannerInfo", "append_rel_list", "AppendRelInfo *"),
    ("PlannerInfo", "placeholder_list", "PlaceHolderInfo *"),
    ("PlannerInfo", "fkey_list", "ForeignKeyOptInfo *"),
    ("PlannerInfo", "query_pathkeys", "PathKey *"),
    ("PlannerInfo", "group_pathkeys", "PathKey *"),
    ("PlannerInfo", "window_pathkeys", "PathKey *"),
    ("PlannerInfo", "distinct_pathkeys", "PathKey *"),
    ("PlannerInfo", "sort_pathkeys", "PathKey *"),
    ("PlannerInfo", "initial_rels", "RelOptInfo *"),
    ("PlannerInfo", "minmax_aggs", "MinMaxAggInfo *"),
    ("PlannerInfo", "rowMarks", "PlanRowMark *"),
    ("PlannerInfo", "processed_tlist", "TargetEntry *"),
    ("PlannerInfo", "plan_params", "PlannerParamItem *"),
    ("PlannerInfo", "agginfos", "AggInfo *"),
    ("PlannerInfo", "aggtransinfos", "AggTransInfo *"),
    ("PlannerGlobal", "subplans", "Plan *"),
    ("PlannerGlobal", "subroots", "PlannerInfo *"),
    ("PlannerGlobal", "finalrtable", "RangeTblEntry *"),
    ("PlannerGlobal", "finalrowmarks", "PlanRowMark *"),
    ("RelOptInfo", "pathlist", "Path *"),
    ("RelOptInfo", "partial_pathlist", "Path *"),
    ("RelOptInfo", "cheapest_parameterized_paths", "Path *"),
    ("RelOptInfo", "baserestrictinfo", "RestrictInfo *"),
    ("RelOptInfo", "joininfo", "RestrictInfo *"),
    ("RelOptInfo", "indexlist", "IndexOptInfo *"),
    ("RelOptInfo", "statlist", "StatisticExtInfo *"),
    ("EquivalenceClass", "ec_members", "EquivalenceMember *"),
    ("EquivalenceClass", "ec_sources", "RestrictInfo *"),
    ("EquivalenceClass", "ec_derives", "RestrictInfo *"),
    ("IndexOptInfo", "indrestrictinfo", "RestrictInfo *"),
    ("IndexOptInfo", "indextlist", "TargetEntry *"),
    ("IndexPath", "indexclauses", "IndexClause *"),
    ("IndexClause", "indexquals", "RestrictInfo *"),
    ("AppendPath", "subpaths", "Path *"),
    ("MergeAppendPath", "subpaths", "Path *"),
    ("NestPath", "joinrestrictinfo", "RestrictInfo *"),
    ("MergePath", "joinrestrictinfo", "RestrictInfo *"),
    ("MergePath", "path_mergeclauses", "RestrictInfo *"),
    ("HashPath", "joinrestrictinfo", "RestrictInfo *"),
    ("HashPath", "path_hashclauses", "RestrictInfo *"),
    ("Query", "rtable", "RangeTblEntry *"),
    ("Query", "rteperminfos", "RTEPermissionInfo *"),
    ("Query", "targetList", "TargetEntry *"),
    ("Query", "returningList", "TargetEntry *"),
    ("Query", "groupClause", "SortGroupClause *"),
    ("Query", "sortClause", "SortGroupClause *"),
    ("Query", "distinctClause", "SortGroupClause *"),
    ("Query", "rowMarks", "RowMarkClause *"),
    ("Query", "cteList", "CommonTableExpr *"),
    ("Query", "windowClause", "WindowClause *"),
    ("PlannedStmt", "rtable", "RangeTblEntry *"),
    ("PlannedStmt", "permInfos", "RTEPermissionInfo *"),
    ("PlannedStmt", "subplans", "Plan *"),
    ("PlannedStmt", "rowMarks", "PlanRowMark *"),
    ("Plan", "targetlist", "TargetEntry *"),
    ("Plan", "initPlan", "SubPlan *"),
    ("Append", "appendplans", "Plan *"),
    ("MergeAppend", "mergeplans", "Plan *"),
    ("BitmapAnd", "bitmapplans", "Plan *"),
    ("BitmapOr", "bitmapplans", "Plan *"),
    ("RangeTblEntry", "functions", "RangeTblFunction *"),
    ("EState", "es_range_table", "RangeTblEntry *"),
    ("EState", "es_tupleTable", "TupleTableSlot *"),
    ("EState", "es_opened_result_relations", "ResultRelInfo *"),
    ("PlanState", "subPlan", "SubPlanState *"),
    ("SelectStmt", "targetList", "ResTarget *"),
    ("CreateStmt", "tableElts", "ColumnDef *"),
];

/// 既定のList要素型（関数, ローカル変数, 要素型）
pub const LIST_VARIABLES: &[(&str, &str, &str)] = &[
    ("standard_join_search", "initial_rels", "RelOptInfo *"),
    ("add_paths_to_append_rel", "live_childrels", "RelOptInfo *"),
    ("generate_partitionwise_join_paths", "live_children", "RelOptInfo *"),
    ("create_index_paths", "bitindexpaths", "Path *"),
    ("create_index_paths", "bitjoinpaths", "Path *"),
    ("choose_bitmap_and", "paths", "Path *"),
];

/// Bitmapset要素が `PlannerInfo` の配列を指すメンバ（コンテナ型, メンバ）
pub const RELIDS_MEMBERS: &[(&str, &str)] = &[
    ("RelOptInfo", "relids"),
    ("RelOptInfo", "lateral_relids"),
    ("RelOptInfo", "lateral_referencers"),
    ("RelOptInfo", "direct_lateral_relids"),
    ("RelOptInfo", "nulling_relids"),
    ("RelOptInfo", "top_parent_relids"),
    ("RelOptInfo", "all_partrels"),
    ("RestrictInfo", "clause_relids"),
    ("RestrictInfo", "required_relids"),
    ("RestrictInfo", "outer_relids"),
    ("RestrictInfo", "left_relids"),
    ("RestrictInfo", "right_relids"),
    ("RestrictInfo", "incompatible_relids"),
    ("EquivalenceClass", "ec_relids"),
    ("EquivalenceMember", "em_relids"),
    ("PlaceHolderInfo", "ph_eval_at"),
    ("PlaceHolderInfo", "ph_lateral"),
    ("PlaceHolderInfo", "ph_needed"),
    ("SpecialJoinInfo", "min_lefthand"),
    ("SpecialJoinInfo", "min_righthand"),
    ("SpecialJoinInfo", "syn_lefthand"),
    ("SpecialJoinInfo", "syn_righthand"),
    ("ParamPathInfo", "ppi_req_outer"),
    ("Var", "varnullingrels"),
];

/// `PlannerInfo` 自身が持つrelids（アンカーは自分自身）
pub const PLANNER_RELIDS_MEMBERS: &[&str] = &[
    "all_baserels",
    "outer_join_rels",
    "all_query_rels",
    "all_result_relids",
    "leaf_result_relids",
];

/// relidsが指す `PlannerInfo` 内の配列
pub const RELIDS_TARGETS: &[&str] = &["simple_rel_array", "simple_rte_array"];
