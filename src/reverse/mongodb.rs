//! MongoDB reverse translation.
//!
//! Commands arrive as JSON documents (`{"find": "users", "filter": {...}}`).
//! The translator walks the `serde_json` tree, dispatching on the first key
//! that names a known command. Every object walk iterates keys in sorted
//! order so the emitted IR is identical no matter how the source map was
//! built.

use serde_json::{Map, Value};

use crate::error::{TranslateError, TranslateResult};
use crate::maps::{operation_for_keyword, Dialect};
use crate::naming::{entity_to_table, table_to_entity};
use crate::oql::{
    self, binary, field, function, literal, normalize_logic, null_literal, AggregateSpec, CaseArm,
    Condition, Expression, Field, IndexDef, Join, JoinType, Logic, Operation, Operator, OrderBy,
    PermissionSpec, Query, SelectColumn, SetOp, SetOperation, WindowFunction, WindowOrder,
};

/// Lift a MongoDB command document into OQL.
pub fn to_query(source: &str) -> TranslateResult<Query> {
    let value: Value = serde_json::from_str(source)
        .map_err(|e| TranslateError::ParseError(format!("invalid command JSON: {}", e)))?;
    let Value::Object(command) = value else {
        return Err(TranslateError::ParseError(
            "command must be a JSON object".into(),
        ));
    };

    let (name, target) = command_key(&command)?;
    lift_command(&name, target, &command)
}

/// Find the command key: the first key (in sorted order) that names a known
/// command.
fn command_key(command: &Map<String, Value>) -> TranslateResult<(String, &Value)> {
    for (key, value) in sorted_entries(command) {
        if operation_for_keyword(Dialect::MongoDb, key).is_some() || key == "use" {
            return Ok((key.clone(), value));
        }
    }
    Err(TranslateError::NotSupported(
        "no known command key in document".into(),
    ))
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Null => oql::NULL_SENTINEL.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// `"$field"` references become identifiers, everything else a literal.
fn expr_from_value(value: &Value) -> Expression {
    match value {
        Value::String(s) if s.starts_with('$') => field(s.trim_start_matches('$')),
        other => literal(scalar_text(other)),
    }
}

fn collection_name(value: &Value) -> TranslateResult<&str> {
    value.as_str().ok_or_else(|| {
        TranslateError::ParseError("command target must be a collection name".into())
    })
}

fn entity_of(value: &Value) -> TranslateResult<String> {
    Ok(table_to_entity(collection_name(value)?))
}

// =============================================================================
// Command dispatch
// =============================================================================

fn lift_command(
    name: &str,
    target: &Value,
    command: &Map<String, Value>,
) -> TranslateResult<Query> {
    match name {
        "find" | "findOne" => lift_find(target, command, name == "findOne"),
        "distinct" => lift_distinct(target, command),
        "insertOne" | "insert" => lift_insert_one(target, command),
        "insertMany" => lift_insert_many(target, command),
        "updateOne" | "updateMany" => lift_update(target, command, name == "updateOne"),
        "replaceOne" => lift_replace(target, command),
        "deleteOne" | "deleteMany" => lift_delete(target, command, name == "deleteMany"),
        "count" | "countDocuments" => lift_count(target, command),
        "aggregate" => lift_aggregate(target, command),

        "create" => Ok(Query::new(Operation::CreateTable, entity_of(target)?)),
        "drop" => Ok(Query::new(Operation::DropTable, entity_of(target)?)),
        "collMod" => lift_coll_mod(target, command),
        "renameCollection" => lift_rename(target, command),
        "createIndexes" => lift_create_indexes(target, command),
        "dropIndexes" => lift_drop_indexes(target, command),
        "createView" => lift_create_view(target, command),
        "dropView" => Ok(Query::new(Operation::DropView, entity_of(target)?)),
        "use" => {
            let mut q = Query::bare(Operation::Use);
            q.database = Some(collection_name(target)?.to_string());
            Ok(q)
        }
        "dropDatabase" => Ok(Query::bare(Operation::DropDatabase)),

        "startTransaction" => Ok(Query::bare(Operation::Begin)),
        "commitTransaction" => Ok(Query::bare(Operation::Commit)),
        "abortTransaction" => Ok(Query::bare(Operation::Rollback)),

        "createUser" => lift_principal(Operation::CreateUser, target, command),
        "updateUser" => lift_principal(Operation::AlterUser, target, command),
        "dropUser" => lift_principal(Operation::DropUser, target, command),
        "createRole" => lift_principal(Operation::CreateRole, target, command),
        "dropRole" => lift_principal(Operation::DropRole, target, command),
        "grantRolesToUser" => lift_role_grant(Operation::Grant, target, command),
        "revokeRolesFromUser" => lift_role_grant(Operation::Revoke, target, command),
        "grantPrivilegesToRole" => lift_privilege_grant(Operation::Grant, target, command),
        "revokePrivilegesFromRole" => lift_privilege_grant(Operation::Revoke, target, command),

        other => Err(TranslateError::NotSupported(format!(
            "command has no OQL mapping: {}",
            other
        ))),
    }
}

// =============================================================================
// CRUD
// =============================================================================

fn lift_find(target: &Value, command: &Map<String, Value>, single: bool) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::Get, entity_of(target)?);

    if let Some(Value::Object(filter)) = command.get("filter") {
        q.conditions = lift_filter(filter).map_err(|e| e.in_clause("filter"))?;
        normalize_logic(&mut q.conditions);
    }
    if let Some(Value::Object(projection)) = command.get("projection") {
        lift_projection(projection, &mut q);
    }
    if let Some(Value::Object(sort)) = command.get("sort") {
        lift_sort(sort, &mut q);
    }
    if let Some(limit) = command.get("limit").and_then(Value::as_u64) {
        q.limit = Some(limit);
    }
    if let Some(skip) = command.get("skip").and_then(Value::as_u64) {
        q.offset = Some(skip);
    }
    if single {
        q.limit = Some(1);
    }
    Ok(q)
}

fn lift_distinct(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::Get, entity_of(target)?);
    q.distinct = true;
    if let Some(Value::String(key)) = command.get("key") {
        q.columns.push(key.clone());
    }
    if let Some(Value::Object(filter)) = command.get("filter") {
        q.conditions = lift_filter(filter).map_err(|e| e.in_clause("filter"))?;
        normalize_logic(&mut q.conditions);
    }
    Ok(q)
}

fn document_fields(document: &Map<String, Value>) -> Vec<Field> {
    sorted_entries(document)
        .into_iter()
        .map(|(key, value)| Field::new(field(key.clone()), Some(expr_from_value(value))))
        .collect()
}

fn lift_insert_one(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let Some(Value::Object(document)) = command.get("document") else {
        return Err(TranslateError::ParseError(
            "insertOne requires a document".into(),
        ));
    };
    let mut q = Query::new(Operation::Create, entity_of(target)?);
    q.fields = document_fields(document);
    Ok(q)
}

fn lift_insert_many(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let Some(Value::Array(documents)) = command.get("documents") else {
        return Err(TranslateError::ParseError(
            "insertMany requires documents".into(),
        ));
    };
    let mut q = Query::new(Operation::BulkInsert, entity_of(target)?);
    for document in documents {
        let Value::Object(document) = document else {
            return Err(TranslateError::ParseError(
                "insertMany documents must be objects".into(),
            ));
        };
        q.bulk_rows.push(document_fields(document));
    }
    if q.bulk_rows.is_empty() {
        return Err(TranslateError::ParseError(
            "insertMany requires documents".into(),
        ));
    }
    Ok(q)
}

fn lift_update(
    target: &Value,
    command: &Map<String, Value>,
    single: bool,
) -> TranslateResult<Query> {
    let upsert = single && command.get("upsert").and_then(Value::as_bool) == Some(true);
    let operation = if upsert {
        Operation::Upsert
    } else {
        Operation::Update
    };
    let mut q = Query::new(operation, entity_of(target)?);

    if let Some(Value::Object(filter)) = command.get("filter") {
        q.conditions = lift_filter(filter).map_err(|e| e.in_clause("filter"))?;
        normalize_logic(&mut q.conditions);
    }
    let Some(Value::Object(update)) = command.get("update") else {
        return Err(TranslateError::ParseError(
            "update requires an update document".into(),
        ));
    };
    q.fields = lift_update_document(update).map_err(|e| e.in_clause("update"))?;

    if upsert {
        // Filter equality fields become the conflict target and join the
        // inserted row, since the filter names the row being upserted.
        let mut conflict_fields = Vec::new();
        let mut key_fields = Vec::new();
        for cond in &q.conditions {
            if cond.operator != Operator::Eq {
                continue;
            }
            let Some(name) = cond.field.leaf_value() else {
                continue;
            };
            conflict_fields.push(name.to_string());
            if q.fields.iter().all(|f| f.name_text() != name) {
                key_fields.push(Field::new(field(name), cond.value.clone()));
            }
        }
        q.upsert = Some(oql::UpsertClause {
            conflict_fields,
            update_fields: q.fields.clone(),
        });
        key_fields.extend(q.fields.drain(..));
        q.fields = key_fields;
    }
    Ok(q)
}

fn lift_replace(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::Replace, entity_of(target)?);
    if let Some(Value::Object(filter)) = command.get("filter") {
        q.conditions = lift_filter(filter).map_err(|e| e.in_clause("filter"))?;
        normalize_logic(&mut q.conditions);
    }
    let Some(Value::Object(replacement)) = command.get("replacement") else {
        return Err(TranslateError::ParseError(
            "replaceOne requires a replacement document".into(),
        ));
    };
    q.fields = document_fields(replacement);
    Ok(q)
}

fn lift_delete(
    target: &Value,
    command: &Map<String, Value>,
    many: bool,
) -> TranslateResult<Query> {
    let filter = match command.get("filter") {
        Some(Value::Object(filter)) => Some(filter),
        _ => None,
    };
    let empty = filter.map(|f| f.is_empty()).unwrap_or(true);

    // deleteMany with an empty filter empties the collection.
    if many && empty {
        return Ok(Query::new(Operation::TruncateTable, entity_of(target)?));
    }

    let mut q = Query::new(Operation::Delete, entity_of(target)?);
    if let Some(filter) = filter {
        q.conditions = lift_filter(filter).map_err(|e| e.in_clause("filter"))?;
        normalize_logic(&mut q.conditions);
    }
    Ok(q)
}

fn lift_count(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::Count, entity_of(target)?);
    q.aggregate = Some(AggregateSpec::over("*"));
    let filter = command.get("query").or_else(|| command.get("filter"));
    if let Some(Value::Object(filter)) = filter {
        q.conditions = lift_filter(filter).map_err(|e| e.in_clause("filter"))?;
        normalize_logic(&mut q.conditions);
    }
    Ok(q)
}

// =============================================================================
// Filters
// =============================================================================

fn lift_filter(filter: &Map<String, Value>) -> TranslateResult<Vec<Condition>> {
    let mut conditions = Vec::new();
    for (key, value) in sorted_entries(filter) {
        match key.as_str() {
            "$and" | "$or" | "$nor" => {
                let Value::Array(elements) = value else {
                    return Err(TranslateError::ParseError(format!(
                        "{} requires an array",
                        key
                    )));
                };
                let logic = if key == "$or" { Logic::Or } else { Logic::And };
                for element in elements {
                    let Value::Object(element) = element else {
                        return Err(TranslateError::ParseError(format!(
                            "{} elements must be objects",
                            key
                        )));
                    };
                    let mut inner = lift_filter(element)?;
                    if key == "$nor" {
                        for cond in &mut inner {
                            cond.operator = cond.operator.negate();
                        }
                    }
                    normalize_logic(&mut inner);
                    let mut cond = if inner.len() == 1 {
                        inner.remove(0)
                    } else {
                        Condition::group(inner)
                    };
                    cond.logic = logic;
                    conditions.push(cond);
                }
            }
            "$elemMatch" => {
                return Err(TranslateError::NotSupported(
                    "$elemMatch has no canonical operator".into(),
                ))
            }
            _ => match value {
                Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                    conditions.extend(lift_field_operators(key, ops)?);
                }
                other => {
                    conditions.push(Condition::new(
                        field(key.clone()),
                        Operator::Eq,
                        Some(literal(scalar_text(other))),
                    ));
                }
            },
        }
    }
    Ok(conditions)
}

fn lift_field_operators(
    name: &str,
    ops: &Map<String, Value>,
) -> TranslateResult<Vec<Condition>> {
    let mut conditions = Vec::new();

    // Joint bounds collapse into ranges before the per-operator walk.
    let gte = ops.get("$gte");
    let lte = ops.get("$lte");
    let gt = ops.get("$gt");
    let lt = ops.get("$lt");
    let mut consumed_range = false;
    if let (Some(low), Some(high)) = (gte, lte) {
        conditions.push(Condition::between(
            field(name),
            Operator::Between,
            literal(scalar_text(low)),
            literal(scalar_text(high)),
        ));
        consumed_range = true;
    } else if let (Some(low), Some(high)) = (lt, gt) {
        // x < low OR x > high is the complement of a range.
        conditions.push(Condition::between(
            field(name),
            Operator::NotBetween,
            literal(scalar_text(low)),
            literal(scalar_text(high)),
        ));
        consumed_range = true;
    }

    for (op_key, op_value) in sorted_entries(ops) {
        if consumed_range && matches!(op_key.as_str(), "$gte" | "$lte" | "$gt" | "$lt") {
            continue;
        }
        match op_key.as_str() {
            "$eq" => conditions.push(Condition::new(
                field(name),
                Operator::Eq,
                Some(literal(scalar_text(op_value))),
            )),
            "$ne" => conditions.push(Condition::new(
                field(name),
                Operator::Ne,
                Some(literal(scalar_text(op_value))),
            )),
            "$gt" => conditions.push(Condition::new(
                field(name),
                Operator::Gt,
                Some(literal(scalar_text(op_value))),
            )),
            "$gte" => conditions.push(Condition::new(
                field(name),
                Operator::Gte,
                Some(literal(scalar_text(op_value))),
            )),
            "$lt" => conditions.push(Condition::new(
                field(name),
                Operator::Lt,
                Some(literal(scalar_text(op_value))),
            )),
            "$lte" => conditions.push(Condition::new(
                field(name),
                Operator::Lte,
                Some(literal(scalar_text(op_value))),
            )),
            "$in" | "$nin" => {
                let Value::Array(items) = op_value else {
                    return Err(TranslateError::ParseError(format!(
                        "{} requires an array",
                        op_key
                    )));
                };
                let values = items.iter().map(|v| literal(scalar_text(v))).collect();
                let op = if op_key == "$in" {
                    Operator::In
                } else {
                    Operator::NotIn
                };
                conditions.push(Condition::in_list(field(name), op, values));
            }
            "$regex" => {
                let pattern = regex_to_like(&scalar_text(op_value));
                let case_insensitive = ops
                    .get("$options")
                    .and_then(Value::as_str)
                    .map(|o| o.contains('i'))
                    .unwrap_or(false);
                let op = if case_insensitive {
                    Operator::ILike
                } else {
                    Operator::Like
                };
                conditions.push(Condition::new(field(name), op, Some(literal(pattern))));
            }
            "$options" => {}
            "$exists" => {
                let op = if op_value.as_bool() == Some(true) {
                    Operator::IsNotNull
                } else {
                    Operator::IsNull
                };
                conditions.push(Condition::new(field(name), op, None));
            }
            "$not" => {
                let Value::Object(inner) = op_value else {
                    return Err(TranslateError::ParseError("$not requires an object".into()));
                };
                let mut negated = lift_field_operators(name, inner)?;
                if let Some(first) = negated.first_mut() {
                    first.operator = first.operator.negate();
                }
                conditions.append(&mut negated);
            }
            "$elemMatch" => {
                return Err(TranslateError::NotSupported(
                    "$elemMatch has no canonical operator".into(),
                ))
            }
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "filter operator has no OQL mapping: {}",
                    other
                )))
            }
        }
    }
    Ok(conditions)
}

/// Regexes become LIKE patterns: a leading `^` and trailing `$` drop, `.*`
/// becomes `%`; a literal `.` is kept as-is.
fn regex_to_like(pattern: &str) -> String {
    let mut out = pattern.to_string();
    if out.starts_with('^') {
        out.remove(0);
    }
    if out.ends_with('$') {
        out.pop();
    }
    out.replace(".*", "%")
}

// =============================================================================
// Update documents
// =============================================================================

fn lift_update_document(update: &Map<String, Value>) -> TranslateResult<Vec<Field>> {
    let mut fields = Vec::new();
    for (key, value) in sorted_entries(update) {
        match key.as_str() {
            "$set" => {
                for (name, v) in sorted_object(value, "$set")? {
                    fields.push(Field::new(field(name.clone()), Some(expr_from_value(v))));
                }
            }
            "$unset" => {
                for (name, _) in sorted_object(value, "$unset")? {
                    fields.push(Field::new(field(name.clone()), Some(null_literal())));
                }
            }
            "$inc" => {
                for (name, v) in sorted_object(value, "$inc")? {
                    fields.push(Field::new(
                        field(name.clone()),
                        Some(binary(field(name.clone()), "+", literal(scalar_text(v)))),
                    ));
                }
            }
            "$mul" => {
                for (name, v) in sorted_object(value, "$mul")? {
                    fields.push(Field::new(
                        field(name.clone()),
                        Some(binary(field(name.clone()), "*", literal(scalar_text(v)))),
                    ));
                }
            }
            "$min" | "$max" => {
                let func_name = if key == "$min" { "MIN" } else { "MAX" };
                for (name, v) in sorted_object(value, key)? {
                    fields.push(Field::new(
                        field(name.clone()),
                        Some(function(
                            func_name,
                            vec![field(name.clone()), literal(scalar_text(v))],
                        )),
                    ));
                }
            }
            "$rename" => {
                for (name, v) in sorted_object(value, "$rename")? {
                    fields.push(
                        Field::new(field(name.clone()), Some(field(scalar_text(v))))
                            .with_constraint(crate::oql::Constraint::Rename),
                    );
                }
            }
            "$push" | "$pull" | "$addToSet" | "$pop" => {
                let func_name = match key.as_str() {
                    "$push" => "ARRAY_APPEND",
                    "$pull" => "ARRAY_REMOVE",
                    "$addToSet" => "ARRAY_ADD_UNIQUE",
                    _ => "ARRAY_POP",
                };
                for (name, v) in sorted_object(value, key)? {
                    fields.push(Field::new(
                        field(name.clone()),
                        Some(function(
                            func_name,
                            vec![field(name.clone()), literal(scalar_text(v))],
                        )),
                    ));
                }
            }
            other if other.starts_with('$') => {
                return Err(TranslateError::NotSupported(format!(
                    "update operator has no OQL mapping: {}",
                    other
                )))
            }
            // A bare field in an update document is a plain assignment.
            _ => fields.push(Field::new(field(key.clone()), Some(expr_from_value(value)))),
        }
    }
    Ok(fields)
}

fn sorted_object<'a>(
    value: &'a Value,
    context: &str,
) -> TranslateResult<Vec<(&'a String, &'a Value)>> {
    match value {
        Value::Object(map) => Ok(sorted_entries(map)),
        _ => Err(TranslateError::ParseError(format!(
            "{} requires an object",
            context
        ))),
    }
}

// =============================================================================
// Aggregation pipeline
// =============================================================================

fn lift_aggregate(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let entity = entity_of(target)?;
    let mut q = Query::new(Operation::Get, entity.clone());

    let Some(Value::Array(pipeline)) = command.get("pipeline") else {
        return Err(TranslateError::ParseError(
            "aggregate requires a pipeline".into(),
        ));
    };

    // $match before a $group filters rows; after it, groups.
    let mut has_group = false;

    for stage in pipeline {
        let Value::Object(stage) = stage else {
            return Err(TranslateError::ParseError(
                "pipeline stages must be objects".into(),
            ));
        };
        let Some((stage_name, stage_value)) = sorted_entries(stage).into_iter().next() else {
            continue;
        };

        match stage_name.as_str() {
            "$match" => {
                let Value::Object(filter) = stage_value else {
                    return Err(TranslateError::ParseError("$match requires an object".into()));
                };
                let mut conds = lift_filter(filter).map_err(|e| e.in_clause("$match"))?;
                normalize_logic(&mut conds);
                if has_group {
                    q.having.extend(conds);
                    normalize_logic(&mut q.having);
                } else {
                    q.conditions.extend(conds);
                    normalize_logic(&mut q.conditions);
                }
            }
            "$group" => {
                lift_group(stage_value, &mut q)?;
                has_group = true;
            }
            "$project" => {
                let Value::Object(projection) = stage_value else {
                    return Err(TranslateError::ParseError(
                        "$project requires an object".into(),
                    ));
                };
                lift_projection(projection, &mut q);
            }
            "$sort" => {
                let Value::Object(sort) = stage_value else {
                    return Err(TranslateError::ParseError("$sort requires an object".into()));
                };
                lift_sort(sort, &mut q);
            }
            "$limit" => q.limit = stage_value.as_u64(),
            "$skip" => q.offset = stage_value.as_u64(),
            "$lookup" => lift_lookup(stage_value, &entity, &mut q)?,
            "$count" => {
                q.operation = Operation::Count;
                q.aggregate = Some(AggregateSpec {
                    field: "*".into(),
                    alias: stage_value.as_str().map(str::to_string),
                    distinct: false,
                });
            }
            "$setWindowFields" => lift_window_fields(stage_value, &mut q)?,
            "$unionWith" => {
                let right_entity = match stage_value {
                    Value::String(coll) => table_to_entity(coll),
                    Value::Object(spec) => spec
                        .get("coll")
                        .and_then(Value::as_str)
                        .map(table_to_entity)
                        .ok_or_else(|| {
                            TranslateError::ParseError("$unionWith requires coll".into())
                        })?,
                    _ => {
                        return Err(TranslateError::ParseError(
                            "$unionWith requires a collection".into(),
                        ))
                    }
                };
                let left = std::mem::replace(&mut q, Query::new(Operation::Get, entity.clone()));
                q.set_operation = Some(SetOperation {
                    op: SetOp::Union,
                    left: Box::new(left),
                    right: Box::new(Query::new(Operation::Get, right_entity)),
                });
            }
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "pipeline stage has no OQL mapping: {}",
                    other
                )))
            }
        }
    }

    Ok(q)
}

fn lift_group(stage_value: &Value, q: &mut Query) -> TranslateResult<()> {
    let Value::Object(group) = stage_value else {
        return Err(TranslateError::ParseError("$group requires an object".into()));
    };

    match group.get("_id") {
        Some(Value::String(id)) if id.starts_with('$') => {
            q.group_by.push(field(id.trim_start_matches('$')));
        }
        Some(Value::Object(id_fields)) => {
            for (_, v) in sorted_entries(id_fields) {
                if let Value::String(name) = v {
                    q.group_by.push(field(name.trim_start_matches('$')));
                }
            }
        }
        _ => {}
    }

    for (key, value) in sorted_entries(group) {
        if key == "_id" {
            continue;
        }
        let Value::Object(accumulator) = value else {
            continue;
        };
        let Some((acc_name, acc_value)) = sorted_entries(accumulator).into_iter().next() else {
            continue;
        };

        let (operation, agg_field) = match acc_name.as_str() {
            // $sum: 1 is how MongoDB spells COUNT(*).
            "$sum" if acc_value.as_i64() == Some(1) => (Operation::Count, "*".to_string()),
            "$sum" => (Operation::Sum, strip_ref(acc_value)),
            "$avg" => (Operation::Avg, strip_ref(acc_value)),
            "$min" => (Operation::Min, strip_ref(acc_value)),
            "$max" => (Operation::Max, strip_ref(acc_value)),
            "$count" => (Operation::Count, "*".to_string()),
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "group accumulator has no OQL mapping: {}",
                    other
                )))
            }
        };
        if q.aggregate.is_none() {
            q.operation = operation;
            q.aggregate = Some(AggregateSpec {
                field: agg_field,
                alias: Some(key.clone()),
                distinct: false,
            });
        }
    }
    Ok(())
}

fn strip_ref(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim_start_matches('$').to_string(),
        other => scalar_text(other),
    }
}

fn lift_projection(projection: &Map<String, Value>, q: &mut Query) {
    for (key, value) in sorted_entries(projection) {
        match value {
            Value::Number(n) if n.as_i64() == Some(0) => {}
            Value::Bool(false) => {}
            Value::Number(_) | Value::Bool(true) => q.columns.push(key.clone()),
            Value::String(s) if s.starts_with('$') => q.select_columns.push(SelectColumn {
                expr: field(s.trim_start_matches('$')),
                alias: Some(key.clone()),
            }),
            Value::Object(expr) => {
                if let Ok(lifted) = lift_cond_expr(expr) {
                    q.select_columns.push(SelectColumn {
                        expr: lifted,
                        alias: Some(key.clone()),
                    });
                }
            }
            _ => {}
        }
    }
}

fn lift_sort(sort: &Map<String, Value>, q: &mut Query) {
    for (key, value) in sorted_entries(sort) {
        let desc = value.as_i64() == Some(-1);
        q.order_by.push(OrderBy {
            expr: field(key.clone()),
            desc,
        });
    }
}

fn lift_lookup(stage_value: &Value, entity: &str, q: &mut Query) -> TranslateResult<()> {
    let Value::Object(lookup) = stage_value else {
        return Err(TranslateError::ParseError("$lookup requires an object".into()));
    };
    let from = lookup
        .get("from")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::ParseError("$lookup requires from".into()))?;
    let local = lookup
        .get("localField")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::ParseError("$lookup requires localField".into()))?;
    let foreign = lookup
        .get("foreignField")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::ParseError("$lookup requires foreignField".into()))?;

    q.joins.push(Join {
        join_type: JoinType::Left,
        table: from.to_string(),
        left: field(format!("{}.{}", entity_to_table(entity), local)),
        right: field(format!("{}.{}", from, foreign)),
    });
    Ok(())
}

fn lift_window_fields(stage_value: &Value, q: &mut Query) -> TranslateResult<()> {
    let Value::Object(spec) = stage_value else {
        return Err(TranslateError::ParseError(
            "$setWindowFields requires an object".into(),
        ));
    };

    let mut partition_by = Vec::new();
    if let Some(Value::String(p)) = spec.get("partitionBy") {
        partition_by.push(field(p.trim_start_matches('$')));
    }
    let mut order_by = Vec::new();
    if let Some(Value::Object(sort)) = spec.get("sortBy") {
        for (key, value) in sorted_entries(sort) {
            order_by.push(WindowOrder {
                expr: field(key.clone()),
                desc: value.as_i64() == Some(-1),
            });
        }
    }

    let Some(Value::Object(output)) = spec.get("output") else {
        return Err(TranslateError::ParseError(
            "$setWindowFields requires output".into(),
        ));
    };

    for (alias, window_spec) in sorted_entries(output) {
        let Value::Object(window_spec) = window_spec else {
            continue;
        };
        let Some((op_name, op_value)) = sorted_entries(window_spec).into_iter().next() else {
            continue;
        };

        let (name, args, offset, buckets) = match op_name.as_str() {
            "$documentNumber" => ("ROW NUMBER".to_string(), vec![], 0, 0),
            "$rank" => ("RANK".to_string(), vec![], 0, 0),
            "$denseRank" => ("DENSE RANK".to_string(), vec![], 0, 0),
            "$ntile" => (
                "NTILE".to_string(),
                vec![],
                0,
                op_value.as_i64().unwrap_or(0),
            ),
            "$shift" => {
                let Value::Object(shift) = op_value else {
                    return Err(TranslateError::ParseError("$shift requires an object".into()));
                };
                let output_field = shift
                    .get("output")
                    .and_then(Value::as_str)
                    .map(|s| field(s.trim_start_matches('$')))
                    .ok_or_else(|| TranslateError::ParseError("$shift requires output".into()))?;
                let by = shift.get("by").and_then(Value::as_i64).unwrap_or(0);
                let (name, offset) = if by < 0 {
                    ("LAG".to_string(), -by)
                } else {
                    ("LEAD".to_string(), by)
                };
                (name, vec![output_field], offset, 0)
            }
            other => {
                return Err(TranslateError::NotSupported(format!(
                    "window operator has no OQL mapping: {}",
                    other
                )))
            }
        };

        q.window_functions.push(WindowFunction {
            expr: Expression::Window {
                name,
                args,
                partition_by: partition_by.clone(),
                order_by: order_by.clone(),
                offset,
                buckets,
            },
            alias: alias.clone(),
        });
    }
    Ok(())
}

// =============================================================================
// $cond / $switch
// =============================================================================

/// Lift a `$cond` (array or object form) or `$switch` expression into a
/// CASE expression.
fn lift_cond_expr(expr: &Map<String, Value>) -> TranslateResult<Expression> {
    if let Some(cond) = expr.get("$cond") {
        return lift_cond(cond);
    }
    if let Some(switch) = expr.get("$switch") {
        return lift_switch(switch);
    }
    Err(TranslateError::NotSupported(
        "projection expression has no OQL mapping".into(),
    ))
}

fn lift_cond(cond: &Value) -> TranslateResult<Expression> {
    let (condition, then, otherwise) = match cond {
        Value::Array(parts) if parts.len() == 3 => (&parts[0], &parts[1], &parts[2]),
        Value::Object(parts) => {
            let condition = parts
                .get("if")
                .ok_or_else(|| TranslateError::ParseError("$cond requires if".into()))?;
            let then = parts
                .get("then")
                .ok_or_else(|| TranslateError::ParseError("$cond requires then".into()))?;
            let otherwise = parts
                .get("else")
                .ok_or_else(|| TranslateError::ParseError("$cond requires else".into()))?;
            (condition, then, otherwise)
        }
        _ => {
            return Err(TranslateError::ParseError(
                "$cond requires an array or object".into(),
            ))
        }
    };

    let arms = vec![CaseArm {
        when: lift_comparison(condition)?,
        then: expr_from_value(then),
    }];
    Ok(oql::case_when(arms, Some(expr_from_value(otherwise))))
}

fn lift_switch(switch: &Value) -> TranslateResult<Expression> {
    let Value::Object(switch) = switch else {
        return Err(TranslateError::ParseError("$switch requires an object".into()));
    };
    let Some(Value::Array(branches)) = switch.get("branches") else {
        return Err(TranslateError::ParseError("$switch requires branches".into()));
    };

    let mut arms = Vec::new();
    for branch in branches {
        let Value::Object(branch) = branch else {
            continue;
        };
        let case = branch
            .get("case")
            .ok_or_else(|| TranslateError::ParseError("$switch branch requires case".into()))?;
        let then = branch
            .get("then")
            .ok_or_else(|| TranslateError::ParseError("$switch branch requires then".into()))?;
        arms.push(CaseArm {
            when: lift_comparison(case)?,
            then: expr_from_value(then),
        });
    }
    if arms.is_empty() {
        return Err(TranslateError::ParseError("$switch without branches".into()));
    }
    let default = switch.get("default").map(expr_from_value);
    Ok(oql::case_when(arms, default))
}

/// A comparison expression like `{"$gte": ["$age", 18]}`.
fn lift_comparison(value: &Value) -> TranslateResult<Condition> {
    let Value::Object(comparison) = value else {
        return Err(TranslateError::ParseError(
            "comparison must be an object".into(),
        ));
    };
    let Some((op_name, operands)) = sorted_entries(comparison).into_iter().next() else {
        return Err(TranslateError::ParseError("empty comparison".into()));
    };
    let operator = match op_name.as_str() {
        "$eq" => Operator::Eq,
        "$ne" => Operator::Ne,
        "$gt" => Operator::Gt,
        "$gte" => Operator::Gte,
        "$lt" => Operator::Lt,
        "$lte" => Operator::Lte,
        other => {
            return Err(TranslateError::NotSupported(format!(
                "comparison operator has no OQL mapping: {}",
                other
            )))
        }
    };
    let Value::Array(operands) = operands else {
        return Err(TranslateError::ParseError(
            "comparison requires operands".into(),
        ));
    };
    if operands.len() != 2 {
        return Err(TranslateError::ParseError(
            "comparison requires two operands".into(),
        ));
    }
    Ok(Condition::new(
        expr_from_value(&operands[0]),
        operator,
        Some(expr_from_value(&operands[1])),
    ))
}

// =============================================================================
// DDL / DCL helpers
// =============================================================================

fn lift_coll_mod(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    if let Some(view_on) = command.get("viewOn").and_then(Value::as_str) {
        let mut q = Query::new(Operation::CreateView, entity_of(target)?);
        q.view_query = Some(Box::new(Query::new(
            Operation::Get,
            table_to_entity(view_on),
        )));
        return Ok(q);
    }
    Ok(Query::new(Operation::AlterTable, entity_of(target)?))
}

fn lift_rename(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let source = collection_name(target)?;
    let source_table = source.rsplit('.').next().unwrap_or(source);
    let to = command
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::ParseError("renameCollection requires to".into()))?;
    let to_table = to.rsplit('.').next().unwrap_or(to);

    let mut q = Query::new(Operation::RenameTable, table_to_entity(source_table));
    q.comment = Some(to_table.to_string());
    Ok(q)
}

fn lift_create_indexes(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::CreateIndex, entity_of(target)?);
    let Some(Value::Array(indexes)) = command.get("indexes") else {
        return Err(TranslateError::ParseError(
            "createIndexes requires indexes".into(),
        ));
    };
    let Some(Value::Object(index)) = indexes.first() else {
        return Err(TranslateError::ParseError(
            "createIndexes requires at least one index".into(),
        ));
    };

    let mut def = IndexDef::default();
    if let Some(Value::Object(key)) = index.get("key") {
        for (column, _) in sorted_entries(key) {
            def.columns.push(column.clone());
        }
    }
    def.name = index
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    def.unique = index.get("unique").and_then(Value::as_bool).unwrap_or(false);
    q.index = Some(def);
    Ok(q)
}

fn lift_drop_indexes(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::DropIndex, entity_of(target)?);
    q.index = Some(IndexDef {
        name: command
            .get("index")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ..Default::default()
    });
    Ok(q)
}

fn lift_create_view(target: &Value, command: &Map<String, Value>) -> TranslateResult<Query> {
    let mut q = Query::new(Operation::CreateView, entity_of(target)?);
    let view_on = command
        .get("viewOn")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::ParseError("createView requires viewOn".into()))?;

    let inner = if command.get("pipeline").is_some() {
        let mut aggregate_command = Map::new();
        aggregate_command.insert("aggregate".into(), Value::String(view_on.into()));
        aggregate_command.insert(
            "pipeline".into(),
            command.get("pipeline").cloned().unwrap_or_default(),
        );
        lift_aggregate(&Value::String(view_on.into()), &aggregate_command)?
    } else {
        Query::new(Operation::Get, table_to_entity(view_on))
    };
    q.view_query = Some(Box::new(inner));
    Ok(q)
}

fn lift_principal(
    operation: Operation,
    target: &Value,
    command: &Map<String, Value>,
) -> TranslateResult<Query> {
    let name = collection_name(target)?;
    let mut q = Query::new(operation, "User");
    let mut perm = PermissionSpec {
        grantee: Some(name.to_string()),
        password: command
            .get("pwd")
            .and_then(Value::as_str)
            .map(str::to_string),
        ..Default::default()
    };
    if let Some(Value::Array(roles)) = command.get("roles") {
        perm.roles = roles
            .iter()
            .filter_map(|r| match r {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("role").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect();
    }
    q.permission = Some(perm);
    Ok(q)
}

fn lift_role_grant(
    operation: Operation,
    target: &Value,
    command: &Map<String, Value>,
) -> TranslateResult<Query> {
    let mut q = lift_principal(operation, target, command)?;
    if q
        .permission
        .as_ref()
        .map(|p| p.roles.is_empty())
        .unwrap_or(true)
    {
        return Err(TranslateError::ParseError(
            "role grant requires roles".into(),
        ));
    }
    Ok(q)
}

fn lift_privilege_grant(
    operation: Operation,
    target: &Value,
    command: &Map<String, Value>,
) -> TranslateResult<Query> {
    let role = collection_name(target)?;
    let mut q = Query::new(operation, String::new());
    let mut perm = PermissionSpec {
        grantee: Some(role.to_string()),
        ..Default::default()
    };

    if let Some(Value::Array(privileges)) = command.get("privileges") {
        for privilege in privileges {
            let Value::Object(privilege) = privilege else {
                continue;
            };
            if let Some(collection) = privilege
                .get("resource")
                .and_then(|r| r.get("collection"))
                .and_then(Value::as_str)
            {
                let entity = table_to_entity(collection);
                q.entity = entity.clone();
                perm.on_entity = Some(entity);
            }
            if let Some(Value::Array(actions)) = privilege.get("actions") {
                perm.privileges.extend(
                    actions
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|a| a.to_uppercase()),
                );
            }
        }
    }
    if perm.privileges.is_empty() {
        return Err(TranslateError::ParseError(
            "privilege grant requires actions".into(),
        ));
    }
    q.permission = Some(perm);
    Ok(q)
}
