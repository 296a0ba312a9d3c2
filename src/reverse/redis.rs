//! Redis reverse translation.
//!
//! Commands are a single line, tokenized by hand with quote awareness. Keys
//! follow the `tenant:<tenantId>:<entity>[:<id>|:<field>:<value>]` shape; a
//! trailing `*` (or `:*`) marks a pattern. ACL subcommands lower to DCL.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TranslateError, TranslateResult};
use crate::naming::table_to_entity;
use crate::oql::{
    binary, field, function, literal, normalize_logic, null_literal, AggregateSpec, Condition,
    Expression, Field, Operation, Operator, PermissionSpec, Query,
};

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIMESTAMP_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2})?$").unwrap());
static ARITHMETIC_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)([+\-*/])(\d+(?:\.\d+)?)$").unwrap());
static FUNCTION_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\(([^)]*)\)$").unwrap());

/// Lift a Redis command line into OQL.
pub fn to_query(source: &str) -> TranslateResult<Query> {
    let tokens = tokenize(source);
    let Some(command) = tokens.first() else {
        return Err(TranslateError::EmptyQuery);
    };

    match command.to_uppercase().as_str() {
        "HGETALL" | "GET" => lift_read(&tokens, &[]),
        "HGET" => {
            let columns: Vec<String> = tokens.get(2).cloned().into_iter().collect();
            lift_read(&tokens, &columns)
        }
        "HKEYS" | "HVALS" | "SMEMBERS" => lift_read(&tokens, &[]),
        "TTL" => lift_read(&tokens, &["ttl".to_string()]),
        "ZSCORE" => lift_zscore(&tokens),
        "LRANGE" | "ZRANGE" => lift_range(&tokens),
        "KEYS" => lift_keys(&tokens),

        "HMSET" | "HSETNX" => lift_create(&tokens),
        "SET" => lift_set(&tokens),
        "MSET" => lift_mset(&tokens),

        "HSET" => lift_hset(&tokens),
        "LPUSH" | "RPUSH" | "SADD" => lift_array_update(&tokens, "ARRAY_APPEND"),
        "ZADD" => lift_zadd(&tokens),
        "SREM" => lift_array_update(&tokens, "ARRAY_REMOVE"),
        "LPOP" | "RPOP" => lift_array_pop(&tokens),
        "HDEL" => lift_hdel(&tokens),
        "ZREM" => lift_zrem(&tokens),
        "EXPIRE" => lift_expire(&tokens),

        "DEL" => lift_del(&tokens),

        "MULTI" => Ok(Query::bare(Operation::Begin)),
        "EXEC" => Ok(Query::bare(Operation::Commit)),
        "DISCARD" => Ok(Query::bare(Operation::Rollback)),

        "EXISTS" => lift_count(&tokens, "*"),
        "LLEN" | "SCARD" => lift_count(&tokens, "value"),
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" => lift_aggregate(&tokens),

        "ACL" => lift_acl(&tokens),

        other => Err(TranslateError::NotSupported(format!(
            "command has no OQL mapping: {}",
            other
        ))),
    }
}

// =============================================================================
// Tokenizer and key parser
// =============================================================================

/// Split on spaces, honoring single and double quotes.
fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in source.trim().chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                ' ' | '\t' => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// A parsed `tenant:<t>:<entity>[...]` key.
#[derive(Debug, Clone, PartialEq, Default)]
struct RedisKey {
    tenant: Option<String>,
    entity: String,
    id: Option<String>,
    field_filter: Option<(String, String)>,
    is_pattern: bool,
}

fn parse_key(key: &str) -> TranslateResult<RedisKey> {
    let mut parsed = RedisKey::default();
    let mut raw = key.to_string();

    if raw.ends_with(":*") {
        parsed.is_pattern = true;
        raw.truncate(raw.len() - 2);
    } else if raw.ends_with('*') {
        parsed.is_pattern = true;
        raw.pop();
    }

    let segments: Vec<&str> = raw.split(':').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(TranslateError::ParseError(format!(
            "key has no entity segment: {}",
            key
        )));
    }

    let rest = if segments[0] == "tenant" {
        if segments.len() < 3 {
            return Err(TranslateError::ParseError(format!(
                "tenant key is missing its entity: {}",
                key
            )));
        }
        parsed.tenant = Some(segments[1].to_string());
        parsed.entity = table_to_entity(segments[2]);
        &segments[3..]
    } else {
        parsed.entity = table_to_entity(segments[0]);
        &segments[1..]
    };

    match rest {
        [] => {}
        [id] => parsed.id = Some(id.to_string()),
        [field_name, value] => {
            parsed.field_filter = Some((field_name.to_string(), value.to_string()))
        }
        _ => {
            return Err(TranslateError::ParseError(format!(
                "key has too many segments: {}",
                key
            )))
        }
    }
    Ok(parsed)
}

fn key_arg<'a>(tokens: &'a [String]) -> TranslateResult<&'a str> {
    tokens
        .get(1)
        .map(String::as_str)
        .ok_or_else(|| TranslateError::ParseError("command is missing its key".into()))
}

/// Conditions implied by the key: an id match or a field/value match.
fn key_conditions(key: &RedisKey) -> Vec<Condition> {
    let mut conditions = Vec::new();
    if let Some(id) = &key.id {
        conditions.push(Condition::new(
            field("id"),
            Operator::Eq,
            Some(literal(id.clone())),
        ));
    }
    if let Some((name, value)) = &key.field_filter {
        conditions.push(Condition::new(
            field(name.clone()),
            Operator::Eq,
            Some(literal(value.clone())),
        ));
    }
    normalize_logic(&mut conditions);
    conditions
}

// =============================================================================
// Values
// =============================================================================

/// Parse a value token: date/timestamp shapes stay opaque literals,
/// `<field><op><number>` becomes an arithmetic expression, `NAME(args)` a
/// function call.
fn parse_value(raw: &str) -> Expression {
    if DATE_SHAPE.is_match(raw) || TIMESTAMP_SHAPE.is_match(raw) {
        return literal(raw);
    }
    if let Some(caps) = ARITHMETIC_SHAPE.captures(raw) {
        return binary(
            field(caps[1].to_string()),
            caps[2].to_string(),
            literal(caps[3].to_string()),
        );
    }
    if let Some(caps) = FUNCTION_SHAPE.captures(raw) {
        let args = caps[2]
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| {
                if a.chars().all(|c| c.is_ascii_digit() || c == '.') {
                    literal(a)
                } else {
                    field(a)
                }
            })
            .collect();
        return function(caps[1].to_uppercase(), args);
    }
    literal(raw)
}

// =============================================================================
// Reads
// =============================================================================

fn lift_read(tokens: &[String], columns: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Get, key.entity.clone());
    q.columns = columns.to_vec();
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_zscore(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Get, key.entity.clone());
    q.columns = vec!["score".into()];
    q.conditions = key_conditions(&key);
    if let Some(member) = tokens.get(2) {
        let mut cond = Condition::new(field("value"), Operator::Eq, Some(literal(member.clone())));
        if !q.conditions.is_empty() {
            cond.logic = crate::oql::Logic::And;
        }
        q.conditions.push(cond);
    }
    Ok(q)
}

fn lift_range(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Get, key.entity.clone());
    q.conditions = key_conditions(&key);

    let start = tokens.get(2).and_then(|t| t.parse::<i64>().ok());
    let stop = tokens.get(3).and_then(|t| t.parse::<i64>().ok());
    if let (Some(start), Some(stop)) = (start, stop) {
        if start >= 0 {
            q.offset = if start > 0 { Some(start as u64) } else { None };
            // An inclusive stop of -1 means the whole list.
            if stop >= start {
                q.limit = Some((stop - start + 1) as u64);
            }
        }
    }
    Ok(q)
}

fn lift_keys(tokens: &[String]) -> TranslateResult<Query> {
    let raw = key_arg(tokens)?;
    let key = parse_key(raw)?;
    let mut q = Query::new(Operation::Get, key.entity.clone());

    // The pattern applies to the id tail: a LIKE over id.
    let tail = key.id.clone().unwrap_or_default();
    let pattern = if key.is_pattern {
        format!("{}%", tail)
    } else {
        tail
    };
    q.conditions = vec![Condition::new(
        field("id"),
        Operator::Like,
        Some(literal(pattern)),
    )];
    Ok(q)
}

// =============================================================================
// Writes
// =============================================================================

fn pairs_to_fields(tokens: &[String]) -> TranslateResult<Vec<Field>> {
    if tokens.is_empty() || tokens.len() % 2 != 0 {
        return Err(TranslateError::ParseError(
            "expected field/value pairs".into(),
        ));
    }
    Ok(tokens
        .chunks(2)
        .map(|pair| Field::new(field(pair[0].clone()), Some(parse_value(&pair[1]))))
        .collect())
}

fn lift_create(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Create, key.entity.clone());
    if let Some(id) = &key.id {
        q.fields.push(Field::assignment("id", id.clone()));
    }
    q.fields.extend(pairs_to_fields(&tokens[2..])?);
    Ok(q)
}

fn lift_set(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let value = tokens
        .get(2)
        .ok_or_else(|| TranslateError::ParseError("SET is missing its value".into()))?;
    let mut q = Query::new(Operation::Create, key.entity.clone());
    if let Some(id) = &key.id {
        q.fields.push(Field::assignment("id", id.clone()));
    }
    q.fields
        .push(Field::new(field("value"), Some(parse_value(value))));
    Ok(q)
}

/// One MSET over several keys of the same entity is one bulk insert, one row
/// per key.
fn lift_mset(tokens: &[String]) -> TranslateResult<Query> {
    let pairs = &tokens[1..];
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(TranslateError::ParseError(
            "MSET expects key/value pairs".into(),
        ));
    }

    let mut q: Option<Query> = None;
    for pair in pairs.chunks(2) {
        let key = parse_key(&pair[0])?;
        let query = q.get_or_insert_with(|| Query::new(Operation::BulkInsert, key.entity.clone()));
        if query.entity != key.entity {
            return Err(TranslateError::NotSupported(
                "MSET across entities has no OQL mapping".into(),
            ));
        }
        let mut row = Vec::new();
        if let Some(id) = &key.id {
            row.push(Field::assignment("id", id.clone()));
        }
        row.push(Field::new(field("value"), Some(parse_value(&pair[1]))));
        query.bulk_rows.push(row);
    }
    q.ok_or_else(|| TranslateError::ParseError("MSET expects key/value pairs".into()))
}

fn lift_hset(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields = pairs_to_fields(&tokens[2..])?;
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_array_update(tokens: &[String], func_name: &str) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let value = tokens
        .get(2)
        .ok_or_else(|| TranslateError::ParseError("array command is missing its value".into()))?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields.push(Field::new(
        field("value"),
        Some(function(
            func_name,
            vec![field("value"), parse_value(value)],
        )),
    ));
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_zadd(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    // ZADD key score member
    let member = tokens
        .get(3)
        .or_else(|| tokens.get(2))
        .ok_or_else(|| TranslateError::ParseError("ZADD is missing its member".into()))?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields.push(Field::new(
        field("value"),
        Some(function(
            "ARRAY_APPEND",
            vec![field("value"), parse_value(member)],
        )),
    ));
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_array_pop(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields.push(Field::new(
        field("value"),
        Some(function("ARRAY_POP", vec![field("value")])),
    ));
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_hdel(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let target = tokens
        .get(2)
        .ok_or_else(|| TranslateError::ParseError("HDEL is missing its field".into()))?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields
        .push(Field::new(field(target.clone()), Some(null_literal())));
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_zrem(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields
        .push(Field::new(field("value"), Some(null_literal())));
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_expire(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let seconds = tokens
        .get(2)
        .ok_or_else(|| TranslateError::ParseError("EXPIRE is missing its seconds".into()))?;
    let mut q = Query::new(Operation::Update, key.entity.clone());
    q.fields
        .push(Field::new(field("ttl"), Some(literal(seconds.clone()))));
    q.conditions = key_conditions(&key);
    Ok(q)
}

fn lift_del(tokens: &[String]) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    if key.is_pattern && key.id.is_none() && key.field_filter.is_none() {
        // Deleting every key of an entity is dropping its table.
        return Ok(Query::new(Operation::DropTable, key.entity));
    }
    let mut q = Query::new(Operation::Delete, key.entity.clone());
    q.conditions = key_conditions(&key);
    Ok(q)
}

// =============================================================================
// Aggregates
// =============================================================================

fn lift_count(tokens: &[String], agg_field: &str) -> TranslateResult<Query> {
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(Operation::Count, key.entity.clone());
    q.aggregate = Some(AggregateSpec::over(agg_field));
    q.conditions = key_conditions(&key);
    Ok(q)
}

/// `COUNT|SUM|AVG|MIN|MAX <key> [field] [LIMIT n]`.
fn lift_aggregate(tokens: &[String]) -> TranslateResult<Query> {
    let operation = match tokens[0].to_uppercase().as_str() {
        "COUNT" => Operation::Count,
        "SUM" => Operation::Sum,
        "AVG" => Operation::Avg,
        "MIN" => Operation::Min,
        "MAX" => Operation::Max,
        other => {
            return Err(TranslateError::NotSupported(format!(
                "aggregate has no OQL mapping: {}",
                other
            )))
        }
    };
    let key = parse_key(key_arg(tokens)?)?;
    let mut q = Query::new(operation, key.entity.clone());
    q.conditions = key_conditions(&key);

    let mut agg_field = if operation == Operation::Count {
        "*".to_string()
    } else {
        String::new()
    };
    let mut rest = tokens[2..].iter();
    while let Some(token) = rest.next() {
        if token.eq_ignore_ascii_case("limit") {
            q.limit = rest.next().and_then(|t| t.parse().ok());
        } else {
            agg_field = token.clone();
        }
    }
    if agg_field.is_empty() {
        return Err(TranslateError::ParseError(
            "aggregate is missing its field".into(),
        ));
    }
    q.aggregate = Some(AggregateSpec::over(agg_field));
    Ok(q)
}

// =============================================================================
// ACL
// =============================================================================

/// Redis verbs lower to OQL permission keywords.
fn permission_keyword(verb: &str) -> String {
    match verb.to_lowercase().as_str() {
        "get" | "hgetall" | "lrange" | "smembers" | "zrange" => "READ".into(),
        "set" | "hset" | "hmset" | "lpush" | "sadd" | "zadd" => "WRITE".into(),
        "del" | "hdel" | "lpop" | "srem" | "zrem" => "DELETE".into(),
        "@all" => "ALL".into(),
        other => other.to_uppercase(),
    }
}

fn lift_acl(tokens: &[String]) -> TranslateResult<Query> {
    let subcommand = tokens
        .get(1)
        .ok_or_else(|| TranslateError::ParseError("ACL without a subcommand".into()))?;

    match subcommand.to_uppercase().as_str() {
        "SETUSER" => lift_acl_setuser(tokens),
        "DELUSER" => {
            let name = tokens
                .get(2)
                .ok_or_else(|| TranslateError::ParseError("ACL DELUSER without a user".into()))?;
            let mut q = Query::new(Operation::DropUser, "User");
            q.permission = Some(PermissionSpec {
                grantee: Some(name.clone()),
                ..Default::default()
            });
            Ok(q)
        }
        "LIST" => Ok(Query::new(Operation::Get, "User")),
        other => Err(TranslateError::NotSupported(format!(
            "ACL subcommand has no OQL mapping: {}",
            other
        ))),
    }
}

fn lift_acl_setuser(tokens: &[String]) -> TranslateResult<Query> {
    let name = tokens
        .get(2)
        .ok_or_else(|| TranslateError::ParseError("ACL SETUSER without a user".into()))?;

    let mut reset_keys = false;
    let mut password: Option<String> = None;
    let mut granted: Vec<String> = Vec::new();
    let mut revoked: Vec<String> = Vec::new();
    let mut on_entity: Option<String> = None;

    for token in &tokens[3..] {
        if token.eq_ignore_ascii_case("resetkeys") {
            reset_keys = true;
        } else if let Some(pwd) = token.strip_prefix('>') {
            password = Some(pwd.to_string());
        } else if let Some(pattern) = token.strip_prefix('~') {
            if let Ok(key) = parse_key(pattern) {
                on_entity = Some(key.entity);
            }
        } else if let Some(verb) = token.strip_prefix('+') {
            granted.push(permission_keyword(verb));
        } else if let Some(verb) = token.strip_prefix('-') {
            revoked.push(permission_keyword(verb));
        }
    }

    let (operation, privileges) = if reset_keys && password.is_some() {
        (Operation::CreateUser, granted)
    } else if !revoked.is_empty() {
        (Operation::Revoke, revoked)
    } else if !granted.is_empty() && password.is_none() {
        (Operation::Grant, granted)
    } else {
        (Operation::AlterUser, granted)
    };

    let entity = on_entity.clone().unwrap_or_else(|| "User".into());
    let mut q = Query::new(operation, entity);
    q.permission = Some(PermissionSpec {
        privileges,
        on_entity,
        grantee: Some(name.clone()),
        password,
        roles: Vec::new(),
    });
    Ok(q)
}
