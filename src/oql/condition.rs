//! Predicate nodes: conditions, the canonical operator set, and logic links.

use serde::Serialize;

use super::expr::Expression;

// =============================================================================
// Canonical operators
// =============================================================================

/// The canonical OQL comparison operator set.
///
/// The `as_str()` values are part of the IR's public contract - downstream
/// consumers depend on them and they must never be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
    Like,
    NotLike,
    ILike,
    NotILike,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Every canonical operator, in a fixed order.
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::In,
        Operator::NotIn,
        Operator::Like,
        Operator::NotLike,
        Operator::ILike,
        Operator::NotILike,
        Operator::Between,
        Operator::NotBetween,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// The canonical IR string for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT_LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotILike => "NOT_ILIKE",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT_BETWEEN",
            Operator::IsNull => "IS_NULL",
            Operator::IsNotNull => "IS_NOT_NULL",
        }
    }

    /// Parse a canonical IR operator string.
    pub fn parse(s: &str) -> Option<Operator> {
        Operator::ALL.iter().copied().find(|op| op.as_str() == s)
    }

    /// Negate this operator.
    ///
    /// The negation table is an involution: `op.negate().negate() == op`
    /// for every canonical operator.
    pub fn negate(&self) -> Operator {
        match self {
            Operator::Eq => Operator::Ne,
            Operator::Ne => Operator::Eq,
            Operator::Lt => Operator::Gte,
            Operator::Gte => Operator::Lt,
            Operator::Gt => Operator::Lte,
            Operator::Lte => Operator::Gt,
            Operator::In => Operator::NotIn,
            Operator::NotIn => Operator::In,
            Operator::Like => Operator::NotLike,
            Operator::NotLike => Operator::Like,
            Operator::ILike => Operator::NotILike,
            Operator::NotILike => Operator::ILike,
            Operator::Between => Operator::NotBetween,
            Operator::NotBetween => Operator::Between,
            Operator::IsNull => Operator::IsNotNull,
            Operator::IsNotNull => Operator::IsNull,
        }
    }

    /// True for the two null tests, which consume no parameters.
    pub fn is_null_test(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// True for IN / NOT_IN, whose operands live in `Condition::values`.
    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// True for BETWEEN / NOT_BETWEEN, which consume two operands.
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }
}

// =============================================================================
// Logic links
// =============================================================================

/// The connective joining a condition to the previous one in its list.
///
/// The first element of any list carries `Logic::None`; subsequent elements
/// default to `And` when the source does not say otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Logic {
    #[default]
    None,
    And,
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::None => "",
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

// =============================================================================
// Condition
// =============================================================================

/// A single predicate: `field op value`, `field BETWEEN value AND value2`,
/// `field IN (values...)`, or a parenthesized `nested` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    /// The left-hand side; any expression, not only a column.
    pub field: Expression,
    pub operator: Operator,
    /// Right-hand operand for scalar operators and the low bound of BETWEEN.
    pub value: Option<Expression>,
    /// High bound of BETWEEN / NOT_BETWEEN.
    pub value2: Option<Expression>,
    /// Operand list for IN / NOT_IN.
    pub values: Vec<Expression>,
    /// Link to the previous condition in the containing list.
    pub logic: Logic,
    /// Parenthesized sub-group; when non-empty this node is a group and the
    /// scalar slots above are ignored.
    pub nested: Vec<Condition>,
}

impl Condition {
    /// A scalar comparison condition.
    pub fn new(field: Expression, operator: Operator, value: Option<Expression>) -> Self {
        Self {
            field,
            operator,
            value,
            value2: None,
            values: Vec::new(),
            logic: Logic::None,
            nested: Vec::new(),
        }
    }

    /// A BETWEEN / NOT_BETWEEN condition.
    pub fn between(field: Expression, operator: Operator, low: Expression, high: Expression) -> Self {
        Self {
            field,
            operator,
            value: Some(low),
            value2: Some(high),
            values: Vec::new(),
            logic: Logic::None,
            nested: Vec::new(),
        }
    }

    /// An IN / NOT_IN condition.
    pub fn in_list(field: Expression, operator: Operator, values: Vec<Expression>) -> Self {
        Self {
            field,
            operator,
            value: None,
            value2: None,
            values,
            logic: Logic::None,
            nested: Vec::new(),
        }
    }

    /// A parenthesized group of conditions.
    pub fn group(nested: Vec<Condition>) -> Self {
        Self {
            field: super::expr::field(""),
            operator: Operator::Eq,
            value: None,
            value2: None,
            values: Vec::new(),
            logic: Logic::None,
            nested,
        }
    }

    /// Set the logic link.
    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.nested.is_empty()
    }
}

/// Normalize a freshly-built condition list: the first element carries no
/// link, every later element without an explicit link gets `AND`.
pub fn normalize_logic(conditions: &mut [Condition]) {
    for (i, cond) in conditions.iter_mut().enumerate() {
        if i == 0 {
            cond.logic = Logic::None;
        } else if cond.logic == Logic::None {
            cond.logic = Logic::And;
        }
    }
}
