use std::fmt::{self, Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumString};

/// Represents the index of a node in a [super::CircuitGraph].
///
/// Indexes are dense and handed out in declaration order, so comparing two [NodeIndex]es
/// tells you which node was declared first.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NodeIndex {
    pub(super) idx: usize,
}

/// Returns a new NodeIndex from a provided usize.
macro_rules! ni {
    ( $x:expr ) => {{
        NodeIndex::new($x)
    }};
}

impl NodeIndex {
    /// Returns a new NodeIndex from a provided usize.
    pub(super) const fn new(idx: usize) -> NodeIndex {
        NodeIndex { idx }
    }

    /// Returns the position of the node in declaration order.
    pub fn index(&self) -> usize {
        self.idx
    }
}

impl Display for NodeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.idx)
    }
}

/// Tri-state logic value carried by every signal in the circuit.
///
/// `Unknown` is the state of anything that has not been driven yet, like a register
/// without an initial value or a memory read with no address in flight.
///
/// # Example
/// ```
/// # use rtlsim::Value;
/// let v: Value = "X".parse().unwrap();
/// assert_eq!(v, Value::Unknown);
/// assert_eq!(Value::from(true).to_string(), "1");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, StrumDisplay, EnumString)]
pub enum Value {
    #[strum(to_string = "0")]
    Zero,
    #[strum(to_string = "1")]
    One,
    #[strum(serialize = "x", to_string = "X")]
    Unknown,
}
use Value::*;

impl Default for Value {
    fn default() -> Self {
        Unknown
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            One
        } else {
            Zero
        }
    }
}

impl Value {
    /// Returns Some(bool) if the value is known, None if it is [Value::Unknown].
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Zero => Some(false),
            One => Some(true),
            Unknown => None,
        }
    }

    /// Returns true if `self` is not [Value::Unknown].
    pub fn is_known(self) -> bool {
        !matches!(self, Unknown)
    }

    /// Logical complement, `Unknown` stays `Unknown`.
    pub fn not(self) -> Value {
        match self {
            Zero => One,
            One => Zero,
            Unknown => Unknown,
        }
    }

    /// Conservative and: any `Unknown` operand makes the result `Unknown`,
    /// even if the other operand is a known `Zero`.
    pub fn and(self, other: Value) -> Value {
        match (self, other) {
            (Unknown, _) | (_, Unknown) => Unknown,
            (One, One) => One,
            _ => Zero,
        }
    }

    /// Or where a single `Unknown` operand is neutral: the result is the other operand.
    ///
    /// Note that this is not strict 4-valued logic, `Zero | Unknown` is `Zero` here.
    ///
    /// # Example
    /// ```
    /// # use rtlsim::Value::*;
    /// assert_eq!(Zero.or(Unknown), Zero);
    /// assert_eq!(Unknown.or(One), One);
    /// assert_eq!(Unknown.or(Unknown), Unknown);
    /// ```
    pub fn or(self, other: Value) -> Value {
        match (self, other) {
            (Unknown, Unknown) => Unknown,
            (Unknown, v) | (v, Unknown) => v,
            (Zero, Zero) => Zero,
            _ => One,
        }
    }
}

/// Operators available to combinational nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, StrumDisplay)]
pub enum OpType {
    Not,
    And,
    Or,
}

impl OpType {
    /// Number of operands the operator consumes.
    pub fn arity(&self) -> usize {
        match self {
            OpType::Not => 1,
            OpType::And | OpType::Or => 2,
        }
    }

    /// Applies the operator to `operands`.
    ///
    /// Only the first [arity](OpType::arity) operands are consumed, the rest are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `operands` holds less than [arity](OpType::arity) values,
    /// schedules reject such nodes before they can be evaluated.
    #[inline(always)]
    pub fn apply(&self, operands: &[Value]) -> Value {
        match self {
            OpType::Not => operands[0].not(),
            OpType::And => operands[0].and(operands[1]),
            OpType::Or => operands[0].or(operands[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Value; 3] = [Zero, One, Unknown];

    #[test]
    fn test_not() {
        assert_eq!(Zero.not(), One);
        assert_eq!(One.not(), Zero);
        assert_eq!(Unknown.not(), Unknown);
    }

    #[test]
    fn test_and_unknown_dominates() {
        for a in &ALL {
            assert_eq!(a.and(Unknown), Unknown, "{} & X", a);
            assert_eq!(Unknown.and(*a), Unknown, "X & {}", a);
        }
        assert_eq!(One.and(One), One);
        assert_eq!(One.and(Zero), Zero);
        assert_eq!(Zero.and(Zero), Zero);
    }

    #[test]
    fn test_or_unknown_is_neutral() {
        assert_eq!(Unknown.or(Unknown), Unknown);
        for v in &[Zero, One] {
            assert_eq!(v.or(Unknown), *v);
            assert_eq!(Unknown.or(*v), *v);
        }
        assert_eq!(Zero.or(Zero), Zero);
        assert_eq!(Zero.or(One), One);
        assert_eq!(One.or(One), One);
    }

    #[test]
    fn test_apply_ignores_extra_operands() {
        assert_eq!(OpType::Not.apply(&[One, Unknown]), Zero);
        assert_eq!(OpType::And.apply(&[One, One, Zero]), One);
        assert_eq!(OpType::Or.apply(&[Zero, Zero, One]), Zero);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("0".parse::<Value>().unwrap(), Zero);
        assert_eq!("1".parse::<Value>().unwrap(), One);
        assert_eq!("x".parse::<Value>().unwrap(), Unknown);
        assert!("2".parse::<Value>().is_err());
        assert_eq!(Unknown.to_string(), "X");
        assert_eq!(OpType::And.to_string(), "And");
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(Value::default(), Unknown);
        assert_eq!(Unknown.to_bool(), None);
        assert_eq!(Value::from(false).to_bool(), Some(false));
    }
}
