/// Binary operators that may appear in a flat operator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    InstanceOf,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

/// Checking family of an operator.
///
/// The grouping follows the source language rather than intuition: `<` and `>` are checked like
/// arithmetic operators while `<=` and `>=` share the conditional family with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorClass {
    InstanceOf,
    Arithmetic,
    Bitwise,
    Conditional,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 20] = [
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::UShr,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::InstanceOf,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::BitAnd,
        BinaryOp::BitXor,
        BinaryOp::BitOr,
        BinaryOp::And,
        BinaryOp::Or,
    ];

    pub fn from_token(token: &str) -> Option<BinaryOp> {
        BinaryOp::ALL.into_iter().find(|op| op.token() == token)
    }

    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Larger = tighter binding. Every level is left-associative.
    pub fn binding_power(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 70,
            BinaryOp::Add | BinaryOp::Sub => 60,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 55,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::InstanceOf => 50,
            BinaryOp::Eq | BinaryOp::Ne => 45,
            BinaryOp::BitAnd => 40,
            BinaryOp::BitXor => 39,
            BinaryOp::BitOr => 38,
            BinaryOp::And => 30,
            BinaryOp::Or => 20,
        }
    }

    pub fn class(self) -> OperatorClass {
        match self {
            BinaryOp::InstanceOf => OperatorClass::InstanceOf,
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::UShr
            | BinaryOp::Lt
            | BinaryOp::Gt => OperatorClass::Arithmetic,
            BinaryOp::BitXor | BinaryOp::BitAnd | BinaryOp::BitOr => OperatorClass::Bitwise,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::And | BinaryOp::Or | BinaryOp::Le | BinaryOp::Ge => {
                OperatorClass::Conditional
            }
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }

    /// `<`, `>`, `<=`, `>=`.
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}
