//! Formula Abstract Syntax Tree types

use crate::lexer::Operator;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Boolean(bool),

    // === References ===
    /// Calculator field reference, `{name}`
    Field(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        /// Uppercased name
        name: String,
        args: Vec<FormulaExpr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }
}

impl From<Operator> for BinaryOperator {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Add => BinaryOperator::Add,
            Operator::Subtract => BinaryOperator::Subtract,
            Operator::Multiply => BinaryOperator::Multiply,
            Operator::Divide => BinaryOperator::Divide,
            Operator::Equal => BinaryOperator::Equal,
            Operator::NotEqual => BinaryOperator::NotEqual,
            Operator::LessThan => BinaryOperator::LessThan,
            Operator::LessEqual => BinaryOperator::LessEqual,
            Operator::GreaterThan => BinaryOperator::GreaterThan,
            Operator::GreaterEqual => BinaryOperator::GreaterEqual,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
}

impl FormulaExpr {
    /// Field names referenced anywhere in the expression, in visit order
    pub fn field_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FormulaExpr::Field(name) => out.push(name),
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_fields(out),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_fields(out);
                }
            }
            FormulaExpr::Number(_) | FormulaExpr::Text(_) | FormulaExpr::Boolean(_) => {}
        }
    }
}
