//! Abstract Syntax Tree definitions for NESTML
//!
//! Every node carries a [`NodeId`] assigned by the parser. Later phases key
//! their side tables (enclosing scope, computed type) by that id instead of
//! storing anything on the nodes themselves.

use crate::utils::SourcePosition;
use serde::Serialize;
use std::fmt;

/// Identity of an AST node, unique within one compilation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// A parsed model file
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub neurons: Vec<Neuron>,
    pub pos: SourcePosition,
}

/// `neuron NAME: ... end`
#[derive(Debug, Clone)]
pub struct Neuron {
    pub id: NodeId,
    pub name: String,
    pub body: Vec<BodyElement>,
    pub pos: SourcePosition,
}

impl Neuron {
    pub fn var_blocks(&self) -> impl Iterator<Item = &VarBlock> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Block(b) => Some(b),
            _ => None,
        })
    }

    pub fn equations_blocks(&self) -> impl Iterator<Item = &EquationsBlock> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Equations(b) => Some(b),
            _ => None,
        })
    }

    pub fn input_blocks(&self) -> impl Iterator<Item = &InputBlock> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Input(b) => Some(b),
            _ => None,
        })
    }

    pub fn update_blocks(&self) -> impl Iterator<Item = &UpdateBlock> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Update(b) => Some(b),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.body.iter().filter_map(|e| match e {
            BodyElement::Function(f) => Some(f),
            _ => None,
        })
    }

    /// All ODE equations across every equations block
    pub fn ode_equations(&self) -> impl Iterator<Item = &OdeEquation> {
        self.equations_blocks()
            .flat_map(|b| b.decls.iter())
            .filter_map(|d| match d {
                OdeDecl::Equation(eq) => Some(eq),
                _ => None,
            })
    }
}

/// Top-level elements of a neuron body
#[derive(Debug, Clone)]
pub enum BodyElement {
    Block(VarBlock),
    Equations(EquationsBlock),
    Input(InputBlock),
    Output(OutputBlock),
    Update(UpdateBlock),
    Function(FunctionDecl),
}

impl BodyElement {
    pub fn pos(&self) -> SourcePosition {
        match self {
            BodyElement::Block(b) => b.pos,
            BodyElement::Equations(b) => b.pos,
            BodyElement::Input(b) => b.pos,
            BodyElement::Output(b) => b.pos,
            BodyElement::Update(b) => b.pos,
            BodyElement::Function(f) => f.pos,
        }
    }
}

/// Kind of a variable-declaring block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    State,
    Parameters,
    Internals,
    InitialValues,
}

impl BlockKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            BlockKind::State => "state",
            BlockKind::Parameters => "parameters",
            BlockKind::Internals => "internals",
            BlockKind::InitialValues => "initial_values",
        }
    }
}

/// `state:`, `parameters:`, `internals:` or `initial_values:` block
#[derive(Debug, Clone)]
pub struct VarBlock {
    pub id: NodeId,
    pub kind: BlockKind,
    pub declarations: Vec<Declaration>,
    pub pos: SourcePosition,
}

/// `equations:` block
#[derive(Debug, Clone)]
pub struct EquationsBlock {
    pub id: NodeId,
    pub decls: Vec<OdeDecl>,
    pub pos: SourcePosition,
}

/// Entry of an equations block
#[derive(Debug, Clone)]
pub enum OdeDecl {
    Function(OdeFunction),
    Shape(OdeShape),
    Equation(OdeEquation),
}

/// `[recordable] function name TYPE = expr` inside equations
#[derive(Debug, Clone)]
pub struct OdeFunction {
    pub id: NodeId,
    pub recordable: bool,
    pub name: String,
    pub data_type: DataType,
    pub expr: Expr,
    pub pos: SourcePosition,
}

/// `shape g = expr`
#[derive(Debug, Clone)]
pub struct OdeShape {
    pub id: NodeId,
    pub lhs: Variable,
    pub rhs: Expr,
    pub pos: SourcePosition,
}

/// `x' = expr`
#[derive(Debug, Clone)]
pub struct OdeEquation {
    pub id: NodeId,
    pub lhs: Variable,
    pub rhs: Expr,
    pub pos: SourcePosition,
}

/// `input:` block
#[derive(Debug, Clone)]
pub struct InputBlock {
    pub id: NodeId,
    pub lines: Vec<InputLine>,
    pub pos: SourcePosition,
}

/// Spike or current signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Spike,
    Current,
}

/// Qualifier of a spike buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputQualifier {
    Inhibitory,
    Excitatory,
}

/// `name [TYPE] <- [inhibitory|excitatory]* spike|current`
#[derive(Debug, Clone)]
pub struct InputLine {
    pub id: NodeId,
    pub name: String,
    pub data_type: Option<DataType>,
    pub qualifiers: Vec<InputQualifier>,
    pub kind: SignalKind,
    pub pos: SourcePosition,
}

/// `output: spike`
#[derive(Debug, Clone)]
pub struct OutputBlock {
    pub id: NodeId,
    pub kind: SignalKind,
    pub pos: SourcePosition,
}

/// `update: ... end`
#[derive(Debug, Clone)]
pub struct UpdateBlock {
    pub id: NodeId,
    pub block: Block,
    pub pos: SourcePosition,
}

/// User function definition
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<DataType>,
    pub block: Block,
    pub pos: SourcePosition,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub id: NodeId,
    pub name: String,
    pub data_type: DataType,
    pub pos: SourcePosition,
}

/// Statement list
#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub pos: SourcePosition,
}

/// `[recordable] [function] a, b TYPE [= expr] [[invariant]]`
#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: NodeId,
    pub recordable: bool,
    pub is_function: bool,
    pub variables: Vec<Variable>,
    pub data_type: DataType,
    pub expr: Option<Expr>,
    pub invariant: Option<Expr>,
    pub pos: SourcePosition,
}

// ==================== Statements ====================

#[derive(Debug, Clone)]
pub enum Stmt {
    Declaration(Declaration),
    Assignment(Assignment),
    Call(FunctionCall),
    Return(ReturnStmt),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
}

impl Stmt {
    pub fn pos(&self) -> SourcePosition {
        match self {
            Stmt::Declaration(d) => d.pos,
            Stmt::Assignment(a) => a.pos,
            Stmt::Call(c) => c.pos,
            Stmt::Return(r) => r.pos,
            Stmt::If(i) => i.pos,
            Stmt::For(f) => f.pos,
            Stmt::While(w) => w.pos,
        }
    }
}

/// Assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// Arithmetic operator applied by a compound assignment
    pub fn arith(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: NodeId,
    pub lhs: Variable,
    pub op: AssignOp,
    pub expr: Expr,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub id: NodeId,
    pub expr: Option<Expr>,
    pub pos: SourcePosition,
}

/// `if cond: block` or `elif cond: block`
#[derive(Debug, Clone)]
pub struct IfClause {
    pub id: NodeId,
    pub cond: Expr,
    pub block: Block,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub id: NodeId,
    pub if_clause: IfClause,
    pub elif_clauses: Vec<IfClause>,
    pub else_block: Option<Block>,
    pub pos: SourcePosition,
}

/// `for x in from ... to step s: block end`
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub id: NodeId,
    pub var: String,
    pub from: Expr,
    pub to: Expr,
    pub step: f64,
    pub block: Block,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub id: NodeId,
    pub cond: Expr,
    pub block: Block,
    pub pos: SourcePosition,
}

// ==================== Expressions ====================

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// Numeric literal followed by a unit or variable name (`10 mV`)
    NumericWithUnit { value: Literal, unit: Variable },
    Variable(Variable),
    Call(FunctionCall),
    Paren(Box<Expr>),
    Unary { op: UnaryOp, expr: Box<Expr> },
    Not(Box<Expr>),
    Binary { lhs: Box<Expr>, op: BinOp, rhs: Box<Expr> },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Inf,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Comparison
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Eq | BinOp::Ne | BinOp::Ge | BinOp::Gt
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Ge => ">=",
            BinOp::Gt => ">",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

/// `name(args)`
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub id: NodeId,
    pub name: String,
    pub args: Vec<Expr>,
    pub pos: SourcePosition,
}

/// Variable reference with its differential order (`V_m''` has order 2)
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: NodeId,
    pub name: String,
    pub order: u32,
    pub pos: SourcePosition,
}

impl Variable {
    /// Name followed by one `'` per differential order
    pub fn complete_name(&self) -> String {
        format!("{}{}", self.name, "'".repeat(self.order as usize))
    }

    /// Name with one derivative mark fewer, as declared in `initial_values`
    pub fn name_of_lhs(&self) -> String {
        format!("{}{}", self.name, "'".repeat(self.order.saturating_sub(1) as usize))
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.order == other.order
    }
}

// ==================== Data types ====================

#[derive(Debug, Clone)]
pub struct DataType {
    pub id: NodeId,
    pub kind: DataTypeKind,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone)]
pub enum DataTypeKind {
    Integer,
    Real,
    Boolean,
    String,
    Void,
    Unit(UnitTypeExpr),
}

/// Unit type expression such as `mV`, `1/ms` or `(nS*mV)**2`
#[derive(Debug, Clone)]
pub struct UnitTypeExpr {
    pub id: NodeId,
    pub kind: UnitTypeKind,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone)]
pub enum UnitTypeKind {
    Simple(String),
    Encapsulated(Box<UnitTypeExpr>),
    Pow {
        base: Box<UnitTypeExpr>,
        exponent: i32,
    },
    Mul {
        lhs: Box<UnitTypeExpr>,
        rhs: Box<UnitTypeExpr>,
    },
    Div {
        lhs: UnitNumerator,
        rhs: Box<UnitTypeExpr>,
    },
}

/// Left-hand side of a unit division
#[derive(Debug, Clone)]
pub enum UnitNumerator {
    Number(i64),
    Unit(Box<UnitTypeExpr>),
}

// ==================== Display ====================

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.complete_name())
    }
}

impl fmt::Display for UnitTypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            UnitTypeKind::Simple(name) => write!(f, "{}", name),
            UnitTypeKind::Encapsulated(inner) => write!(f, "({})", inner),
            UnitTypeKind::Pow { base, exponent } => write!(f, "{}**{}", base, exponent),
            UnitTypeKind::Mul { lhs, rhs } => write!(f, "{}*{}", lhs, rhs),
            UnitTypeKind::Div { lhs, rhs } => match lhs {
                UnitNumerator::Number(n) => write!(f, "{}/{}", n, rhs),
                UnitNumerator::Unit(u) => write!(f, "{}/{}", u, rhs),
            },
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DataTypeKind::Integer => write!(f, "integer"),
            DataTypeKind::Real => write!(f, "real"),
            DataTypeKind::Boolean => write!(f, "boolean"),
            DataTypeKind::String => write!(f, "string"),
            DataTypeKind::Void => write!(f, "void"),
            DataTypeKind::Unit(u) => write!(f, "{}", u),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(s) => write!(f, "\"{}\"", s),
            Literal::Inf => write!(f, "inf"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::NumericWithUnit { value, unit } => write!(f, "{} {}", value, unit),
            ExprKind::Variable(var) => write!(f, "{}", var),
            ExprKind::Call(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::Paren(inner) => write!(f, "({})", inner),
            ExprKind::Unary { op, expr } => {
                let sym = match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                    UnaryOp::BitNot => "~",
                };
                write!(f, "{}{}", sym, expr)
            }
            ExprKind::Not(inner) => write!(f, "not {}", inner),
            ExprKind::Binary { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            ExprKind::Ternary { cond, then, otherwise } => {
                write!(f, "{} ? {} : {}", cond, then, otherwise)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn var(name: &str, order: u32, id: u32) -> Variable {
        Variable {
            id: NodeId(id),
            name: name.to_string(),
            order,
            pos: SourcePosition::default(),
        }
    }

    #[test]
    fn test_complete_name_appends_marks() {
        assert_eq!(var("V_m", 2, 0).complete_name(), "V_m''");
        assert_eq!(var("V_m", 2, 0).name_of_lhs(), "V_m'");
        assert_eq!(var("g", 0, 0).name_of_lhs(), "g");
    }

    #[test]
    fn test_variable_equality_needs_name_and_order() {
        assert!(var("V_m", 1, 0) == var("V_m", 1, 7));
        assert!(var("V_m", 1, 0) != var("V_m", 0, 0));
        assert!(var("V_m", 1, 0) != var("I", 1, 0));
    }
}
