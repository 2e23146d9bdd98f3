//! Expression type checking
//!
//! Computes a [`TypeSymbol`] for every expression of a neuron and records it
//! in a [`NodeTypes`] table keyed by node id. A failing expression gets the
//! `Error` type; it is reported once where it fails and silently propagated
//! by every enclosing expression.

use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::*;
use crate::frontend::symbol_table::{SymbolKind, SymbolTable};
use crate::frontend::visitor::{self, Visitor};
use crate::types::{CompilationContext, TypeSymbol, Unit};
use crate::utils::SourcePosition;
use log::debug;
use std::collections::HashMap;

/// Types computed for the nodes of one neuron
#[derive(Debug, Default)]
pub struct NodeTypes {
    types: HashMap<NodeId, TypeSymbol>,
}

impl NodeTypes {
    pub fn get(&self, id: NodeId) -> Option<&TypeSymbol> {
        self.types.get(&id)
    }

    /// Type of `id`, `Error` when the node was never typed
    pub fn type_of(&self, id: NodeId) -> TypeSymbol {
        self.get(id).cloned().unwrap_or_else(TypeSymbol::error)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Predefined functions whose result has the unit of their buffer argument
const BUFFER_SUMS: &[&str] = &["convolve", "curr_sum", "cond_sum"];

pub struct TypeChecker<'a> {
    table: &'a SymbolTable,
    ctx: &'a mut CompilationContext,
    sink: &'a mut Diagnostics,
    types: NodeTypes,
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        table: &'a SymbolTable,
        ctx: &'a mut CompilationContext,
        sink: &'a mut Diagnostics,
    ) -> Self {
        Self {
            table,
            ctx,
            sink,
            types: NodeTypes::default(),
        }
    }

    /// Type every expression, assignment and call statement of `neuron`
    pub fn check_neuron(
        neuron: &Neuron,
        table: &'a SymbolTable,
        ctx: &'a mut CompilationContext,
        sink: &'a mut Diagnostics,
    ) -> NodeTypes {
        let mut checker = Self::new(table, ctx, sink);
        checker.visit_neuron(neuron);
        debug!("neuron '{}': {} nodes typed", neuron.name, checker.types.len());
        checker.types
    }

    /// Memoized type of `expr`; the cached symbol is cloned on every read
    pub fn expr_type(&mut self, expr: &Expr) -> TypeSymbol {
        if let Some(ty) = self.types.get(expr.id) {
            return ty.clone();
        }
        let ty = self.compute(expr);
        self.types.types.insert(expr.id, ty.clone());
        ty
    }

    fn compute(&mut self, expr: &Expr) -> TypeSymbol {
        match &expr.kind {
            ExprKind::Literal(lit) => literal_type(lit),
            ExprKind::NumericWithUnit { unit, .. } => {
                let ty = self.variable_type(unit);
                if ty.is_error() || ty.is_numeric() {
                    TypeSymbol { is_buffer: false, ..ty }
                } else {
                    self.sink.error(
                        MessageCode::TypeMismatch,
                        format!("Numeric literal cannot be scaled by '{}' of type '{}'.", unit, ty),
                        unit.pos,
                    );
                    TypeSymbol::error()
                }
            }
            ExprKind::Variable(var) => self.variable_type(var),
            ExprKind::Call(call) => {
                let ty = self.call_type(call);
                if ty.is_void() {
                    self.sink.error(
                        MessageCode::VoidFunctionInExpr,
                        format!(
                            "Function '{}' with return-type 'void' cannot be used in expressions!",
                            call.name
                        ),
                        call.pos,
                    );
                    return TypeSymbol::error();
                }
                ty
            }
            ExprKind::Paren(inner) => self.expr_type(inner),
            ExprKind::Unary { op, expr: inner } => {
                let ty = self.expr_type(inner);
                self.unary_type(*op, ty, expr.pos)
            }
            ExprKind::Not(inner) => {
                let ty = self.expr_type(inner);
                if ty.is_error() || ty.is_boolean() {
                    return ty;
                }
                self.sink.error(
                    MessageCode::TypeDifferentFromExpected,
                    format!("Operand of 'not' must be of type 'boolean', got '{}'.", ty),
                    expr.pos,
                );
                TypeSymbol::error()
            }
            ExprKind::Binary { lhs, op, rhs } => {
                let l = self.expr_type(lhs);
                let r = self.expr_type(rhs);
                self.binary_type(*op, &l, &r, rhs, expr.pos)
            }
            ExprKind::Ternary { cond, then, otherwise } => {
                let c = self.expr_type(cond);
                let a = self.expr_type(then);
                let b = self.expr_type(otherwise);
                if c.is_error() {
                    return c;
                }
                if !c.is_boolean() {
                    self.sink.error(
                        MessageCode::ConditionNotBool,
                        format!("Condition of ternary operator expected a bool but got '{}'.", c),
                        cond.pos,
                    );
                    return TypeSymbol::error();
                }
                if a.is_error() || b.is_error() {
                    return TypeSymbol::error();
                }
                if a == b {
                    return a;
                }
                self.sink.warning(
                    MessageCode::TypeMismatch,
                    format!(
                        "Mismatched conditional alternatives '{}' and '{}', assuming real.",
                        a, b
                    ),
                    expr.pos,
                );
                TypeSymbol::real()
            }
        }
    }

    /// Resolve a variable reference; unit names stand for their unit type
    fn variable_type(&mut self, var: &Variable) -> TypeSymbol {
        let name = var.complete_name();
        let table = self.table;
        if let Some(symbol) = table.resolve_from(var.id, &name, SymbolKind::Variable) {
            if let Some(info) = symbol.as_variable() {
                return info.ty.clone();
            }
        }
        if var.order == 0 {
            if let Some(unit) = self.ctx.lookup_unit(&var.name) {
                return TypeSymbol::unit(unit);
            }
        }
        self.sink.error(
            MessageCode::SymbolNotResolved,
            format!("Could not resolve symbol '{}'.", name),
            var.pos,
        );
        TypeSymbol::error()
    }

    /// Return type of a call after checking its arguments
    fn call_type(&mut self, call: &FunctionCall) -> TypeSymbol {
        let args: Vec<TypeSymbol> = call.args.iter().map(|a| self.expr_type(a)).collect();

        let table = self.table;
        let Some(symbol) = table.resolve_from(call.id, &call.name, SymbolKind::Function) else {
            self.sink.error(
                MessageCode::FunctionNotDeclared,
                format!("Function '{}' is not declared!", call.name),
                call.pos,
            );
            return TypeSymbol::error();
        };
        let Some(function) = symbol.as_function() else {
            return TypeSymbol::error();
        };

        if args.len() != function.params.len() {
            self.sink.error(
                MessageCode::WrongNumberOfArgs,
                format!(
                    "Wrong number of arguments in function-call '{}'! expected '{}', found '{}'.",
                    call.name,
                    function.params.len(),
                    args.len()
                ),
                call.pos,
            );
            return TypeSymbol::error();
        }

        // Convolutions take the type of the buffer they sum over
        if symbol.is_predefined() && BUFFER_SUMS.contains(&call.name.as_str()) {
            return match args.last() {
                Some(buffer) if !args.iter().any(TypeSymbol::is_error) => plain(buffer),
                _ => TypeSymbol::error(),
            };
        }

        let mut failed = false;
        for (i, ((arg, param), expr)) in args.iter().zip(&function.params).zip(&call.args).enumerate() {
            if arg.is_error() || param.is_error() {
                failed = true;
                continue;
            }
            if arg == param {
                continue;
            }
            if arg.differs_in_magnitude(param) || arg.is_castable_to(param) {
                self.sink.warning(
                    MessageCode::ImplicitCast,
                    format!(
                        "Implicit casting of argument {} of '{}' from type '{}' to '{}'.",
                        i + 1,
                        call.name,
                        arg,
                        param
                    ),
                    expr.pos,
                );
            } else {
                self.sink.error(
                    MessageCode::FunctionCallTypeError,
                    format!(
                        "Argument {} of function-call '{}' has type '{}', expected '{}'.",
                        i + 1,
                        call.name,
                        arg,
                        param
                    ),
                    expr.pos,
                );
                failed = true;
            }
        }

        if failed {
            TypeSymbol::error()
        } else {
            function.ret.clone()
        }
    }

    fn unary_type(&mut self, op: UnaryOp, ty: TypeSymbol, pos: SourcePosition) -> TypeSymbol {
        if ty.is_error() {
            return ty;
        }
        match op {
            UnaryOp::Plus | UnaryOp::Minus if ty.is_numeric() => ty,
            UnaryOp::BitNot if ty.is_integer() => ty,
            UnaryOp::Plus | UnaryOp::Minus => {
                self.sink.error(
                    MessageCode::OperationNotDefined,
                    format!("Cannot perform an arithmetic operation on a non-numeric type '{}'.", ty),
                    pos,
                );
                TypeSymbol::error()
            }
            UnaryOp::BitNot => {
                self.sink.error(
                    MessageCode::OperationNotDefined,
                    format!("Operation '~' is only defined for integers, got '{}'.", ty),
                    pos,
                );
                TypeSymbol::error()
            }
        }
    }

    fn binary_type(
        &mut self,
        op: BinOp,
        lhs: &TypeSymbol,
        rhs: &TypeSymbol,
        rhs_expr: &Expr,
        pos: SourcePosition,
    ) -> TypeSymbol {
        if lhs.is_error() || rhs.is_error() {
            return TypeSymbol::error();
        }
        let result = if op.is_comparison() {
            self.comparison_type(op, lhs, rhs, pos)
        } else if op.is_logical() {
            if lhs.is_boolean() && rhs.is_boolean() {
                Some(TypeSymbol::boolean())
            } else {
                self.sink.error(
                    MessageCode::TypeDifferentFromExpected,
                    format!(
                        "Both operands of '{}' must be of type 'boolean', got '{}' and '{}'.",
                        op.symbol(),
                        lhs,
                        rhs
                    ),
                    pos,
                );
                return TypeSymbol::error();
            }
        } else if op.is_bitwise() {
            (lhs.is_integer() && rhs.is_integer()).then(TypeSymbol::integer)
        } else {
            match op {
                BinOp::Add | BinOp::Sub => self.additive_type(op, lhs, rhs, pos),
                BinOp::Mul | BinOp::Div => self.multiplicative_type(op, lhs, rhs, pos),
                BinOp::Mod => modulo_type(lhs, rhs),
                _ => self.power_type(lhs, rhs, rhs_expr, pos),
            }
        };

        // `None` means no rule applies; rules that reported return `Error`
        result.unwrap_or_else(|| {
            self.sink.error(
                MessageCode::OperationNotDefined,
                format!(
                    "Operation '{}' is not defined for types '{}' and '{}'.",
                    op.symbol(),
                    lhs,
                    rhs
                ),
                pos,
            );
            TypeSymbol::error()
        })
    }

    fn comparison_type(
        &mut self,
        op: BinOp,
        lhs: &TypeSymbol,
        rhs: &TypeSymbol,
        pos: SourcePosition,
    ) -> Option<TypeSymbol> {
        if lhs.is_boolean() && rhs.is_boolean() {
            return Some(TypeSymbol::boolean());
        }
        if lhs.is_numeric() && rhs.is_numeric() {
            if lhs.differs_in_magnitude(rhs) {
                self.sink.warning(
                    MessageCode::ImplicitCast,
                    format!("Implicit magnitude conversion from '{}' to '{}'.", rhs, lhs),
                    pos,
                );
            } else if lhs != rhs && (lhs.is_unit() || rhs.is_unit()) {
                self.sink.warning(
                    MessageCode::SoftIncompatibility,
                    format!(
                        "Comparison '{}' of '{}' and '{}' is only softly compatible.",
                        op.symbol(),
                        lhs,
                        rhs
                    ),
                    pos,
                );
            }
            return Some(TypeSymbol::boolean());
        }
        self.sink.error(
            MessageCode::HardIncompatibility,
            format!(
                "Operands of '{}' are incompatible: '{}' and '{}'.",
                op.symbol(),
                lhs,
                rhs
            ),
            pos,
        );
        Some(TypeSymbol::error())
    }

    fn additive_type(
        &mut self,
        op: BinOp,
        lhs: &TypeSymbol,
        rhs: &TypeSymbol,
        pos: SourcePosition,
    ) -> Option<TypeSymbol> {
        if op == BinOp::Add && lhs.is_string() && rhs.is_string() {
            return Some(TypeSymbol::string());
        }
        if lhs.is_numeric_primitive() && rhs.is_numeric_primitive() {
            return Some(primitive_result(lhs, rhs));
        }
        match (lhs.as_unit(), rhs.as_unit()) {
            (Some(a), Some(b)) => {
                if a == b {
                    return Some(plain(lhs));
                }
                if a.differs_in_magnitude(b) {
                    let (wider, narrower) = if a.scale() >= b.scale() { (lhs, rhs) } else { (rhs, lhs) };
                    self.sink.warning(
                        MessageCode::ImplicitCast,
                        format!(
                            "Implicit magnitude conversion from '{}' to '{}'.",
                            narrower, wider
                        ),
                        pos,
                    );
                    return Some(plain(wider));
                }
                self.sink.error(
                    MessageCode::AddSubTypeMismatch,
                    format!(
                        "Type mismatch in '{}': cast not possible from '{}' to '{}'.",
                        op.symbol(),
                        rhs,
                        lhs
                    ),
                    pos,
                );
                Some(TypeSymbol::error())
            }
            (Some(_), None) | (None, Some(_))
                if lhs.is_numeric() && rhs.is_numeric() =>
            {
                let (unit, other) = if lhs.is_unit() { (lhs, rhs) } else { (rhs, lhs) };
                self.sink.warning(
                    MessageCode::ImplicitCast,
                    format!("Implicit casting from '{}' to '{}'.", other, unit),
                    pos,
                );
                Some(plain(unit))
            }
            _ => None,
        }
    }

    fn multiplicative_type(
        &mut self,
        op: BinOp,
        lhs: &TypeSymbol,
        rhs: &TypeSymbol,
        pos: SourcePosition,
    ) -> Option<TypeSymbol> {
        if !lhs.is_numeric() || !rhs.is_numeric() {
            return None;
        }
        let derived = match (lhs.as_unit(), rhs.as_unit(), op) {
            (Some(a), Some(b), BinOp::Mul) => self.ctx.multiply(a, b),
            (Some(a), Some(b), _) => self.ctx.divide(a, b),
            (Some(_), None, _) => Some(plain(lhs)),
            (None, Some(_), BinOp::Mul) => Some(plain(rhs)),
            (None, Some(b), _) => self.ctx.divide(&Unit::one(), b),
            (None, None, _) => Some(primitive_result(lhs, rhs)),
        };
        Some(derived.unwrap_or_else(|| {
            self.unit_overflow(&format!("{} {} {}", lhs, op.symbol(), rhs), pos)
        }))
    }

    fn power_type(
        &mut self,
        base: &TypeSymbol,
        exponent: &TypeSymbol,
        exponent_expr: &Expr,
        pos: SourcePosition,
    ) -> Option<TypeSymbol> {
        if !base.is_numeric() || !exponent.is_numeric_primitive() {
            return None;
        }
        let Some(unit) = base.as_unit() else {
            return Some(primitive_result(base, exponent));
        };
        match const_int(exponent_expr).and_then(|n| i32::try_from(n).ok()) {
            Some(n) => Some(self.ctx.power(unit, n).unwrap_or_else(|| {
                self.unit_overflow(&format!("{}**{}", base, exponent_expr), pos)
            })),
            None => {
                self.sink.error(
                    MessageCode::OperationNotDefined,
                    format!(
                        "Exponent of unit '{}' must be an integer constant, got '{}'.",
                        base, exponent_expr
                    ),
                    pos,
                );
                Some(TypeSymbol::error())
            }
        }
    }

    /// A derived unit whose exponents do not fit
    fn unit_overflow(&mut self, what: &str, pos: SourcePosition) -> TypeSymbol {
        self.sink.error(
            MessageCode::OperationNotDefined,
            format!("Unit of '{}' is out of range: exponent overflow.", what),
            pos,
        );
        TypeSymbol::error()
    }

    fn check_assignment(&mut self, assignment: &Assignment) {
        let lhs = &assignment.lhs;
        let name = lhs.complete_name();
        let table = self.table;
        let lhs_ty = match table
            .resolve_from(lhs.id, &name, SymbolKind::Variable)
            .and_then(|s| s.as_variable())
        {
            Some(info) => info.ty.clone(),
            None => {
                self.sink.error(
                    MessageCode::NoVariableFound,
                    format!("Variable '{}' not found!", name),
                    lhs.pos,
                );
                TypeSymbol::error()
            }
        };
        self.types.types.insert(lhs.id, lhs_ty.clone());

        let rhs_ty = self.expr_type(&assignment.expr);
        // Compound assignments store the type of `lhs op rhs`
        let effective = match assignment.op.arith() {
            Some(op) => self.binary_type(op, &lhs_ty, &rhs_ty, &assignment.expr, assignment.pos),
            None => rhs_ty,
        };
        self.types.types.insert(assignment.id, effective);
    }
}

impl Visitor for TypeChecker<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        self.expr_type(expr);
    }

    fn visit_function_call(&mut self, call: &FunctionCall) {
        let ty = self.call_type(call);
        self.types.types.insert(call.id, ty);
    }

    fn visit_assignment(&mut self, assignment: &Assignment) {
        self.check_assignment(assignment);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::For(for_stmt) = stmt {
            if self
                .table
                .resolve_from(for_stmt.from.id, &for_stmt.var, SymbolKind::Variable)
                .is_none()
            {
                self.sink.error(
                    MessageCode::NoVariableFound,
                    format!("Variable '{}' not found!", for_stmt.var),
                    for_stmt.pos,
                );
            }
        }
        visitor::walk_stmt(self, stmt);
    }
}

fn literal_type(lit: &Literal) -> TypeSymbol {
    match lit {
        Literal::Int(_) => TypeSymbol::integer(),
        Literal::Float(_) | Literal::Inf => TypeSymbol::real(),
        Literal::Bool(_) => TypeSymbol::boolean(),
        Literal::Str(_) => TypeSymbol::string(),
    }
}

/// integer op integer stays integer, anything else with real is real
fn primitive_result(lhs: &TypeSymbol, rhs: &TypeSymbol) -> TypeSymbol {
    if lhs.is_integer() && rhs.is_integer() {
        TypeSymbol::integer()
    } else {
        TypeSymbol::real()
    }
}

fn modulo_type(lhs: &TypeSymbol, rhs: &TypeSymbol) -> Option<TypeSymbol> {
    if lhs.is_numeric_primitive() && rhs.is_numeric_primitive() {
        return Some(primitive_result(lhs, rhs));
    }
    match (lhs.as_unit(), rhs.as_unit()) {
        (Some(a), Some(b)) if a.same_dimension(b) => Some(plain(lhs)),
        _ => None,
    }
}

/// Drop buffer flag and origin of an operand type
fn plain(ty: &TypeSymbol) -> TypeSymbol {
    TypeSymbol::new(ty.kind.clone())
}

/// Value of an integer constant expression (`2`, `-3`, `(2)`)
fn const_int(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(n)) => Some(*n),
        ExprKind::Paren(inner) => const_int(inner),
        ExprKind::Unary { op: UnaryOp::Minus, expr } => const_int(expr).map(|n| -n),
        ExprKind::Unary { op: UnaryOp::Plus, expr } => const_int(expr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::frontend::parser::parse_model;
    use crate::frontend::symbol_table::SymbolTableBuilder;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "neuron n:
  state:
    V_m mV = 0 mV
    I pA = 0 pA
    flag boolean = true
    n integer = 1
  end
  function foo(a real, b real, c real) real:
    return a
  end
  update:
";

    /// Type the initializer of `probe real = <expr>` inside the update block
    fn type_of(expr: &str) -> (TypeSymbol, Diagnostics) {
        let source = format!("{}    probe real = {}\n  end\nend", HEADER, expr);
        let unit = parse_model(&source).expect("model should parse");
        let neuron = &unit.neurons[0];
        let mut ctx = CompilationContext::new();
        let mut sink = Diagnostics::new();
        let table = SymbolTableBuilder::build(neuron, &mut ctx, &mut sink);
        let types = TypeChecker::check_neuron(neuron, &table, &mut ctx, &mut sink);

        let update = neuron.update_blocks().next().expect("update block");
        let Some(Stmt::Declaration(decl)) = update.block.stmts.last() else {
            panic!("expected probe declaration");
        };
        let expr = decl.expr.as_ref().expect("initializer");
        (types.type_of(expr.id), sink)
    }

    fn codes(sink: &Diagnostics) -> Vec<(u16, Severity)> {
        sink.entries().iter().map(|d| (d.code.code(), d.severity)).collect()
    }

    /// Diagnostics of type checking `HEADER` with `stmts` in the update block
    fn check_update(stmts: &str) -> Diagnostics {
        let source = format!("{}{}\n  end\nend", HEADER, stmts);
        let unit = parse_model(&source).expect("model should parse");
        let neuron = &unit.neurons[0];
        let mut ctx = CompilationContext::new();
        let mut sink = Diagnostics::new();
        let table = SymbolTableBuilder::build(neuron, &mut ctx, &mut sink);
        TypeChecker::check_neuron(neuron, &table, &mut ctx, &mut sink);
        sink
    }

    #[test]
    fn test_literals_and_units() {
        assert_eq!(type_of("1").0.name(), "integer");
        assert_eq!(type_of("1.5").0.name(), "real");
        assert_eq!(type_of("10 mV").0.name(), "mV");
        assert_eq!(type_of("\"x\"").0.name(), "string");
    }

    #[test]
    fn test_unit_algebra_in_expressions() {
        assert_eq!(type_of("V_m / ms").0.name(), "mV/ms");
        assert_eq!(type_of("V_m * V_m").0.name(), "mV**2");
        assert_eq!(type_of("1 / V_m").0.name(), "1/mV");
        assert_eq!(type_of("V_m ** 2").0.name(), "mV**2");
        assert_eq!(type_of("V_m / mV").0.name(), "real");
        assert!(type_of("V_m / ms").1.is_empty());
    }

    #[test]
    fn test_non_constant_exponent_is_an_error() {
        let (ty, sink) = type_of("V_m ** n");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(57, Severity::Error)]);
    }

    #[test]
    fn test_add_with_different_prefix_warns_and_widens() {
        let (ty, sink) = type_of("V_m + 1 V");
        assert_eq!(ty.name(), "V");
        assert_eq!(codes(&sink), vec![(5, Severity::Warning)]);
    }

    #[test]
    fn test_add_across_dimensions_is_an_error() {
        let (ty, sink) = type_of("V_m + I");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(8, Severity::Error)]);
        assert!(sink.entries()[0].message.contains("cast not possible"));
    }

    #[test]
    fn test_unit_vs_real_comparison_warns_once() {
        let (ty, sink) = type_of("V_m > 0.0");
        assert!(ty.is_boolean());
        assert_eq!(codes(&sink), vec![(45, Severity::Warning)]);
    }

    #[test]
    fn test_unit_vs_boolean_comparison_errors_once() {
        let (ty, sink) = type_of("V_m > flag");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(46, Severity::Error)]);
    }

    #[test]
    fn test_errors_are_reported_once() {
        let (ty, sink) = type_of("(undefined + 1) * 2 - V_m");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(49, Severity::Error)]);
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(type_of("-V_m").0.name(), "mV");
        assert_eq!(type_of("~n").0.name(), "integer");
        let (ty, sink) = type_of("-flag");
        assert!(ty.is_error());
        assert!(sink.entries()[0].message.contains("boolean"));
        assert_eq!(codes(&type_of("~1.5").1), vec![(57, Severity::Error)]);
    }

    #[test]
    fn test_ternary() {
        assert_eq!(type_of("flag ? V_m : 1 mV").0.name(), "mV");

        let (ty, sink) = type_of("flag ? V_m : 1.0");
        assert!(ty.is_real());
        assert_eq!(codes(&sink), vec![(50, Severity::Warning)]);

        let (ty, sink) = type_of("V_m ? 1 : 2");
        assert!(ty.is_error());
        assert!(sink.entries()[0].message.contains("expected a bool"));
    }

    #[test]
    fn test_wrong_number_of_arguments() {
        let (ty, sink) = type_of("foo(1.0, 2.0)");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(28, Severity::Error)]);
        assert!(sink.entries()[0].message.contains("expected '3', found '2'"));
    }

    #[test]
    fn test_argument_casts() {
        let (ty, sink) = type_of("exp(V_m)");
        assert!(ty.is_real());
        assert_eq!(codes(&sink), vec![(5, Severity::Warning)]);

        let (ty, sink) = type_of("exp(\"x\")");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(3, Severity::Error)]);
    }

    #[test]
    fn test_convolve_has_buffer_type() {
        let source = "neuron n:
  equations:
    shape g = exp(-t / ms)
  end
  input:
    spikes pA <- spike
  end
  update:
    x pA = convolve(g, spikes)
  end
end";
        let unit = parse_model(source).expect("model should parse");
        let neuron = &unit.neurons[0];
        let mut ctx = CompilationContext::new();
        let mut sink = Diagnostics::new();
        let table = SymbolTableBuilder::build(neuron, &mut ctx, &mut sink);
        let types = TypeChecker::check_neuron(neuron, &table, &mut ctx, &mut sink);

        let update = neuron.update_blocks().next().expect("update block");
        let Stmt::Declaration(decl) = &update.block.stmts[0] else {
            panic!("expected declaration");
        };
        let ty = types.type_of(decl.expr.as_ref().expect("initializer").id);
        assert_eq!(ty.name(), "pA");
        assert!(!ty.is_buffer);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unknown_and_void_functions() {
        assert_eq!(codes(&type_of("bar(1)").1), vec![(52, Severity::Error)]);
        assert_eq!(codes(&type_of("emit_spike()").1), vec![(65, Severity::Error)]);
    }

    #[test]
    fn test_logical_operators() {
        assert!(type_of("flag and not flag").0.is_boolean());
        assert_eq!(codes(&type_of("flag or 1").1), vec![(7, Severity::Error)]);
    }

    #[test]
    fn test_new_types_are_registered() {
        let source = format!("{}    probe real = V_m / ms\n  end\nend", HEADER);
        let unit = parse_model(&source).expect("model should parse");
        let neuron = &unit.neurons[0];
        let mut ctx = CompilationContext::new();
        let mut sink = Diagnostics::new();
        let table = SymbolTableBuilder::build(neuron, &mut ctx, &mut sink);
        TypeChecker::check_neuron(neuron, &table, &mut ctx, &mut sink);
        assert!(ctx.types().contains("mV/ms"));
        assert_eq!(ctx.drain_new_types(), vec!["mV/ms".to_string()]);
    }

    #[test]
    fn test_assignment_to_undeclared_variable() {
        let sink = check_update("    x = 1");
        assert_eq!(codes(&sink), vec![(11, Severity::Error)]);
        assert!(sink.entries()[0].message.contains("'x'"));
    }

    #[test]
    fn test_for_loop_variable_must_be_declared() {
        let sink = check_update("    for j in 0 ... 10:\n    end");
        assert_eq!(codes(&sink), vec![(11, Severity::Error)]);
        assert!(sink.entries()[0].message.contains("'j'"));

        assert!(check_update("    for n in 0 ... 10 step 2:\n      V_m += 1 mV\n    end").is_empty());
    }

    #[test]
    fn test_unit_exponent_overflow_is_an_error() {
        let (ty, sink) = type_of("V_m ** 2000000000");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(57, Severity::Error)]);

        let (ty, sink) = type_of("(V_m ** 600000000) * (V_m ** 600000000)");
        assert!(ty.is_error());
        assert_eq!(codes(&sink), vec![(57, Severity::Error)]);
    }
}
