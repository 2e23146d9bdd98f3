//! Type compatibility of declarations, assignments, conditions and returns

use super::{Coco, NeuronContext};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::*;
use crate::frontend::symbol_table::SymbolTable;
use crate::frontend::type_checker::NodeTypes;
use crate::frontend::visitor::{self, Visitor};
use crate::types::TypeSymbol;
use crate::utils::SourcePosition;

/// Right-hand sides fit their targets and conditions are boolean
pub struct IllegalExpression;

impl Coco for IllegalExpression {
    fn name(&self) -> &'static str {
        "illegal-expression"
    }

    fn description(&self) -> &'static str {
        "assigned values are compatible with their targets and conditions are boolean"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let mut checker = ExpressionChecker {
            table: cx.table,
            types: cx.types,
            sink,
            function: None,
        };
        checker.visit_neuron(cx.neuron);
    }
}

struct ExpressionChecker<'a> {
    table: &'a SymbolTable,
    types: &'a NodeTypes,
    sink: &'a mut Diagnostics,
    /// Name and return type of the enclosing user function
    function: Option<(String, TypeSymbol)>,
}

impl ExpressionChecker<'_> {
    /// A value of type `actual` stored into `target` named `what`
    fn check_compatible(
        &mut self,
        target: &TypeSymbol,
        actual: &TypeSymbol,
        what: &str,
        pos: SourcePosition,
    ) {
        if target.is_error() || actual.is_error() || target == actual {
            return;
        }
        if actual.differs_in_magnitude(target) {
            self.sink.warning(
                MessageCode::ImplicitCast,
                format!(
                    "Implicit magnitude conversion from '{}' to '{}' in '{}'.",
                    actual, target, what
                ),
                pos,
            );
        } else if actual.is_castable_to(target) {
            self.sink.warning(
                MessageCode::ImplicitCast,
                format!(
                    "Implicit casting from (compatible) type '{}' to '{}' in '{}'.",
                    actual, target, what
                ),
                pos,
            );
        } else {
            self.sink.error(
                MessageCode::CastNotPossible,
                format!(
                    "Type of lhs '{}' does not correspond to rhs type '{}' in '{}': cast not possible!",
                    target, actual, what
                ),
                pos,
            );
        }
    }

    fn check_boolean(&mut self, expr: &Expr, what: &str) {
        let ty = self.types.type_of(expr.id);
        if ty.is_error() || ty.is_boolean() {
            return;
        }
        self.sink.error(
            MessageCode::TypeDifferentFromExpected,
            format!("{} must be of type 'boolean', got '{}'.", what, ty),
            expr.pos,
        );
    }
}

impl Visitor for ExpressionChecker<'_> {
    fn visit_declaration(&mut self, decl: &Declaration) {
        let declared = self.table.declared_type(&decl.data_type);
        let names: Vec<String> = decl.variables.iter().map(|v| v.complete_name()).collect();
        let what = names.join(", ");
        if let Some(expr) = &decl.expr {
            let actual = self.types.type_of(expr.id);
            self.check_compatible(&declared, &actual, &what, expr.pos);
        }
        if let Some(inv) = &decl.invariant {
            self.check_boolean(inv, &format!("Invariant of '{}'", what));
        }
    }

    fn visit_ode_function(&mut self, func: &OdeFunction) {
        let declared = self.table.declared_type(&func.data_type);
        let actual = self.types.type_of(func.expr.id);
        self.check_compatible(&declared, &actual, &func.name, func.expr.pos);
    }

    fn visit_assignment(&mut self, assignment: &Assignment) {
        let Some(target) = self.types.get(assignment.lhs.id).cloned() else {
            return;
        };
        let actual = self.types.type_of(assignment.id);
        let what = assignment.lhs.complete_name();
        self.check_compatible(&target, &actual, &what, assignment.expr.pos);
    }

    fn visit_function(&mut self, func: &FunctionDecl) {
        let ret = match &func.return_type {
            Some(data_type) => self.table.declared_type(data_type),
            None => TypeSymbol::void(),
        };
        self.function = Some((func.name.clone(), ret));
        visitor::walk_function(self, func);
        self.function = None;
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(if_stmt) => {
                for clause in std::iter::once(&if_stmt.if_clause).chain(&if_stmt.elif_clauses) {
                    self.check_boolean(&clause.cond, "Condition of 'if'");
                }
            }
            Stmt::While(while_stmt) => self.check_boolean(&while_stmt.cond, "Condition of 'while'"),
            Stmt::Return(ret) => {
                if let (Some((name, expected)), Some(expr)) = (self.function.clone(), &ret.expr) {
                    let actual = self.types.type_of(expr.id);
                    if expected.is_void() {
                        self.sink.error(
                            MessageCode::TypeDifferentFromExpected,
                            format!("Function '{}' with return type 'void' returns a value.", name),
                            ret.pos,
                        );
                    } else {
                        self.check_compatible(&expected, &actual, &name, expr.pos);
                    }
                }
            }
            _ => {}
        }
        visitor::walk_stmt(self, stmt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cocos::test_support::{codes, run_coco};
    use crate::diagnostics::Severity;
    use pretty_assertions::assert_eq;

    fn check(body: &str) -> Diagnostics {
        let source = format!(
            "neuron n:\n  state:\n    V_m mV = 0 mV\n    flag boolean = true\n  end\n{}\nend",
            body
        );
        run_coco(&IllegalExpression, &source)
    }

    #[test]
    fn test_declaration_types() {
        assert!(check("  parameters:\n    a mV = V_m\n  end").is_empty());
        assert_eq!(codes(&check("  parameters:\n    a mV = 1 V\n  end")), vec![5]);
        assert_eq!(codes(&check("  parameters:\n    a real = V_m\n  end")), vec![5]);
        let sink = check("  parameters:\n    a mV = 1 ms\n  end");
        assert_eq!(codes(&sink), vec![6]);
        assert!(sink.entries()[0].message.contains("cast not possible"));
    }

    #[test]
    fn test_real_does_not_cast_to_unit() {
        assert_eq!(codes(&check("  parameters:\n    a mV = 1.5\n  end")), vec![6]);
    }

    #[test]
    fn test_compound_assignment_uses_the_combined_type() {
        assert!(check("  update:\n    V_m += 1 mV\n    V_m *= 2\n  end").is_empty());
        assert_eq!(codes(&check("  update:\n    V_m *= 1 mV\n  end")), vec![6]);
    }

    #[test]
    fn test_conditions_must_be_boolean() {
        let sink = check("  update:\n    if V_m:\n    elif flag:\n    end\n    while 1:\n    end\n  end");
        assert_eq!(codes(&sink), vec![7, 7]);
        assert!(sink.entries().iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_invariant_must_be_boolean() {
        assert!(check("  parameters:\n    a mV = 1 mV [[a > 0 mV]]\n  end").is_empty());
        assert_eq!(codes(&check("  parameters:\n    a mV = 1 mV [[a]]\n  end")), vec![7]);
    }

    #[test]
    fn test_return_types() {
        let body = "  function f(x mV) mV:
    return 1 ms
  end
  function g():
    return 1
  end";
        assert_eq!(codes(&check(body)), vec![6, 7]);
    }

    #[test]
    fn test_errors_from_typing_are_not_repeated() {
        assert!(check("  parameters:\n    a mV = undefined\n  end").is_empty());
    }
}
