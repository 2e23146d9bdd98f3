//! Read-only AST traversal
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending. Children are visited in
//! source order.

use crate::frontend::ast::*;

pub trait Visitor {
    fn visit_neuron(&mut self, neuron: &Neuron) {
        walk_neuron(self, neuron)
    }

    fn visit_var_block(&mut self, block: &VarBlock) {
        walk_var_block(self, block)
    }

    fn visit_declaration(&mut self, decl: &Declaration) {
        walk_declaration(self, decl)
    }

    fn visit_equations_block(&mut self, block: &EquationsBlock) {
        walk_equations_block(self, block)
    }

    fn visit_ode_function(&mut self, func: &OdeFunction) {
        walk_ode_function(self, func)
    }

    fn visit_ode_shape(&mut self, shape: &OdeShape) {
        walk_ode_shape(self, shape)
    }

    fn visit_ode_equation(&mut self, eq: &OdeEquation) {
        walk_ode_equation(self, eq)
    }

    fn visit_input_line(&mut self, line: &InputLine) {
        walk_input_line(self, line)
    }

    fn visit_update_block(&mut self, block: &UpdateBlock) {
        self.visit_block(&block.block)
    }

    fn visit_function(&mut self, func: &FunctionDecl) {
        walk_function(self, func)
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt)
    }

    fn visit_assignment(&mut self, assignment: &Assignment) {
        walk_assignment(self, assignment)
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr)
    }

    fn visit_function_call(&mut self, call: &FunctionCall) {
        walk_function_call(self, call)
    }

    fn visit_variable(&mut self, _var: &Variable) {}

    fn visit_data_type(&mut self, data_type: &DataType) {
        walk_data_type(self, data_type)
    }

    fn visit_unit_type(&mut self, unit: &UnitTypeExpr) {
        walk_unit_type(self, unit)
    }
}

pub fn walk_neuron<V: Visitor + ?Sized>(v: &mut V, neuron: &Neuron) {
    for element in &neuron.body {
        match element {
            BodyElement::Block(block) => v.visit_var_block(block),
            BodyElement::Equations(block) => v.visit_equations_block(block),
            BodyElement::Input(block) => {
                for line in &block.lines {
                    v.visit_input_line(line);
                }
            }
            BodyElement::Output(_) => {}
            BodyElement::Update(block) => v.visit_update_block(block),
            BodyElement::Function(func) => v.visit_function(func),
        }
    }
}

pub fn walk_var_block<V: Visitor + ?Sized>(v: &mut V, block: &VarBlock) {
    for decl in &block.declarations {
        v.visit_declaration(decl);
    }
}

pub fn walk_declaration<V: Visitor + ?Sized>(v: &mut V, decl: &Declaration) {
    for var in &decl.variables {
        v.visit_variable(var);
    }
    v.visit_data_type(&decl.data_type);
    if let Some(expr) = &decl.expr {
        v.visit_expr(expr);
    }
    if let Some(inv) = &decl.invariant {
        v.visit_expr(inv);
    }
}

pub fn walk_equations_block<V: Visitor + ?Sized>(v: &mut V, block: &EquationsBlock) {
    for decl in &block.decls {
        match decl {
            OdeDecl::Function(func) => v.visit_ode_function(func),
            OdeDecl::Shape(shape) => v.visit_ode_shape(shape),
            OdeDecl::Equation(eq) => v.visit_ode_equation(eq),
        }
    }
}

pub fn walk_ode_function<V: Visitor + ?Sized>(v: &mut V, func: &OdeFunction) {
    v.visit_data_type(&func.data_type);
    v.visit_expr(&func.expr);
}

pub fn walk_ode_shape<V: Visitor + ?Sized>(v: &mut V, shape: &OdeShape) {
    v.visit_variable(&shape.lhs);
    v.visit_expr(&shape.rhs);
}

pub fn walk_ode_equation<V: Visitor + ?Sized>(v: &mut V, eq: &OdeEquation) {
    v.visit_variable(&eq.lhs);
    v.visit_expr(&eq.rhs);
}

pub fn walk_input_line<V: Visitor + ?Sized>(v: &mut V, line: &InputLine) {
    if let Some(data_type) = &line.data_type {
        v.visit_data_type(data_type);
    }
}

pub fn walk_function<V: Visitor + ?Sized>(v: &mut V, func: &FunctionDecl) {
    for param in &func.params {
        v.visit_data_type(&param.data_type);
    }
    if let Some(ret) = &func.return_type {
        v.visit_data_type(ret);
    }
    v.visit_block(&func.block);
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Declaration(decl) => v.visit_declaration(decl),
        Stmt::Assignment(assignment) => v.visit_assignment(assignment),
        Stmt::Call(call) => v.visit_function_call(call),
        Stmt::Return(ret) => {
            if let Some(expr) = &ret.expr {
                v.visit_expr(expr);
            }
        }
        Stmt::If(stmt) => {
            for clause in std::iter::once(&stmt.if_clause).chain(&stmt.elif_clauses) {
                v.visit_expr(&clause.cond);
                v.visit_block(&clause.block);
            }
            if let Some(block) = &stmt.else_block {
                v.visit_block(block);
            }
        }
        Stmt::For(stmt) => {
            v.visit_expr(&stmt.from);
            v.visit_expr(&stmt.to);
            v.visit_block(&stmt.block);
        }
        Stmt::While(stmt) => {
            v.visit_expr(&stmt.cond);
            v.visit_block(&stmt.block);
        }
    }
}

pub fn walk_assignment<V: Visitor + ?Sized>(v: &mut V, assignment: &Assignment) {
    v.visit_variable(&assignment.lhs);
    v.visit_expr(&assignment.expr);
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::NumericWithUnit { unit, .. } => v.visit_variable(unit),
        ExprKind::Variable(var) => v.visit_variable(var),
        ExprKind::Call(call) => v.visit_function_call(call),
        ExprKind::Paren(inner) | ExprKind::Not(inner) => v.visit_expr(inner),
        ExprKind::Unary { expr, .. } => v.visit_expr(expr),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Ternary { cond, then, otherwise } => {
            v.visit_expr(cond);
            v.visit_expr(then);
            v.visit_expr(otherwise);
        }
    }
}

pub fn walk_function_call<V: Visitor + ?Sized>(v: &mut V, call: &FunctionCall) {
    for arg in &call.args {
        v.visit_expr(arg);
    }
}

pub fn walk_data_type<V: Visitor + ?Sized>(v: &mut V, data_type: &DataType) {
    if let DataTypeKind::Unit(unit) = &data_type.kind {
        v.visit_unit_type(unit);
    }
}

pub fn walk_unit_type<V: Visitor + ?Sized>(v: &mut V, unit: &UnitTypeExpr) {
    match &unit.kind {
        UnitTypeKind::Simple(_) => {}
        UnitTypeKind::Encapsulated(inner) => v.visit_unit_type(inner),
        UnitTypeKind::Pow { base, .. } => v.visit_unit_type(base),
        UnitTypeKind::Mul { lhs, rhs } => {
            v.visit_unit_type(lhs);
            v.visit_unit_type(rhs);
        }
        UnitTypeKind::Div { lhs, rhs } => {
            if let UnitNumerator::Unit(u) = lhs {
                v.visit_unit_type(u);
            }
            v.visit_unit_type(rhs);
        }
    }
}

// ==================== Mutable variable walk ====================

/// Apply `f` to every variable reference in `neuron`, in source order
pub fn for_each_variable_mut(neuron: &mut Neuron, f: &mut dyn FnMut(&mut Variable)) {
    for element in &mut neuron.body {
        match element {
            BodyElement::Block(block) => {
                for decl in &mut block.declarations {
                    declaration_variables_mut(decl, f);
                }
            }
            BodyElement::Equations(block) => {
                for decl in &mut block.decls {
                    match decl {
                        OdeDecl::Function(func) => expr_variables_mut(&mut func.expr, f),
                        OdeDecl::Shape(shape) => {
                            f(&mut shape.lhs);
                            expr_variables_mut(&mut shape.rhs, f);
                        }
                        OdeDecl::Equation(eq) => {
                            f(&mut eq.lhs);
                            expr_variables_mut(&mut eq.rhs, f);
                        }
                    }
                }
            }
            BodyElement::Update(block) => block_variables_mut(&mut block.block, f),
            BodyElement::Function(func) => block_variables_mut(&mut func.block, f),
            BodyElement::Input(_) | BodyElement::Output(_) => {}
        }
    }
}

fn declaration_variables_mut(decl: &mut Declaration, f: &mut dyn FnMut(&mut Variable)) {
    for var in &mut decl.variables {
        f(var);
    }
    if let Some(expr) = &mut decl.expr {
        expr_variables_mut(expr, f);
    }
    if let Some(inv) = &mut decl.invariant {
        expr_variables_mut(inv, f);
    }
}

fn block_variables_mut(block: &mut Block, f: &mut dyn FnMut(&mut Variable)) {
    for stmt in &mut block.stmts {
        match stmt {
            Stmt::Declaration(decl) => declaration_variables_mut(decl, f),
            Stmt::Assignment(assignment) => {
                f(&mut assignment.lhs);
                expr_variables_mut(&mut assignment.expr, f);
            }
            Stmt::Call(call) => {
                for arg in &mut call.args {
                    expr_variables_mut(arg, f);
                }
            }
            Stmt::Return(ret) => {
                if let Some(expr) = &mut ret.expr {
                    expr_variables_mut(expr, f);
                }
            }
            Stmt::If(stmt) => {
                expr_variables_mut(&mut stmt.if_clause.cond, f);
                block_variables_mut(&mut stmt.if_clause.block, f);
                for clause in &mut stmt.elif_clauses {
                    expr_variables_mut(&mut clause.cond, f);
                    block_variables_mut(&mut clause.block, f);
                }
                if let Some(block) = &mut stmt.else_block {
                    block_variables_mut(block, f);
                }
            }
            Stmt::For(stmt) => {
                expr_variables_mut(&mut stmt.from, f);
                expr_variables_mut(&mut stmt.to, f);
                block_variables_mut(&mut stmt.block, f);
            }
            Stmt::While(stmt) => {
                expr_variables_mut(&mut stmt.cond, f);
                block_variables_mut(&mut stmt.block, f);
            }
        }
    }
}

fn expr_variables_mut(expr: &mut Expr, f: &mut dyn FnMut(&mut Variable)) {
    match &mut expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::NumericWithUnit { unit, .. } => f(unit),
        ExprKind::Variable(var) => f(var),
        ExprKind::Call(call) => {
            for arg in &mut call.args {
                expr_variables_mut(arg, f);
            }
        }
        ExprKind::Paren(inner) | ExprKind::Not(inner) => expr_variables_mut(inner, f),
        ExprKind::Unary { expr, .. } => expr_variables_mut(expr, f),
        ExprKind::Binary { lhs, rhs, .. } => {
            expr_variables_mut(lhs, f);
            expr_variables_mut(rhs, f);
        }
        ExprKind::Ternary { cond, then, otherwise } => {
            expr_variables_mut(cond, f);
            expr_variables_mut(then, f);
            expr_variables_mut(otherwise, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_model;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct NameCollector {
        names: Vec<String>,
    }

    impl Visitor for NameCollector {
        fn visit_variable(&mut self, var: &Variable) {
            self.names.push(var.complete_name());
        }
    }

    #[test]
    fn test_visits_variables_in_source_order() {
        let unit = parse_model(
            "neuron n:\n  state:\n    V_m mV = E_L\n  end\n  equations:\n    V_m' = -V_m / tau\n  end\n  update:\n    if V_m > V_th:\n      V_m = E_L\n    end\n  end\nend",
        )
        .expect("model should parse");

        let mut collector = NameCollector::default();
        collector.visit_neuron(&unit.neurons[0]);
        assert_eq!(
            collector.names,
            vec!["V_m", "E_L", "V_m'", "V_m", "tau", "V_m", "V_th", "V_m", "E_L"]
        );
    }

    #[test]
    fn test_mutable_walk_reaches_every_variable() {
        let mut unit = parse_model("neuron n:\n  update:\n    x = foo(y, z + 1)\n  end\nend")
            .expect("model should parse");
        let mut count = 0;
        for_each_variable_mut(&mut unit.neurons[0], &mut |v| {
            v.name.make_ascii_uppercase();
            count += 1;
        });
        assert_eq!(count, 3);
    }
}
