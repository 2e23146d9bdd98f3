//! Differential-order renaming
//!
//! Rewrites derivative marks into plain names before symbol tables are
//! built: `g_in''` becomes `g_in__dd`. The left-hand side of an ODE or shape
//! keeps a single mark, so `g'' = ...` becomes `g__d' = ...` and still refers
//! to the initial value `g'` (now `g__d`) declared for it.

use crate::frontend::ast::{BodyElement, CompilationUnit, Neuron, NodeId, OdeDecl};
use crate::frontend::visitor::for_each_variable_mut;
use log::debug;
use std::collections::HashSet;

/// Apply the renaming to every neuron of the unit
pub fn rename_differential_orders(unit: &mut CompilationUnit) {
    for neuron in &mut unit.neurons {
        rename_in_neuron(neuron);
    }
}

fn rename_in_neuron(neuron: &mut Neuron) {
    // Left-hand sides drop one mark now and get it back at the end
    let mut restore: HashSet<NodeId> = HashSet::new();
    for element in &mut neuron.body {
        let BodyElement::Equations(block) = element else {
            continue;
        };
        for decl in &mut block.decls {
            let lhs = match decl {
                OdeDecl::Equation(eq) => &mut eq.lhs,
                OdeDecl::Shape(shape) => &mut shape.lhs,
                OdeDecl::Function(_) => continue,
            };
            if lhs.order > 0 {
                lhs.order -= 1;
                restore.insert(lhs.id);
            }
        }
    }

    let mut renamed = 0usize;
    for_each_variable_mut(neuron, &mut |var| {
        if var.order > 0 {
            var.name = format!("{}__{}", var.name, "d".repeat(var.order as usize));
            var.order = 0;
            renamed += 1;
        }
        if restore.contains(&var.id) {
            var.order = 1;
        }
    });

    debug!(
        "neuron '{}': {} derivative variables renamed, {} ODE left-hand sides kept",
        neuron.name,
        renamed,
        restore.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{OdeDecl, Stmt};
    use crate::frontend::parser::parse_model;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "neuron n:
  initial_values:
    g nS = 0 nS
    g' nS/ms = 0 nS/ms
  end
  equations:
    g'' = -g' / tau
    V_m' = -V_m / tau
    shape s = exp(-t)
  end
  update:
    x = g'' + V_m'
  end
end";

    fn lhs_names(unit: &CompilationUnit) -> Vec<String> {
        unit.neurons[0]
            .equations_blocks()
            .flat_map(|b| b.decls.iter())
            .filter_map(|d| match d {
                OdeDecl::Equation(eq) => Some(eq.lhs.complete_name()),
                OdeDecl::Shape(s) => Some(s.lhs.complete_name()),
                OdeDecl::Function(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_lhs_keeps_one_mark() {
        let mut unit = parse_model(MODEL).expect("model should parse");
        rename_differential_orders(&mut unit);
        assert_eq!(lhs_names(&unit), vec!["g__d'", "V_m'", "s"]);
    }

    #[test]
    fn test_other_variables_are_renamed() {
        let mut unit = parse_model(MODEL).expect("model should parse");
        rename_differential_orders(&mut unit);

        let neuron = &unit.neurons[0];
        let declared: Vec<String> = neuron
            .var_blocks()
            .flat_map(|b| b.declarations.iter())
            .flat_map(|d| d.variables.iter().map(|v| v.complete_name()))
            .collect();
        assert_eq!(declared, vec!["g", "g__d"]);

        let update = neuron.update_blocks().next().expect("update block");
        match &update.block.stmts[0] {
            Stmt::Assignment(a) => assert_eq!(a.expr.to_string(), "g__dd + V_m__d"),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_renaming_is_idempotent() {
        let mut unit = parse_model(MODEL).expect("model should parse");
        rename_differential_orders(&mut unit);
        let once = lhs_names(&unit);
        rename_differential_orders(&mut unit);
        assert_eq!(lhs_names(&unit), once);
    }
}
