//! Equations block checks

use super::{Coco, NeuronContext};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::{OdeDecl, Variable};
use crate::frontend::symbol_table::{SymbolKind, VariableBlock, VariableInfo};
use crate::types::Unit;
use crate::utils::SourcePosition;

/// Left-hand sides of ODE equations and ODE-form shapes
fn ode_lhs<'n>(cx: &NeuronContext<'n>) -> Vec<(&'n Variable, SourcePosition)> {
    cx.neuron
        .equations_blocks()
        .flat_map(|b| b.decls.iter())
        .filter_map(|decl| match decl {
            OdeDecl::Equation(eq) => Some((&eq.lhs, eq.pos)),
            OdeDecl::Shape(shape) if shape.lhs.order > 0 => Some((&shape.lhs, shape.pos)),
            _ => None,
        })
        .collect()
}

/// The variable an ODE left-hand side defines, looked up in the neuron scope
fn lhs_variable<'t>(cx: &NeuronContext<'t>, lhs: &Variable) -> Option<&'t VariableInfo> {
    cx.table
        .resolve(cx.table.root(), &lhs.name_of_lhs(), SymbolKind::Variable)
        .and_then(|s| s.as_variable())
}

/// ODEs are only given for variables of the `initial_values` block
pub struct EquationsOnlyForInitialValues;

impl Coco for EquationsOnlyForInitialValues {
    fn name(&self) -> &'static str {
        "equations-only-for-initial-values"
    }

    fn description(&self) -> &'static str {
        "ODE left-hand sides refer to initial values"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        for (lhs, pos) in ode_lhs(cx) {
            let in_init = lhs_variable(cx, lhs)
                .map_or(false, |info| info.block == VariableBlock::InitialValues);
            if !in_init {
                sink.error(
                    MessageCode::VariableNotInInit,
                    format!(
                        "Ode equation lhs-variable '{}' not defined in initial-values block!",
                        lhs.name_of_lhs()
                    ),
                    pos,
                );
            }
        }
    }
}

/// `x = ...` in an equations block needs at least one derivative mark
pub struct OdeLhsHasOrder;

impl Coco for OdeLhsHasOrder {
    fn name(&self) -> &'static str {
        "ode-lhs-has-order"
    }

    fn description(&self) -> &'static str {
        "ODE left-hand sides carry a differential order"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        for eq in cx.neuron.ode_equations() {
            if eq.lhs.order == 0 {
                sink.error(
                    MessageCode::OrderNotDeclared,
                    format!(
                        "Order of differential equation for '{}' is not declared!",
                        eq.lhs.name
                    ),
                    eq.pos,
                );
            }
        }
    }
}

/// The rhs of `x' = rhs` has the dimension of `x` per time
pub struct OdeCorrectlyTyped;

impl Coco for OdeCorrectlyTyped {
    fn name(&self) -> &'static str {
        "ode-correctly-typed"
    }

    fn description(&self) -> &'static str {
        "ODE right-hand sides have the unit of the lhs divided by time"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let Some(ms) = cx.ctx.lookup_unit("ms") else {
            return;
        };
        for eq in cx.neuron.ode_equations() {
            if eq.lhs.order == 0 {
                continue;
            }
            let Some(info) = lhs_variable(cx, &eq.lhs) else {
                continue;
            };
            let rhs = cx.types.type_of(eq.rhs.id);
            if info.ty.is_error() || rhs.is_error() {
                continue;
            }

            let base = match info.ty.as_unit() {
                Some(unit) => unit.clone(),
                None if info.ty.is_numeric_primitive() => Unit::one(),
                None => continue,
            };
            let Some(expected) = i32::try_from(eq.lhs.order)
                .ok()
                .and_then(|order| ms.power(order))
                .and_then(|per_time| base.divide(&per_time))
            else {
                continue;
            };
            let matches = rhs.as_unit().map_or(false, |u| u.same_dimension(&expected));
            if !matches {
                sink.warning(
                    MessageCode::OdeRhsTypeMismatch,
                    format!(
                        "ODE definition for '{}' has incompatible type: expected a unit like '{}' but got '{}'.",
                        eq.lhs.complete_name(),
                        expected,
                        rhs
                    ),
                    eq.pos,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cocos::test_support::{codes, run_coco};
    use pretty_assertions::assert_eq;

    const MODEL: &str = "neuron n:
  state:
    V_s mV = 0 mV
  end
  initial_values:
    V_m mV = 0 mV
    g nS = 0 nS
    g' nS/ms = 0 nS/ms
  end
  parameters:
    tau ms = 10 ms
  end
  equations:
    V_m' = -V_m / tau
    g'' = -g' / tau
    V_s' = -V_s / tau
  end
end";

    #[test]
    fn test_equations_only_for_initial_values() {
        let sink = run_coco(&EquationsOnlyForInitialValues, MODEL);
        assert_eq!(codes(&sink), vec![27]);
        assert!(sink.entries()[0].message.contains("'V_s'"));
        assert_eq!(sink.entries()[0].position.map(|p| p.start_line), Some(16));
    }

    #[test]
    fn test_ode_shape_needs_initial_values() {
        let source = "neuron n:\n  equations:\n    shape g' = -g / tau\n    shape h = exp(-t / ms)\n  end\nend";
        assert_eq!(codes(&run_coco(&EquationsOnlyForInitialValues, source)), vec![27]);
    }

    #[test]
    fn test_missing_order() {
        let source = "neuron n:\n  initial_values:\n    x real = 0\n  end\n  equations:\n    x = 1\n  end\nend";
        assert_eq!(codes(&run_coco(&OdeLhsHasOrder, source)), vec![24]);
    }

    #[test]
    fn test_well_typed_odes_pass() {
        let source = "neuron n:
  initial_values:
    V_m mV = 0 mV
    g nS = 0 nS
    g' nS/ms = 0 nS/ms
  end
  parameters:
    tau ms = 10 ms
  end
  equations:
    V_m' = -V_m / tau
    g'' = -g' / tau
  end
end";
        assert!(run_coco(&OdeCorrectlyTyped, source).is_empty());
    }

    #[test]
    fn test_ill_typed_ode_warns() {
        let source = "neuron n:\n  initial_values:\n    V_m mV = 0 mV\n  end\n  equations:\n    V_m' = V_m\n  end\nend";
        let sink = run_coco(&OdeCorrectlyTyped, source);
        assert_eq!(codes(&sink), vec![67]);
        assert_eq!(sink.count(crate::diagnostics::Severity::Warning), 1);
    }
}
