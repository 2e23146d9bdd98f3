//! Unit type checks

use super::{Coco, NeuronContext};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::{UnitNumerator, UnitTypeExpr, UnitTypeKind};
use crate::frontend::visitor::{self, Visitor};

/// In a unit type `n/unit` the numerator must be `1`
pub struct UnitNumeratorIsOne;

impl Coco for UnitNumeratorIsOne {
    fn name(&self) -> &'static str {
        "unit-numerator-is-one"
    }

    fn description(&self) -> &'static str {
        "numeric numerators of unit types are 1"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let mut numerators = Numerators { sink };
        numerators.visit_neuron(cx.neuron);
    }
}

struct Numerators<'a> {
    sink: &'a mut Diagnostics,
}

impl Visitor for Numerators<'_> {
    fn visit_unit_type(&mut self, unit: &UnitTypeExpr) {
        if let UnitTypeKind::Div {
            lhs: UnitNumerator::Number(n),
            ..
        } = &unit.kind
        {
            if *n != 1 {
                self.sink.error(
                    MessageCode::NumeratorNotOne,
                    format!("Numeric numerator of unit '{}' not 1!", unit),
                    unit.pos,
                );
            }
        }
        visitor::walk_unit_type(self, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cocos::test_support::{codes, run_coco};
    use pretty_assertions::assert_eq;

    fn check_numerator(n: i64) -> Vec<u16> {
        let source = format!("neuron n:\n  state:\n    x {}/mV\n  end\nend", n);
        codes(&run_coco(&UnitNumeratorIsOne, &source))
    }

    #[test]
    fn test_only_one_is_accepted() {
        assert!(check_numerator(1).is_empty());
        assert_eq!(check_numerator(2), vec![23]);
        assert_eq!(check_numerator(0), vec![23]);
    }

    #[test]
    fn test_nested_and_parameter_types_are_checked() {
        let source = "neuron n:
  function f(a (2/ms)**2) real:
    b 3/nS = 1 / nS
    return 1.0
  end
end";
        let sink = run_coco(&UnitNumeratorIsOne, source);
        assert_eq!(codes(&sink), vec![23, 23]);
        assert!(sink.entries()[0].message.contains("'2/ms'"));
    }
}
