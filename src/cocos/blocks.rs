//! Block structure checks

use super::{Coco, NeuronContext};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::{Block, BodyElement, Stmt};
use std::collections::HashSet;

/// Each kind of block appears at most once per neuron
pub struct EachBlockUnique;

impl Coco for EachBlockUnique {
    fn name(&self) -> &'static str {
        "each-block-unique"
    }

    fn description(&self) -> &'static str {
        "state, parameters, internals, initial_values, equations, input, output and update appear at most once"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let mut seen = HashSet::new();
        for element in &cx.neuron.body {
            let keyword = match element {
                BodyElement::Block(block) => block.kind.keyword(),
                BodyElement::Equations(_) => "equations",
                BodyElement::Input(_) => "input",
                BodyElement::Output(_) => "output",
                BodyElement::Update(_) => "update",
                BodyElement::Function(_) => continue,
            };
            if !seen.insert(keyword) {
                sink.error(
                    MessageCode::BlockNotCorrect,
                    format!(
                        "Block '{}' defined more than once in neuron '{}'!",
                        keyword, cx.neuron.name
                    ),
                    element.pos(),
                );
            }
        }
    }
}

/// Functions with a non-void return type end in `return <expr>`
pub struct FunctionHasReturn;

impl Coco for FunctionHasReturn {
    fn name(&self) -> &'static str {
        "function-has-return"
    }

    fn description(&self) -> &'static str {
        "functions with a return type end with a return statement"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        for func in cx.neuron.functions() {
            let Some(data_type) = &func.return_type else {
                continue;
            };
            let ty = cx.table.declared_type(data_type);
            if ty.is_void() || ty.is_error() {
                continue;
            }
            if !ends_with_return(&func.block) {
                sink.error(
                    MessageCode::NoReturn,
                    format!("Function '{}' must return a value of type '{}'!", func.name, ty),
                    func.pos,
                );
            }
        }
    }
}

/// Last statement returns a value; an `if` counts when every branch does
fn ends_with_return(block: &Block) -> bool {
    match block.stmts.last() {
        Some(Stmt::Return(ret)) => ret.expr.is_some(),
        Some(Stmt::If(stmt)) => {
            let Some(else_block) = &stmt.else_block else {
                return false;
            };
            std::iter::once(&stmt.if_clause)
                .chain(&stmt.elif_clauses)
                .all(|clause| ends_with_return(&clause.block))
                && ends_with_return(else_block)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cocos::test_support::{codes, run_coco};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_duplicate_block_is_reported_at_second() {
        let sink = run_coco(
            &EachBlockUnique,
            "neuron n:\n  state:\n  end\n  parameters:\n  end\n  state:\n  end\nend",
        );
        assert_eq!(codes(&sink), vec![26]);
        assert_eq!(sink.entries()[0].position.map(|p| p.start_line), Some(6));
    }

    #[test]
    fn test_distinct_blocks_pass() {
        let sink = run_coco(
            &EachBlockUnique,
            "neuron n:\n  state:\n  end\n  update:\n  end\n  function f() real:\n    return 1.0\n  end\n  function g() real:\n    return 2.0\n  end\nend",
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_return() {
        let sink = run_coco(
            &FunctionHasReturn,
            "neuron n:\n  function f(x real) real:\n    y real = x\n  end\nend",
        );
        assert_eq!(codes(&sink), vec![47]);
    }

    #[test]
    fn test_return_in_every_branch() {
        let source = "neuron n:
  function f(x real) real:
    if x > 0:
      return x
    else:
      return -x
    end
  end
  function g(x real):
    x = 1.0
  end
end";
        assert!(run_coco(&FunctionHasReturn, source).is_empty());
    }

    #[test]
    fn test_if_without_else_is_not_enough() {
        let source = "neuron n:
  function f(x real) real:
    if x > 0:
      return x
    end
  end
end";
        assert_eq!(codes(&run_coco(&FunctionHasReturn, source)), vec![47]);
    }
}
