//! Context conditions
//!
//! Each coco is an independent check over one neuron. Cocos read the AST,
//! the neuron's symbol table and the computed node types and report through
//! the diagnostics sink; they never modify anything.

pub mod blocks;
pub mod declarations;
pub mod equations;
pub mod expressions;
pub mod input;
pub mod units;

use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::Neuron;
use crate::frontend::symbol_table::SymbolTable;
use crate::frontend::type_checker::NodeTypes;
use crate::types::CompilationContext;
use log::debug;
use std::panic::{self, AssertUnwindSafe};

/// Everything a coco may look at for one neuron
pub struct NeuronContext<'a> {
    pub neuron: &'a Neuron,
    pub table: &'a SymbolTable,
    pub types: &'a NodeTypes,
    pub ctx: &'a CompilationContext,
}

/// A context condition
pub trait Coco {
    /// Stable name of the check
    fn name(&self) -> &'static str;

    /// One-line description for listings
    fn description(&self) -> &'static str;

    /// Run the check, reporting findings to `sink`
    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics);
}

/// Runs the registered cocos in order
pub struct CocoRunner {
    cocos: Vec<Box<dyn Coco>>,
}

impl CocoRunner {
    pub fn new() -> Self {
        let mut runner = Self { cocos: Vec::new() };
        runner.add_coco(Box::new(blocks::EachBlockUnique));
        runner.add_coco(Box::new(declarations::VariablesUniqueInScope));
        runner.add_coco(Box::new(declarations::FunctionsUniqueInScope));
        runner.add_coco(Box::new(declarations::VariablesDefinedBeforeUse));
        runner.add_coco(Box::new(declarations::FunctionAliasHasRhs));
        runner.add_coco(Box::new(units::UnitNumeratorIsOne));
        runner.add_coco(Box::new(input::CorrectInputKeywords));
        runner.add_coco(Box::new(input::BufferNotAssigned));
        runner.add_coco(Box::new(equations::EquationsOnlyForInitialValues));
        runner.add_coco(Box::new(equations::OdeLhsHasOrder));
        runner.add_coco(Box::new(equations::OdeCorrectlyTyped));
        runner.add_coco(Box::new(blocks::FunctionHasReturn));
        runner.add_coco(Box::new(expressions::IllegalExpression));
        runner
    }

    pub fn add_coco(&mut self, coco: Box<dyn Coco>) {
        self.cocos.push(coco);
    }

    pub fn cocos(&self) -> impl Iterator<Item = &dyn Coco> {
        self.cocos.iter().map(|c| c.as_ref())
    }

    /// Run every coco. A panicking coco is reported and the rest still run.
    pub fn run(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        for coco in &self.cocos {
            debug!(
                "coco '{}' on neuron '{}': {}",
                coco.name(),
                cx.neuron.name,
                coco.description()
            );
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| coco.check(cx, sink)));
            if let Err(payload) = outcome {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown cause".to_string());
                sink.error(
                    MessageCode::CocoFailed,
                    format!("Context condition '{}' failed: {}", coco.name(), reason),
                    cx.neuron.pos,
                );
            }
        }
    }
}

impl Default for CocoRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::frontend::parser::parse_model;
    use crate::frontend::symbol_table::SymbolTableBuilder;
    use crate::frontend::transform::rename_differential_orders;
    use crate::frontend::type_checker::TypeChecker;

    /// Run `coco` alone over the first neuron of `source`. Diagnostics from
    /// table building and type checking are dropped.
    pub fn run_coco(coco: &dyn Coco, source: &str) -> Diagnostics {
        let mut unit = parse_model(source).expect("model should parse");
        rename_differential_orders(&mut unit);
        let neuron = &unit.neurons[0];
        let mut ctx = CompilationContext::new();
        let mut scratch = Diagnostics::new();
        let table = SymbolTableBuilder::build(neuron, &mut ctx, &mut scratch);
        let types = TypeChecker::check_neuron(neuron, &table, &mut ctx, &mut scratch);

        let mut sink = Diagnostics::new();
        let cx = NeuronContext {
            neuron,
            table: &table,
            types: &types,
            ctx: &ctx,
        };
        coco.check(&cx, &mut sink);
        sink
    }

    pub fn codes(sink: &Diagnostics) -> Vec<u16> {
        sink.entries().iter().map(|d| d.code.code()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Exploding;

    impl Coco for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn description(&self) -> &'static str {
            "always panics"
        }

        fn check(&self, _cx: &NeuronContext<'_>, _sink: &mut Diagnostics) {
            panic!("boom");
        }
    }

    struct Marker;

    impl Coco for Marker {
        fn name(&self) -> &'static str {
            "marker"
        }

        fn description(&self) -> &'static str {
            "reports one warning"
        }

        fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
            sink.warning(MessageCode::ImplicitCast, "marker", cx.neuron.pos);
        }
    }

    #[test]
    fn test_panicking_coco_is_reported_and_others_run() {
        let unit = crate::frontend::parser::parse_model("neuron n:\nend").expect("parses");
        let neuron = &unit.neurons[0];
        let mut ctx = CompilationContext::new();
        let mut sink = Diagnostics::new();
        let table =
            crate::frontend::symbol_table::SymbolTableBuilder::build(neuron, &mut ctx, &mut sink);
        let types = NodeTypes::default();
        let cx = NeuronContext {
            neuron,
            table: &table,
            types: &types,
            ctx: &ctx,
        };

        let mut runner = CocoRunner { cocos: Vec::new() };
        runner.add_coco(Box::new(Exploding));
        runner.add_coco(Box::new(Marker));
        runner.run(&cx, &mut sink);

        let codes: Vec<u16> = sink.entries().iter().map(|d| d.code.code()).collect();
        assert_eq!(codes, vec![68, 5]);
        assert!(sink.entries()[0].message.contains("boom"));
    }

    #[test]
    fn test_default_cocos_have_distinct_names() {
        let runner = CocoRunner::new();
        let mut names: Vec<&str> = runner.cocos().map(|c| c.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(runner.cocos().all(|c| !c.description().is_empty()));
    }
}
