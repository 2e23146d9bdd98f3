//! Front end pipeline
//!
//! parse → rename differential orders → per neuron: symbol table, type
//! check, cocos. One [`CompilationContext`] and one diagnostics sink are
//! shared by every file and neuron processed by a [`Frontend`].

use crate::cocos::{CocoRunner, NeuronContext};
use crate::diagnostics::{Diagnostic, Diagnostics, MessageCode, Severity};
use crate::frontend::ast::Neuron;
use crate::frontend::parser::parse_model;
use crate::frontend::symbol_table::{SymbolTable, SymbolTableBuilder};
use crate::frontend::transform::rename_differential_orders;
use crate::frontend::type_checker::{NodeTypes, TypeChecker};
use crate::types::CompilationContext;
use crate::utils::SourcePosition;
use log::info;
use serde::Serialize;
use std::collections::HashMap;

/// Pipeline options
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Keep INFO diagnostics in the sink
    pub emit_info: bool,
    /// Lowest severity included in reports
    pub min_severity: Severity,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            emit_info: false,
            min_severity: Severity::Info,
        }
    }
}

/// A neuron after analysis
#[derive(Debug)]
pub struct CheckedNeuron {
    pub neuron: Neuron,
    pub table: SymbolTable,
    pub types: NodeTypes,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckedNeuron {
    /// No ERROR diagnostics: code may be generated
    pub fn is_generatable(&self) -> bool {
        self.errors == 0
    }
}

/// Per-neuron summary
#[derive(Debug, Clone, Serialize)]
pub struct NeuronReport {
    pub name: String,
    pub errors: usize,
    pub warnings: usize,
    pub generatable: bool,
}

/// Result of checking one source text
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub neurons: Vec<NeuronReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

pub struct Frontend {
    config: FrontendConfig,
    ctx: CompilationContext,
    sink: Diagnostics,
    cocos: CocoRunner,
}

impl Frontend {
    pub fn new(config: FrontendConfig) -> Self {
        let sink = Diagnostics::with_info(config.emit_info);
        Self {
            config,
            ctx: CompilationContext::new(),
            sink,
            cocos: CocoRunner::new(),
        }
    }

    pub fn context(&self) -> &CompilationContext {
        &self.ctx
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.sink
    }

    pub fn cocos(&self) -> &CocoRunner {
        &self.cocos
    }

    /// Run the whole pipeline over `source` and keep the analysed neurons
    pub fn analyse_source(&mut self, source: &str, file: Option<&str>) -> Vec<CheckedNeuron> {
        let file = file.unwrap_or("<input>");
        self.sink.set_neuron(None);
        self.sink.info(
            MessageCode::StartProcessingFile,
            format!("Start processing '{}'", file),
            None,
        );

        let mut unit = match parse_model(source) {
            Ok(unit) => unit,
            Err(e) => {
                self.sink.report(MessageCode::SyntaxError, Severity::Error, e.to_string(), e.position());
                return Vec::new();
            }
        };
        rename_differential_orders(&mut unit);

        let mut seen: HashMap<String, SourcePosition> = HashMap::new();
        let mut checked = Vec::with_capacity(unit.neurons.len());
        for neuron in unit.neurons {
            let first = seen.get(&neuron.name).copied();
            seen.entry(neuron.name.clone()).or_insert(neuron.pos);
            checked.push(self.check_neuron(neuron, first));
        }
        self.sink.set_neuron(None);
        checked
    }

    /// Check `source` and summarise the findings
    pub fn check_source(&mut self, source: &str, file: Option<&str>) -> CheckReport {
        let start = self.sink.len();
        let neurons: Vec<NeuronReport> = self
            .analyse_source(source, file)
            .iter()
            .map(|n| NeuronReport {
                name: n.neuron.name.clone(),
                errors: n.errors,
                warnings: n.warnings,
                generatable: n.is_generatable(),
            })
            .collect();

        let emitted = self.sink.since(start);
        CheckReport {
            file: file.map(str::to_string),
            neurons,
            diagnostics: emitted
                .iter()
                .filter(|d| d.severity >= self.config.min_severity)
                .cloned()
                .collect(),
            errors: emitted.iter().filter(|d| d.severity == Severity::Error).count(),
            warnings: emitted.iter().filter(|d| d.severity == Severity::Warning).count(),
        }
    }

    /// `first` is the position of an earlier neuron with the same name
    fn check_neuron(&mut self, neuron: Neuron, first: Option<SourcePosition>) -> CheckedNeuron {
        info!("checking neuron '{}'", neuron.name);
        let start = self.sink.len();
        self.sink.set_neuron(Some(&neuron.name));
        self.sink.info(
            MessageCode::StartProcessingNeuron,
            format!("Start processing neuron '{}'", neuron.name),
            Some(neuron.pos),
        );
        if let Some(first) = first {
            self.sink.error(
                MessageCode::NeuronRedeclared,
                format!("Neuron '{}' has already been declared at {}!", neuron.name, first),
                neuron.pos,
            );
        }

        let table = SymbolTableBuilder::build(&neuron, &mut self.ctx, &mut self.sink);
        self.report_new_types();
        let types = TypeChecker::check_neuron(&neuron, &table, &mut self.ctx, &mut self.sink);
        self.report_new_types();

        let cx = NeuronContext {
            neuron: &neuron,
            table: &table,
            types: &types,
            ctx: &self.ctx,
        };
        self.cocos.run(&cx, &mut self.sink);

        let emitted = self.sink.since(start);
        let errors = emitted.iter().filter(|d| d.severity == Severity::Error).count();
        let warnings = emitted.iter().filter(|d| d.severity == Severity::Warning).count();
        if errors > 0 {
            self.sink.info(
                MessageCode::NeuronContainsErrors,
                format!("Neuron '{}' contains errors. No code generated!", neuron.name),
                Some(neuron.pos),
            );
        }

        CheckedNeuron {
            neuron,
            table,
            types,
            errors,
            warnings,
        }
    }

    fn report_new_types(&mut self) {
        for name in self.ctx.drain_new_types() {
            self.sink.info(
                MessageCode::TypeRegistered,
                format!("New type registered '{}'.", name),
                None,
            );
        }
    }
}

impl Default for Frontend {
    fn default() -> Self {
        Self::new(FrontendConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IAF_PSC_EXP: &str = "
neuron iaf_psc_exp:
  parameters:
    C_m pF = 250 pF
    tau_m ms = 10 ms
    tau_syn_ex ms = 2 ms
    E_L mV = -70 mV
    V_th mV = -55 mV
    V_reset mV = -70 mV
    t_ref ms = 2 ms
    I_e pA = 0 pA
  end
  internals:
    RefractoryCounts integer = steps(t_ref)
  end
  initial_values:
    V_m mV = E_L
  end
  state:
    r integer = 0
  end
  input:
    spikes pA <- spike
    currents <- current
  end
  output: spike
  equations:
    shape I_shape_ex = exp(-t / tau_syn_ex)
    function I_syn pA = convolve(I_shape_ex, spikes)
    V_m' = -(V_m - E_L) / tau_m + (I_syn + I_e + currents) / C_m
  end
  update:
    if r == 0:
      integrate_odes()
    else:
      r = r - 1
    end
    if V_m >= V_th:
      r = RefractoryCounts
      V_m = V_reset
      emit_spike()
    end
  end
end
";

    fn error_codes(report: &CheckReport) -> Vec<u16> {
        report
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.code.code())
            .collect()
    }

    #[test]
    fn test_well_formed_model_is_generatable() {
        let mut frontend = Frontend::default();
        let report = frontend.check_source(IAF_PSC_EXP, Some("iaf_psc_exp.nestml"));
        assert_eq!(error_codes(&report), Vec::<u16>::new());
        assert_eq!(report.neurons.len(), 1);
        assert!(report.neurons[0].generatable);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_numerator_and_initial_values_scenario() {
        let source = "neuron bad:
  state:
    V_m 2/mV = 2/mV
  end
  equations:
    V_m' = V_m
  end
end";
        let mut frontend = Frontend::default();
        let report = frontend.check_source(source, None);
        assert_eq!(error_codes(&report), vec![23, 27]);
        assert_eq!(report.diagnostics[0].position.map(|p| p.start_line), Some(3));
        let last = report
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .last()
            .expect("two errors");
        assert_eq!(last.position.map(|p| p.start_line), Some(6));
        assert!(!report.neurons[0].generatable);
    }

    #[test]
    fn test_wrong_argument_count_scenario() {
        let source = "neuron calls:
  function foo(a real, b real, c real) real:
    return a + b + c
  end
  update:
    x real = foo(1.0, 2.0)
  end
end";
        let mut frontend = Frontend::default();
        let report = frontend.check_source(source, None);
        assert_eq!(error_codes(&report), vec![28]);
        assert!(report.diagnostics[0].message.contains("expected '3', found '2'"));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut frontend = Frontend::default();
        let report = frontend.check_source("neuron broken:\n  state:\n    x mV = \nend", None);
        assert_eq!(error_codes(&report), vec![62]);
        assert!(report.neurons.is_empty());
        assert!(report.has_errors());
    }

    #[test]
    fn test_redeclared_neuron_only_fails_the_second() {
        let source = "neuron a:\nend\nneuron b:\nend\nneuron a:\nend";
        let mut frontend = Frontend::default();
        let report = frontend.check_source(source, None);
        assert_eq!(error_codes(&report), vec![34]);
        let generatable: Vec<bool> = report.neurons.iter().map(|n| n.generatable).collect();
        assert_eq!(generatable, vec![true, true, false]);
    }

    #[test]
    fn test_errors_in_one_neuron_do_not_stop_the_next() {
        let source = "neuron first:\n  state:\n    x furlong\n  end\nend\nneuron second:\n  state:\n    y mV = 1 mV\n  end\nend";
        let mut frontend = Frontend::default();
        let report = frontend.check_source(source, None);
        assert_eq!(error_codes(&report), vec![54]);
        assert_eq!(report.neurons[0].errors, 1);
        assert!(report.neurons[1].generatable);
    }

    #[test]
    fn test_exponent_overflow_is_reported_and_next_neuron_checked() {
        let source = "neuron p:
  state:
    V_m mV = 0 mV
    w mV**2000000000
  end
  update:
    x real = V_m ** 2000000000
  end
end
neuron q:
  state:
    y mV = 1 mV
  end
end";
        let mut frontend = Frontend::default();
        let report = frontend.check_source(source, None);
        assert_eq!(error_codes(&report), vec![54, 57]);
        assert!(report.diagnostics.iter().all(|d| d.message.contains("out of range")));
        let names: Vec<&str> = report.neurons.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["p", "q"]);
        assert_eq!(report.neurons[0].errors, 2);
        assert!(report.neurons[1].generatable);
    }

    #[test]
    fn test_derived_types_are_registered_once_per_run() {
        let source = "neuron a:
  state:
    x mV = 0 mV
  end
  update:
    y mV/ms = x / ms
  end
end
neuron b:
  update:
    z mV/ms = 1 mV / ms
  end
end";
        let mut frontend = Frontend::new(FrontendConfig {
            emit_info: true,
            min_severity: Severity::Info,
        });
        frontend.check_source(source, None);
        let registered: Vec<&str> = frontend
            .diagnostics()
            .entries()
            .iter()
            .filter(|d| d.code == MessageCode::TypeRegistered)
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(registered, vec!["New type registered 'mV/ms'."]);
        assert!(frontend.context().types().contains("mV/ms"));
    }

    #[test]
    fn test_min_severity_filters_report() {
        let source = "neuron w:\n  parameters:\n    a real = 1 mV\n  end\nend";
        let mut frontend = Frontend::new(FrontendConfig {
            emit_info: true,
            min_severity: Severity::Warning,
        });
        let report = frontend.check_source(source, None);
        assert_eq!(report.warnings, 1);
        assert!(report.diagnostics.iter().all(|d| d.severity >= Severity::Warning));
        assert_eq!(report.diagnostics.len(), 1);
    }
}
