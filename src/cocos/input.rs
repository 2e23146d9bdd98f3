//! Input buffer checks

use super::{Coco, NeuronContext};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::{Assignment, InputQualifier, SignalKind};
use crate::frontend::symbol_table::{SymbolKind, SymbolTable, VariableBlock};
use crate::frontend::visitor::Visitor;

fn qualifier_name(qualifier: InputQualifier) -> &'static str {
    match qualifier {
        InputQualifier::Inhibitory => "inhibitory",
        InputQualifier::Excitatory => "excitatory",
    }
}

/// Current buffers take no qualifiers; spike qualifiers appear once each
pub struct CorrectInputKeywords;

impl Coco for CorrectInputKeywords {
    fn name(&self) -> &'static str {
        "correct-input-keywords"
    }

    fn description(&self) -> &'static str {
        "input qualifiers are only used on spike buffers and at most once"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        for line in cx.neuron.input_blocks().flat_map(|b| b.lines.iter()) {
            if line.kind == SignalKind::Current && !line.qualifiers.is_empty() {
                let keywords: Vec<&str> = line.qualifiers.iter().map(|q| qualifier_name(*q)).collect();
                sink.error(
                    MessageCode::CurrentBufferSpecified,
                    format!(
                        "Current buffer '{}' specified with type keywords ({})!",
                        line.name,
                        keywords.join(", ")
                    ),
                    line.pos,
                );
                continue;
            }
            for qualifier in [InputQualifier::Inhibitory, InputQualifier::Excitatory] {
                if line.qualifiers.iter().filter(|q| **q == qualifier).count() > 1 {
                    sink.error(
                        MessageCode::MultipleKeywords,
                        format!(
                            "Buffer '{}' specified with multiple '{}' keywords!",
                            line.name,
                            qualifier_name(qualifier)
                        ),
                        line.pos,
                    );
                }
            }
        }
    }
}

/// Input buffers are read-only
pub struct BufferNotAssigned;

impl Coco for BufferNotAssigned {
    fn name(&self) -> &'static str {
        "buffer-not-assigned"
    }

    fn description(&self) -> &'static str {
        "no value is assigned to an input buffer"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let mut finder = BufferAssignments {
            table: cx.table,
            sink,
        };
        finder.visit_neuron(cx.neuron);
    }
}

struct BufferAssignments<'a> {
    table: &'a SymbolTable,
    sink: &'a mut Diagnostics,
}

impl Visitor for BufferAssignments<'_> {
    fn visit_assignment(&mut self, assignment: &Assignment) {
        let name = assignment.lhs.complete_name();
        let is_buffer = self
            .table
            .resolve_from(assignment.lhs.id, &name, SymbolKind::Variable)
            .and_then(|s| s.as_variable())
            .map_or(false, |info| info.block == VariableBlock::Input);
        if is_buffer {
            self.sink.error(
                MessageCode::ValueAssignedToBuffer,
                format!("Value assigned to buffer '{}'!", name),
                assignment.pos,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cocos::test_support::{codes, run_coco};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_current_buffer_with_keyword() {
        let source = "neuron n:\n  input:\n    I_stim pA <- inhibitory current\n  end\nend";
        let sink = run_coco(&CorrectInputKeywords, source);
        assert_eq!(codes(&sink), vec![25]);
        assert!(sink.entries()[0].message.contains("(inhibitory)"));
    }

    #[test]
    fn test_repeated_keyword() {
        let source = "neuron n:\n  input:\n    spikes nS <- excitatory excitatory spike\n    other nS <- inhibitory excitatory spike\n  end\nend";
        assert_eq!(codes(&run_coco(&CorrectInputKeywords, source)), vec![42]);
    }

    #[test]
    fn test_assignment_to_buffer() {
        let source = "neuron n:
  input:
    spikes nS <- spike
  end
  state:
    g nS = 0 nS
  end
  update:
    g += spikes
    spikes = 0 nS
  end
end";
        let sink = run_coco(&BufferNotAssigned, source);
        assert_eq!(codes(&sink), vec![20]);
        assert_eq!(sink.entries()[0].position.map(|p| p.start_line), Some(10));
    }
}
