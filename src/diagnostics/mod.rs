//! Diagnostics sink
//!
//! Every finding about a model is recorded here as a (code, severity,
//! message, position, neuron) record, in emission order. Records are also
//! mirrored to `log` at the matching level.

#![allow(dead_code)]

use crate::utils::SourcePosition;
use log::{error, info, warn};
use serde::{Serialize, Serializer};
use std::fmt;

// ==================== Severity ====================

/// Severity of a diagnostic, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

// ==================== Message Codes ====================

/// Closed set of message codes. The integer is the stable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCode {
    StartProcessingFile = 0,
    TypeRegistered = 1,
    StartSymbolTableBuilding = 2,
    FunctionCallTypeError = 3,
    ImplicitCast = 5,
    CastNotPossible = 6,
    TypeDifferentFromExpected = 7,
    AddSubTypeMismatch = 8,
    NoVariableFound = 11,
    NeuronContainsErrors = 13,
    StartProcessingNeuron = 14,
    VariableUsedBeforeDeclaration = 18,
    VariableDefinedRecursively = 19,
    ValueAssignedToBuffer = 20,
    NumeratorNotOne = 23,
    OrderNotDeclared = 24,
    CurrentBufferSpecified = 25,
    BlockNotCorrect = 26,
    VariableNotInInit = 27,
    WrongNumberOfArgs = 28,
    NoRhs = 29,
    SeveralLhs = 30,
    FunctionRedeclared = 31,
    NeuronRedeclared = 34,
    MultipleKeywords = 42,
    VariableRedeclared = 44,
    SoftIncompatibility = 45,
    HardIncompatibility = 46,
    NoReturn = 47,
    SymbolNotResolved = 49,
    TypeMismatch = 50,
    FunctionNotDeclared = 52,
    NoUnit = 54,
    OperationNotDefined = 57,
    SyntaxError = 62,
    VoidFunctionInExpr = 65,
    ConditionNotBool = 66,
    OdeRhsTypeMismatch = 67,
    CocoFailed = 68,
}

impl MessageCode {
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl Serialize for MessageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

// ==================== Diagnostic ====================

/// A single finding
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Emission order within the sink
    pub seq: usize,
    pub code: MessageCode,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neuron: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.severity)?;
        if let Some(neuron) = &self.neuron {
            write!(f, " [{}]", neuron)?;
        }
        if let Some(pos) = &self.position {
            write!(f, " {}", pos)?;
        }
        write!(f, " {} (code {})", self.message, self.code.code())
    }
}

// ==================== Sink ====================

/// Append-only diagnostic log
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    /// Neuron that newly reported diagnostics belong to
    neuron: Option<String>,
    /// Keep INFO records (they are always logged)
    emit_info: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(emit_info: bool) -> Self {
        Self {
            emit_info,
            ..Self::default()
        }
    }

    /// Attribute the following diagnostics to `neuron`
    pub fn set_neuron(&mut self, neuron: Option<&str>) {
        self.neuron = neuron.map(str::to_string);
    }

    pub fn report(
        &mut self,
        code: MessageCode,
        severity: Severity,
        message: impl Into<String>,
        position: Option<SourcePosition>,
    ) {
        let diagnostic = Diagnostic {
            seq: self.entries.len(),
            code,
            severity,
            message: message.into(),
            position,
            neuron: self.neuron.clone(),
        };

        match severity {
            Severity::Error => error!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Info => info!("{}", diagnostic),
        }

        if severity > Severity::Info || self.emit_info {
            self.entries.push(diagnostic);
        }
    }

    pub fn error(&mut self, code: MessageCode, message: impl Into<String>, pos: SourcePosition) {
        self.report(code, Severity::Error, message, Some(pos));
    }

    pub fn warning(&mut self, code: MessageCode, message: impl Into<String>, pos: SourcePosition) {
        self.report(code, Severity::Warning, message, Some(pos));
    }

    pub fn info(&mut self, code: MessageCode, message: impl Into<String>, pos: Option<SourcePosition>) {
        self.report(code, Severity::Info, message, pos);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// Records emitted at or after sequence number `seq`
    pub fn since(&self, seq: usize) -> &[Diagnostic] {
        &self.entries[seq.min(self.entries.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_keep_emission_order() {
        let mut sink = Diagnostics::new();
        sink.set_neuron(Some("iaf"));
        sink.error(MessageCode::NumeratorNotOne, "first", SourcePosition::new(1, 1, 1, 4));
        sink.warning(MessageCode::ImplicitCast, "second", SourcePosition::new(2, 1, 2, 4));
        sink.set_neuron(None);
        sink.error(MessageCode::SyntaxError, "third", SourcePosition::new(3, 1, 3, 4));

        let seqs: Vec<usize> = sink.entries().iter().map(|d| d.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        let neurons: Vec<Option<&str>> = sink.entries().iter().map(|d| d.neuron.as_deref()).collect();
        assert_eq!(neurons, vec![Some("iaf"), Some("iaf"), None]);
        assert_eq!(sink.count(Severity::Error), 2);
        assert_eq!(sink.since(2)[0].message, "third");
    }

    #[test]
    fn test_info_is_dropped_unless_enabled() {
        let mut quiet = Diagnostics::new();
        quiet.info(MessageCode::TypeRegistered, "mV/ms", None);
        assert!(quiet.is_empty());

        let mut verbose = Diagnostics::with_info(true);
        verbose.info(MessageCode::TypeRegistered, "mV/ms", None);
        assert_eq!(verbose.len(), 1);
    }

    #[test]
    fn test_json_uses_numeric_codes() {
        let mut sink = Diagnostics::new();
        sink.set_neuron(Some("iaf"));
        sink.error(MessageCode::NumeratorNotOne, "Numeric numerator of unit '2/mV' not 1!", SourcePosition::new(3, 5, 3, 8));

        let json = serde_json::to_value(&sink.entries()[0]).expect("serializable");
        assert_eq!(json["code"], 23);
        assert_eq!(json["severity"], "ERROR");
        assert_eq!(json["neuron"], "iaf");
        assert_eq!(json["position"]["start_line"], 3);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
