//! Declaration checks: uniqueness per scope and declaration order

use super::{Coco, NeuronContext};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::{Declaration, NodeId, Variable};
use crate::frontend::symbol_table::{ScopeId, Symbol, SymbolKind, SymbolTable, VariableBlock};
use crate::frontend::visitor::Visitor;

/// Symbols of `kind` in `scope` in textual order, predefined ones first
fn ordered_symbols(table: &SymbolTable, scope: ScopeId, kind: SymbolKind) -> Vec<&Symbol> {
    let mut symbols: Vec<&Symbol> = table.symbols_in(scope).filter(|s| s.kind() == kind).collect();
    symbols.sort_by_key(|s| (s.pos.start_line, s.pos.start_column));
    symbols
}

/// Report every symbol whose name was already taken earlier in its scope.
/// The textually later declaration is the offender.
fn report_duplicates(
    cx: &NeuronContext<'_>,
    sink: &mut Diagnostics,
    kind: SymbolKind,
    code: MessageCode,
    what: &str,
) {
    for scope in cx.table.scope_ids() {
        let symbols = ordered_symbols(cx.table, scope, kind);
        for (i, symbol) in symbols.iter().enumerate() {
            if symbol.is_predefined() {
                continue;
            }
            let Some(first) = symbols[..i].iter().find(|s| s.name == symbol.name) else {
                continue;
            };
            let message = if first.is_predefined() {
                format!("Predefined {} '{}' redeclared!", what, symbol.name)
            } else {
                format!(
                    "{} '{}' has already been declared at {}!",
                    capitalize(what),
                    symbol.name,
                    first.pos
                )
            };
            sink.error(code, message, symbol.pos);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// No two variables of one scope share a name
pub struct VariablesUniqueInScope;

impl Coco for VariablesUniqueInScope {
    fn name(&self) -> &'static str {
        "variables-unique-in-scope"
    }

    fn description(&self) -> &'static str {
        "each variable is declared only once per scope"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        report_duplicates(
            cx,
            sink,
            SymbolKind::Variable,
            MessageCode::VariableRedeclared,
            "variable",
        );
    }
}

/// No two functions of one scope share a name
pub struct FunctionsUniqueInScope;

impl Coco for FunctionsUniqueInScope {
    fn name(&self) -> &'static str {
        "functions-unique-in-scope"
    }

    fn description(&self) -> &'static str {
        "each function is declared only once and does not redefine a predefined one"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        report_duplicates(
            cx,
            sink,
            SymbolKind::Function,
            MessageCode::FunctionRedeclared,
            "function",
        );
    }
}

/// Initializers only use variables declared earlier in the same scope,
/// and never the variable being declared
pub struct VariablesDefinedBeforeUse;

impl Coco for VariablesDefinedBeforeUse {
    fn name(&self) -> &'static str {
        "variables-defined-before-use"
    }

    fn description(&self) -> &'static str {
        "declaration right-hand sides use only previously declared variables"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let mut checker = DeclarationOrder {
            table: cx.table,
            sink,
            current: None,
        };
        checker.visit_neuron(cx.neuron);
    }
}

/// The declaration whose right-hand side is being walked
struct CurrentDeclaration {
    scope: ScopeId,
    declared: Vec<NodeId>,
}

struct DeclarationOrder<'a> {
    table: &'a SymbolTable,
    sink: &'a mut Diagnostics,
    current: Option<CurrentDeclaration>,
}

impl Visitor for DeclarationOrder<'_> {
    fn visit_declaration(&mut self, decl: &Declaration) {
        let Some(scope) = self.table.scope_of(decl.id) else {
            return;
        };
        self.current = Some(CurrentDeclaration {
            scope,
            declared: decl.variables.iter().map(|v| v.id).collect(),
        });
        if let Some(expr) = &decl.expr {
            self.visit_expr(expr);
        }
        if let Some(inv) = &decl.invariant {
            self.visit_expr(inv);
        }
        self.current = None;
    }

    fn visit_variable(&mut self, var: &Variable) {
        let Some(current) = &self.current else {
            return;
        };
        let name = var.complete_name();
        let Some(symbol) = self.table.resolve_from(var.id, &name, SymbolKind::Variable) else {
            return;
        };
        let Some(info) = symbol.as_variable() else {
            return;
        };
        if symbol.is_predefined()
            || matches!(info.block, VariableBlock::Input | VariableBlock::Equations)
        {
            return;
        }

        if symbol.decl.map_or(false, |d| current.declared.contains(&d)) {
            self.sink.error(
                MessageCode::VariableDefinedRecursively,
                format!("Variable '{}' is defined recursively in its own declaration!", name),
                var.pos,
            );
        } else if symbol.scope == current.scope && var.pos.before(&symbol.pos) {
            self.sink.error(
                MessageCode::VariableUsedBeforeDeclaration,
                format!("Variable '{}' used before declaration at {}!", name, symbol.pos),
                var.pos,
            );
        }
    }
}

/// A `function` alias declaration names one variable and has a right-hand side
pub struct FunctionAliasHasRhs;

impl Coco for FunctionAliasHasRhs {
    fn name(&self) -> &'static str {
        "function-alias-has-rhs"
    }

    fn description(&self) -> &'static str {
        "function alias declarations define exactly one variable by an expression"
    }

    fn check(&self, cx: &NeuronContext<'_>, sink: &mut Diagnostics) {
        let mut aliases = FunctionAliases { sink };
        aliases.visit_neuron(cx.neuron);
    }
}

struct FunctionAliases<'a> {
    sink: &'a mut Diagnostics,
}

impl Visitor for FunctionAliases<'_> {
    fn visit_declaration(&mut self, decl: &Declaration) {
        if !decl.is_function {
            return;
        }
        let names: Vec<String> = decl.variables.iter().map(|v| v.complete_name()).collect();
        if names.len() > 1 {
            self.sink.error(
                MessageCode::SeveralLhs,
                format!("Function declared with several variables ({})!", names.join(", ")),
                decl.pos,
            );
        }
        if decl.expr.is_none() {
            self.sink.error(
                MessageCode::NoRhs,
                format!("Function variable '{}' has no right-hand side!", names.join(", ")),
                decl.pos,
            );
        }
    }
}
