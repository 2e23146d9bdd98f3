//! Symbol tables
//!
//! One scope tree per neuron, stored as arenas of scopes and symbols.
//! Parents are plain [`ScopeId`] indices and symbols refer back to their
//! declaring node by [`NodeId`]. Every AST node of the neuron is mapped to
//! the scope that lexically contains it.
//!
//! Duplicate names are accepted while building; the redeclaration cocos
//! report them afterwards with the positions of every declaration.

use crate::diagnostics::{Diagnostics, MessageCode};
use crate::frontend::ast::*;
use crate::frontend::visitor::{self, Visitor};
use crate::types::{CompilationContext, TypeSymbol};
use crate::utils::SourcePosition;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::Write;

// ==================== Symbol Table ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Unique identifier for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// Kind of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Root of a neuron: predefined and neuron-level symbols
    Global,
    /// Body of a user function
    Function,
    /// Body of the update block
    Update,
    /// Body of a compound statement
    Local,
}

/// Lookup category of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

/// Where a variable was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableBlock {
    State,
    Parameters,
    Internals,
    InitialValues,
    Equations,
    Input,
    Local,
}

impl From<BlockKind> for VariableBlock {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::State => VariableBlock::State,
            BlockKind::Parameters => VariableBlock::Parameters,
            BlockKind::Internals => VariableBlock::Internals,
            BlockKind::InitialValues => VariableBlock::InitialValues,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub ty: TypeSymbol,
    pub block: VariableBlock,
    pub recordable: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub params: Vec<TypeSymbol>,
    pub ret: TypeSymbol,
}

#[derive(Debug, Clone)]
pub enum SymbolInfo {
    Variable(VariableInfo),
    Function(FunctionInfo),
}

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub scope: ScopeId,
    /// Declaring node, `None` for predefined symbols
    pub decl: Option<NodeId>,
    pub pos: SourcePosition,
    pub info: SymbolInfo,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self.info {
            SymbolInfo::Variable(_) => SymbolKind::Variable,
            SymbolInfo::Function(_) => SymbolKind::Function,
        }
    }

    pub fn is_predefined(&self) -> bool {
        self.decl.is_none()
    }

    pub fn as_variable(&self) -> Option<&VariableInfo> {
        match &self.info {
            SymbolInfo::Variable(v) => Some(v),
            SymbolInfo::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match &self.info {
            SymbolInfo::Function(f) => Some(f),
            SymbolInfo::Variable(_) => None,
        }
    }
}

/// A scope containing symbols
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Symbols in declaration order
    pub symbols: Vec<SymbolId>,
    pub pos: SourcePosition,
}

/// Scope tree of one neuron
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    node_scopes: HashMap<NodeId, ScopeId>,
    /// Resolved declared types keyed by their `DataType` node
    declared: HashMap<NodeId, TypeSymbol>,
}

impl SymbolTable {
    fn new(pos: SourcePosition) -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                children: Vec::new(),
                symbols: Vec::new(),
                pos,
            }],
            symbols: Vec::new(),
            node_scopes: HashMap::new(),
            declared: HashMap::new(),
        }
    }

    /// The neuron's global scope
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// Symbols declared directly in `scope`, in declaration order
    pub fn symbols_in(&self, scope: ScopeId) -> impl Iterator<Item = &Symbol> {
        self.scopes[scope.0].symbols.iter().map(move |&id| &self.symbols[id.0])
    }

    /// Scope that lexically contains `node`
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// The type a `DataType` node resolved to, `Error` if it did not
    pub fn declared_type(&self, data_type: &DataType) -> TypeSymbol {
        self.declared
            .get(&data_type.id)
            .cloned()
            .unwrap_or_else(TypeSymbol::error)
    }

    /// Look `name` up in `scope` only; the first declaration wins
    pub fn resolve_local(&self, scope: ScopeId, name: &str, kind: SymbolKind) -> Option<&Symbol> {
        self.symbols_in(scope).find(|s| s.name == name && s.kind() == kind)
    }

    /// Look `name` up in `scope` and then its ancestors
    pub fn resolve(&self, scope: ScopeId, name: &str, kind: SymbolKind) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.resolve_local(id, name, kind) {
                return Some(symbol);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Resolve `name` from the scope containing `node`
    pub fn resolve_from(&self, node: NodeId, name: &str, kind: SymbolKind) -> Option<&Symbol> {
        self.resolve(self.scope_of(node)?, name, kind)
    }

    fn add_scope(&mut self, kind: ScopeKind, parent: ScopeId, pos: SourcePosition) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            symbols: Vec::new(),
            pos,
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.scopes[symbol.scope.0].symbols.push(id);
        self.symbols.push(symbol);
        id
    }

    /// Human readable scope tree, predefined symbols omitted
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_scope(self.root(), 0, &mut out);
        out
    }

    fn dump_scope(&self, id: ScopeId, depth: usize, out: &mut String) {
        let scope = self.scope(id);
        let indent = "  ".repeat(depth);
        let _ = writeln!(out, "{}{:?} scope {}", indent, scope.kind, scope.pos);
        for symbol in self.symbols_in(id).filter(|s| !s.is_predefined()) {
            let _ = match &symbol.info {
                SymbolInfo::Variable(v) => writeln!(
                    out,
                    "{}  variable {} : {} ({:?}{})",
                    indent,
                    symbol.name,
                    v.ty,
                    v.block,
                    if v.recordable { ", recordable" } else { "" }
                ),
                SymbolInfo::Function(f) => writeln!(
                    out,
                    "{}  function {}({}) -> {}",
                    indent,
                    symbol.name,
                    f.params.iter().map(|p| p.name()).collect::<Vec<_>>().join(", "),
                    f.ret
                ),
            };
        }
        for &child in &scope.children {
            self.dump_scope(child, depth + 1, out);
        }
    }
}

// ==================== Predefined symbols ====================

/// Predefined variables: Euler's number and the simulation time
const PREDEFINED_VARIABLES: &[(&str, &str)] = &[("e", "real"), ("t", "ms")];

/// Predefined functions as (name, parameter types, return type)
const PREDEFINED_FUNCTIONS: &[(&str, &[&str], &str)] = &[
    ("exp", &["real"], "real"),
    ("log", &["real"], "real"),
    ("ln", &["real"], "real"),
    ("log10", &["real"], "real"),
    ("cosh", &["real"], "real"),
    ("sinh", &["real"], "real"),
    ("tanh", &["real"], "real"),
    ("expm1", &["real"], "real"),
    ("abs", &["real"], "real"),
    ("pow", &["real", "real"], "real"),
    ("max", &["real", "real"], "real"),
    ("min", &["real", "real"], "real"),
    ("random_normal", &["real", "real"], "real"),
    ("random_uniform", &["real", "real"], "real"),
    ("emit_spike", &[], "void"),
    ("steps", &["ms"], "integer"),
    ("resolution", &[], "ms"),
    ("integrate_odes", &[], "void"),
    ("print", &["string"], "void"),
    ("println", &[], "void"),
    ("convolve", &["real", "real"], "real"),
    ("curr_sum", &["real", "real"], "real"),
    ("cond_sum", &["real", "real"], "real"),
    ("delta", &["ms", "ms"], "real"),
    ("deliver_spike", &["real", "ms"], "void"),
];

/// Names of the predefined functions
pub fn predefined_function_names() -> impl Iterator<Item = &'static str> {
    PREDEFINED_FUNCTIONS.iter().map(|(name, _, _)| *name)
}

fn predefined_type(ctx: &CompilationContext, name: &str) -> TypeSymbol {
    ctx.types().lookup(name).cloned().unwrap_or_else(TypeSymbol::error)
}

// ==================== Builder ====================

/// Builds the symbol table of one neuron.
///
/// Each call produces a fresh table; the only shared state touched is the
/// additive type registry, so building twice over the same neuron yields
/// equal tables.
pub struct SymbolTableBuilder<'a> {
    table: SymbolTable,
    ctx: &'a mut CompilationContext,
    sink: &'a mut Diagnostics,
}

impl<'a> SymbolTableBuilder<'a> {
    pub fn build(
        neuron: &Neuron,
        ctx: &'a mut CompilationContext,
        sink: &'a mut Diagnostics,
    ) -> SymbolTable {
        info!("Start building symbol table for neuron '{}'", neuron.name);
        sink.info(
            MessageCode::StartSymbolTableBuilding,
            format!("Start building symbol table for neuron '{}'", neuron.name),
            Some(neuron.pos),
        );

        let mut builder = Self {
            table: SymbolTable::new(neuron.pos),
            ctx,
            sink,
        };
        builder.register_predefined();
        builder.visit_neuron(neuron);

        debug!(
            "neuron '{}': {} scopes, {} symbols",
            neuron.name,
            builder.table.scopes.len(),
            builder.table.symbols.len()
        );
        builder.table
    }

    fn register_predefined(&mut self) {
        let root = self.table.root();
        for (name, ty) in PREDEFINED_VARIABLES {
            let ty = predefined_type(self.ctx, ty);
            self.table.add_symbol(Symbol {
                name: name.to_string(),
                scope: root,
                decl: None,
                pos: SourcePosition::predefined(),
                info: SymbolInfo::Variable(VariableInfo {
                    ty,
                    block: VariableBlock::State,
                    recordable: false,
                }),
            });
        }
        for (name, params, ret) in PREDEFINED_FUNCTIONS {
            let params = params.iter().map(|p| predefined_type(self.ctx, p)).collect();
            let ret = predefined_type(self.ctx, ret);
            self.table.add_symbol(Symbol {
                name: name.to_string(),
                scope: root,
                decl: None,
                pos: SourcePosition::predefined(),
                info: SymbolInfo::Function(FunctionInfo { params, ret }),
            });
        }
    }

    /// Resolve a declared type; unknown or overflowing units are reported and become `Error`
    fn resolve_type(&mut self, data_type: &DataType) -> TypeSymbol {
        match self.ctx.resolve_data_type(data_type) {
            Ok(ty) => {
                self.table.declared.insert(data_type.id, ty.clone());
                ty
            }
            Err(err) => {
                self.sink.error(MessageCode::NoUnit, err.to_string(), data_type.pos);
                TypeSymbol::error()
            }
        }
    }

    fn annotate(&mut self, node: NodeId, scope: ScopeId) {
        self.table.node_scopes.insert(node, scope);
    }

    /// Map every node below `expr` to `scope`
    fn annotate_expr(&mut self, expr: &Expr, scope: ScopeId) {
        let mut annotator = Annotator {
            map: &mut self.table.node_scopes,
            scope,
        };
        annotator.visit_expr(expr);
    }

    fn annotate_data_type(&mut self, data_type: &DataType, scope: ScopeId) {
        let mut annotator = Annotator {
            map: &mut self.table.node_scopes,
            scope,
        };
        annotator.visit_data_type(data_type);
    }

    fn add_variable(
        &mut self,
        name: String,
        scope: ScopeId,
        decl: NodeId,
        pos: SourcePosition,
        info: VariableInfo,
    ) {
        self.table.add_symbol(Symbol {
            name,
            scope,
            decl: Some(decl),
            pos,
            info: SymbolInfo::Variable(info),
        });
    }

    /// One symbol per declared name (`a, b mV` declares two)
    fn declare(&mut self, decl: &Declaration, block: VariableBlock, scope: ScopeId) {
        self.annotate(decl.id, scope);
        self.annotate_data_type(&decl.data_type, scope);
        let ty = self.resolve_type(&decl.data_type);

        for var in &decl.variables {
            self.annotate(var.id, scope);
            self.add_variable(
                var.complete_name(),
                scope,
                var.id,
                var.pos,
                VariableInfo {
                    ty: ty.clone().with_origin(decl.id),
                    block,
                    recordable: decl.recordable,
                },
            );
        }
        if let Some(expr) = &decl.expr {
            self.annotate_expr(expr, scope);
        }
        if let Some(inv) = &decl.invariant {
            self.annotate_expr(inv, scope);
        }
    }

    fn visit_block_in(&mut self, block: &Block, scope: ScopeId) {
        self.annotate(block.id, scope);
        for stmt in &block.stmts {
            self.visit_stmt_in(stmt, scope);
        }
    }

    /// Compound statement bodies always get their own local scope
    fn visit_nested_block(&mut self, block: &Block, parent: ScopeId) {
        let scope = self.table.add_scope(ScopeKind::Local, parent, block.pos);
        self.visit_block_in(block, scope);
    }

    fn visit_stmt_in(&mut self, stmt: &Stmt, scope: ScopeId) {
        match stmt {
            Stmt::Declaration(decl) => self.declare(decl, VariableBlock::Local, scope),
            Stmt::Assignment(assignment) => {
                self.annotate(assignment.id, scope);
                self.annotate(assignment.lhs.id, scope);
                self.annotate_expr(&assignment.expr, scope);
            }
            Stmt::Call(call) => {
                self.annotate(call.id, scope);
                for arg in &call.args {
                    self.annotate_expr(arg, scope);
                }
            }
            Stmt::Return(ret) => {
                self.annotate(ret.id, scope);
                if let Some(expr) = &ret.expr {
                    self.annotate_expr(expr, scope);
                }
            }
            Stmt::If(stmt) => {
                self.annotate(stmt.id, scope);
                for clause in std::iter::once(&stmt.if_clause).chain(&stmt.elif_clauses) {
                    self.annotate(clause.id, scope);
                    self.annotate_expr(&clause.cond, scope);
                    self.visit_nested_block(&clause.block, scope);
                }
                if let Some(block) = &stmt.else_block {
                    self.visit_nested_block(block, scope);
                }
            }
            Stmt::For(stmt) => {
                self.annotate(stmt.id, scope);
                self.annotate_expr(&stmt.from, scope);
                self.annotate_expr(&stmt.to, scope);
                self.visit_nested_block(&stmt.block, scope);
            }
            Stmt::While(stmt) => {
                self.annotate(stmt.id, scope);
                self.annotate_expr(&stmt.cond, scope);
                self.visit_nested_block(&stmt.block, scope);
            }
        }
    }
}

impl Visitor for SymbolTableBuilder<'_> {
    fn visit_neuron(&mut self, neuron: &Neuron) {
        self.annotate(neuron.id, self.table.root());
        visitor::walk_neuron(self, neuron);
    }

    fn visit_var_block(&mut self, block: &VarBlock) {
        let root = self.table.root();
        self.annotate(block.id, root);
        for decl in &block.declarations {
            self.declare(decl, block.kind.into(), root);
        }
    }

    fn visit_equations_block(&mut self, block: &EquationsBlock) {
        self.annotate(block.id, self.table.root());
        visitor::walk_equations_block(self, block);
    }

    fn visit_ode_function(&mut self, func: &OdeFunction) {
        let root = self.table.root();
        self.annotate(func.id, root);
        self.annotate_data_type(&func.data_type, root);
        self.annotate_expr(&func.expr, root);
        let ty = self.resolve_type(&func.data_type).with_origin(func.id);
        self.add_variable(
            func.name.clone(),
            root,
            func.id,
            func.pos,
            VariableInfo {
                ty,
                block: VariableBlock::Equations,
                recordable: func.recordable,
            },
        );
    }

    fn visit_ode_shape(&mut self, shape: &OdeShape) {
        let root = self.table.root();
        self.annotate(shape.id, root);
        self.annotate(shape.lhs.id, root);
        self.annotate_expr(&shape.rhs, root);
        // Shapes given as ODEs refer to initial values instead
        if shape.lhs.order == 0 {
            self.add_variable(
                shape.lhs.name.clone(),
                root,
                shape.id,
                shape.lhs.pos,
                VariableInfo {
                    ty: TypeSymbol::real().with_origin(shape.id),
                    block: VariableBlock::Equations,
                    recordable: false,
                },
            );
        }
    }

    fn visit_ode_equation(&mut self, eq: &OdeEquation) {
        let root = self.table.root();
        self.annotate(eq.id, root);
        self.annotate(eq.lhs.id, root);
        self.annotate_expr(&eq.rhs, root);
    }

    fn visit_input_line(&mut self, line: &InputLine) {
        let root = self.table.root();
        self.annotate(line.id, root);
        let ty = match &line.data_type {
            Some(data_type) => {
                self.annotate_data_type(data_type, root);
                self.resolve_type(data_type)
            }
            None => match line.kind {
                SignalKind::Spike => predefined_type(self.ctx, "nS"),
                SignalKind::Current => predefined_type(self.ctx, "pA"),
            },
        };
        self.add_variable(
            line.name.clone(),
            root,
            line.id,
            line.pos,
            VariableInfo {
                ty: ty.with_origin(line.id).as_buffer(),
                block: VariableBlock::Input,
                recordable: false,
            },
        );
    }

    fn visit_update_block(&mut self, block: &UpdateBlock) {
        let root = self.table.root();
        self.annotate(block.id, root);
        let scope = self.table.add_scope(ScopeKind::Update, root, block.pos);
        self.visit_block_in(&block.block, scope);
    }

    fn visit_function(&mut self, func: &FunctionDecl) {
        let root = self.table.root();
        self.annotate(func.id, root);

        let params: Vec<TypeSymbol> = func
            .params
            .iter()
            .map(|p| self.resolve_type(&p.data_type))
            .collect();
        let ret = match &func.return_type {
            Some(data_type) => {
                self.annotate_data_type(data_type, root);
                self.resolve_type(data_type)
            }
            None => TypeSymbol::void(),
        };
        self.table.add_symbol(Symbol {
            name: func.name.clone(),
            scope: root,
            decl: Some(func.id),
            pos: func.pos,
            info: SymbolInfo::Function(FunctionInfo {
                params: params.clone(),
                ret,
            }),
        });

        let scope = self.table.add_scope(ScopeKind::Function, root, func.pos);
        for (param, ty) in func.params.iter().zip(params) {
            self.annotate(param.id, scope);
            self.annotate_data_type(&param.data_type, scope);
            self.add_variable(
                param.name.clone(),
                scope,
                param.id,
                param.pos,
                VariableInfo {
                    ty: ty.with_origin(param.id),
                    block: VariableBlock::Local,
                    recordable: false,
                },
            );
        }
        self.visit_block_in(&func.block, scope);
    }
}

/// Records the enclosing scope of every expression-level node
struct Annotator<'m> {
    map: &'m mut HashMap<NodeId, ScopeId>,
    scope: ScopeId,
}

impl Visitor for Annotator<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        self.map.insert(expr.id, self.scope);
        visitor::walk_expr(self, expr);
    }

    fn visit_function_call(&mut self, call: &FunctionCall) {
        self.map.insert(call.id, self.scope);
        visitor::walk_function_call(self, call);
    }

    fn visit_variable(&mut self, var: &Variable) {
        self.map.insert(var.id, self.scope);
    }

    fn visit_data_type(&mut self, data_type: &DataType) {
        self.map.insert(data_type.id, self.scope);
        visitor::walk_data_type(self, data_type);
    }

    fn visit_unit_type(&mut self, unit: &UnitTypeExpr) {
        self.map.insert(unit.id, self.scope);
        visitor::walk_unit_type(self, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::frontend::parser::parse_model;
    use pretty_assertions::assert_eq;

    fn build(source: &str) -> (Neuron, SymbolTable, Diagnostics) {
        let mut unit = parse_model(source).expect("model should parse");
        let neuron = unit.neurons.remove(0);
        let mut ctx = CompilationContext::new();
        let mut sink = Diagnostics::new();
        let table = SymbolTableBuilder::build(&neuron, &mut ctx, &mut sink);
        (neuron, table, sink)
    }

    fn user_symbols(table: &SymbolTable, scope: ScopeId) -> Vec<String> {
        table
            .symbols_in(scope)
            .filter(|s| !s.is_predefined())
            .map(|s| s.name.clone())
            .collect()
    }

    #[test]
    fn test_multi_name_declaration() {
        let (_, table, _) = build("neuron n:\n  state:\n    a, b mV = 0 mV\n  end\nend");
        let root = table.root();
        assert_eq!(user_symbols(&table, root), vec!["a", "b"]);
        let b = table.resolve(root, "b", SymbolKind::Variable).expect("b");
        let info = b.as_variable().expect("variable");
        assert_eq!(info.block, VariableBlock::State);
        assert_eq!(info.ty.name(), "mV");
    }

    #[test]
    fn test_function_scope() {
        let (_, table, _) = build(
            "neuron n:\n  function f(x real, y mV) mV:\n    z mV = y\n    return z\n  end\nend",
        );
        let root = table.root();
        assert_eq!(user_symbols(&table, root), vec!["f"]);
        let f = table.resolve(root, "f", SymbolKind::Function).expect("f");
        assert_eq!(f.as_function().map(|i| i.params.len()), Some(2));

        let func_scope = table.scope(root).children[0];
        assert_eq!(table.scope(func_scope).kind, ScopeKind::Function);
        assert_eq!(user_symbols(&table, func_scope), vec!["x", "y", "z"]);
        assert!(table.resolve(root, "x", SymbolKind::Variable).is_none());
    }

    #[test]
    fn test_compound_statements_open_local_scopes() {
        let (_, table, _) = build(
            "neuron n:\n  update:\n    if true:\n    elif false:\n      k integer = 1\n    else:\n    end\n    while false:\n    end\n    for i in 0 ... 10:\n      m integer = i\n    end\n  end\nend",
        );
        let update = table.scope(table.root()).children[0];
        assert_eq!(table.scope(update).kind, ScopeKind::Update);
        let locals = &table.scope(update).children;
        assert_eq!(locals.len(), 5);
        assert!(locals.iter().all(|&s| table.scope(s).kind == ScopeKind::Local));
        assert_eq!(user_symbols(&table, locals[1]), vec!["k"]);
        assert_eq!(user_symbols(&table, locals[4]), vec!["m"]);
        assert!(user_symbols(&table, update).is_empty());
    }

    #[test]
    fn test_equations_declare_functions_and_shapes_only() {
        let (_, table, _) = build(
            "neuron n:\n  equations:\n    shape g = exp(-t/tau)\n    function I pA = 1 pA\n    V_m' = I / C_m\n  end\nend",
        );
        assert_eq!(user_symbols(&table, table.root()), vec!["g", "I"]);
    }

    #[test]
    fn test_input_buffers() {
        let (_, table, _) = build(
            "neuron n:\n  input:\n    spikes <- spike\n    currents <- current\n  end\nend",
        );
        let root = table.root();
        let spikes = table.resolve(root, "spikes", SymbolKind::Variable).expect("spikes");
        let info = spikes.as_variable().expect("variable");
        assert!(info.ty.is_buffer);
        assert_eq!(info.ty.name(), "nS");
        assert_eq!(info.block, VariableBlock::Input);
    }

    #[test]
    fn test_predefined_symbols_and_node_scopes() {
        let (neuron, table, _) = build("neuron n:\n  update:\n    x real = exp(t / ms)\n  end\nend");
        let root = table.root();
        assert!(table.resolve(root, "t", SymbolKind::Variable).is_some());
        assert!(table.resolve(root, "exp", SymbolKind::Function).is_some());

        let update = neuron.update_blocks().next().expect("update block");
        let Stmt::Declaration(decl) = &update.block.stmts[0] else {
            panic!("expected declaration");
        };
        let expr = decl.expr.as_ref().expect("initializer");
        let scope = table.scope_of(expr.id).expect("annotated");
        assert_eq!(table.scope(scope).kind, ScopeKind::Update);
        assert!(table.resolve_from(expr.id, "t", SymbolKind::Variable).is_some());
    }

    #[test]
    fn test_unknown_unit_reports_and_yields_error_type() {
        let (_, table, sink) = build("neuron n:\n  state:\n    x furlong = 1\n  end\nend");
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.entries()[0].code, MessageCode::NoUnit);
        let x = table.resolve(table.root(), "x", SymbolKind::Variable).expect("x");
        assert!(x.as_variable().map_or(false, |v| v.ty.is_error()));
    }

    #[test]
    fn test_duplicates_are_kept_for_cocos() {
        let (_, table, _) = build("neuron n:\n  state:\n    a mV\n    a mV\n  end\nend");
        assert_eq!(user_symbols(&table, table.root()), vec!["a", "a"]);
    }
}
