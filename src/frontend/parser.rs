//! Parser for NESTML
//!
//! Recursive descent parser with Pratt parsing for expressions. Statements
//! are newline separated, so an infix operator or a unit suffix only
//! continues an expression when it sits on the same line (or inside
//! parentheses).

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, SourcePosition};

/// Binding powers, loosest first
const BP_OR: u8 = 1;
const BP_AND: u8 = 2;
const BP_COMPARE: u8 = 4;
const BP_BIT: u8 = 5;
const BP_ADD: u8 = 6;
const BP_MUL: u8 = 7;
const BP_POW: u8 = 9;

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    paren_depth: u32,
}

/// Lex and parse a whole model file
pub fn parse_model(source: &str) -> Result<CompilationUnit> {
    Parser::new(Lexer::new(source))?.parse_compilation_unit()
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        Ok(Self::from_tokens(lexer.tokenize()?))
    }

    /// Create a parser from pre-tokenized input
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let pos = tokens.last().map(|t| t.pos).unwrap_or_default();
            tokens.push(Token::eof(pos));
        }
        Self {
            tokens,
            pos: 0,
            next_id: 0,
            paren_depth: 0,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn previous_pos(&self) -> SourcePosition {
        self.tokens[self.pos.saturating_sub(1)].pos
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(Error::UnexpectedToken {
                expected: expected.describe(),
                got: self.current_kind().describe(),
                pos: self.current().pos,
            })
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Region from `start` to the last consumed token
    fn span_from(&self, start: SourcePosition) -> SourcePosition {
        start.merge(&self.previous_pos())
    }

    /// Whether the current token may continue the expression on the left
    fn continues_line(&self) -> bool {
        self.paren_depth > 0 || !self.current().first_on_line
    }

    fn parse_name(&mut self) -> Result<String> {
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(Error::ExpectedIdent { pos: self.current().pos }),
        }
    }

    /// Parse `name` followed by any number of `'`
    fn parse_variable(&mut self) -> Result<Variable> {
        let start = self.current().pos;
        let name = self.parse_name()?;
        let mut order = 0;
        while self.check(&TokenKind::Prime) {
            self.advance();
            order += 1;
        }
        Ok(Variable {
            id: self.node_id(),
            name,
            order,
            pos: self.span_from(start),
        })
    }

    // ==================== Structure ====================

    /// Parse a complete model file
    pub fn parse_compilation_unit(&mut self) -> Result<CompilationUnit> {
        let start = self.current().pos;
        let mut neurons = Vec::new();

        while !self.is_at_end() {
            neurons.push(self.parse_neuron()?);
        }

        Ok(CompilationUnit {
            neurons,
            pos: self.span_from(start),
        })
    }

    fn parse_neuron(&mut self) -> Result<Neuron> {
        let start = self.current().pos;
        self.expect(TokenKind::Neuron)?;
        let id = self.node_id();
        let name = self.parse_name()?;
        self.expect(TokenKind::Colon)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::End) {
            body.push(self.parse_body_element()?);
        }
        self.expect(TokenKind::End)?;

        Ok(Neuron {
            id,
            name,
            body,
            pos: self.span_from(start),
        })
    }

    fn parse_body_element(&mut self) -> Result<BodyElement> {
        match self.current_kind() {
            TokenKind::State => self.parse_var_block(BlockKind::State).map(BodyElement::Block),
            TokenKind::Parameters => {
                self.parse_var_block(BlockKind::Parameters).map(BodyElement::Block)
            }
            TokenKind::Internals => {
                self.parse_var_block(BlockKind::Internals).map(BodyElement::Block)
            }
            TokenKind::InitialValues => {
                self.parse_var_block(BlockKind::InitialValues).map(BodyElement::Block)
            }
            TokenKind::Equations => self.parse_equations_block().map(BodyElement::Equations),
            TokenKind::Input => self.parse_input_block().map(BodyElement::Input),
            TokenKind::Output => self.parse_output_block().map(BodyElement::Output),
            TokenKind::Update => self.parse_update_block().map(BodyElement::Update),
            TokenKind::Function => self.parse_function().map(BodyElement::Function),
            _ => Err(Error::UnexpectedToken {
                expected: "block (state, parameters, internals, initial_values, equations, input, output, update, function)".to_string(),
                got: self.current_kind().describe(),
                pos: self.current().pos,
            }),
        }
    }

    fn parse_var_block(&mut self, kind: BlockKind) -> Result<VarBlock> {
        let start = self.advance().pos;
        let id = self.node_id();
        self.expect(TokenKind::Colon)?;

        let mut declarations = Vec::new();
        while !self.check(&TokenKind::End) {
            declarations.push(self.parse_declaration()?);
        }
        self.expect(TokenKind::End)?;

        Ok(VarBlock {
            id,
            kind,
            declarations,
            pos: self.span_from(start),
        })
    }

    fn parse_equations_block(&mut self) -> Result<EquationsBlock> {
        let start = self.advance().pos;
        let id = self.node_id();
        self.expect(TokenKind::Colon)?;

        let mut decls = Vec::new();
        while !self.check(&TokenKind::End) {
            decls.push(self.parse_ode_decl()?);
        }
        self.expect(TokenKind::End)?;

        Ok(EquationsBlock {
            id,
            decls,
            pos: self.span_from(start),
        })
    }

    fn parse_ode_decl(&mut self) -> Result<OdeDecl> {
        let start = self.current().pos;
        let id = self.node_id();
        match self.current_kind() {
            TokenKind::Shape => {
                self.advance();
                let lhs = self.parse_variable()?;
                self.expect(TokenKind::Eq)?;
                let rhs = self.parse_expr()?;
                Ok(OdeDecl::Shape(OdeShape {
                    id,
                    lhs,
                    rhs,
                    pos: self.span_from(start),
                }))
            }
            TokenKind::Recordable | TokenKind::Function => {
                let recordable = self.consume(&TokenKind::Recordable);
                self.expect(TokenKind::Function)?;
                let name = self.parse_name()?;
                let data_type = self.parse_data_type()?;
                self.expect(TokenKind::Eq)?;
                let expr = self.parse_expr()?;
                Ok(OdeDecl::Function(OdeFunction {
                    id,
                    recordable,
                    name,
                    data_type,
                    expr,
                    pos: self.span_from(start),
                }))
            }
            _ => {
                let lhs = self.parse_variable()?;
                self.expect(TokenKind::Eq)?;
                let rhs = self.parse_expr()?;
                Ok(OdeDecl::Equation(OdeEquation {
                    id,
                    lhs,
                    rhs,
                    pos: self.span_from(start),
                }))
            }
        }
    }

    fn parse_input_block(&mut self) -> Result<InputBlock> {
        let start = self.advance().pos;
        let id = self.node_id();
        self.expect(TokenKind::Colon)?;

        let mut lines = Vec::new();
        while !self.check(&TokenKind::End) {
            lines.push(self.parse_input_line()?);
        }
        self.expect(TokenKind::End)?;

        Ok(InputBlock {
            id,
            lines,
            pos: self.span_from(start),
        })
    }

    fn parse_input_line(&mut self) -> Result<InputLine> {
        let start = self.current().pos;
        let id = self.node_id();
        let name = self.parse_name()?;
        let data_type = if self.check(&TokenKind::LeftArrow) {
            None
        } else {
            Some(self.parse_data_type()?)
        };
        self.expect(TokenKind::LeftArrow)?;

        let mut qualifiers = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::Inhibitory => qualifiers.push(InputQualifier::Inhibitory),
                TokenKind::Excitatory => qualifiers.push(InputQualifier::Excitatory),
                _ => break,
            }
            self.advance();
        }
        let kind = self.parse_signal_kind()?;

        Ok(InputLine {
            id,
            name,
            data_type,
            qualifiers,
            kind,
            pos: self.span_from(start),
        })
    }

    fn parse_signal_kind(&mut self) -> Result<SignalKind> {
        match self.current_kind() {
            TokenKind::Spike => {
                self.advance();
                Ok(SignalKind::Spike)
            }
            TokenKind::Current => {
                self.advance();
                Ok(SignalKind::Current)
            }
            _ => Err(Error::Expected("'spike' or 'current'".to_string(), self.current().pos)),
        }
    }

    fn parse_output_block(&mut self) -> Result<OutputBlock> {
        let start = self.advance().pos;
        let id = self.node_id();
        self.expect(TokenKind::Colon)?;
        let kind = self.parse_signal_kind()?;
        Ok(OutputBlock {
            id,
            kind,
            pos: self.span_from(start),
        })
    }

    fn parse_update_block(&mut self) -> Result<UpdateBlock> {
        let start = self.advance().pos;
        let id = self.node_id();
        self.expect(TokenKind::Colon)?;
        let block = self.parse_block()?;
        self.expect(TokenKind::End)?;
        Ok(UpdateBlock {
            id,
            block,
            pos: self.span_from(start),
        })
    }

    /// Parse a function definition
    fn parse_function(&mut self) -> Result<FunctionDecl> {
        let start = self.current().pos;
        self.expect(TokenKind::Function)?;
        let id = self.node_id();
        let name = self.parse_name()?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param_start = self.current().pos;
            let param_id = self.node_id();
            let param_name = self.parse_name()?;
            let data_type = self.parse_data_type()?;
            params.push(Parameter {
                id: param_id,
                name: param_name,
                data_type,
                pos: self.span_from(param_start),
            });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let return_type = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_data_type()?)
        };
        self.expect(TokenKind::Colon)?;
        let block = self.parse_block()?;
        self.expect(TokenKind::End)?;

        Ok(FunctionDecl {
            id,
            name,
            params,
            return_type,
            block,
            pos: self.span_from(start),
        })
    }

    // ==================== Declarations and Types ====================

    fn parse_declaration(&mut self) -> Result<Declaration> {
        let start = self.current().pos;
        let id = self.node_id();
        let recordable = self.consume(&TokenKind::Recordable);
        let is_function = self.consume(&TokenKind::Function);

        let mut variables = vec![self.parse_variable()?];
        while self.consume(&TokenKind::Comma) {
            variables.push(self.parse_variable()?);
        }

        let data_type = self.parse_data_type()?;
        let expr = if self.consume(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let invariant = if self.consume(&TokenKind::LDoubleBracket) {
            self.paren_depth += 1;
            let inv = self.parse_expr();
            self.paren_depth -= 1;
            let inv = inv?;
            self.expect(TokenKind::RDoubleBracket)?;
            Some(inv)
        } else {
            None
        };

        Ok(Declaration {
            id,
            recordable,
            is_function,
            variables,
            data_type,
            expr,
            invariant,
            pos: self.span_from(start),
        })
    }

    /// Parse a primitive type or a unit type expression
    fn parse_data_type(&mut self) -> Result<DataType> {
        let start = self.current().pos;
        let id = self.node_id();
        let kind = match self.current_kind() {
            TokenKind::Integer => DataTypeKind::Integer,
            TokenKind::Real => DataTypeKind::Real,
            TokenKind::Boolean => DataTypeKind::Boolean,
            TokenKind::String => DataTypeKind::String,
            TokenKind::Void => DataTypeKind::Void,
            TokenKind::Ident(_) | TokenKind::IntLit(_) | TokenKind::LParen => {
                let unit = self.parse_unit_type()?;
                return Ok(DataType {
                    id,
                    kind: DataTypeKind::Unit(unit),
                    pos: self.span_from(start),
                });
            }
            _ => return Err(Error::ExpectedType { pos: start }),
        };
        self.advance();
        Ok(DataType {
            id,
            kind,
            pos: start,
        })
    }

    /// unit_type := (INT '/' unit_pow | unit_pow) (('*' | '/') unit_pow)*
    fn parse_unit_type(&mut self) -> Result<UnitTypeExpr> {
        let start = self.current().pos;
        let mut lhs = if let TokenKind::IntLit(n) = *self.current_kind() {
            self.advance();
            self.expect(TokenKind::Slash)?;
            let rhs = self.parse_unit_pow()?;
            UnitTypeExpr {
                id: self.node_id(),
                kind: UnitTypeKind::Div {
                    lhs: UnitNumerator::Number(n),
                    rhs: Box::new(rhs),
                },
                pos: self.span_from(start),
            }
        } else {
            self.parse_unit_pow()?
        };

        loop {
            let is_mul = match self.current_kind() {
                TokenKind::Star => true,
                TokenKind::Slash => false,
                _ => break,
            };
            self.advance();
            let rhs = Box::new(self.parse_unit_pow()?);
            let kind = if is_mul {
                UnitTypeKind::Mul {
                    lhs: Box::new(lhs),
                    rhs,
                }
            } else {
                UnitTypeKind::Div {
                    lhs: UnitNumerator::Unit(Box::new(lhs)),
                    rhs,
                }
            };
            lhs = UnitTypeExpr {
                id: self.node_id(),
                kind,
                pos: self.span_from(start),
            };
        }

        Ok(lhs)
    }

    fn parse_unit_pow(&mut self) -> Result<UnitTypeExpr> {
        let start = self.current().pos;
        let base = self.parse_unit_atom()?;
        if !self.consume(&TokenKind::StarStar) {
            return Ok(base);
        }

        let negative = self.consume(&TokenKind::Minus);
        let exponent = match *self.current_kind() {
            TokenKind::IntLit(n) => i32::try_from(n)
                .map_err(|_| Error::InvalidExponent { pos: self.current().pos })?,
            _ => return Err(Error::InvalidExponent { pos: self.current().pos }),
        };
        self.advance();

        Ok(UnitTypeExpr {
            id: self.node_id(),
            kind: UnitTypeKind::Pow {
                base: Box::new(base),
                exponent: if negative { -exponent } else { exponent },
            },
            pos: self.span_from(start),
        })
    }

    fn parse_unit_atom(&mut self) -> Result<UnitTypeExpr> {
        let start = self.current().pos;
        let kind = match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                UnitTypeKind::Simple(name)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_unit_type()?;
                self.expect(TokenKind::RParen)?;
                UnitTypeKind::Encapsulated(Box::new(inner))
            }
            _ => return Err(Error::ExpectedType { pos: start }),
        };
        Ok(UnitTypeExpr {
            id: self.node_id(),
            kind,
            pos: self.span_from(start),
        })
    }

    // ==================== Statements ====================

    /// Parse statements up to `end`, `elif` or `else` (not consumed)
    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current().pos;
        let id = self.node_id();
        let mut stmts = Vec::new();

        while !matches!(
            self.current_kind(),
            TokenKind::End | TokenKind::Elif | TokenKind::Else | TokenKind::Eof
        ) {
            stmts.push(self.parse_stmt()?);
        }

        let pos = if stmts.is_empty() {
            start
        } else {
            self.span_from(start)
        };
        Ok(Block { id, stmts, pos })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.current_kind() {
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Recordable | TokenKind::Function => {
                Ok(Stmt::Declaration(self.parse_declaration()?))
            }
            TokenKind::Ident(_) => {
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    Ok(Stmt::Call(self.parse_call()?))
                } else if self.is_assignment_ahead() {
                    self.parse_assignment()
                } else {
                    Ok(Stmt::Declaration(self.parse_declaration()?))
                }
            }
            _ => Err(Error::UnexpectedToken {
                expected: "statement".to_string(),
                got: self.current_kind().describe(),
                pos: self.current().pos,
            }),
        }
    }

    /// `name '* (= | += | -= | *= | /=)`
    fn is_assignment_ahead(&self) -> bool {
        let mut i = self.pos + 1;
        while matches!(self.tokens.get(i).map(|t| &t.kind), Some(TokenKind::Prime)) {
            i += 1;
        }
        matches!(
            self.tokens.get(i).map(|t| &t.kind),
            Some(TokenKind::Eq)
                | Some(TokenKind::PlusEq)
                | Some(TokenKind::MinusEq)
                | Some(TokenKind::StarEq)
                | Some(TokenKind::SlashEq)
        )
    }

    fn parse_assignment(&mut self) -> Result<Stmt> {
        let start = self.current().pos;
        let id = self.node_id();
        let lhs = self.parse_variable()?;
        let op = match self.advance().kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "assignment operator".to_string(),
                    got: other.describe(),
                    pos: self.previous_pos(),
                })
            }
        };
        let expr = self.parse_expr()?;
        Ok(Stmt::Assignment(Assignment {
            id,
            lhs,
            op,
            expr,
            pos: self.span_from(start),
        }))
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt> {
        let start = self.advance().pos;
        let id = self.node_id();
        let ends_here = self.current().first_on_line
            || matches!(
                self.current_kind(),
                TokenKind::End | TokenKind::Elif | TokenKind::Else
            );
        let expr = if ends_here { None } else { Some(self.parse_expr()?) };
        Ok(Stmt::Return(ReturnStmt {
            id,
            expr,
            pos: self.span_from(start),
        }))
    }

    fn parse_if_clause(&mut self) -> Result<IfClause> {
        let start = self.advance().pos;
        let id = self.node_id();
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let block = self.parse_block()?;
        Ok(IfClause {
            id,
            cond,
            block,
            pos: self.span_from(start),
        })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().pos;
        let id = self.node_id();
        let if_clause = self.parse_if_clause()?;

        let mut elif_clauses = Vec::new();
        while self.check(&TokenKind::Elif) {
            elif_clauses.push(self.parse_if_clause()?);
        }

        let else_block = if self.consume(&TokenKind::Else) {
            self.expect(TokenKind::Colon)?;
            Some(self.parse_block()?)
        } else {
            None
        };
        self.expect(TokenKind::End)?;

        Ok(Stmt::If(IfStmt {
            id,
            if_clause,
            elif_clauses,
            else_block,
            pos: self.span_from(start),
        }))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt> {
        let start = self.advance().pos;
        let id = self.node_id();
        let var = self.parse_name()?;
        self.expect(TokenKind::In)?;
        let from = self.parse_expr()?;
        self.expect(TokenKind::Ellipsis)?;
        let to = self.parse_expr()?;

        let step = if self.consume(&TokenKind::Step) {
            let negative = self.consume(&TokenKind::Minus);
            let value = match *self.current_kind() {
                TokenKind::IntLit(v) => v as f64,
                TokenKind::FloatLit(v) => v,
                _ => return Err(Error::Expected("numeric step".to_string(), self.current().pos)),
            };
            self.advance();
            if negative {
                -value
            } else {
                value
            }
        } else {
            1.0
        };

        self.expect(TokenKind::Colon)?;
        let block = self.parse_block()?;
        self.expect(TokenKind::End)?;

        Ok(Stmt::For(ForStmt {
            id,
            var,
            from,
            to,
            step,
            block,
            pos: self.span_from(start),
        }))
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt> {
        let start = self.advance().pos;
        let id = self.node_id();
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let block = self.parse_block()?;
        self.expect(TokenKind::End)?;
        Ok(Stmt::While(WhileStmt {
            id,
            cond,
            block,
            pos: self.span_from(start),
        }))
    }

    // ==================== Expression Parsing (Pratt) ====================

    pub fn parse_expr(&mut self) -> Result<Expr> {
        let start = self.current().pos;
        let cond = self.parse_expr_bp(BP_OR)?;

        if !(self.check(&TokenKind::Question) && self.continues_line()) {
            return Ok(cond);
        }
        self.advance();
        let then = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_expr()?;

        Ok(Expr {
            id: self.node_id(),
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            pos: self.span_from(start),
        })
    }

    /// Parse expression with binding power (Pratt parsing)
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let start = self.current().pos;
        let mut left = self.parse_prefix()?;

        loop {
            let Some((op, bp)) = Self::binary_op(self.current_kind()) else {
                break;
            };
            if bp < min_bp || !self.continues_line() {
                break;
            }
            self.advance();

            // `**` is right-associative
            let next_bp = if op == BinOp::Pow { bp } else { bp + 1 };
            let right = self.parse_expr_bp(next_bp)?;

            left = Expr {
                id: self.node_id(),
                kind: ExprKind::Binary {
                    lhs: Box::new(left),
                    op,
                    rhs: Box::new(right),
                },
                pos: self.span_from(start),
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        let start = self.current().pos;
        let kind = match self.current_kind() {
            TokenKind::Not => {
                self.advance();
                ExprKind::Not(Box::new(self.parse_expr_bp(BP_COMPARE)?))
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Tilde => {
                let op = match self.advance().kind {
                    TokenKind::Plus => UnaryOp::Plus,
                    TokenKind::Minus => UnaryOp::Minus,
                    _ => UnaryOp::BitNot,
                };
                ExprKind::Unary {
                    op,
                    expr: Box::new(self.parse_expr_bp(BP_POW)?),
                }
            }
            _ => return self.parse_primary(),
        };
        Ok(Expr {
            id: self.node_id(),
            kind,
            pos: self.span_from(start),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let kind = match token.kind {
            TokenKind::IntLit(v) => {
                self.advance();
                self.numeric_literal(Literal::Int(v))?
            }
            TokenKind::FloatLit(v) => {
                self.advance();
                self.numeric_literal(Literal::Float(v))?
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::Inf => {
                self.advance();
                ExprKind::Literal(Literal::Inf)
            }
            TokenKind::StringLit(s) => {
                self.advance();
                ExprKind::Literal(Literal::Str(s))
            }
            TokenKind::Ident(_) => {
                if matches!(self.peek_kind(), TokenKind::LParen) {
                    ExprKind::Call(self.parse_call()?)
                } else {
                    ExprKind::Variable(self.parse_variable()?)
                }
            }
            TokenKind::LParen => {
                self.advance();
                self.paren_depth += 1;
                let inner = self.parse_expr();
                self.paren_depth -= 1;
                let inner = inner?;
                self.expect(TokenKind::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            _ => return Err(Error::ExpectedExpr { pos: token.pos }),
        };

        Ok(Expr {
            id: self.node_id(),
            kind,
            pos: self.span_from(token.pos),
        })
    }

    /// A number optionally followed by a unit or variable on the same line
    fn numeric_literal(&mut self, value: Literal) -> Result<ExprKind> {
        let suffix = matches!(self.current_kind(), TokenKind::Ident(_))
            && !matches!(self.peek_kind(), TokenKind::LParen)
            && self.continues_line();
        if !suffix {
            return Ok(ExprKind::Literal(value));
        }
        let unit = self.parse_variable()?;
        Ok(ExprKind::NumericWithUnit { value, unit })
    }

    fn parse_call(&mut self) -> Result<FunctionCall> {
        let start = self.current().pos;
        let name = self.parse_name()?;
        self.expect(TokenKind::LParen)?;

        self.paren_depth += 1;
        let args = self.parse_args();
        self.paren_depth -= 1;
        let args = args?;
        self.expect(TokenKind::RParen)?;

        Ok(FunctionCall {
            id: self.node_id(),
            name,
            args,
            pos: self.span_from(start),
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn binary_op(kind: &TokenKind) -> Option<(BinOp, u8)> {
        let op = match kind {
            TokenKind::Or => (BinOp::Or, BP_OR),
            TokenKind::And => (BinOp::And, BP_AND),
            TokenKind::Lt => (BinOp::Lt, BP_COMPARE),
            TokenKind::LtEq => (BinOp::Le, BP_COMPARE),
            TokenKind::EqEq => (BinOp::Eq, BP_COMPARE),
            TokenKind::NotEq | TokenKind::LtGt => (BinOp::Ne, BP_COMPARE),
            TokenKind::GtEq => (BinOp::Ge, BP_COMPARE),
            TokenKind::Gt => (BinOp::Gt, BP_COMPARE),
            TokenKind::Pipe => (BinOp::BitOr, BP_BIT),
            TokenKind::Caret => (BinOp::BitXor, BP_BIT),
            TokenKind::Amp => (BinOp::BitAnd, BP_BIT),
            TokenKind::Shl => (BinOp::Shl, BP_BIT),
            TokenKind::Shr => (BinOp::Shr, BP_BIT),
            TokenKind::Plus => (BinOp::Add, BP_ADD),
            TokenKind::Minus => (BinOp::Sub, BP_ADD),
            TokenKind::Star => (BinOp::Mul, BP_MUL),
            TokenKind::Slash => (BinOp::Div, BP_MUL),
            TokenKind::Percent => (BinOp::Mod, BP_MUL),
            TokenKind::StarStar => (BinOp::Pow, BP_POW),
            _ => return None,
        };
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> CompilationUnit {
        parse_model(source).expect("model should parse")
    }

    fn parse_expr(source: &str) -> Expr {
        Parser::new(Lexer::new(source))
            .and_then(|mut p| p.parse_expr())
            .expect("expression should parse")
    }

    #[test]
    fn test_empty_neuron() {
        let unit = parse("neuron empty:\nend");
        assert_eq!(unit.neurons.len(), 1);
        assert_eq!(unit.neurons[0].name, "empty");
        assert!(unit.neurons[0].body.is_empty());
    }

    #[test]
    fn test_declarations_are_newline_separated() {
        let unit = parse(
            "neuron n:\n  state:\n    V_m mV = -70 mV\n    a, b real = 1.5\n    r integer\n  end\nend",
        );
        let block = unit.neurons[0].var_blocks().next().expect("state block");
        assert_eq!(block.kind, BlockKind::State);
        assert_eq!(block.declarations.len(), 3);
        assert_eq!(block.declarations[0].expr.as_ref().map(|e| e.to_string()), Some("-70 mV".to_string()));
        assert_eq!(block.declarations[1].variables.len(), 2);
        assert!(block.declarations[2].expr.is_none());
    }

    #[test]
    fn test_unit_types() {
        let unit = parse("neuron n:\n  parameters:\n    a 1/mV\n    b mV**2/ms\n    c (nS*mV)**-1\n  end\nend");
        let block = unit.neurons[0].var_blocks().next().expect("parameters block");
        let types: Vec<String> = block.declarations.iter().map(|d| d.data_type.to_string()).collect();
        assert_eq!(types, vec!["1/mV", "mV**2/ms", "(nS*mV)**-1"]);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse_expr("a + b * c ** 2 ** 3").to_string(), "a + b * c ** 2 ** 3");
        match parse_expr("-x ** 2").kind {
            ExprKind::Unary { op: UnaryOp::Minus, expr } => {
                assert!(matches!(expr.kind, ExprKind::Binary { op: BinOp::Pow, .. }))
            }
            other => panic!("expected unary minus, got {:?}", other),
        }
        match parse_expr("a < b and not c or d").kind {
            ExprKind::Binary { op: BinOp::Or, lhs, .. } => {
                assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::And, .. }))
            }
            other => panic!("expected or at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary_and_calls() {
        let expr = parse_expr("x > 0 ? exp(-t/tau) : 1.0");
        assert!(matches!(expr.kind, ExprKind::Ternary { .. }));
        assert_eq!(expr.to_string(), "x > 0 ? exp(-t / tau) : 1");
    }

    #[test]
    fn test_equations_block() {
        let unit = parse(
            "neuron n:\n  equations:\n    shape g_in = exp(-t/tau)\n    function I_syn pA = g_in * 1 pA\n    V_m' = -V_m/tau + I_syn/C_m\n  end\nend",
        );
        let eqs = unit.neurons[0].equations_blocks().next().expect("equations block");
        assert_eq!(eqs.decls.len(), 3);
        assert!(matches!(eqs.decls[0], OdeDecl::Shape(_)));
        assert!(matches!(eqs.decls[1], OdeDecl::Function(_)));
        match &eqs.decls[2] {
            OdeDecl::Equation(eq) => assert_eq!(eq.lhs.complete_name(), "V_m'"),
            other => panic!("expected an equation, got {:?}", other),
        }
    }

    #[test]
    fn test_input_output_update_function() {
        let unit = parse(
            "neuron n:\n  input:\n    spikes nS <- inhibitory excitatory spike\n    currents <- current\n  end\n  output: spike\n  update:\n    if r > 0:\n      r -= 1\n    elif r == 0:\n      r = 2\n    else:\n      foo(1, 2)\n    end\n    for i in 0 ... 10 step -2:\n      x += i\n    end\n  end\n  function foo(a real, b mV) mV:\n    return a * b\n  end\nend",
        );
        let neuron = &unit.neurons[0];
        let input = neuron.input_blocks().next().expect("input block");
        assert_eq!(input.lines[0].qualifiers.len(), 2);
        assert_eq!(input.lines[1].kind, SignalKind::Current);
        assert!(input.lines[1].data_type.is_none());

        let update = neuron.update_blocks().next().expect("update block");
        assert_eq!(update.block.stmts.len(), 2);
        match &update.block.stmts[0] {
            Stmt::If(stmt) => {
                assert_eq!(stmt.elif_clauses.len(), 1);
                assert!(stmt.else_block.is_some());
            }
            other => panic!("expected if, got {:?}", other),
        }
        match &update.block.stmts[1] {
            Stmt::For(stmt) => assert_eq!(stmt.step, -2.0),
            other => panic!("expected for, got {:?}", other),
        }

        let function = neuron.functions().next().expect("function");
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.return_type.as_ref().map(|t| t.to_string()), Some("mV".to_string()));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let unit = parse("neuron n:\n  state:\n    a mV = 1 mV + 2 mV\n  end\nend");
        let decl = &unit.neurons[0].var_blocks().next().expect("state block").declarations[0];
        let expr = decl.expr.as_ref().expect("initializer");
        let mut ids = vec![unit.neurons[0].id, decl.id, decl.data_type.id, decl.variables[0].id, expr.id];
        if let ExprKind::Binary { lhs, rhs, .. } = &expr.kind {
            ids.push(lhs.id);
            ids.push(rhs.id);
        }
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = parse_model("neuron n:\n  state:\n    V_m = \n  end\nend");
        assert!(result.is_err());
    }
}
