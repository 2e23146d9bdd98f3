//! Token definitions for NESTML

use crate::utils::SourcePosition;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: SourcePosition,
    /// A line break separates this token from the previous one
    pub first_on_line: bool,
}

impl Token {
    pub fn new(kind: TokenKind, pos: SourcePosition) -> Self {
        Self { kind, pos, first_on_line: false }
    }

    pub fn eof(pos: SourcePosition) -> Self {
        Self { kind: TokenKind::Eof, pos, first_on_line: true }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Structure Keywords ============
    /// neuron
    Neuron,
    /// end
    End,
    /// state
    State,
    /// parameters
    Parameters,
    /// internals
    Internals,
    /// initial_values
    InitialValues,
    /// equations
    Equations,
    /// input
    Input,
    /// output
    Output,
    /// update
    Update,
    /// function
    Function,
    /// shape
    Shape,
    /// recordable
    Recordable,

    // ============ Statement Keywords ============
    /// if
    If,
    /// elif
    Elif,
    /// else
    Else,
    /// for
    For,
    /// in
    In,
    /// step
    Step,
    /// while
    While,
    /// return
    Return,

    // ============ Logic Keywords ============
    /// and
    And,
    /// or
    Or,
    /// not
    Not,
    /// true
    True,
    /// false
    False,
    /// inf
    Inf,

    // ============ Type Keywords ============
    /// integer
    Integer,
    /// real
    Real,
    /// string
    String,
    /// boolean
    Boolean,
    /// void
    Void,

    // ============ Input Keywords ============
    /// spike
    Spike,
    /// current
    Current,
    /// inhibitory
    Inhibitory,
    /// excitatory
    Excitatory,

    // ============ Identifiers and Literals ============
    /// Identifier (variable, unit or function name)
    Ident(std::string::String),
    /// Integer literal
    IntLit(i64),
    /// Floating-point literal
    FloatLit(f64),
    /// String literal
    StringLit(std::string::String),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// **
    StarStar,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    NotEq,
    /// <>
    LtGt,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// &
    Amp,
    /// |
    Pipe,
    /// ^
    Caret,
    /// ~
    Tilde,
    /// <<
    Shl,
    /// >>
    Shr,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// <-
    LeftArrow,
    /// ?
    Question,
    /// '
    Prime,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// [[
    LDoubleBracket,
    /// ]]
    RDoubleBracket,
    /// ,
    Comma,
    /// :
    Colon,
    /// ...
    Ellipsis,

    // ============ Special ============
    /// End of file
    Eof,
}

impl TokenKind {
    /// Look up a keyword by its source text
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "neuron" => Some(TokenKind::Neuron),
            "end" => Some(TokenKind::End),
            "state" => Some(TokenKind::State),
            "parameters" => Some(TokenKind::Parameters),
            "internals" => Some(TokenKind::Internals),
            "initial_values" => Some(TokenKind::InitialValues),
            "equations" => Some(TokenKind::Equations),
            "input" => Some(TokenKind::Input),
            "output" => Some(TokenKind::Output),
            "update" => Some(TokenKind::Update),
            "function" => Some(TokenKind::Function),
            "shape" => Some(TokenKind::Shape),
            "recordable" => Some(TokenKind::Recordable),
            "if" => Some(TokenKind::If),
            "elif" => Some(TokenKind::Elif),
            "else" => Some(TokenKind::Else),
            "for" => Some(TokenKind::For),
            "in" => Some(TokenKind::In),
            "step" => Some(TokenKind::Step),
            "while" => Some(TokenKind::While),
            "return" => Some(TokenKind::Return),
            "and" => Some(TokenKind::And),
            "or" => Some(TokenKind::Or),
            "not" => Some(TokenKind::Not),
            "true" | "True" => Some(TokenKind::True),
            "false" | "False" => Some(TokenKind::False),
            "inf" => Some(TokenKind::Inf),
            "integer" => Some(TokenKind::Integer),
            "real" => Some(TokenKind::Real),
            "string" => Some(TokenKind::String),
            "boolean" => Some(TokenKind::Boolean),
            "void" => Some(TokenKind::Void),
            "spike" => Some(TokenKind::Spike),
            "current" => Some(TokenKind::Current),
            "inhibitory" => Some(TokenKind::Inhibitory),
            "excitatory" => Some(TokenKind::Excitatory),
            _ => None,
        }
    }

    /// Human readable description used in parse errors
    pub fn describe(&self) -> std::string::String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::IntLit(v) => format!("integer '{}'", v),
            TokenKind::FloatLit(v) => format!("float '{}'", v),
            TokenKind::StringLit(s) => format!("string \"{}\"", s),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("{:?}", other),
        }
    }
}
