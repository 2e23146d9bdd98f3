//! Frontend module - Lexer, Parser, Symbol Tables, Type Checking

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod visitor;
pub mod transform;
pub mod symbol_table;
pub mod type_checker;
pub mod pipeline;
