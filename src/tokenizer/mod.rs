//! # Tokenizer Component
//!
//! The Tokenizer component performs lexical analysis of SciFiWeb source code,
//! transforming raw text into a structured token stream for the parser.
//!
//! ## Design Principles
//!
//! * **Position Information**: Each token carries its line and column so later
//!   stages can report precise diagnostics.
//! * **Comment Preservation**: Comments are emitted as tokens and stripped by
//!   the preprocessor, keeping the lexer a pure text-to-token transform.
//! * **Boundary Awareness**: Keywords are only recognized on identifier
//!   boundaries, so `optional` lexes as an identifier rather than the keyword
//!   `option` followed by `al`.
//!
//! ## Component Structure
//!
//! * [`token`]: Core token types and the [`Tokenizer`](token::Tokenizer)
//! * [`keyword`]: The reserved word set of the language
//! * [`symbol`]: Operators and delimiters
//! * [`literal`]: Number and string literals
//! * [`comment`]: Line comments and the `#include` directive
//!
//! ## Integration Points
//!
//! The Tokenizer is the first phase of the processing pipeline:
//!
//! 1. **Input**: Raw SciFiWeb text
//! 2. **Processing**: [`Tokenizer::tokenize`](token::Tokenizer::tokenize)
//! 3. **Output**: Stream of [`TokenSpan`](token::TokenSpan) values
//! 4. **Next Stage**: The preprocessor strips comments and expands includes,
//!    then the parser consumes the stream to build the AST.

pub mod comment;
pub mod keyword;
pub mod literal;
pub mod symbol;
pub mod token;
