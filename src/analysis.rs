//! Analysis: turning field text into an [`Inversion`] of tokens.

pub mod analyzer;
pub mod inversion;
pub mod token;

pub use analyzer::{Analyzer, StandardAnalyzer, WhitespaceAnalyzer, analyzer_by_name};
pub use inversion::Inversion;
pub use token::Token;
