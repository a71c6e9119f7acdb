//! Lexer for placeholder templates

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    #[token("{{")]
    Open,

    #[token("}}")]
    Close,

    #[token("\n")]
    Newline,

    #[token("{")]
    #[token("}")]
    Brace,

    #[regex(r"[^{}\n]+")]
    Text,
}
