//! Minimal built-in text renderer
//!
//! Supports `{{ key }}` substitution from the current options (dotted keys
//! descend into tables), `{{ section }}` and `{{ template }}` for the cursor,
//! and `{{ yield }}` / `{{ yieldall }}` to render subsections.

use logos::Logos;

use super::lexer::Token;
use super::{Bindings, Resume, TextRenderer};
use crate::error::TemplateError;
use crate::options::stringify;

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

fn syntax_error(
    bindings: &Bindings<'_>,
    line: usize,
    offset: usize,
    message: String,
) -> TemplateError {
    TemplateError::Syntax {
        file: bindings.file.to_path_buf(),
        line,
        offset,
        message,
    }
}

impl PlaceholderRenderer {
    fn evaluate(
        &self,
        expr: &str,
        bindings: &Bindings<'_>,
        resume: &mut dyn Resume,
        line: usize,
        offset: usize,
    ) -> Result<String, TemplateError> {
        match expr {
            "yield" => resume.resume(None),
            "yieldall" => resume.resume_all(None),
            "section" => Ok(bindings.section.to_string()),
            "template" => Ok(bindings.template.to_string()),
            "" => Err(syntax_error(bindings, line, offset, "empty tag".to_string())),
            key => bindings.options.lookup(key).map(stringify).ok_or_else(|| {
                syntax_error(bindings, line, offset, format!("undefined key '{}'", key))
            }),
        }
    }
}

impl TextRenderer for PlaceholderRenderer {
    fn render(
        &self,
        text: &str,
        bindings: &Bindings<'_>,
        resume: &mut dyn Resume,
    ) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(text.len());
        let mut line = 1;
        let mut lexer = Token::lexer(text);

        while let Some(token) = lexer.next() {
            let token = token.map_err(|_| {
                syntax_error(bindings, line, lexer.span().start, "unexpected input".to_string())
            })?;
            match token {
                Token::Text | Token::Brace | Token::Close => output.push_str(lexer.slice()),
                Token::Newline => {
                    output.push('\n');
                    line += 1;
                }
                Token::Open => {
                    let start = lexer.span().start;
                    let mut expr = String::new();
                    loop {
                        match lexer.next() {
                            Some(Ok(Token::Close)) => break,
                            Some(Ok(Token::Text | Token::Brace)) => expr.push_str(lexer.slice()),
                            Some(Ok(Token::Open)) => {
                                return Err(syntax_error(
                                    bindings,
                                    line,
                                    lexer.span().start,
                                    "nested tag".to_string(),
                                ))
                            }
                            Some(Ok(Token::Newline)) | Some(Err(_)) | None => {
                                return Err(syntax_error(
                                    bindings,
                                    line,
                                    start,
                                    "unclosed tag".to_string(),
                                ))
                            }
                        }
                    }
                    output.push_str(&self.evaluate(expr.trim(), bindings, resume, line, start)?);
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl Resume for Recorder {
        fn resume(&mut self, _overrides: Option<&Options>) -> Result<String, TemplateError> {
            self.calls.push("yield");
            Ok("<next>".to_string())
        }

        fn resume_all(&mut self, _overrides: Option<&Options>) -> Result<String, TemplateError> {
            self.calls.push("yieldall");
            Ok("<all>".to_string())
        }
    }

    fn render(text: &str, options: &Options) -> (Result<String, TemplateError>, Vec<&'static str>) {
        let bindings = Bindings {
            template: "default/class",
            section: "header",
            file: Path::new("header.tpl"),
            options,
            subsections: None,
        };
        let mut recorder = Recorder::default();
        let result = PlaceholderRenderer.render(text, &bindings, &mut recorder);
        (result, recorder.calls)
    }

    #[test]
    fn test_substitutes_options() {
        let options = Options::new().with("name", "Widget").with("count", 3);
        let (out, _) = render("{{name}} x{{ count }}", &options);
        assert_eq!(out.unwrap(), "Widget x3");
    }

    #[test]
    fn test_cursor_bindings() {
        let (out, _) = render("{{ template }}#{{ section }}", &Options::new());
        assert_eq!(out.unwrap(), "default/class#header");
    }

    #[test]
    fn test_yield_calls_resume() {
        let (out, calls) = render("[{{ yield }}|{{ yield }}|{{ yieldall }}]", &Options::new());
        assert_eq!(out.unwrap(), "[<next>|<next>|<all>]");
        assert_eq!(calls, vec!["yield", "yield", "yieldall"]);
    }

    #[test]
    fn test_literal_braces_pass_through() {
        let (out, _) = render("fn main() { } }}", &Options::new());
        assert_eq!(out.unwrap(), "fn main() { } }}");
    }

    #[test]
    fn test_unclosed_tag_reports_line() {
        let (out, _) = render("line one\nline {{ two\n", &Options::new());
        match out.unwrap_err() {
            TemplateError::Syntax { file, line, offset, message } => {
                assert_eq!(file, Path::new("header.tpl"));
                assert_eq!(line, 2);
                assert_eq!(offset, 14);
                assert_eq!(message, "unclosed tag");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_undefined_key_is_syntax_error() {
        let (out, _) = render("{{ missing }}", &Options::new());
        assert!(matches!(
            out,
            Err(TemplateError::Syntax { ref message, .. }) if message.contains("missing")
        ));
    }

    #[test]
    fn test_nested_tag_is_rejected() {
        let (out, _) = render("{{ a {{ b }} }}", &Options::new());
        assert!(matches!(
            out,
            Err(TemplateError::Syntax { ref message, .. }) if message == "nested tag"
        ));
    }
}
