//! Delimiter translation.
//!
//! Tera only understands `{{ }}`, `{% %}` and `{# #}`. Templates written
//! with custom delimiters are rewritten to native syntax before parsing:
//! every tag is re-emitted with native delimiters, and literal text that
//! happens to contain a native delimiter is wrapped in a raw block so Tera
//! copies it through untouched.
//!
//! The same pass implements `allow_undefined`: a variable tag that is a
//! plain path (optionally followed by filters) gets `default(value="")`
//! inserted as its first filter.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use stamp_core::EngineConfig;

use crate::error::RenderError;

const NATIVE_VAR: (&str, &str) = ("{{", "}}");
const NATIVE_BLOCK: (&str, &str) = ("{%", "%}");
const NATIVE_COMMENT: (&str, &str) = ("{#", "#}");

#[allow(clippy::expect_used)]
static SIMPLE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*|\[\d+\])*)\s*(\|.*)?$")
        .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Variable,
    Block,
    Comment,
}

struct Delim<'a> {
    kind: Kind,
    start: &'a str,
    end: &'a str,
}

/// Rewrite `source` into native Tera syntax according to `engine`.
///
/// Returns the input unchanged when no rewriting is needed.
pub fn translate<'s>(
    template: &str,
    source: &'s str,
    engine: &EngineConfig,
) -> Result<Cow<'s, str>, RenderError> {
    if engine.has_default_syntax() && !engine.allow_undefined {
        return Ok(Cow::Borrowed(source));
    }
    Translator {
        template,
        source,
        delims: [
            Delim {
                kind: Kind::Variable,
                start: &engine.variable_start,
                end: &engine.variable_end,
            },
            Delim {
                kind: Kind::Block,
                start: &engine.block_start,
                end: &engine.block_end,
            },
            Delim {
                kind: Kind::Comment,
                start: &engine.comment_start,
                end: &engine.comment_end,
            },
        ],
        allow_undefined: engine.allow_undefined,
        out: String::with_capacity(source.len()),
    }
    .run()
    .map(Cow::Owned)
}

struct Translator<'a> {
    template: &'a str,
    source: &'a str,
    delims: [Delim<'a>; 3],
    allow_undefined: bool,
    out: String,
}

/// One parsed tag: whitespace markers plus the body between them.
struct Tag<'a> {
    kind: Kind,
    lead: &'a str,
    body: &'a str,
    trail: &'a str,
}

impl<'a> Translator<'a> {
    fn run(mut self) -> Result<String, RenderError> {
        let source = self.source;
        let mut pos = 0;
        while let Some((start, idx)) = self.next_start(pos) {
            self.push_literal(&source[pos..start]);
            let (tag, after) = self.read_tag(start, idx)?;
            pos = after;

            if tag.kind == Kind::Block && tag.body.trim() == "raw" {
                pos = self.copy_raw(&tag, pos)?;
            } else {
                self.push_tag(&tag);
            }
        }
        self.push_literal(&source[pos..]);
        Ok(self.out)
    }

    /// Earliest start delimiter at or after `pos`; longest wins on a tie.
    fn next_start(&self, pos: usize) -> Option<(usize, usize)> {
        self.delims
            .iter()
            .enumerate()
            .filter_map(|(i, d)| self.source[pos..].find(d.start).map(|off| (pos + off, i)))
            .min_by(|(a, ai), (b, bi)| {
                a.cmp(b)
                    .then(self.delims[*bi].start.len().cmp(&self.delims[*ai].start.len()))
            })
    }

    fn read_tag(&self, start: usize, idx: usize) -> Result<(Tag<'a>, usize), RenderError> {
        let source: &'a str = self.source;
        let delim = &self.delims[idx];
        let inner_start = start + delim.start.len();
        let rest = &source[inner_start..];
        let end = match delim.kind {
            Kind::Comment => rest.find(delim.end),
            _ => find_unquoted(rest, delim.end),
        }
        .ok_or_else(|| RenderError::UnterminatedTag {
            template: self.template.to_string(),
            line: source[..start].matches('\n').count() + 1,
            expected: delim.end.to_string(),
        })?;

        let inner = &rest[..end];
        let (lead, inner) = match inner.strip_prefix('-') {
            Some(stripped) => ("-", stripped),
            None => ("", inner),
        };
        let (body, trail) = match inner.strip_suffix('-') {
            Some(stripped) => (stripped, "-"),
            None => (inner, ""),
        };
        let tag = Tag {
            kind: delim.kind,
            lead,
            body,
            trail,
        };
        Ok((tag, inner_start + end + delim.end.len()))
    }

    /// Copy everything up to the matching `endraw` block verbatim.
    fn copy_raw(&mut self, open: &Tag<'_>, pos: usize) -> Result<usize, RenderError> {
        let source = self.source;
        let (block_start, block_end) = (self.delims[1].start, self.delims[1].end);
        let mut search = pos;
        while let Some(off) = source[search..].find(block_start) {
            let start = search + off;
            let (tag, after) = self.read_tag(start, 1)?;
            if tag.body.trim() == "endraw" {
                let content = &source[pos..start];
                self.out.push_str(NATIVE_BLOCK.0);
                self.out.push_str(open.lead);
                self.out.push_str(" raw ");
                self.out.push_str(open.trail);
                self.out.push_str(NATIVE_BLOCK.1);
                self.out.push_str(content);
                self.push_tag(&tag);
                return Ok(after);
            }
            search = after;
        }
        Err(RenderError::UnterminatedTag {
            template: self.template.to_string(),
            line: source[..pos].matches('\n').count() + 1,
            expected: format!("{block_start} endraw {block_end}"),
        })
    }

    fn push_tag(&mut self, tag: &Tag<'_>) {
        let (open, close) = match tag.kind {
            Kind::Variable => NATIVE_VAR,
            Kind::Block => NATIVE_BLOCK,
            Kind::Comment => NATIVE_COMMENT,
        };
        self.out.push_str(open);
        self.out.push_str(tag.lead);
        if tag.kind == Kind::Variable && self.allow_undefined {
            self.out.push_str(&with_default(tag.body));
        } else {
            self.out.push_str(tag.body);
        }
        self.out.push_str(tag.trail);
        self.out.push_str(close);
    }

    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let collides = [NATIVE_VAR.0, NATIVE_BLOCK.0, NATIVE_COMMENT.0]
            .iter()
            .any(|d| text.contains(d));
        if collides {
            self.out.push_str("{% raw %}");
            self.out.push_str(text);
            self.out.push_str("{% endraw %}");
        } else {
            self.out.push_str(text);
        }
    }
}

/// Position of `end` in `s`, skipping over quoted string literals.
fn find_unquoted(s: &str, end: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if s[i..].starts_with(end) => return Some(i),
            None if matches!(c, '"' | '\'' | '`') => quote = Some(c),
            None => {}
        }
    }
    None
}

fn with_default(body: &str) -> Cow<'_, str> {
    match SIMPLE_PATH.captures(body) {
        Some(caps) => {
            let path = caps.get(1).map_or("", |m| m.as_str());
            let filters = caps.get(2).map_or("", |m| m.as_str());
            Cow::Owned(format!(" {path} | default(value=\"\") {filters} "))
        }
        None => Cow::Borrowed(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(
        var: (&str, &str),
        block: (&str, &str),
        comment: (&str, &str),
    ) -> EngineConfig {
        EngineConfig {
            variable_start: var.0.into(),
            variable_end: var.1.into(),
            block_start: block.0.into(),
            block_end: block.1.into(),
            comment_start: comment.0.into(),
            comment_end: comment.1.into(),
            ..EngineConfig::default()
        }
    }

    fn custom() -> EngineConfig {
        engine(("[[", "]]"), ("[%", "%]"), ("[#", "#]"))
    }

    #[test]
    fn default_syntax_is_borrowed() {
        let out = translate("t", "{{ a }}", &EngineConfig::default()).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn custom_delimiters_become_native() {
        let out = translate("t", "[% if a %][[ a | upper ]][% endif %][# note #]", &custom()).unwrap();
        assert_eq!(out, "{% if a %}{{ a | upper }}{% endif %}{# note #}");
    }

    #[test]
    fn whitespace_markers_survive() {
        let out = translate("t", "x [[- a -]] y", &custom()).unwrap();
        assert_eq!(out, "x {{- a -}} y");
    }

    #[test]
    fn native_delimiters_in_literal_text_are_escaped() {
        let out = translate("t", "keep {{ this }} [[ a ]]", &custom()).unwrap();
        assert_eq!(out, "{% raw %}keep {{ this }} {% endraw %}{{ a }}");
    }

    #[test]
    fn quoted_end_delimiter_does_not_close_tag() {
        let out = translate("t", r#"[[ "]]" ~ a ]]"#, &custom()).unwrap();
        assert_eq!(out, r#"{{ "]]" ~ a }}"#);
    }

    #[test]
    fn raw_block_content_copied_verbatim() {
        let out = translate("t", "[% raw %][[ a ]][% endraw %]", &custom()).unwrap();
        assert_eq!(out, "{% raw %}[[ a ]]{% endraw %}");
    }

    #[test]
    fn unterminated_tag_reports_line() {
        let err = translate("t.stamp", "a\nb [[ c", &custom()).unwrap_err();
        match err {
            RenderError::UnterminatedTag { line, expected, .. } => {
                assert_eq!(line, 2);
                assert_eq!(expected, "]]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn allow_undefined_inserts_default_filter() {
        let cfg = EngineConfig {
            allow_undefined: true,
            ..EngineConfig::default()
        };
        let out = translate("t", "{{ a.b }}{{ c | upper }}{{ 1 + 2 }}", &cfg).unwrap();
        assert_eq!(
            out,
            "{{ a.b | default(value=\"\")  }}{{ c | default(value=\"\") | upper  }}{{ 1 + 2 }}"
        );
    }
}
