//! Splits rich-text field values into block-level segments.
//!
//! A field like `<p>One</p><p>Two</p>` becomes a skeleton of markup and two
//! translatable segments. Inline markup (`<strong>`, `<a href>`, `<br>`)
//! stays inside the segment it belongs to; block-level tags and comments
//! become skeleton markup. Rebuilding with translated segments puts the
//! original markup back around them.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9:-]*)\b[^<>]*?(/?)>").unwrap()
});

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "dd", "div", "dl", "dt",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "ul",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unexpected closing tag </{tag}>")]
    UnexpectedClose { tag: String },

    #[error("closing tag </{found}> does not match <{expected}>")]
    Mismatched { expected: String, found: String },

    #[error("unclosed <{tag}>")]
    Unclosed { tag: String },

    #[error("stray '<' at byte {offset}")]
    StrayBracket { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonPart {
    Markup(String),
    Segment(String),
}

/// The result of splitting one rich-text value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlSkeleton {
    parts: Vec<SkeletonPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClosing,
    Comment,
}

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Tag {
        raw: &'a str,
        name: String,
        kind: TagKind,
    },
}

impl Token<'_> {
    fn is_boundary(&self) -> bool {
        match self {
            Token::Text(_) => false,
            Token::Tag { kind, .. } if *kind == TagKind::Comment => true,
            Token::Tag { name, .. } => BLOCK_TAGS.contains(&name.as_str()),
        }
    }
}

fn tokenize(html: &str) -> Result<Vec<Token<'_>>, MarkupError> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in RE_TAG.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_text(&mut tokens, html, last, whole.start())?;
        last = whole.end();

        let raw = whole.as_str();
        let Some(name) = caps.get(2) else {
            tokens.push(Token::Tag {
                raw,
                name: String::new(),
                kind: TagKind::Comment,
            });
            continue;
        };

        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
        let kind = if closing {
            TagKind::Close
        } else if self_closing || VOID_TAGS.contains(&name.as_str()) {
            TagKind::SelfClosing
        } else {
            TagKind::Open
        };
        tokens.push(Token::Tag { raw, name, kind });
    }

    push_text(&mut tokens, html, last, html.len())?;
    Ok(tokens)
}

fn push_text<'a>(
    tokens: &mut Vec<Token<'a>>,
    html: &'a str,
    start: usize,
    end: usize,
) -> Result<(), MarkupError> {
    let text = &html[start..end];
    if let Some(pos) = text.find('<') {
        return Err(MarkupError::StrayBracket { offset: start + pos });
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(())
}

fn check_balance(tokens: &[Token<'_>]) -> Result<(), MarkupError> {
    let mut open: Vec<&str> = Vec::new();
    for token in tokens {
        let Token::Tag { name, kind, .. } = token else {
            continue;
        };
        match kind {
            TagKind::Open => open.push(name),
            TagKind::Close => match open.pop() {
                Some(expected) if expected == name => {}
                Some(expected) => {
                    return Err(MarkupError::Mismatched {
                        expected: expected.to_string(),
                        found: name.clone(),
                    })
                }
                None => return Err(MarkupError::UnexpectedClose { tag: name.clone() }),
            },
            TagKind::SelfClosing | TagKind::Comment => {}
        }
    }

    match open.pop() {
        Some(tag) => Err(MarkupError::Unclosed {
            tag: tag.to_string(),
        }),
        None => Ok(()),
    }
}

/// Splits `html` into a skeleton. Fails on unbalanced or malformed markup.
pub fn split(html: &str) -> Result<HtmlSkeleton, MarkupError> {
    let tokens = tokenize(html)?;
    check_balance(&tokens)?;

    let mut skeleton = HtmlSkeleton::default();
    let mut run = String::new();
    let mut run_has_text = false;

    for token in &tokens {
        if token.is_boundary() {
            skeleton.flush_run(&mut run, run_has_text);
            run_has_text = false;
            if let Token::Tag { raw, .. } = token {
                skeleton.push_markup(raw);
            }
            continue;
        }

        match token {
            Token::Text(text) => {
                run_has_text |= !text.trim().is_empty();
                run.push_str(text);
            }
            Token::Tag { raw, .. } => run.push_str(raw),
        }
    }
    skeleton.flush_run(&mut run, run_has_text);

    Ok(skeleton)
}

impl HtmlSkeleton {
    pub fn parts(&self) -> &[SkeletonPart] {
        &self.parts
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            SkeletonPart::Segment(text) => Some(text.as_str()),
            SkeletonPart::Markup(_) => None,
        })
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Reassembles the value with `targets` in place of the segments.
    /// Returns `None` when the number of targets does not match.
    pub fn rebuild<S: AsRef<str>>(&self, targets: &[S]) -> Option<String> {
        if targets.len() != self.segment_count() {
            return None;
        }

        let mut out = String::new();
        let mut targets = targets.iter();
        for part in &self.parts {
            match part {
                SkeletonPart::Markup(markup) => out.push_str(markup),
                SkeletonPart::Segment(_) => out.push_str(targets.next()?.as_ref()),
            }
        }
        Some(out)
    }

    fn push_markup(&mut self, markup: &str) {
        if markup.is_empty() {
            return;
        }
        if let Some(SkeletonPart::Markup(last)) = self.parts.last_mut() {
            last.push_str(markup);
        } else {
            self.parts.push(SkeletonPart::Markup(markup.to_string()));
        }
    }

    /// Moves the pending run into the skeleton. Surrounding whitespace stays
    /// in the markup so segments are trimmed.
    fn flush_run(&mut self, run: &mut String, has_text: bool) {
        if run.is_empty() {
            return;
        }
        if !has_text {
            self.push_markup(run);
            run.clear();
            return;
        }

        let trimmed_start = run.trim_start();
        let lead = &run[..run.len() - trimmed_start.len()];
        let core = trimmed_start.trim_end();
        let trail = &trimmed_start[core.len()..];

        let (lead, core, trail) = (lead.to_string(), core.to_string(), trail.to_string());
        self.push_markup(&lead);
        self.parts.push(SkeletonPart::Segment(core));
        self.push_markup(&trail);
        run.clear();
    }
}
