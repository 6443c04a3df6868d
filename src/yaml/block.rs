//! Block scalar accumulation (`>` folded, `|` literal).

use std::iter::Peekable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// Lines joined with single spaces
    Folded,
    /// Line breaks preserved
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chomping {
    /// No trailing newline (`>` and `>-`)
    Strip,
    /// Trailing newlines kept, including those of trailing blank lines (`>+`)
    Keep,
}

/// A parsed block indicator such as `>`, `|-`, `|+` or `|2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIndicator {
    pub style: BlockStyle,
    pub chomping: Chomping,
    /// Explicit content indentation relative to the key
    pub indent: Option<usize>,
}

impl BlockIndicator {
    /// Parse a field value; returns `None` for ordinary scalars.
    pub fn parse(value: &str) -> Option<Self> {
        let mut chars = value.chars();
        let style = match chars.next()? {
            '>' => BlockStyle::Folded,
            '|' => BlockStyle::Literal,
            _ => return None,
        };

        let mut chomping = None;
        let mut indent = None;
        for c in chars {
            match c {
                '-' | '+' if chomping.is_none() => {
                    chomping = Some(if c == '+' { Chomping::Keep } else { Chomping::Strip });
                }
                '1'..='9' if indent.is_none() => indent = c.to_digit(10).map(|d| d as usize),
                _ => return None,
            }
        }

        Some(Self {
            style,
            chomping: chomping.unwrap_or(Chomping::Strip),
            indent,
        })
    }
}

/// Consume the lines of a block scalar whose key sits at `parent_indent`.
///
/// Every line indented deeper than the key (and every blank line) belongs to
/// the block. The first non-blank line at or below the key's indentation is
/// left in `lines`. Reaching the end of input just ends the block.
pub fn accumulate<'a, I>(
    lines: &mut Peekable<I>,
    parent_indent: usize,
    indicator: BlockIndicator,
) -> String
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut raw: Vec<&str> = Vec::new();
    while let Some(&(_, line)) = lines.peek() {
        let content = line.trim_start();
        if content.is_empty() {
            raw.push("");
        } else if line.len() - content.len() <= parent_indent {
            break;
        } else {
            raw.push(line);
        }
        lines.next();
    }

    let mut trailing_blanks = 0;
    while raw.last().is_some_and(|line| line.is_empty()) {
        raw.pop();
        trailing_blanks += 1;
    }

    let common = match indicator.indent {
        Some(indent) => parent_indent + indent,
        None => raw
            .iter()
            .filter(|line| !line.is_empty())
            .map(|line| indent_of(line))
            .min()
            .unwrap_or(0),
    };
    let stripped = raw
        .iter()
        .map(|line| line.get(common.min(indent_of(line))..).unwrap_or(""));

    let mut text = match indicator.style {
        BlockStyle::Literal => stripped.collect::<Vec<_>>().join("\n"),
        BlockStyle::Folded => fold(stripped),
    };
    if indicator.chomping == Chomping::Keep && !raw.is_empty() {
        text.push_str(&"\n".repeat(trailing_blanks + 1));
    }
    text
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn fold<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut text = String::new();
    for line in lines {
        if line.is_empty() {
            text.push('\n');
            continue;
        }
        if !text.is_empty() && !text.ends_with('\n') {
            text.push(' ');
        }
        text.push_str(line);
    }
    text
}
