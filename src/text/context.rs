//! Expanding match offsets into whole lines and surrounding context

use crate::{Config, FileKey, Match};
use std::collections::HashSet;
use tracing::debug;

/// The physical line containing some byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    /// Byte offset of the first character of the line
    pub start: usize,
    /// Byte offset of the terminating newline, or the end of the text
    pub end: usize,
    /// 1-based line number
    pub number: usize,
}

/// Find the line around `offset`
pub fn line_at(text: &str, offset: usize) -> LineSpan {
    let offset = offset.min(text.len());
    let start = text[..offset].rfind('\n').map_or(0, |nl| nl + 1);
    let end = text[offset..].find('\n').map_or(text.len(), |nl| offset + nl);
    let number = text[..start].matches('\n').count() + 1;
    LineSpan { start, end, number }
}

/// The lines of `text`
///
/// A newline ends the line before it, so a final `\n` does not open an empty
/// line after it.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.strip_suffix('\n').unwrap_or(text).split('\n').collect()
}

/// Lines before and after `line_number`, clamped to the file
///
/// `lines` is the whole text as returned by [`split_lines`].
pub fn context_window<'a, 'b>(
    lines: &'b [&'a str],
    line_number: usize,
    before: usize,
    after: usize,
) -> (&'b [&'a str], &'b [&'a str]) {
    if lines.is_empty() {
        return (&[], &[]);
    }
    let idx = line_number.saturating_sub(1).min(lines.len() - 1);
    let before = before.min(idx);
    let after = after.min(lines.len() - idx - 1);
    (&lines[idx - before..idx], &lines[idx + 1..idx + 1 + after])
}

/// Convenience form of [`context_window`] over unsplit text
pub fn context_lines(
    content: &str,
    line_number: usize,
    before: usize,
    after: usize,
) -> (Vec<&str>, Vec<&str>) {
    let lines = split_lines(content);
    let (leading, trailing) = context_window(&lines, line_number, before, after);
    (leading.to_vec(), trailing.to_vec())
}

pub fn expand_tabs(s: &str, width: usize) -> String {
    s.replace('\t', &" ".repeat(width))
}

/// Builds the output records for one highlighted file
pub struct LineExtractor<'a> {
    key: &'a FileKey,
    branch: &'a str,
    before: usize,
    after: usize,
    tab_width: usize,
}

impl<'a> LineExtractor<'a> {
    pub fn new(key: &'a FileKey, branch: &'a str, config: &Config) -> Self {
        Self {
            key,
            branch,
            before: config.before_lines(),
            after: config.after_lines(),
            tab_width: config.tab_width,
        }
    }

    /// One record per matching line, each preceded and followed by its context
    ///
    /// A line holding several matches is emitted once; it already carries the
    /// markup of all of them.
    pub fn extract(
        &self,
        text: &str,
        offsets: impl IntoIterator<Item = usize>,
    ) -> Vec<Match> {
        let lines = if self.before > 0 || self.after > 0 {
            split_lines(text)
        } else {
            Vec::new()
        };

        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for offset in offsets {
            let line = line_at(text, offset);
            if !seen.insert(line.number) {
                debug!("[{}] already processed this line, moving on", line.number);
                continue;
            }

            let (leading, trailing) =
                context_window(&lines, line.number, self.before, self.after);

            for (i, l) in leading.iter().enumerate() {
                records.push(self.record(line.number - leading.len() + i, 0, l));
            }
            let column = offset - line.start;
            records.push(self.record(line.number, column, &text[line.start..line.end]));
            for (i, l) in trailing.iter().enumerate() {
                records.push(self.record(line.number + i + 1, 0, l));
            }
        }

        records
    }

    fn record(&self, line_number: usize, column_number: usize, text: &str) -> Match {
        Match {
            owner: self.key.owner.clone(),
            repo: self.key.repo_name.clone(),
            branch: self.branch.to_string(),
            path: self.key.path.clone(),
            line_number,
            column_number,
            text: expand_tabs(text, self.tab_width),
        }
    }
}
