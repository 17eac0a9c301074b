//! Locating search fragments in full file text and highlighting the matches

use crate::{FileKey, TextMatch};
use colored::Colorize;
use tracing::{debug, warn};

/// Markup placed around every matched span
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Highlight {
    /// Red ANSI escapes; turned off by `colored` when NO_COLOR is set or stdout isn't a tty
    #[default]
    Ansi,
    /// No markup at all
    Plain,
    /// Arbitrary opening and closing strings
    Delimited { open: String, close: String },
}

impl Highlight {
    pub fn delimited(open: &str, close: &str) -> Self {
        Highlight::Delimited {
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    pub fn wrap(&self, s: &str) -> String {
        match self {
            Highlight::Ansi => s.red().to_string(),
            Highlight::Plain => s.to_string(),
            Highlight::Delimited { open, close } => format!("{open}{s}{close}"),
        }
    }
}

/// A file's text after highlighting, plus where each match now starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    pub text: String,
    /// Byte offsets into `text` of every highlighted match start, one group
    /// per fragment that was found, in the order the fragments were given
    pub fragments: Vec<Vec<usize>>,
}

impl Localized {
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.fragments.iter().flatten().copied()
    }
}

/// Finds fragments inside full text and wraps their match ranges in markup
pub struct Localizer<'a> {
    highlight: &'a Highlight,
    max_fragments: Option<usize>,
}

impl<'a> Localizer<'a> {
    pub fn new(highlight: &'a Highlight) -> Self {
        Self {
            highlight,
            max_fragments: None,
        }
    }

    /// Stop after this many fragments have been located
    pub fn max_fragments(mut self, max: Option<usize>) -> Self {
        self.max_fragments = max;
        self
    }

    /// Highlight every match of `matches` inside `content`
    ///
    /// Fragments that can't be found are skipped with a warning. `truncated`
    /// only changes which warning is printed.
    pub fn localize(
        &self,
        key: &FileKey,
        content: &str,
        matches: &[TextMatch],
        truncated: bool,
    ) -> Localized {
        let mut state = Localized {
            text: content.to_string(),
            fragments: Vec::new(),
        };

        for tm in matches {
            if self
                .max_fragments
                .is_some_and(|max| state.fragments.len() >= max)
            {
                break;
            }
            if tm.fragment.is_empty() {
                debug!("empty fragment for {}, skipping", key);
                continue;
            }

            // Searched in the already highlighted text, so markup from earlier
            // fragments is part of the located offset.
            let Some(fragment_start) = state.text.find(&tm.fragment) else {
                if truncated {
                    warn!("file content truncated in GitHub reply: {}", key);
                } else {
                    warn!("couldn't find search term in file content: {}", key);
                }
                debug!("search term: {:?}", tm.fragment);
                continue;
            };

            let starts = self.highlight_fragment(key, &mut state, tm, fragment_start);
            state.fragments.push(starts);
        }

        state
    }

    fn highlight_fragment(
        &self,
        key: &FileKey,
        state: &mut Localized,
        tm: &TextMatch,
        fragment_start: usize,
    ) -> Vec<usize> {
        let mut indices = tm.indices.clone();
        indices.sort_unstable();

        let mut starts = Vec::with_capacity(indices.len());
        let mut drift = 0;
        let mut previous_end = 0;

        for (local_start, local_end) in indices {
            if local_start > local_end
                || local_end > tm.fragment.len()
                || local_start < previous_end
                || !tm.fragment.is_char_boundary(local_start)
                || !tm.fragment.is_char_boundary(local_end)
            {
                warn!(
                    "ignoring match range {}..{} outside of fragment: {}",
                    local_start, local_end, key
                );
                continue;
            }
            previous_end = local_end;

            let start = fragment_start + local_start + drift;
            let end = fragment_start + local_end + drift;
            let wrapped = self.highlight.wrap(&state.text[start..end]);
            let grown = wrapped.len() - (end - start);
            state.text.replace_range(start..end, &wrapped);

            // Offsets kept from earlier fragments that sit past this span
            for offset in state.fragments.iter_mut().flatten() {
                if *offset >= end {
                    *offset += grown;
                }
            }

            drift += grown;
            starts.push(start);
        }

        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key() -> FileKey {
        FileKey::new("owner", "repo", "file.txt")
    }

    fn tm(fragment: &str, indices: &[(usize, usize)]) -> TextMatch {
        TextMatch {
            fragment: fragment.to_string(),
            indices: indices.to_vec(),
        }
    }

    fn brackets() -> Highlight {
        Highlight::delimited("[", "]")
    }

    fn strip(s: &str) -> String {
        s.replace(['[', ']'], "")
    }

    #[test]
    fn no_matches_leaves_text_alone() {
        let h = brackets();
        let out = Localizer::new(&h).localize(&key(), "foo\nbar\n", &[], false);
        assert_eq!(out.text, "foo\nbar\n");
        assert!(out.fragments.is_empty());
    }

    #[test]
    fn highlights_single_match() {
        let h = brackets();
        let fragments = [tm("bar", &[(0, 3)])];
        let out = Localizer::new(&h).localize(&key(), "foo\nbar\nbaz\n", &fragments, false);
        assert_eq!(out.text, "foo\n[bar]\nbaz\n");
        assert_eq!(out.fragments, vec![vec![4]]);
    }

    #[test]
    fn drift_keeps_later_ranges_on_their_words() {
        let h = Highlight::delimited("<em>", "</em>");
        let content = "let alpha = beta + gamma;\n";
        let fragment = "alpha = beta + gamma";
        let out = Localizer::new(&h).localize(
            &key(),
            content,
            &[tm(fragment, &[(0, 5), (8, 12), (15, 20)])],
            false,
        );
        assert_eq!(out.text, "let <em>alpha</em> = <em>beta</em> + <em>gamma</em>;\n");

        let words: Vec<_> = out.fragments[0]
            .iter()
            .map(|&start| {
                let rest = &out.text[start..];
                let end = rest.find("</em>").unwrap() + "</em>".len();
                rest[..end].replace("<em>", "").replace("</em>", "")
            })
            .collect();
        assert_eq!(words, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn unsorted_indices_are_applied_in_order() {
        let h = brackets();
        let fragments = [tm("a b c", &[(4, 5), (0, 1)])];
        let out = Localizer::new(&h).localize(&key(), "a b c", &fragments, false);
        assert_eq!(out.text, "[a] b [c]");
        assert_eq!(out.fragments, vec![vec![0, 6]]);
    }

    #[test]
    fn later_fragment_before_earlier_one_shifts_recorded_offsets() {
        let h = brackets();
        let content = "one\ntwo\nthree\n";
        let out = Localizer::new(&h).localize(
            &key(),
            content,
            &[tm("three", &[(0, 5)]), tm("one", &[(0, 3)])],
            false,
        );
        assert_eq!(out.text, "[one]\ntwo\n[three]\n");
        assert_eq!(out.fragments, vec![vec![10], vec![0]]);
        assert_eq!(&out.text[10..17], "[three]");
    }

    #[test]
    fn missing_fragment_is_skipped() {
        let h = brackets();
        let matches = [tm("nowhere", &[(0, 3)]), tm("bar", &[(0, 3)])];
        for truncated in [false, true] {
            let out = Localizer::new(&h).localize(&key(), "foo bar", &matches, truncated);
            assert_eq!(out.text, "foo [bar]");
            assert_eq!(out.fragments, vec![vec![4]]);
        }
    }

    #[test]
    fn bad_ranges_are_ignored() {
        let h = brackets();
        let content = "héllo world";
        // 2 falls inside the two byte 'é'
        let out = Localizer::new(&h).localize(
            &key(),
            content,
            &[tm(content, &[(0, 2), (7, 100), (5, 3), (7, 12)])],
            false,
        );
        assert_eq!(out.text, "héllo [world]");
        assert_eq!(strip(&out.text), content);
    }

    #[test]
    fn multibyte_text_keeps_byte_offsets() {
        let h = brackets();
        let content = "ünïcode match";
        let out = Localizer::new(&h).localize(&key(), content, &[tm("match", &[(0, 5)])], false);
        assert_eq!(out.fragments, vec![vec![10]]);
        assert_eq!(&out.text[10..], "[match]");
    }

    #[test]
    fn max_fragments_counts_only_located_fragments() {
        let h = brackets();
        let matches = [tm("zzz", &[(0, 1)]), tm("foo", &[(0, 3)]), tm("bar", &[(0, 3)])];
        let out = Localizer::new(&h)
            .max_fragments(Some(1))
            .localize(&key(), "foo bar", &matches, false);
        assert_eq!(out.text, "[foo] bar");
        assert_eq!(out.offsets().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn plain_highlight_adds_nothing() {
        let fragments = [tm("bar", &[(0, 3)])];
        let out = Localizer::new(&Highlight::Plain).localize(&key(), "foo bar", &fragments, false);
        assert_eq!(out.text, "foo bar");
        assert_eq!(out.fragments, vec![vec![4]]);
    }
}
