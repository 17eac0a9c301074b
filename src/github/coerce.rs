//! Reducing raw search hits to the fragments we can highlight

use super::search::{CodeHit, RawTextMatch};
use crate::{FileKey, SearchResult, TextMatch};

/// Keep only content matches; path matches have no line to show
fn is_content_match(tm: &RawTextMatch) -> bool {
    tm.object_type == "FileContent" && tm.property == "content"
}

pub fn coerce_results(hits: &[CodeHit]) -> SearchResult {
    let mut coerced = SearchResult::new();
    for hit in hits {
        let key = FileKey::new(&hit.repository.owner.login, &hit.repository.name, &hit.path);

        let fragments = hit
            .text_matches
            .iter()
            .filter(|tm| is_content_match(tm))
            .map(|tm| TextMatch {
                fragment: tm.fragment.clone(),
                indices: tm
                    .matches
                    .iter()
                    .filter_map(|m| match m.indices.as_slice() {
                        [start, end, ..] => Some((*start, *end)),
                        _ => None,
                    })
                    .collect(),
            });

        coerced.entry(key).or_default().extend(fragments);
    }
    coerced
}
