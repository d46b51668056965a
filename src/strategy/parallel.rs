//! Parallel Selection (Strategy B)
//!
//! Uses Rayon to run independent selector sets over the same document.
//! Every task builds its own dispatcher and matching chains; only the
//! compiled selector cache is shared.

use rayon::prelude::*;

use super::split::{extract, split, SplitOutput};
use crate::error::MarkupError;
use crate::select::SelectOptions;

/// Split `input` once per selector set, in parallel
pub fn split_parallel<S: AsRef<str> + Sync>(
    input: &[u8],
    selector_sets: &[Vec<S>],
    options: &SelectOptions,
) -> Vec<Result<SplitOutput, MarkupError>> {
    selector_sets
        .par_iter()
        .map(|selectors| split(input, selectors.as_slice(), options))
        .collect()
}

/// Keyed extraction: evaluate each `(key, selector)` pair in parallel and
/// collect the selected markup per key
pub fn extract_map(
    input: &[u8],
    queries: &[(&str, &str)],
    options: &SelectOptions,
) -> Result<Vec<(String, Vec<u8>)>, MarkupError> {
    queries
        .par_iter()
        .map(|(key, selector)| {
            extract(input, &[selector], options).map(|selected| (key.to_string(), selected))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectorError;
    use pretty_assertions::assert_eq;

    const DOC: &[u8] = b"<html><body><h1>T</h1><ul><li>a</li><li>b</li></ul><p>x</p></body></html>";

    #[test]
    fn test_split_parallel() {
        let sets = vec![vec!["h1"], vec!["li[0]", "p"], vec!["a["]];
        let results = split_parallel(DOC, &sets, &SelectOptions::default());
        assert_eq!(results.len(), 3);

        let first = results[0].as_ref().unwrap();
        assert_eq!(first.selected, b"<h1>T</h1>".to_vec());

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.selected, b"<li>a</li><p>x</p>".to_vec());

        assert!(matches!(
            results[2],
            Err(MarkupError::Selector(SelectorError::Syntax { .. }))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sets: Vec<Vec<String>> = (0..16)
            .map(|i| vec![format!("li[{}]", i % 3), "h1//text()".to_string()])
            .collect();
        let options = SelectOptions::default();
        let parallel = split_parallel(DOC, &sets, &options);
        for (set, result) in sets.iter().zip(parallel) {
            assert_eq!(result.unwrap(), split(DOC, set.as_slice(), &options).unwrap());
        }
    }

    #[test]
    fn test_extract_map() {
        let queries = [("title", "h1/text()"), ("items", "li")];
        let results = extract_map(DOC, &queries, &SelectOptions::default()).unwrap();
        assert_eq!(
            results,
            vec![
                ("title".to_string(), b"T".to_vec()),
                ("items".to_string(), b"<li>a</li><li>b</li>".to_vec()),
            ]
        );
        assert!(extract_map(DOC, &[("bad", "")], &SelectOptions::default()).is_err());
    }
}
