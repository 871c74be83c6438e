use std::borrow::Borrow;
use std::collections::HashSet;

use crate::models::Notice;

/// Collapse a notice list to unique notices by identifier
///
/// Keeps the first occurrence of every id and preserves input order. Works on
/// owned notices as well as on references into a batch.
pub fn dedupe<N>(notices: impl IntoIterator<Item = N>) -> Vec<N>
where
    N: Borrow<Notice>,
{
    let mut seen = HashSet::new();
    notices
        .into_iter()
        .filter(|notice| seen.insert(<N as Borrow<Notice>>::borrow(notice).id.clone()))
        .collect()
}
