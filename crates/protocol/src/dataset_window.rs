use std::ops::Range;

/// Rows each dataset contributes to one page of a federated result.
///
/// Datasets are laid end to end in the given order, so page `page_index`
/// covers merged rows `[page_index * page_size, (page_index + 1) * page_size)`.
/// Each returned range indexes into that dataset's own rows and is empty when
/// the dataset lies outside the page. A plain paginated result is the single
/// dataset case.
pub fn shares(totals: &[u64], page_index: usize, page_size: usize) -> Vec<Range<u64>> {
    let start = (page_index as u64).saturating_mul(page_size as u64);
    let end = start.saturating_add(page_size as u64);
    let mut offset = 0u64;
    totals
        .iter()
        .map(|&total| {
            let upper = offset.saturating_add(total);
            let share = start.clamp(offset, upper) - offset..end.clamp(offset, upper) - offset;
            offset = upper;
            share
        })
        .collect()
}
