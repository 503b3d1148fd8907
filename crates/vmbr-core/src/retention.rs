//! Retention selection: which tags to delete to stay under a cap.

use crate::record::TagRecord;

/// Return the tags that must be deleted so that at most `max_tags` remain,
/// oldest first.
///
/// `max_tags == 0` disables retention and selects nothing. When the
/// collection already fits the cap, nothing is selected. Ordering ties on
/// `created_at` keep the listing order (stable sort).
pub fn excess_tags(mut tags: Vec<TagRecord>, max_tags: usize) -> Vec<TagRecord> {
    if max_tags == 0 || tags.len() <= max_tags {
        return Vec::new();
    }
    tags.sort_by_key(|t| t.created_at);
    let excess = tags.len() - max_tags;
    tags.truncate(excess);
    tags
}
