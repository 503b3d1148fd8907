//! Retention pruner: keep a repository's tag history under a cap.

use tracing::info;

use vmbr_core::{excess_tags, RepositoryId};

use crate::api::ImageApi;
use crate::error::CloudError;

/// Ensure at most `max_tags` tags remain in `repo`, deleting the oldest
/// first. Returns the number of tags deleted.
///
/// `max_tags == 0` disables retention. The first deletion failure aborts
/// the remaining batch and is returned as-is; tags already deleted stay
/// deleted.
///
/// Callers run this with one slot reserved for the tag the in-progress
/// snapshot or upload is about to create, i.e. with `configured_limit - 1`.
pub async fn prune_repository_tags(
    api: &dyn ImageApi,
    repo: &RepositoryId,
    max_tags: usize,
) -> Result<usize, CloudError> {
    if max_tags == 0 {
        return Ok(0);
    }

    let tags = api.list_tags(repo).await?;
    let total = tags.len();
    let doomed = excess_tags(tags, max_tags);
    if doomed.is_empty() {
        return Ok(0);
    }

    info!(
        repository = %repo,
        total,
        max_tags,
        deleting = doomed.len(),
        "pruning repository tags"
    );

    let mut deleted = 0;
    for tag in &doomed {
        api.delete_tag(&tag.id).await?;
        info!(tag_id = %tag.id, created_at = %tag.created_at, "deleted tag");
        deleted += 1;
    }
    Ok(deleted)
}
