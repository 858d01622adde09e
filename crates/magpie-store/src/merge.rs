//! Merge semantics of the durable store.

use std::collections::HashSet;

use magpie_types::Post;

/// Merges freshly harvested rows into the existing store content.
///
/// Rows are deduplicated by `link`, keeping the first occurrence - existing
/// store rows come first, so a re-harvested post never overwrites what was
/// already persisted. The result is then stably sorted ascending by
/// [`posted_at`](Post::posted_at); rows with unparsable timestamps land
/// after all parsable ones (see [`magpie_types::PostedAt`]).
#[must_use]
pub fn merge(existing: Vec<Post>, incoming: Vec<Post>) -> Vec<Post> {
    let mut seen: HashSet<String> = HashSet::with_capacity(existing.len() + incoming.len());
    let mut rows: Vec<Post> = Vec::with_capacity(existing.len() + incoming.len());

    for post in existing.into_iter().chain(incoming) {
        if seen.insert(post.link.clone()) {
            rows.push(post);
        }
    }

    rows.sort_by(|a, b| a.posted_at.cmp(&b.posted_at));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_types::PostedAt;

    fn post(link: &str, at: &str, text: &str) -> Post {
        Post {
            author: "alice".to_string(),
            text: text.to_string(),
            reposts: 0,
            likes: 0,
            replies: 0,
            posted_at: PostedAt::parse(at),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let existing = vec![post("https://example.net/1", "2018-01-01 00:00:00", "old")];
        let incoming = vec![
            post("https://example.net/1", "2018-01-01 00:00:00", "new"),
            post("https://example.net/2", "2018-01-02 00:00:00", "other"),
        ];

        let merged = merge(existing, incoming);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "old");
    }

    #[test]
    fn test_sorted_ascending_by_post_time() {
        let merged = merge(
            vec![
                post("https://example.net/3", "2018-03-01 00:00:00", ""),
                post("https://example.net/1", "2018-01-01 00:00:00", ""),
            ],
            vec![post("https://example.net/2", "2018-02-01 00:00:00", "")],
        );

        let links: Vec<_> = merged.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.net/1",
                "https://example.net/2",
                "https://example.net/3",
            ]
        );
    }

    #[test]
    fn test_unparsable_timestamps_sort_last() {
        let merged = merge(
            vec![post("https://example.net/odd", "someday", "")],
            vec![post("https://example.net/1", "2018-01-01 00:00:00", "")],
        );

        assert_eq!(merged[1].link, "https://example.net/odd");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let rows = vec![
            post("https://example.net/1", "2018-01-01 00:00:00", ""),
            post("https://example.net/2", "2018-01-02 00:00:00", ""),
        ];

        let once = merge(rows.clone(), rows.clone());
        let twice = merge(once.clone(), rows);

        assert_eq!(once, twice);
    }
}
