//! Temporal grouping: only articles published close together can be the
//! same breaking story, so comparisons are restricted to these groups.

use chrono::Duration;
use newsdesk_common::Article;

/// Partition `articles` into runs anchored on their first member.
///
/// Articles are ordered by effective time. A run starts at an anchor and
/// absorbs every following article whose effective time is within `window`
/// of that anchor, not of the previous article, so members of one run can
/// sit almost two windows apart end to end. The first article outside the
/// window becomes the next anchor. Runs with fewer than two members are
/// dropped since they yield no pairs.
pub fn temporal_groups(articles: &[Article], window: Duration) -> Vec<Vec<&Article>> {
    let mut sorted: Vec<&Article> = articles.iter().collect();
    sorted.sort_by(|a, b| {
        a.effective_time()
            .cmp(&b.effective_time())
            .then_with(|| a.url_hash.cmp(&b.url_hash))
    });

    let mut groups = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return groups;
    };

    let mut anchor = first.effective_time();
    let mut current = vec![first];

    for article in iter {
        if article.effective_time() - anchor <= window {
            current.push(article);
        } else {
            if current.len() >= 2 {
                groups.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
            anchor = article.effective_time();
            current.push(article);
        }
    }

    if current.len() >= 2 {
        groups.push(current);
    }

    groups
}

/// Every unordered pair within each group. Never crosses groups.
pub fn candidate_pairs<'a>(groups: &[Vec<&'a Article>]) -> Vec<(&'a Article, &'a Article)> {
    let mut pairs = Vec::new();
    for group in groups {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}
