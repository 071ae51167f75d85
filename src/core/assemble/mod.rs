use crate::core::feed::types::Article;

/// Interleaves the full collection into one display ordering: group by feed
/// (first-seen order), sort each group newest-first, then emit rounds of one
/// article per feed, each round re-sorted newest-first. Recency dominates
/// within a round while every feed stays represented.
///
/// With `include_empty` false, articles without any discussion comments are
/// filtered out before grouping.
pub fn interleave_by_recency(articles: &[Article], include_empty: bool) -> Vec<Article> {
    let filtered: Vec<&Article> = articles
        .iter()
        .filter(|article| include_empty || article.social.total_comment_count() > 0)
        .collect();

    let mut groups: Vec<(&str, Vec<&Article>)> = Vec::new();
    for article in filtered {
        match groups
            .iter_mut()
            .find(|(feed_name, _)| *feed_name == article.feed_name)
        {
            Some((_, group)) => group.push(article),
            None => groups.push((article.feed_name.as_str(), vec![article])),
        }
    }
    for (_, group) in &mut groups {
        group.sort_by_key(|article| std::cmp::Reverse(article.published_millis()));
    }

    let mut result = Vec::new();
    let mut index = 0;
    loop {
        let mut round: Vec<&Article> = groups
            .iter()
            .filter_map(|(_, group)| group.get(index).copied())
            .collect();
        if round.is_empty() {
            break;
        }
        round.sort_by_key(|article| std::cmp::Reverse(article.published_millis()));
        result.extend(round.into_iter().cloned());
        index += 1;
    }

    result
}
