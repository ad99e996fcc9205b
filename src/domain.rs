/// Domain extraction and counting logic for Tab Eater
use std::collections::HashMap;

use url::Url;

/// Canonical domain key for a URL.
///
/// The hostname is lowercased and a leading `www.` is stripped, so
/// `https://www.EXAMPLE.com/x` and `https://example.com/y` share the key
/// `example.com`. Malformed URLs and URLs without a host (`about:blank`,
/// `file:///...`) yield `None`.
pub fn domain_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let domain = host.strip_prefix("www.").unwrap_or(&host);

    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

/// Normalize something the user typed as a domain (`WWW.Example.com`).
pub fn normalize_domain(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Key used to detect duplicate tabs: the URL with its fragment removed.
pub fn dedupe_key(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Count domain occurrences from a list of URLs
pub fn count_domains<'a, I>(urls: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    urls.into_iter()
        .filter_map(domain_from_url)
        .fold(HashMap::new(), |mut counts, domain| {
            *counts.entry(domain).or_insert(0) += 1;
            counts
        })
}

/// Get the top N domains by count
pub fn top_domains<C: Ord + Copy>(counts: &HashMap<String, C>, n: usize) -> Vec<(String, C)> {
    let mut domain_vec: Vec<(String, C)> = counts
        .iter()
        .map(|(domain, count)| (domain.clone(), *count))
        .collect();

    // Sort by count descending, then by domain name ascending
    domain_vec.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    domain_vec.into_iter().take(n).collect()
}
