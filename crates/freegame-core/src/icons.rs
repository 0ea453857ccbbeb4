//! Best-effort mapping from a game link to an icon for rich messages.

use reqwest::Url;

/// Derives a favicon URL for the store hosting `url`, falling back to known
/// storefront icons when the link does not parse as an absolute URL.
#[must_use]
pub fn icon_from_url(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    if let Ok(parsed) = Url::parse(url)
        && let Some(host) = parsed.host_str()
    {
        return Some(format!("{}://{host}/favicon.ico", parsed.scheme()));
    }

    if url.contains("steam") {
        Some("https://store.steampowered.com/favicon.ico".to_string())
    } else if url.contains("epic") {
        Some("https://www.epicgames.com/favicon.ico".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::icon_from_url;

    #[test]
    fn absolute_url_yields_host_favicon() {
        assert_eq!(
            icon_from_url("https://store.steampowered.com/app/314660/Oddworld/").as_deref(),
            Some("https://store.steampowered.com/favicon.ico")
        );
        assert_eq!(
            icon_from_url("http://gog.com/game/x").as_deref(),
            Some("http://gog.com/favicon.ico")
        );
    }

    #[test]
    fn known_storefront_keywords_fall_back_to_fixed_icons() {
        assert_eq!(
            icon_from_url("steam-free-weekend").as_deref(),
            Some("https://store.steampowered.com/favicon.ico")
        );
        assert_eq!(
            icon_from_url("epic-giveaway").as_deref(),
            Some("https://www.epicgames.com/favicon.ico")
        );
    }

    #[test]
    fn empty_or_unknown_links_yield_nothing() {
        assert_eq!(icon_from_url(""), None);
        assert_eq!(icon_from_url("some random text"), None);
    }
}
