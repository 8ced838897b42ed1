//! Client classification from the User-Agent header
//!
//! Social platforms fetch shared links with dedicated preview bots that read
//! meta tags and never run scripts. Everything else is treated as a browser.
//! This is a rendering heuristic only: a client can claim to be either, and
//! the worst outcome of lying is a less useful page.

/// Rendering strategy chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// Link-preview or search crawler: static meta tags, no script
    Crawler,
    /// Anything else: card plus delayed redirect
    Browser,
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Crawler => "crawler",
            ClientKind::Browser => "browser",
        }
    }
}

/// Lowercase User-Agent fragments of known preview and search crawlers
///
/// Checked in order; the first fragment found wins. Fragments name the bot,
/// never the app: in-app browsers (Pinterest, Snapchat, Tumblr, Viber) carry
/// the app name in their User-Agent and must still get the redirect.
pub const CRAWLER_FRAGMENTS: &[&str] = &[
    "facebookexternalhit",
    "facebot",
    "meta-externalagent",
    "twitterbot",
    "linkedinbot",
    "slackbot",
    "slack-imgproxy",
    "discordbot",
    "telegrambot",
    "whatsapp",
    "pinterestbot",
    "pinterest/0.",
    "redditbot",
    "skypeuripreview",
    "microsoftpreview",
    "embedly",
    "quora link preview",
    "vkshare",
    "iframely",
    "mastodon",
    "bluesky",
    "cardyb",
    "snap url preview",
    "applebot",
    "googlebot",
    "google-inspectiontool",
    "bingbot",
    "duckduckbot",
    "yandexbot",
    "baiduspider",
    "w3c_validator",
];

/// Name of the first crawler fragment contained in `user_agent`, if any
pub fn matched_crawler(user_agent: &str) -> Option<&'static str> {
    if user_agent.is_empty() {
        return None;
    }
    let lowered = user_agent.to_lowercase();
    CRAWLER_FRAGMENTS
        .iter()
        .copied()
        .find(|fragment| lowered.contains(fragment))
}

/// Classify a raw User-Agent string; total over all inputs
pub fn classify(user_agent: &str) -> ClientKind {
    match matched_crawler(user_agent) {
        Some(_) => ClientKind::Crawler,
        None => ClientKind::Browser,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_browser() {
        assert_eq!(classify(""), ClientKind::Browser);
        assert_eq!(matched_crawler(""), None);
    }

    #[test]
    fn test_mixed_case_crawler() {
        assert_eq!(classify("FaceBookExternalHit/1.1"), ClientKind::Crawler);
        assert_eq!(
            matched_crawler("FaceBookExternalHit/1.1"),
            Some("facebookexternalhit")
        );
        assert_eq!(classify("TWITTERBOT/1.0"), ClientKind::Crawler);
    }

    #[test]
    fn test_real_crawler_strings() {
        let agents = [
            "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
            "Mozilla/5.0 (compatible; Discordbot/2.0; +https://discordapp.com)",
            "Slackbot-LinkExpanding 1.0 (+https://api.slack.com/robots)",
            "WhatsApp/2.23.20.0",
            "TelegramBot (like TwitterBot)",
            "LinkedInBot/1.0 (compatible; Mozilla/5.0; Apache-HttpClient +http://www.linkedin.com)",
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
        ];
        for agent in agents {
            assert_eq!(classify(agent), ClientKind::Crawler, "{agent}");
        }
    }

    #[test]
    fn test_desktop_browser() {
        let chrome = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                      (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
        assert_eq!(classify(chrome), ClientKind::Browser);

        let safari = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
                      AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
        assert_eq!(classify(safari), ClientKind::Browser);
    }

    #[test]
    fn test_in_app_browsers_are_browsers() {
        let agents = [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Mobile/15E148 Snapchat/12.80.0.36 (like Safari/8617.1.17.10.12, panda)",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Mobile/15E148 [Pinterest/iOS]",
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/124.0.0.0 Mobile Safari/537.36 [Pinterest/Android]",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Mobile/15E148 Tumblr/iOS/33.5",
            "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/124.0.0.0 Mobile Safari/537.36 Viber/21.6.0.2",
        ];
        for agent in agents {
            assert_eq!(classify(agent), ClientKind::Browser, "{agent}");
        }
    }

    #[test]
    fn test_app_preview_bots_are_crawlers() {
        let agents = [
            "Pinterestbot/1.0 (+http://www.pinterest.com/bot.html)",
            "Pinterest/0.2 (+https://www.pinterest.com/bot.html)",
            "Mozilla/5.0 (compatible; Snap URL Preview Service; bot; snapchat_proxy; +https://developers.snap.com/robots)",
        ];
        for agent in agents {
            assert_eq!(classify(agent), ClientKind::Crawler, "{agent}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        // Telegram advertises itself "like TwitterBot"; the list order decides
        assert_eq!(
            matched_crawler("TwitterBot TelegramBot"),
            Some("twitterbot")
        );
    }

    #[test]
    fn test_fragments_are_lowercase() {
        for fragment in CRAWLER_FRAGMENTS {
            assert_eq!(*fragment, fragment.to_lowercase());
        }
    }
}
