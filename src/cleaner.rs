//! Content cleaning: noise stripping, spam scoring, and rule-based title
//! generation, with an optional AI override that always falls back to the
//! local heuristic.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ai::AiClient;
use crate::category::Category;

static RE_RT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^RT\s+@\w+:\s*").expect("rt regex"));
static RE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").expect("mention regex"));
static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

// Emoticons, symbols & pictographs, transport, flags, dingbats, enclosed.
static RE_EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}\x{2702}-\x{27B0}\x{24C2}-\x{1F251}]",
    )
    .expect("emoji regex")
});

static RE_SPAM_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)click here|follow for more|link in bio|dm for|check my profile|tap the link|join our telegram",
    )
    .expect("spam phrase regex")
});

static RE_NOT_WORDLIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s,.]").expect("symbol regex"));

static RE_TITLE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?[A-Z]{2,10}\b").expect("title token regex"));
static RE_TITLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?%|\$\d+(?:\.\d+)?[BMK]?").expect("title number regex"));
static RE_NON_TITLE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s$%.,!?-]").expect("title strip regex"));

/// Emojis worth keeping; at most one survives cleaning.
const RELEVANT_EMOJI: [char; 6] = ['\u{1F680}', '\u{1F4C8}', '\u{1F4B0}', '\u{1F525}', '\u{26A1}', '\u{1F3AF}'];

const FALLBACK_TITLE: &str = "Crypto Update";

/// Scrub noise from raw text: RT prefixes, @mentions, URLs, excess emoji,
/// spam phrases. Idempotent: cleaning cleaned text is a no-op.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = RE_RT.replace(text, "").to_string();
    out = RE_MENTION.replace_all(&out, "").to_string();
    out = RE_URL.replace_all(&out, "").to_string();

    // Strip emoji, remembering the first "relevant" one so it can come back.
    let kept_emoji = RE_EMOJI
        .find_iter(&out)
        .filter_map(|m| m.as_str().chars().next())
        .find(|c| RELEVANT_EMOJI.contains(c));
    out = RE_EMOJI.replace_all(&out, " ").to_string();
    if let Some(emoji) = kept_emoji {
        out = format!("{emoji} {out}");
    }

    out = RE_WS.replace_all(&out, " ").trim().to_string();
    out = RE_SPAM_PHRASES.replace_all(&out, "").to_string();
    // Spam-phrase removal can leave double spaces; collapse once more so the
    // whole pipeline stays idempotent.
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// High-confidence spam phrases, +2 each.
const SPAM_KEYWORDS: &[&str] = &[
    "buy now",
    "limited offer",
    "guaranteed profit",
    "guaranteed",
    "risk free",
    "double your",
    "free airdrop",
    "claim now",
    "send to wallet",
    "dm me",
    "private signal",
    "100x guaranteed",
    "pump incoming",
];

/// Medium-confidence indicators, +1 each.
const SUS_KEYWORDS: &[&str] = &[
    "click here",
    "follow for",
    "link in bio",
    "telegram",
    "join our",
    "exclusive",
];

/// Weighted spam score: phrase hits plus caps-ratio, emoji-density, and
/// exclamation heuristics. Text is spam at score >= 4.
pub fn is_spam_content(text: &str) -> bool {
    let char_len = text.chars().count();
    if char_len < 10 {
        return true;
    }

    let lower = text.to_lowercase();
    let mut score = 0u32;

    for kw in SPAM_KEYWORDS {
        if lower.contains(kw) {
            score += 2;
        }
    }
    for kw in SUS_KEYWORDS {
        if lower.contains(kw) {
            score += 1;
        }
    }

    if char_len > 20 {
        let caps = text.chars().filter(|c| c.is_uppercase()).count();
        if caps as f64 / char_len as f64 > 0.5 {
            score += 2;
        }
    }

    let symbols = RE_NOT_WORDLIKE.find_iter(text).count();
    if symbols as f64 / char_len as f64 > 0.15 {
        score += 1;
    }

    if text.chars().filter(|c| *c == '!').count() > 3 {
        score += 1;
    }

    score >= 4
}

/// Rule-based title: lead with a token symbol and a number when present,
/// then the head of the first sentence; 80-char cap, capitalized.
pub fn heuristic_title(text: &str) -> String {
    let cleaned = clean_text(text);
    if cleaned.chars().count() < 30 {
        return title_fallback(&cleaned, 80);
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(m) = RE_TITLE_TOKEN.find(&cleaned) {
        parts.push(m.as_str().to_string());
    }
    if let Some(m) = RE_TITLE_NUMBER.find(&cleaned) {
        parts.push(m.as_str().to_string());
    }

    let first_sentence = cleaned.split('.').next().unwrap_or("").trim();

    let mut title = if parts.is_empty() {
        first_sentence
            .split_whitespace()
            .take(12)
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        let base = parts.join(" ");
        let context = first_sentence
            .split_whitespace()
            .take(15)
            .collect::<Vec<_>>()
            .join(" ");
        format!("{base}: {context}")
    };

    title = RE_WS.replace_all(&title, " ").trim().to_string();
    title = truncate_chars(&title, 80);
    capitalize(&title)
}

/// Plain first-sentence extraction, used when the text is too short for the
/// smart rules.
pub fn title_fallback(text: &str, max_length: usize) -> String {
    if text.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    let stripped = RE_NON_TITLE_CHARS.replace_all(text, "").to_string();
    let first = stripped
        .split(['.', '!', '?'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    let mut title = if first.chars().count() > 15 {
        first
    } else {
        stripped.chars().take(max_length).collect()
    };
    title = title.trim().to_string();
    title = truncate_chars(&title, max_length);

    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title
    }
}

/// Title generation entry point: ask the AI client when one is wired in,
/// always fall back to the local heuristic. The output on any AI failure is
/// byte-identical to the heuristic's.
pub async fn generate_title(
    ai: &dyn AiClient,
    text: &str,
    source: &str,
    category: Category,
) -> String {
    let local = heuristic_title(text);
    if text.chars().count() < 20 {
        return local;
    }

    let prompt = format!(
        "Write one concise, professional headline (50-80 characters) for this \
         {source} item in the '{category}' category. Respond with the headline \
         only, no quotes, no preamble.\n\n{text}"
    );

    match ai.complete(&prompt).await {
        Some(raw) => {
            let first_line = raw.lines().next().unwrap_or("").trim().replace(['"', '\''], "");
            let title = truncate_chars(first_line.trim(), 80);
            if title.chars().count() >= 10 {
                title
            } else {
                local
            }
        }
        None => local,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head.trim_end())
    } else {
        s.to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => FALLBACK_TITLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_rt_mentions_and_urls() {
        let out = clean_text("RT @whale_alert: big move by @cz_binance https://t.co/abc now");
        assert_eq!(out, "big move by now");
    }

    #[test]
    fn clean_keeps_at_most_one_relevant_emoji() {
        let out = clean_text("\u{1F680}\u{1F680} BTC to the moon \u{1F525}");
        assert!(out.starts_with('\u{1F680}'));
        assert_eq!(out.matches('\u{1F680}').count(), 1);
        assert!(!out.contains('\u{1F525}'));
    }

    #[test]
    fn clean_is_idempotent() {
        let samples = [
            "RT @user: check https://example.com \u{1F680} BTC up 10%!!!",
            "plain text with no noise at all",
            "Join our telegram, click here for gains",
            "\u{1F525}\u{1F680} stacked emojis \u{1F4B0}",
            "",
        ];
        for s in samples {
            let once = clean_text(s);
            let twice = clean_text(&once);
            assert_eq!(once, twice, "clean not idempotent for {s:?}");
        }
    }

    #[test]
    fn spam_example_is_flagged() {
        assert!(is_spam_content(
            "\u{1F6A8} DM me for guaranteed 100x profit, click here!!!"
        ));
    }

    #[test]
    fn short_text_is_spam() {
        assert!(is_spam_content("gm"));
    }

    #[test]
    fn normal_news_is_not_spam() {
        assert!(!is_spam_content(
            "Bitcoin ETF inflows reached a new record this week as institutions bought the dip."
        ));
    }

    #[test]
    fn spam_score_is_monotonic_in_keywords() {
        let base = "An ordinary update about markets, nothing odd here.";
        let spammier = format!("{base} guaranteed profit free airdrop dm me");
        // Adding high-confidence phrases can only raise the score.
        assert!(!is_spam_content(base));
        assert!(is_spam_content(&spammier));
    }

    #[test]
    fn heuristic_title_leads_with_token_and_number() {
        let text = "BTC surged 12% today after the spot ETF decision. More detail follows in the report.";
        let title = heuristic_title(text);
        assert!(title.starts_with("BTC 12%:"), "got {title}");
        assert!(title.chars().count() <= 80);
    }

    #[test]
    fn heuristic_title_caps_at_80_chars() {
        let long = format!(
            "SOL {} end.",
            "very long words repeated again and again forever ".repeat(5)
        );
        let title = heuristic_title(&long);
        assert!(title.chars().count() <= 80);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn title_fallback_handles_empty_and_short() {
        assert_eq!(title_fallback("", 80), "Crypto Update");
        let t = title_fallback("Tiny note", 80);
        assert_eq!(t, "Tiny note");
    }

    #[tokio::test]
    async fn generate_title_falls_back_without_ai() {
        let ai = crate::ai::DisabledClient;
        let text = "Ethereum gas fees dropped sharply after the upgrade went live across mainnet.";
        let got = generate_title(&ai, text, "rss", Category::Eth).await;
        assert_eq!(got, heuristic_title(text));
    }
}
