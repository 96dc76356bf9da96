// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Media URL classification for profile music and links.
//!
//! [`EmbedResolver::resolve`] decides, without any network I/O, whether a
//! pasted URL can be played in the page (a direct audio file) or belongs to a
//! known platform that only gets an external-link affordance. It is total:
//! every input maps to exactly one classification and nothing is thrown.
//!
//! Rules, first match wins:
//! 1. blank input
//! 2. raw-string audio fast path (extension, `file`/`filename` query value,
//!    streaming-audio host)
//! 3. strict URL parse, failing to `unknown`
//! 4. parsed audio path or storage prefix, then Spotify, YouTube, SoundCloud,
//!    Apple Music, and finally `unknown`

use crate::config::EmbedConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// File extensions that play directly in an audio element.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "m4a", "mp3", "wav", "ogg", "aac", "flac", "mp4", "opus", "webm",
];

const HINT_EMPTY: &str = "Paste a URL";
const HINT_AUDIO: &str = "Direct audio file, plays in the page";
const HINT_INVALID: &str = "That does not look like a valid http(s) URL";
const HINT_SPOTIFY: &str =
    "Spotify links cannot be embedded directly; paste a direct audio URL to play in the page";
const HINT_YOUTUBE: &str =
    "YouTube links open externally; paste a direct audio URL to play in the page";
const HINT_SOUNDCLOUD: &str =
    "SoundCloud links open externally; paste a direct audio URL to play in the page";
const HINT_APPLE: &str =
    "Apple Music links open externally; paste a direct audio URL to play in the page";
const HINT_UNKNOWN: &str = "Unrecognized link; paste a direct audio URL (.mp3, .m4a, .ogg, ...)";

/// Media platform a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Audio,
    Youtube,
    Spotify,
    Soundcloud,
    Apple,
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Youtube => "youtube",
            Self::Spotify => "spotify",
            Self::Soundcloud => "soundcloud",
            Self::Apple => "apple",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedClassification {
    pub provider: Provider,
    /// Normalized target; canonical form for YouTube and Spotify
    pub embed_url: String,
    /// True exactly when `provider` is `Audio`
    pub embeddable: bool,
    /// Reserved; never set by the current rules
    pub converted: bool,
    pub hint: String,
}

impl EmbedClassification {
    fn new(provider: Provider, embed_url: impl Into<String>, hint: &str) -> Self {
        Self {
            provider,
            embed_url: embed_url.into(),
            embeddable: provider == Provider::Audio,
            converted: false,
            hint: hint.to_string(),
        }
    }
}

/// Provider search link suggested for a free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchLink {
    pub provider: Provider,
    pub label: &'static str,
    pub url: String,
}

/// URL classifier configured with the platform's storage and streaming hosts.
#[derive(Debug, Clone, Default)]
pub struct EmbedResolver {
    config: EmbedConfig,
}

impl EmbedResolver {
    pub fn new(config: EmbedConfig) -> Self {
        Self { config }
    }

    /// Classify `raw`. Pure and total.
    pub fn resolve(&self, raw: &str) -> EmbedClassification {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return EmbedClassification::new(Provider::Unknown, "", HINT_EMPTY);
        }

        if self.is_raw_audio(trimmed) {
            debug!(url = %trimmed, "Raw audio match");
            return EmbedClassification::new(Provider::Audio, trimmed, HINT_AUDIO);
        }

        let url = match parse_strict(trimmed) {
            Some(url) => url,
            None => {
                debug!(url = %trimmed, "Unparseable media URL");
                return EmbedClassification::new(Provider::Unknown, trimmed, HINT_INVALID);
            }
        };

        let host = normalized_host(&url);
        let path = url.path();

        let prefix = self.config.audio_storage_prefix.as_str();
        if has_audio_extension(path) || (!prefix.is_empty() && path.contains(prefix)) {
            return EmbedClassification::new(Provider::Audio, url.as_str(), HINT_AUDIO);
        }

        if is_spotify_host(&host) {
            let emitted_host = url.host_str().unwrap_or(host.as_str());
            let canonical = format!("https://{}{}", emitted_host, strip_locale_segment(path));
            return EmbedClassification::new(Provider::Spotify, canonical, HINT_SPOTIFY);
        }

        if is_youtube_host(&host) {
            if let Some(id) = youtube_video_id(&url, &host) {
                let canonical = format!("https://www.youtube.com/watch?v={id}");
                return EmbedClassification::new(Provider::Youtube, canonical, HINT_YOUTUBE);
            }
        }

        if host == "soundcloud.com" || host.ends_with(".soundcloud.com") || host == "snd.sc" {
            return EmbedClassification::new(Provider::Soundcloud, url.as_str(), HINT_SOUNDCLOUD);
        }

        if host == "music.apple.com" || host == "embed.music.apple.com" {
            return EmbedClassification::new(Provider::Apple, url.as_str(), HINT_APPLE);
        }

        EmbedClassification::new(Provider::Unknown, url.as_str(), HINT_UNKNOWN)
    }

    /// Audio checks that run on the raw string, before strict parsing.
    /// Only http(s) and scheme-less input qualifies.
    fn is_raw_audio(&self, raw: &str) -> bool {
        if has_foreign_scheme(raw) {
            return false;
        }

        let without_fragment = raw.split('#').next().unwrap_or(raw);
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_fragment, None),
        };

        if has_audio_extension(path) {
            return true;
        }

        let file_param = query.into_iter().flat_map(|q| q.split('&')).any(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            matches!(name.to_ascii_lowercase().as_str(), "file" | "filename")
                && has_audio_extension(&urlencoding::decode(value).unwrap_or_default())
        });
        if file_param {
            return true;
        }

        let lower = raw.to_ascii_lowercase();
        self.config
            .streaming_hosts
            .iter()
            .any(|host| !host.is_empty() && lower.contains(&host.to_ascii_lowercase()))
    }
}

/// Classify `raw` with the default configuration.
pub fn resolve(raw: &str) -> EmbedClassification {
    EmbedResolver::default().resolve(raw)
}

/// Search links on each music provider for `query`. Blank queries give none.
pub fn search_links(query: &str) -> Vec<SearchLink> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let q = urlencoding::encode(query);

    vec![
        SearchLink {
            provider: Provider::Spotify,
            label: "Spotify",
            url: format!("https://open.spotify.com/search/{q}"),
        },
        SearchLink {
            provider: Provider::Youtube,
            label: "YouTube",
            url: format!("https://www.youtube.com/results?search_query={q}"),
        },
        SearchLink {
            provider: Provider::Soundcloud,
            label: "SoundCloud",
            url: format!("https://soundcloud.com/search?q={q}"),
        },
        SearchLink {
            provider: Provider::Apple,
            label: "Apple Music",
            url: format!("https://music.apple.com/us/search?term={q}"),
        },
    ]
}

/// Parse as an absolute http(s) URL with a host.
pub(crate) fn parse_strict(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

/// Lowercased host without a leading `www.`.
pub(crate) fn normalized_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Whether the last path segment is `<stem>.<audio extension>`.
fn has_audio_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    let Some((stem, ext)) = segment.rsplit_once('.') else {
        return false;
    };
    if stem.is_empty() {
        return false;
    }
    let ext = ext.to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str())
}

/// True when `raw` starts with a URL scheme other than http or https.
fn has_foreign_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let looks_like_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    looks_like_scheme
        && !scheme.eq_ignore_ascii_case("http")
        && !scheme.eq_ignore_ascii_case("https")
}

fn is_spotify_host(host: &str) -> bool {
    matches!(host, "spotify.com" | "spotify.link") || host.ends_with(".spotify.com")
}

fn is_youtube_host(host: &str) -> bool {
    matches!(
        host,
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtube-nocookie.com" | "youtu.be"
    )
}

/// Drop a leading `intl-xx` locale segment from a Spotify path.
fn strip_locale_segment(path: &str) -> &str {
    let rest = path.trim_start_matches('/');
    let (first, tail) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    match (is_locale_segment(first), tail) {
        (false, _) => path,
        (true, "") => "/",
        (true, tail) => tail,
    }
}

fn is_locale_segment(segment: &str) -> bool {
    segment
        .strip_prefix("intl-")
        .is_some_and(|locale| !locale.is_empty() && locale.chars().all(|c| c.is_ascii_alphabetic() || c == '-'))
}

fn youtube_video_id(url: &Url, host: &str) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if host == "youtu.be" {
        segments.next().map(str::to_string)
    } else {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(name, _)| name == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        }
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
