// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Icon inference for profile links.

use crate::embed::{normalized_host, parse_strict};
use serde::Serialize;

/// Generic icon used when the platform is not recognized.
pub const GENERIC_ICON: &str = "link";

/// Host suffix to icon name. Checked in order; the first suffix match wins.
const KNOWN_ICONS: &[(&str, &str)] = &[
    ("github.com", "github"),
    ("gitlab.com", "gitlab"),
    ("twitter.com", "x"),
    ("x.com", "x"),
    ("instagram.com", "instagram"),
    ("tiktok.com", "tiktok"),
    ("youtube.com", "youtube"),
    ("youtu.be", "youtube"),
    ("spotify.com", "spotify"),
    ("soundcloud.com", "soundcloud"),
    ("music.apple.com", "apple-music"),
    ("discord.gg", "discord"),
    ("discord.com", "discord"),
    ("twitch.tv", "twitch"),
    ("linkedin.com", "linkedin"),
    ("reddit.com", "reddit"),
    ("bsky.app", "bluesky"),
    ("steamcommunity.com", "steam"),
    ("patreon.com", "patreon"),
    ("ko-fi.com", "ko-fi"),
    ("paypal.me", "paypal"),
    ("telegram.me", "telegram"),
    ("t.me", "telegram"),
];

/// Icon to show next to a profile link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkIcon {
    /// Normalized host, if the link parsed
    pub host: Option<String>,
    /// Known platform icon name or [`GENERIC_ICON`]
    pub icon: &'static str,
    /// Favicon service URL for the host
    pub favicon_url: Option<String>,
}

/// Infer the icon for `raw`. Never fails; unparseable links get the generic icon.
pub fn link_icon(raw: &str) -> LinkIcon {
    let Some(url) = parse_strict(raw.trim()) else {
        return LinkIcon {
            host: None,
            icon: GENERIC_ICON,
            favicon_url: None,
        };
    };

    let host = normalized_host(&url);
    let icon = KNOWN_ICONS
        .iter()
        .find(|(suffix, _)| host_matches(&host, suffix))
        .map(|(_, icon)| *icon)
        .unwrap_or(GENERIC_ICON);

    LinkIcon {
        favicon_url: Some(format!(
            "https://www.google.com/s2/favicons?domain={}&sz=64",
            urlencoding::encode(&host)
        )),
        host: Some(host),
        icon,
    }
}

fn host_matches(host: &str, suffix: &str) -> bool {
    host == suffix
        || host
            .strip_suffix(suffix)
            .is_some_and(|rest| rest.ends_with('.'))
}
