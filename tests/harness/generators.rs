// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a pool of IPv6 addresses inside one /64.
pub fn generate_ipv6(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, i as u16)))
        .collect()
}

/// Generate profile handles.
pub fn generate_handles(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("profile{}", i)).collect()
}

/// Generate authenticated user ids.
pub fn generate_user_ids(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("00000000-0000-4000-8000-{:012x}", i))
        .collect()
}

/// Case variations of one handle. They must all land in the same bucket.
pub fn generate_handle_case_variants(handle: &str) -> Vec<String> {
    vec![
        handle.to_lowercase(),
        handle.to_uppercase(),
        handle
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if i % 2 == 0 {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect(),
    ]
}

/// Inputs users paste into the media field that must never classify as
/// playable audio.
pub fn generate_hostile_media_urls() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "not-a-url",
        "ftp://files.example.com/",
        "://missing-scheme.com/",
        "https://",
        "javascript:alert(1)",
        "data:text/html,<script>",
        "file:///etc/passwd",
        "javascript:x('.mp3')",
        "data:audio/mpeg,track.mp3",
        "file:///home/me/track.mp3",
        "https://example.com/.mp3",
        "https://example.com/mp3",
        "https://example.com/track.mp3.html",
        "https://evilspotify.com/track/1",
        "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_handle_variants() {
        let variants = generate_handle_case_variants("Alice");
        assert_eq!(variants.len(), 3);
        assert!(variants.iter().all(|v| v.eq_ignore_ascii_case("alice")));
    }
}
