//! Avatar byte fetching.

use std::time::Duration;

use image::RgbaImage;

use crate::error::{PresenceError, Result};

pub const DEFAULT_CDN_BASE: &str = "https://cdn.discordapp.com";
pub const DEFAULT_AVATAR_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("presence-card/", env!("CARGO_PKG_VERSION"));

/// Fetches raw avatar bytes for a reference produced by the resolver.
pub trait AvatarFetcher: Send + Sync {
    fn fetch(&self, avatar: &str) -> Result<Vec<u8>>;
}

/// Builds the CDN URL for a user's avatar key.
pub fn avatar_url(cdn_base: &str, id: presence_protocol::UserId, avatar_key: &str) -> String {
    format!(
        "{}/avatars/{}/{}.png",
        cdn_base.trim_end_matches('/'),
        id,
        avatar_key
    )
}

/// Fetches avatars over HTTP with a bounded timeout.
#[derive(Clone)]
pub struct HttpAvatarFetcher {
    client: reqwest::blocking::Client,
}

impl HttpAvatarFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PresenceError::HttpClient {
                details: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl AvatarFetcher for HttpAvatarFetcher {
    fn fetch(&self, avatar: &str) -> Result<Vec<u8>> {
        let fetch_error = |details: String| PresenceError::AvatarFetch {
            url: avatar.to_string(),
            details,
        };

        let response = self
            .client
            .get(avatar)
            .send()
            .map_err(|e| fetch_error(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| fetch_error(format!("Failed to read response: {}", e)))
    }
}

/// Fetcher for hosts without network access; every fetch fails and the
/// avatar layer is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAvatarFetcher;

impl AvatarFetcher for NoAvatarFetcher {
    fn fetch(&self, avatar: &str) -> Result<Vec<u8>> {
        Err(PresenceError::AvatarFetch {
            url: avatar.to_string(),
            details: "avatar fetching disabled".to_string(),
        })
    }
}

/// Fetches and decodes an avatar into RGBA.
pub fn load_avatar(fetcher: &dyn AvatarFetcher, avatar: &str) -> Result<RgbaImage> {
    let bytes = fetcher.fetch(avatar)?;
    image::load_from_memory(&bytes)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|source| PresenceError::AvatarDecode {
            url: avatar.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_protocol::UserId;
    use std::io::Cursor;

    struct BytesFetcher(Vec<u8>);

    impl AvatarFetcher for BytesFetcher {
        fn fetch(&self, _avatar: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn avatar_url_uses_cdn_layout() {
        assert_eq!(
            avatar_url("https://cdn.discordapp.com/", UserId(42), "abc"),
            "https://cdn.discordapp.com/avatars/42/abc.png"
        );
    }

    #[test]
    fn load_avatar_decodes_png() {
        let source = RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 255]));
        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode");

        let decoded = load_avatar(&BytesFetcher(bytes), "mem://a").expect("decode");
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn load_avatar_reports_garbage_as_decode_error() {
        let err = load_avatar(&BytesFetcher(b"not an image".to_vec()), "mem://a").unwrap_err();
        assert!(matches!(err, PresenceError::AvatarDecode { .. }));
    }

    #[test]
    fn disabled_fetcher_reports_fetch_error() {
        let err = load_avatar(&NoAvatarFetcher, "mem://a").unwrap_err();
        assert!(matches!(err, PresenceError::AvatarFetch { .. }));
    }
}
