use std::time::Duration;

use image::RgbImage;
use tracing::{debug, warn};

use lc_common::render;

use crate::cache::ImageCache;

/// Total wait bound for a remote fetch (connect + read). Expiry is treated
/// as a fetch failure, not retried.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser-like identifying header; some image hosts reject generic clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const ERROR_CARD_WIDTH: u32 = 480;
const ERROR_CARD_HEIGHT: u32 = 240;
/// Wrap width for the error message at text scale 2.
const ERROR_WRAP_CHARS: usize = 38;

/// Outcome of a load. Both arms carry a displayable image; the error arm
/// additionally exposes the failure text that was rendered onto it.
#[derive(Debug)]
pub enum Loaded {
    Ok(RgbImage),
    Error { message: String, image: RgbImage },
}

impl Loaded {
    pub fn image(&self) -> &RgbImage {
        match self {
            Loaded::Ok(image) => image,
            Loaded::Error { image, .. } => image,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loaded::Ok(_) => None,
            Loaded::Error { message, .. } => Some(message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderBuildError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetches remote images through a disk cache, normalizing everything to
/// RGB8. Requests carry a browser-like `User-Agent` and, when an API key is
/// supplied, a bearer-auth header.
#[derive(Debug, Clone)]
pub struct RemoteImageLoader {
    cache: ImageCache,
    http: reqwest::Client,
}

impl RemoteImageLoader {
    pub fn new(cache: ImageCache) -> Result<Self, LoaderBuildError> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { cache, http })
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Load `url`, reusing a cache entry younger than `max_age_secs`
    /// (zero disables reuse). Never fails: every failure class returns
    /// `Loaded::Error` with a rendered card.
    pub async fn load(&self, url: &str, max_age_secs: u64, api_key: Option<&str>) -> Loaded {
        let url = url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return error_card(format!(
                "invalid URL: must start with http:// or https:// (got {url:?})"
            ));
        }

        if self.cache.is_fresh(url, max_age_secs) {
            match self.decode_cached(url) {
                Some(image) => {
                    debug!(url, "serving remote image from cache");
                    return Loaded::Ok(image);
                }
                // A cache entry we cannot decode is treated as a miss.
                None => warn!(url, "cached image unreadable, refetching"),
            }
        }

        debug!(url, "fetching remote image");
        self.fetch_and_persist(url, api_key).await
    }

    fn decode_cached(&self, url: &str) -> Option<RgbImage> {
        let bytes = self
            .cache
            .read(url)
            .inspect_err(|e| warn!(url, error = %e, "cache read failed"))
            .ok()?;
        image::load_from_memory(&bytes)
            .inspect_err(|e| warn!(url, error = %e, "cache decode failed"))
            .ok()
            .map(|img| img.to_rgb8())
    }

    async fn fetch_and_persist(&self, url: &str, api_key: Option<&str>) -> Loaded {
        let mut request = self.http.get(url);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return error_card(format!("network error: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return error_card(format!(
                "network error ({}): server returned {}",
                status.as_u16(),
                status
            ));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return error_card(format!("network error reading body: {e}")),
        };

        let image = match image::load_from_memory(&body) {
            Ok(image) => image.to_rgb8(),
            Err(e) => return error_card(format!("response is not a decodable image: {e}")),
        };

        // Persist the normalized PNG. A cache write failure downgrades to a
        // warning; the fetched image is still returned.
        match render::encode_png(&image) {
            Ok(png) => {
                if let Err(e) = self.cache.write(url, &png) {
                    warn!(url, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(url, error = %e, "cache encode failed"),
        }

        Loaded::Ok(image)
    }
}

/// Render the failure text onto a dark card with a red header bar, in the
/// style of the chapter status graphics.
fn error_card(message: String) -> Loaded {
    let mut img = render::solid(ERROR_CARD_WIDTH, ERROR_CARD_HEIGHT, [40, 40, 40]);
    render::fill_rect(&mut img, 0, 0, ERROR_CARD_WIDTH, 40, [180, 30, 30]);
    render::draw_text(&mut img, 10, 10, "REMOTE IMAGE LOAD ERROR", 2, [255, 255, 255]);

    let mut y = 50;
    for line in render::wrap_text(&message, ERROR_WRAP_CHARS) {
        render::draw_text(&mut img, 10, y, &line, 2, [255, 255, 255]);
        y += 20;
        if y + 20 > ERROR_CARD_HEIGHT {
            break;
        }
    }

    warn!(error = %message, "remote image load failed");
    Loaded::Error {
        message,
        image: img,
    }
}
