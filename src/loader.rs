//! Fetching and decoding of logo images.
//!
//! Every logo is loaded independently; [`load_all`] joins them and reports a
//! result per logo, so one broken image never holds up the others.

use std::sync::Arc;

use futures::future::{LocalBoxFuture, join_all};
use log::{debug, warn};

use crate::config::LogoSpec;
use crate::error::LoadError;

/// A decoded image, straight (non-premultiplied) RGBA8, row major.
#[derive(Clone, Debug, PartialEq)]
pub struct LogoImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl LogoImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        (width > 0 && height > 0 && rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    /// A single-colour image; zero dimensions are raised to one pixel.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let rgba = color.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Nearest-neighbour lookup at normalized coordinates; out-of-range
    /// values are clamped to the edge.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        let x = ((u * self.width as f32) as usize).min(self.width as usize - 1);
        let y = ((v * self.height as f32) as usize).min(self.height as usize - 1);
        let idx = (y * self.width as usize + x) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }
}

pub trait ResourceFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

/// Reads logos from the local filesystem; accepts plain paths and `file://` URLs.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
pub struct FileFetcher;

#[cfg(not(target_arch = "wasm32"))]
impl ResourceFetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>> {
        Box::pin(async move {
            let path = url.strip_prefix("file://").unwrap_or(url);
            std::fs::read(path).map_err(|e| LoadError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
        })
    }
}

pub fn decode(url: &str, bytes: &[u8]) -> Result<LogoImage, LoadError> {
    let img = image::load_from_memory(bytes)
        .map_err(|source| LoadError::Decode {
            url: url.to_string(),
            source,
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    LogoImage::from_rgba(width, height, img.into_raw()).ok_or_else(|| LoadError::Empty {
        url: url.to_string(),
    })
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub logo: LogoSpec,
    pub result: Result<Arc<LogoImage>, LoadError>,
}

/// Every requested logo, settled, in request order.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub outcomes: Vec<LoadOutcome>,
}

impl LoadReport {
    pub fn loaded(&self) -> impl Iterator<Item = (&LogoSpec, &Arc<LogoImage>)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|img| (&o.logo, img)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&LogoSpec, &LoadError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.logo, e)))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

async fn load_one<F: ResourceFetcher + ?Sized>(
    fetcher: &F,
    logo: &LogoSpec,
) -> Result<Arc<LogoImage>, LoadError> {
    let bytes = fetcher.fetch(&logo.src).await?;
    let image = decode(&logo.src, &bytes)?;
    debug!("loaded {} ({:?})", logo.src, image.dimensions());
    Ok(Arc::new(image))
}

/// Loads every logo concurrently and waits until all have either loaded or failed.
pub async fn load_all<F: ResourceFetcher + ?Sized>(fetcher: &F, logos: &[LogoSpec]) -> LoadReport {
    let outcomes = join_all(logos.iter().map(|logo| async move {
        let result = load_one(fetcher, logo).await;
        if let Err(e) = &result {
            warn!("[floating-logos] skipping logo: {e}");
        }
        LoadOutcome {
            logo: logo.clone(),
            result,
        }
    }))
    .await;
    LoadReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[derive(Default)]
    struct MapFetcher(HashMap<String, Vec<u8>>);

    impl ResourceFetcher for MapFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>> {
            Box::pin(async move {
                self.0.get(url).cloned().ok_or_else(|| LoadError::Fetch {
                    url: url.to_string(),
                    reason: "404".to_string(),
                })
            })
        }
    }

    #[test]
    fn test_decode_png() {
        let image = decode("a.png", &png_bytes(3, 2, [1, 2, 3, 255])).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.sample(0.99, 0.99), [1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode("junk.png", b"not an image"),
            Err(LoadError::Decode { .. })
        ));
    }

    #[test]
    fn test_load_all_keeps_order_and_failures() {
        let mut fetcher = MapFetcher::default();
        fetcher.0.insert("ok.png".into(), png_bytes(2, 2, [9, 9, 9, 255]));
        fetcher.0.insert("bad.png".into(), b"garbage".to_vec());
        let logos = vec![
            LogoSpec::new("missing.png"),
            LogoSpec::new("ok.png"),
            LogoSpec::new("bad.png"),
        ];

        let report = block_on(load_all(&fetcher, &logos));

        assert_eq!(report.len(), 3);
        assert_eq!(report.outcomes[1].logo.src, "ok.png");
        let loaded: Vec<_> = report.loaded().map(|(l, _)| l.src.as_str()).collect();
        assert_eq!(loaded, vec!["ok.png"]);
        let failed: Vec<_> = report.failures().map(|(l, _)| l.src.as_str()).collect();
        assert_eq!(failed, vec!["missing.png", "bad.png"]);
    }

    #[test]
    fn test_sample_clamps_to_edges() {
        let mut rgba = vec![0; 2 * 1 * 4];
        rgba[4..8].copy_from_slice(&[200, 100, 50, 255]);
        let image = LogoImage::from_rgba(2, 1, rgba).unwrap();
        assert_eq!(image.sample(-1.0, 0.5), [0, 0, 0, 0]);
        assert_eq!(image.sample(5.0, 0.5), [200, 100, 50, 255]);
        assert!(LogoImage::from_rgba(0, 4, vec![]).is_none());
    }

    #[test]
    fn test_solid_never_builds_an_empty_image() {
        let image = LogoImage::solid(0, 0, [7, 7, 7, 255]);
        assert_eq!(image.dimensions(), (1, 1));
        assert_eq!(image.sample(0.5, 0.5), [7, 7, 7, 255]);
    }
}
