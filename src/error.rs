use thiserror::Error;

/// Failure to turn one logo resource into a decoded image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("could not decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{url} decoded to an empty image")]
    Empty { url: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("restitution must lie in [0, 1], got {0}")]
    Restitution(f32),
    #[error("max_speed must be positive, got {0}")]
    MaxSpeed(f32),
    #[error("density must be positive, got {0}")]
    Density(f32),
    #[error("logo {index} has a non-positive {field}: {value}")]
    Logo {
        index: usize,
        field: &'static str,
        value: f32,
    },
    #[error("background color {0:?} is not #rrggbb or #rrggbbaa")]
    Background(String),
    #[error("malformed config: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
#[error("font could not be parsed: {0}")]
pub struct FontError(pub &'static str);
