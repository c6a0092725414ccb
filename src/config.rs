use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_LOGO_RADIUS: f32 = 28.0;
pub const MIN_LOGO_RADIUS: f32 = 16.0;
pub const DEFAULT_RESTITUTION: f32 = 0.9;
pub const DEFAULT_MAX_SPEED: f32 = 0.9; // px/ms
pub const DEFAULT_DENSITY: f32 = 1.0;

/// One logo to float: where its image lives plus optional size overrides.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LogoSpec {
    pub src: String,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub mass: Option<f32>,
}

impl LogoSpec {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            radius: None,
            mass: None,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Body radius after density scaling, never below [`MIN_LOGO_RADIUS`].
    pub fn scaled_radius(&self, density: f32) -> f32 {
        (self.radius.unwrap_or(DEFAULT_LOGO_RADIUS) * density).max(MIN_LOGO_RADIUS)
    }

    /// Explicit mass, or area-proportional `radius²`.
    pub fn mass_for(&self, radius: f32) -> f32 {
        self.mass.unwrap_or(radius * radius)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FloatingLogosConfig {
    pub logos: Vec<LogoSpec>,
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    #[serde(default = "default_density")]
    pub density: f32,
    #[serde(default)]
    pub bg: Option<String>,
    #[serde(default)]
    pub enable_on_touch: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_restitution() -> f32 {
    DEFAULT_RESTITUTION
}

fn default_max_speed() -> f32 {
    DEFAULT_MAX_SPEED
}

fn default_density() -> f32 {
    DEFAULT_DENSITY
}

impl Default for FloatingLogosConfig {
    fn default() -> Self {
        Self {
            logos: vec![],
            restitution: DEFAULT_RESTITUTION,
            max_speed: DEFAULT_MAX_SPEED,
            density: DEFAULT_DENSITY,
            bg: None,
            enable_on_touch: false,
            seed: None,
        }
    }
}

impl FloatingLogosConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Restitution(self.restitution));
        }
        if !(self.max_speed > 0.0) {
            return Err(ConfigError::MaxSpeed(self.max_speed));
        }
        if !(self.density > 0.0) {
            return Err(ConfigError::Density(self.density));
        }
        for (index, logo) in self.logos.iter().enumerate() {
            if let Some(value) = logo.radius.filter(|r| !(*r > 0.0)) {
                return Err(ConfigError::Logo {
                    index,
                    field: "radius",
                    value,
                });
            }
            if let Some(value) = logo.mass.filter(|m| !(*m > 0.0)) {
                return Err(ConfigError::Logo {
                    index,
                    field: "mass",
                    value,
                });
            }
        }
        if let Some(bg) = &self.bg {
            parse_hex_color(bg)?;
        }
        Ok(())
    }

    /// Background fill as straight RGBA, `None` meaning "clear to transparent".
    pub fn background(&self) -> Option<[u8; 4]> {
        self.bg.as_deref().and_then(|bg| parse_hex_color(bg).ok())
    }
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(text: &str) -> Result<[u8; 4], ConfigError> {
    let bad = || ConfigError::Background(text.to_string());
    let hex = text.strip_prefix('#').ok_or_else(bad)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok([channel(0)?, channel(2)?, channel(4)?, alpha])
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerKind {
    #[default]
    Fine,
    Coarse,
}

/// What the host page tells us about its user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostHints {
    pub pointer: PointerKind,
    pub prefers_reduced_motion: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = FloatingLogosConfig::from_json(r#"{"logos":[{"src":"a.png"}]}"#).unwrap();
        assert_eq!(config.restitution, 0.9);
        assert_eq!(config.max_speed, 0.9);
        assert_eq!(config.density, 1.0);
        assert!(!config.enable_on_touch);
        assert_eq!(config.logos, vec![LogoSpec::new("a.png")]);
    }

    #[test]
    fn test_radius_floor_and_area_mass() {
        let logo = LogoSpec::new("a.png");
        assert_eq!(logo.scaled_radius(1.0), 28.0);
        assert_eq!(logo.scaled_radius(0.5), 16.0);
        assert_eq!(logo.mass_for(28.0), 784.0);
        assert_eq!(logo.with_mass(3.0).mass_for(28.0), 3.0);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = FloatingLogosConfig::default();
        config.restitution = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::Restitution(1.5)));

        let mut config = FloatingLogosConfig::default();
        config.logos.push(LogoSpec::new("a.png").with_radius(0.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Logo { field: "radius", .. })
        ));
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_hex_color("#0a141e").unwrap(), [10, 20, 30, 255]);
        assert_eq!(parse_hex_color("#ffffff80").unwrap(), [255, 255, 255, 128]);
        assert!(parse_hex_color("blue").is_err());
        assert!(parse_hex_color("#12345").is_err());
    }
}
