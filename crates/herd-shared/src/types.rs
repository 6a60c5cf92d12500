use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::EARTH_RADIUS_KM;

/// Generate a fresh entity identifier.
///
/// Three random v4 UUIDs are concatenated, which keeps collisions out of
/// reach while leaving identifiers visually distinct in logs and tests.
/// Identifiers are assigned once at construction and never regenerated.
pub fn triple_id() -> String {
    format!("{}{}{}", Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
}

/// A colour as four normalised channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const BLUE: Color = Color::rgb(0.0, 0.478, 1.0);
    pub const GRAY: Color = Color::rgb(0.557, 0.557, 0.576);

    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
        }
    }

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn components(&self) -> [f64; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// Build a colour from channels, rejecting anything outside `[0, 1]`.
    pub fn from_components(c: [f64; 4]) -> Option<Self> {
        if c.iter().all(|v| (0.0..=1.0).contains(v)) {
            Some(Self::rgba(c[0], c[1], c[2], c[3]))
        } else {
            None
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLUE
    }
}

/// Typeface family a user reads posts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontPreference {
    #[default]
    Regular,
    Rounded,
    Serif,
    Monospace,
}

impl FontPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontPreference::Regular => "default",
            FontPreference::Rounded => "rounded",
            FontPreference::Serif => "serif",
            FontPreference::Monospace => "monospace",
        }
    }

    /// Unknown names fall back to [`FontPreference::Regular`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "rounded" => FontPreference::Rounded,
            "serif" => FontPreference::Serif,
            "monospace" => FontPreference::Monospace,
            _ => FontPreference::Regular,
        }
    }
}

/// Where the feed is centred: the device's own position or a saved location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocationMode {
    #[default]
    Current,
    Saved(String),
}

impl LocationMode {
    pub fn encode(&self) -> String {
        match self {
            LocationMode::Current => "current".to_string(),
            LocationMode::Saved(id) => id.clone(),
        }
    }

    pub fn decode(s: &str) -> Self {
        if s == "current" {
            LocationMode::Current
        } else {
            LocationMode::Saved(s.to_string())
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}
