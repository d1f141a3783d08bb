use serde::{Deserialize, Serialize};

/// Session key holding the preferred color scheme.
pub const COLOR_SCHEME_KEY: &str = "colorScheme";

/// Display theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Dark,
    Light,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 2] = [ColorScheme::Dark, ColorScheme::Light];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// The other scheme, for toggles.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl std::fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!(
                "Invalid enum value. Expected 'dark' | 'light', received '{other}'"
            )),
        }
    }
}

/// Submitted preference change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTheme {
    #[serde(rename = "colorScheme")]
    pub color_scheme: ColorScheme,
}
