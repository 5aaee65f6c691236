//! Languages, themes and the user-facing messages the client itself produces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::WayraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }

    #[must_use]
    pub fn messages(self) -> &'static Messages {
        match self {
            Language::Es => &SPANISH,
            Language::En => &ENGLISH,
        }
    }
}

impl FromStr for Language {
    type Err = WayraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            other => Err(WayraError::validation(format!(
                "Unsupported language '{other}'. Must be one of: es, en"
            ))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = WayraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(WayraError::validation(format!(
                "Unsupported theme '{other}'. Must be one of: dark, light"
            ))),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Message table for one language
#[derive(Debug)]
pub struct Messages {
    pub missing_city: &'static str,
    pub map_required: &'static str,
    pub generic: &'static str,
    pub hourly_fetch: &'static str,
    pub gateway: &'static str,
    pub network: &'static str,
    pub download_target: &'static str,
    pub no_data: &'static str,
}

static SPANISH: Messages = Messages {
    missing_city: "Ingresa una ciudad para analizar.",
    map_required: "Selecciona un punto en el mapa antes de analizar.",
    generic: "Ocurrió un error inesperado. Intenta nuevamente.",
    hourly_fetch: "No se pudo obtener el pronóstico horario.",
    gateway: "Error en el servicio WayraScope (502). Intenta nuevamente en unos minutos.",
    network: "Falla inesperada de red",
    download_target: "Indica ciudad o coordenadas para generar la descarga.",
    no_data: "s/d",
};

static ENGLISH: Messages = Messages {
    missing_city: "Enter a city to analyze.",
    map_required: "Pick a point on the map before analyzing.",
    generic: "Something went wrong. Please try again.",
    hourly_fetch: "Could not load the hourly forecast.",
    gateway: "WayraScope service error (502). Please try again in a few minutes.",
    network: "Unexpected network failure",
    download_target: "Provide a city or coordinates to build the download.",
    no_data: "n/a",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("es".parse::<Language>().unwrap(), Language::Es);
        assert_eq!(" EN ".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::default(), Language::Es);
    }

    #[test]
    fn test_theme_parsing() {
        assert_eq!("light".parse::<Theme>().unwrap(), Theme::Light);
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!(Theme::default().to_string(), "dark");
    }

    #[test]
    fn test_messages_differ_per_language() {
        assert_ne!(Language::Es.messages().missing_city, Language::En.messages().missing_city);
        assert!(Language::Es.messages().gateway.contains("502"));
    }
}
