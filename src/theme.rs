//! Light/dark theme preference, persisted across sessions
//!
//! The preference is a single key on disk (the localStorage analog). It is
//! read once at startup and written on every toggle; the two-value enum
//! needs no further validation.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Result;
use ratatui::style::Color;
use std::fs;

/// Default when no preference has been persisted yet.
pub const DEFAULT_THEME: Theme = Theme::Dark;

/// File name of the persisted preference inside the state directory.
const THEME_FILE: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn flipped(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn parse(s: &str) -> Option<Theme> {
        match s.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    /// Color palette for the terminal front-end.
    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Dark => &DARK_PALETTE,
            Theme::Light => &LIGHT_PALETTE,
        }
    }
}

/// Persisted theme preference.
#[derive(Debug)]
pub struct ThemeStore {
    path: Utf8PathBuf,
    current: Theme,
}

impl ThemeStore {
    /// Open the store, reading the persisted preference or falling back to
    /// the default. A missing or unparsable file is treated as absent.
    pub fn open(state_dir: &Utf8Path) -> Self {
        let path = state_dir.join(THEME_FILE);
        let current = fs::read_to_string(&path)
            .ok()
            .and_then(|s| Theme::parse(&s))
            .unwrap_or(DEFAULT_THEME);
        Self { path, current }
    }

    pub fn get(&self) -> Theme {
        self.current
    }

    /// Flip the preference and persist it. The caller applies the new theme
    /// to its rendering target immediately.
    pub fn toggle(&mut self) -> Result<Theme> {
        self.current = self.current.flipped();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, self.current.as_str())?;
        Ok(self.current)
    }
}

/// Semantic colors for the reader TUI.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub accent: Color,
    pub highlight_bg: Color,
    pub part_title: Color,
    pub error: Color,
    pub success: Color,
}

/// Dark palette, after Tokyo Night.
pub const DARK_PALETTE: Palette = Palette {
    bg: Color::Rgb(0x1a, 0x1b, 0x26),
    fg: Color::Rgb(0xa9, 0xb1, 0xd6),
    fg_dim: Color::Rgb(0x56, 0x5f, 0x89),
    accent: Color::Rgb(0x7a, 0xa2, 0xf7),
    highlight_bg: Color::Rgb(0x29, 0x2e, 0x42),
    part_title: Color::Rgb(0xbb, 0x9a, 0xf7),
    error: Color::Rgb(0xf7, 0x76, 0x8e),
    success: Color::Rgb(0x9e, 0xce, 0x6a),
};

/// Light palette, after GitHub Light.
pub const LIGHT_PALETTE: Palette = Palette {
    bg: Color::Rgb(0xff, 0xff, 0xff),
    fg: Color::Rgb(0x1f, 0x23, 0x28),
    fg_dim: Color::Rgb(0x6e, 0x77, 0x81),
    accent: Color::Rgb(0x09, 0x69, 0xda),
    highlight_bg: Color::Rgb(0xdd, 0xf4, 0xff),
    part_title: Color::Rgb(0x82, 0x50, 0xdf),
    error: Color::Rgb(0xcf, 0x22, 0x2e),
    success: Color::Rgb(0x1a, 0x7f, 0x37),
};

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn state_dir(tmp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn default_applies_when_nothing_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ThemeStore::open(&state_dir(&tmp));
        assert_eq!(store.get(), Theme::Dark);
    }

    #[test]
    fn toggle_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = state_dir(&tmp);

        let mut store = ThemeStore::open(&dir);
        assert_eq!(store.toggle().unwrap(), Theme::Light);

        let reopened = ThemeStore::open(&dir);
        assert_eq!(reopened.get(), Theme::Light);
    }

    #[test]
    fn double_toggle_returns_to_start() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ThemeStore::open(&state_dir(&tmp));
        let start = store.get();
        store.toggle().unwrap();
        store.toggle().unwrap();
        assert_eq!(store.get(), start);
    }

    #[test]
    fn garbage_preference_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = state_dir(&tmp);
        std::fs::write(dir.join("theme"), "solarized").unwrap();
        let store = ThemeStore::open(&dir);
        assert_eq!(store.get(), Theme::Dark);
    }

    #[test]
    fn parse_accepts_surrounding_whitespace() {
        assert_eq!(Theme::parse("light\n"), Some(Theme::Light));
        assert_eq!(Theme::parse(" dark "), Some(Theme::Dark));
        assert_eq!(Theme::parse(""), None);
    }
}
