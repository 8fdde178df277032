use std::env;
use std::io::stdout;

use colored::{ColoredString, Colorize};
use is_terminal::IsTerminal;

/// Color mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Use TTY detection
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => Err(format!(
                "invalid color mode: '{}'. Valid options: auto, always, never",
                s
            )),
        }
    }
}

/// TTY-aware color helper that respects NO_COLOR and terminal detection.
#[derive(Clone)]
pub struct ColorHelper {
    mode: ColorMode,
    stdout_is_terminal: bool,
    no_color: bool,
}

impl ColorHelper {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            mode,
            stdout_is_terminal: stdout().is_terminal(),
            no_color: env::var("NO_COLOR").is_ok_and(|v| !v.is_empty()),
        }
    }

    /// Whether output to stdout should be colored.
    pub fn enabled(&self) -> bool {
        if self.no_color {
            return false;
        }
        match self.mode {
            ColorMode::Never => false,
            ColorMode::Always => true,
            ColorMode::Auto => self.stdout_is_terminal,
        }
    }

    fn apply(&self, text: &str, f: impl FnOnce(&str) -> ColoredString) -> ColoredString {
        if self.enabled() { f(text) } else { text.normal() }
    }

    pub fn red(&self, text: &str) -> ColoredString {
        self.apply(text, |t| t.red())
    }

    pub fn green(&self, text: &str) -> ColoredString {
        self.apply(text, |t| t.green())
    }

    pub fn yellow(&self, text: &str) -> ColoredString {
        self.apply(text, |t| t.yellow())
    }

    pub fn cyan(&self, text: &str) -> ColoredString {
        self.apply(text, |t| t.cyan())
    }

    pub fn bold(&self, text: &str) -> ColoredString {
        self.apply(text, |t| t.bold())
    }

    pub fn dimmed(&self, text: &str) -> ColoredString {
        self.apply(text, |t| t.dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_mode_parsing() {
        assert_eq!("auto".parse::<ColorMode>().unwrap(), ColorMode::Auto);
        assert_eq!("ALWAYS".parse::<ColorMode>().unwrap(), ColorMode::Always);
        assert_eq!("never".parse::<ColorMode>().unwrap(), ColorMode::Never);
        assert!("invalid".parse::<ColorMode>().is_err());
    }

    #[test]
    fn never_mode_disables_colors() {
        let helper = ColorHelper::new(ColorMode::Never);
        assert!(!helper.enabled());
    }

    #[test]
    fn always_mode_enables_colors_unless_no_color() {
        let helper = ColorHelper::new(ColorMode::Always);
        if !helper.no_color {
            assert!(helper.enabled());
        }
    }
}
