use iced::{Background, Border, Color};
use serde::{Deserialize, Serialize};

use crate::chat::Role;

/// How the palette is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
    /// Follow the desktop's color scheme, re-checked periodically.
    Auto,
}

const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Color {
    Color { r, g, b, a }
}

/// Colors and font sizes for the companion window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeColors {
    pub is_dark: bool,
    // Text
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub error: Color,
    // Backgrounds
    pub panel_bg: Color,
    pub user_bubble: Color,
    pub model_bubble: Color,
    pub error_bubble: Color,
    pub reaction_bg: Color,
    pub input_bg: Color,
    // Status dot
    pub online: Color,
    pub starting: Color,
    pub offline: Color,
    // Font sizes (logical pixels)
    pub body_text: f32,
    /// Header name, reaction bubble
    pub title_text: f32,
    /// Version line at the bottom
    pub info_text: f32,
}

impl ThemeColors {
    pub fn dark() -> Self {
        Self {
            is_dark: true,
            text: rgba(1.0, 1.0, 1.0, 0.9),
            muted: rgba(1.0, 1.0, 1.0, 0.45),
            accent: rgba(1.0, 0.62, 0.78, 1.0),
            error: rgba(0.95, 0.35, 0.35, 1.0),
            panel_bg: rgba(0.05, 0.05, 0.08, 0.82),
            user_bubble: rgba(0.22, 0.18, 0.32, 0.9),
            model_bubble: rgba(0.12, 0.12, 0.18, 0.9),
            error_bubble: rgba(0.35, 0.08, 0.08, 0.85),
            reaction_bg: rgba(0.18, 0.1, 0.16, 0.95),
            input_bg: rgba(0.1, 0.1, 0.14, 0.95),
            online: rgba(0.3, 0.85, 0.45, 1.0),
            starting: rgba(1.0, 0.78, 0.0, 1.0),
            offline: rgba(0.9, 0.2, 0.2, 1.0),
            body_text: 14.0,
            title_text: 16.0,
            info_text: 9.0,
        }
    }

    pub fn light() -> Self {
        Self {
            is_dark: false,
            text: rgba(0.08, 0.08, 0.08, 0.95),
            muted: rgba(0.35, 0.35, 0.35, 0.8),
            accent: rgba(0.72, 0.2, 0.45, 1.0),
            error: rgba(0.75, 0.1, 0.1, 1.0),
            panel_bg: rgba(0.95, 0.95, 0.97, 0.88),
            user_bubble: rgba(0.86, 0.82, 0.95, 0.95),
            model_bubble: rgba(0.9, 0.9, 0.93, 0.95),
            error_bubble: rgba(0.98, 0.85, 0.85, 0.95),
            reaction_bg: rgba(1.0, 0.9, 0.95, 0.97),
            input_bg: rgba(1.0, 1.0, 1.0, 0.95),
            online: rgba(0.1, 0.6, 0.25, 1.0),
            starting: rgba(0.7, 0.5, 0.0, 1.0),
            offline: rgba(0.75, 0.1, 0.1, 1.0),
            body_text: 14.0,
            title_text: 16.0,
            info_text: 8.5,
        }
    }

    pub fn bubble(&self, role: Role) -> Color {
        match role {
            Role::User => self.user_bubble,
            Role::Model => self.model_bubble,
            Role::Error => self.error_bubble,
        }
    }

    pub fn panel_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style + use<> {
        let color = self.panel_bg;
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(Background::Color(color)),
            border: Border {
                radius: 12.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn bubble_style(
        &self,
        role: Role,
    ) -> impl Fn(&iced::Theme) -> iced::widget::container::Style + use<> {
        let color = self.bubble(role);
        let text = if role == Role::Error { self.error } else { self.text };
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(Background::Color(color)),
            text_color: Some(text),
            border: Border {
                radius: 8.0.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn reaction_style(&self) -> impl Fn(&iced::Theme) -> iced::widget::container::Style + use<> {
        let color = self.reaction_bg;
        let accent = self.accent;
        move |_theme: &iced::Theme| iced::widget::container::Style {
            background: Some(Background::Color(color)),
            border: Border {
                color: accent,
                width: 1.0,
                radius: 10.0.into(),
            },
            ..Default::default()
        }
    }

    pub fn input_style(
        &self,
    ) -> impl Fn(&iced::Theme, iced::widget::text_input::Status) -> iced::widget::text_input::Style
    + use<> {
        let bg = self.input_bg;
        let text = self.text;
        let muted = self.muted;
        let accent = self.accent;
        move |_theme: &iced::Theme, status: iced::widget::text_input::Status| {
            let border_color = match status {
                iced::widget::text_input::Status::Focused { .. } => accent,
                _ => muted,
            };
            iced::widget::text_input::Style {
                background: Background::Color(bg),
                border: Border {
                    color: border_color,
                    width: 1.0,
                    radius: 6.0.into(),
                },
                icon: muted,
                placeholder: muted,
                value: text,
                selection: accent,
            }
        }
    }
}

/// Ask the desktop for a dark color scheme, most specific source first.
/// Spawns CLI tools synchronously; keep it off tight loops.
pub fn detect_system_dark() -> bool {
    // COSMIC writes its mode to a plain file
    if let Some(home) = dirs::home_dir() {
        let cosmic_path = home.join(".config/cosmic/com.system76.CosmicTheme.Mode/v1/is_dark");
        if let Ok(contents) = std::fs::read_to_string(&cosmic_path) {
            match contents.trim() {
                "true" => return true,
                "false" => return false,
                _ => {}
            }
        }
    }

    // XDG desktop portal. color-scheme: 0=no preference, 1=dark, 2=light
    if let Ok(output) = std::process::Command::new("dbus-send")
        .args([
            "--session",
            "--print-reply=literal",
            "--dest=org.freedesktop.portal.Desktop",
            "/org/freedesktop/portal/desktop",
            "org.freedesktop.portal.Settings.ReadOne",
            "string:org.freedesktop.appearance",
            "string:color-scheme",
        ])
        .output()
    {
        if output.status.success() {
            if let Some(dark) = portal_scheme_is_dark(&String::from_utf8_lossy(&output.stdout)) {
                return dark;
            }
        }
    }

    if let Ok(output) = std::process::Command::new("gsettings")
        .args(["get", "org.gnome.desktop.interface", "color-scheme"])
        .output()
    {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("prefer-dark") {
            return true;
        }
        if stdout.contains("prefer-light") || stdout.contains("default") {
            return false;
        }
    }

    // e.g. "Adwaita:dark"
    if let Ok(val) = std::env::var("GTK_THEME") {
        return val.to_lowercase().contains("dark");
    }

    tracing::debug!("system theme undetectable, assuming dark");
    true
}

fn portal_scheme_is_dark(reply: &str) -> Option<bool> {
    if reply.contains("uint32 1") {
        Some(true)
    } else if reply.contains("uint32 2") {
        Some(false)
    } else {
        None
    }
}

/// Palette for a mode. `Auto` consults the desktop.
pub fn resolve(mode: ThemeMode) -> ThemeColors {
    match mode {
        ThemeMode::Dark => ThemeColors::dark(),
        ThemeMode::Light => ThemeColors::light(),
        ThemeMode::Auto => {
            if detect_system_dark() {
                ThemeColors::dark()
            } else {
                ThemeColors::light()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_in_config() {
        let mode: ThemeMode = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(mode, ThemeMode::Auto);
        assert_eq!(serde_json::to_string(&ThemeMode::Light).unwrap(), "\"light\"");
    }

    #[test]
    fn portal_reply_parsing() {
        assert_eq!(portal_scheme_is_dark("   variant       uint32 1\n"), Some(true));
        assert_eq!(portal_scheme_is_dark("   variant       uint32 2\n"), Some(false));
        assert_eq!(portal_scheme_is_dark("   variant       uint32 0\n"), None);
    }

    #[test]
    fn error_bubbles_stand_apart() {
        let colors = ThemeColors::dark();
        assert_ne!(colors.bubble(Role::Error), colors.bubble(Role::Model));
        assert_ne!(colors.bubble(Role::User), colors.bubble(Role::Model));
    }
}
