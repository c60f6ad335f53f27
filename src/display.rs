//! Markup rendered into the hosting component's own element

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Read = 1,
    Edit = 2,
}

pub const PLACEHOLDER_LABEL: &str = "❄️ Snow Effect Settings";

/// In edit mode the otherwise invisible component shows a small label so
/// authors can find and configure it.
pub fn placeholder_html(mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Edit => format!(
            r#"<div class="snow-effect"><div style="padding: 8px; text-align: center; background: rgba(0, 120, 215, 0.05); border-radius: 3px; border: 1px dashed rgba(0, 120, 215, 0.1); margin: 2px; font-size: 11px;"><span style="color: #0078d7;">{PLACEHOLDER_LABEL}</span></div></div>"#
        ),
        DisplayMode::Read => r#"<div class="snow-effect" style="display: none;"></div>"#.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_mode_shows_label() {
        let html = placeholder_html(DisplayMode::Edit);
        assert!(html.contains(PLACEHOLDER_LABEL));
        assert!(!html.contains("display: none"));
    }

    #[test]
    fn read_mode_is_hidden() {
        let html = placeholder_html(DisplayMode::Read);
        assert!(html.contains("display: none"));
        assert!(!html.contains(PLACEHOLDER_LABEL));
    }
}
