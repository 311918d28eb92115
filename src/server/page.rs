use crate::config::prompt::{ Preset, PRESETS };

const TEMPLATE: &str = include_str!("../../assets/index.html");

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn preset_button(preset: &Preset) -> String {
    format!(
        "<button type=\"button\" data-preset=\"{}\">{}</button>",
        escape_html(preset.id),
        escape_html(preset.label)
    )
}

pub fn render_page(ws_port: u16) -> String {
    let buttons = PRESETS.iter().map(preset_button).collect::<Vec<_>>().join("\n");
    TEMPLATE
        .replace("{{SIDEBAR_BUTTONS}}", &buttons)
        .replace("{{WS_PORT}}", &ws_port.to_string())
}
