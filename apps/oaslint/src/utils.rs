//! Colored message prefixes for stderr diagnostics. Honors `NO_COLOR`.

use owo_colors::OwoColorize;

fn colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if colors() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}
