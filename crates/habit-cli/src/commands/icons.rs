use habit_core::models::{AVAILABLE_ICONS, COLOR_PALETTE, DEFAULT_COLOR, DEFAULT_ICON};

pub fn run_icons() {
    for line in format_palettes() {
        println!("{line}");
    }
}

pub fn format_palettes() -> Vec<String> {
    vec![
        format!("Icons (default {DEFAULT_ICON}):"),
        format!("  {}", AVAILABLE_ICONS.join(" ")),
        format!("Colors (default {DEFAULT_COLOR}):"),
        format!("  {}", COLOR_PALETTE.join(" ")),
    ]
}
