/// Render a clip length: `0s`, `42s`, `1:05`.
pub fn format_duration(seconds: u32) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }

    format!("{}:{:02}", seconds / 60, seconds % 60)
}
