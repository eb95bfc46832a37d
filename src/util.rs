/// Formats whole seconds the way the countdown pill shows them: bare
/// seconds under a minute, m:ss from a minute up.
pub fn format_clock(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}
