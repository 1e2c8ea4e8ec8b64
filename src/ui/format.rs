//! Text formatting shared by widgets, the shell and the CLI.

use humansize::{format_size, BINARY};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Cut `s` to at most `max_width` terminal columns, marking the cut with `…`.
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max_width - 1 {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// Pad or cut to exactly `width` columns.
pub fn fit(s: &str, width: usize) -> String {
    let cut = truncate(s, width);
    let pad = width.saturating_sub(cut.width());
    format!("{}{}", cut, " ".repeat(pad))
}

/// Megabytes as a human-readable size.
pub fn megabytes(mb: f64) -> String {
    let bytes = (mb.max(0.0) * 1024.0 * 1024.0) as u64;
    format_size(bytes, BINARY)
}

/// Seconds as `1d 02:03:04` (days omitted when zero).
pub fn uptime(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// KB/s as a throughput string.
pub fn throughput(kb_per_sec: f64) -> String {
    if kb_per_sec >= 1024.0 {
        format!("{:.1} MB/s", kb_per_sec / 1024.0)
    } else {
        format!("{:.0} KB/s", kb_per_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("postgres", 20), "postgres");
        assert_eq!(truncate("postgres", 5), "post…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn fit_pads_short_strings() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("abcdef", 4), "abc…");
    }

    #[test]
    fn uptime_formats() {
        assert_eq!(uptime(59.9), "00:00:59");
        assert_eq!(uptime(90_061.0), "1d 01:01:01");
    }

    #[test]
    fn sizes_are_binary() {
        assert_eq!(megabytes(1.0), "1 MiB");
        assert_eq!(throughput(2048.0), "2.0 MB/s");
        assert_eq!(throughput(12.4), "12 KB/s");
    }
}
