use std::sync::OnceLock;

use regex::Regex;

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
    })
}

/// Converts an ISO-8601 `PT#H#M#S` duration to whole minutes. Anything
/// that does not start with `PT` counts as zero; oversized values clamp
/// to `u64::MAX`.
pub fn parse_duration_minutes(duration: &str) -> u64 {
    let Some(caps) = duration_regex().captures(duration.trim()) else {
        return 0;
    };
    let part = |index: usize| -> u64 {
        // Digits only, so a parse failure means overflow.
        caps.get(index)
            .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
            .unwrap_or(0)
    };
    part(1)
        .saturating_mul(60)
        .saturating_add(part(2))
        .saturating_add(part(3) / 60)
}
