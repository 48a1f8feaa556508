//! Macro Interpolation
//!
//! Pure string rewrite of a query template before execution: every built-in
//! time-range/interval macro token is replaced with a value computed from
//! the requested time range and resolution step. Each macro is recognized
//! in four textual variants (quoted/unquoted x braced/unbraced), and no
//! expansion contains another macro's token, so substitution is
//! order-independent across macros and idempotent on already-rewritten
//! text.

use once_cell::sync::Lazy;
use std::time::Duration;

static VAR_INTERVAL: Lazy<[String; 4]> = Lazy::new(|| variable_variants("__interval"));
static VAR_INTERVAL_MS: Lazy<[String; 4]> = Lazy::new(|| variable_variants("__interval_ms"));
static VAR_RANGE: Lazy<[String; 4]> = Lazy::new(|| variable_variants("__range"));
static VAR_RANGE_S: Lazy<[String; 4]> = Lazy::new(|| variable_variants("__range_s"));
static VAR_RANGE_MS: Lazy<[String; 4]> = Lazy::new(|| variable_variants("__range_ms"));
static VAR_RATE_INTERVAL: Lazy<[String; 4]> = Lazy::new(|| variable_variants("__rate_interval"));

fn variable_variants(base: &str) -> [String; 4] {
    [
        format!("\"${{{base}}}\""),
        format!("\"${base}\""),
        format!("${base}"),
        format!("${{{base}}}"),
    ]
}

/// Replace every recognized macro token in `expr`.
///
/// `interval` is the dashboard's resolution step, `range` the length of the
/// requested time window. Longer tokens are substituted before their
/// prefixes (`__interval_ms` before `__interval`, `__range_*` before
/// `__range`).
pub fn interpolate_variables(expr: &str, interval: Duration, range: Duration) -> String {
    let range_ms = range.as_millis() as i64;
    let range_s_rounded = (range_ms as f64 / 1000.0).round() as i64;

    let mut expr = multi_replace(expr, &*VAR_INTERVAL_MS, &interval.as_millis().to_string());
    expr = multi_replace(&expr, &*VAR_INTERVAL, &scaled_duration_text(interval));
    expr = multi_replace(&expr, &*VAR_RANGE_MS, &range_ms.to_string());
    expr = multi_replace(&expr, &*VAR_RANGE_S, &range_s_rounded.to_string());
    expr = multi_replace(&expr, &*VAR_RANGE, &format!("{range_s_rounded}s"));
    expr = multi_replace(&expr, &*VAR_RATE_INTERVAL, &exact_duration_text(interval));

    expr
}

fn multi_replace(s: &str, tokens: &[String], replacement: &str) -> String {
    let mut result = s.to_string();
    for token in tokens {
        result = result.replace(token, replacement);
    }
    result
}

/// Render an interval using its largest applicable whole unit, flooring.
/// Sub-millisecond intervals collapse to "1ms".
fn scaled_duration_text(interval: Duration) -> String {
    const MS: u128 = 1;
    const SECOND: u128 = 1_000 * MS;
    const MINUTE: u128 = 60 * SECOND;
    const HOUR: u128 = 60 * MINUTE;
    const DAY: u128 = 24 * HOUR;
    const YEAR: u128 = 365 * DAY;

    let ms = interval.as_millis();
    for (unit, suffix) in [
        (YEAR, "y"),
        (DAY, "d"),
        (HOUR, "h"),
        (MINUTE, "m"),
        (SECOND, "s"),
        (MS, "ms"),
    ] {
        if ms >= unit {
            return format!("{}{}", ms / unit, suffix);
        }
    }
    "1ms".to_string()
}

/// Render a duration in its exact unit-qualified form ("1m30s", "500ms"),
/// the way rate expressions expect it.
fn exact_duration_text(interval: Duration) -> String {
    let total_ms = interval.as_millis();
    if total_ms == 0 {
        return "0s".to_string();
    }
    if total_ms < 1_000 {
        return format!("{total_ms}ms");
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let ms = total_ms % 1_000;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 || hours > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if ms > 0 {
        out.push_str(&format!("{seconds}.{ms:03}s"));
    } else {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_all_variants_substitute_identically() {
        let range = Duration::from_secs(6 * 3600);
        for token in ["\"${__interval}\"", "\"$__interval\"", "$__interval", "${__interval}"] {
            assert_eq!(interpolate_variables(token, MINUTE, range), "1m");
        }
    }

    #[test]
    fn test_interval_and_interval_ms() {
        let out = interpolate_variables("$__interval / $__interval_ms", MINUTE, HOUR);
        assert_eq!(out, "1m / 60000");
    }

    #[test]
    fn test_range_macros() {
        let range = Duration::from_secs(6 * 3600);
        assert_eq!(interpolate_variables("$__range", MINUTE, range), "21600s");
        assert_eq!(interpolate_variables("$__range_s", MINUTE, range), "21600");
        assert_eq!(interpolate_variables("$__range_ms", MINUTE, range), "21600000");
    }

    #[test]
    fn test_range_seconds_rounds_to_nearest() {
        let range = Duration::from_millis(1_600);
        assert_eq!(interpolate_variables("$__range_s", MINUTE, range), "2");
    }

    #[test]
    fn test_rate_interval_uses_exact_form() {
        let interval = Duration::from_secs(90);
        assert_eq!(interpolate_variables("$__rate_interval", interval, HOUR), "1m30s");
        // the scaled form floors instead
        assert_eq!(interpolate_variables("$__interval", interval, HOUR), "1m");
    }

    #[test]
    fn test_scaled_duration_units() {
        assert_eq!(scaled_duration_text(Duration::from_millis(500)), "500ms");
        assert_eq!(scaled_duration_text(Duration::from_secs(30)), "30s");
        assert_eq!(scaled_duration_text(Duration::from_secs(120)), "2m");
        assert_eq!(scaled_duration_text(Duration::from_secs(2 * 24 * 3600)), "2d");
        assert_eq!(scaled_duration_text(Duration::from_secs(366 * 24 * 3600)), "1y");
        assert_eq!(scaled_duration_text(Duration::from_micros(10)), "1ms");
    }

    #[test]
    fn test_exact_duration_text() {
        assert_eq!(exact_duration_text(Duration::from_millis(500)), "500ms");
        assert_eq!(exact_duration_text(Duration::from_secs(30)), "30s");
        assert_eq!(exact_duration_text(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(exact_duration_text(Duration::from_millis(90_500)), "1m30.500s");
    }

    #[test]
    fn test_interpolation_is_idempotent() {
        let expr = "SELECT floor(__time to minute), count(*) FROM logs \
                    WHERE ts > now() - $__range GROUP BY 1 -- step $__interval";
        let once = interpolate_variables(expr, MINUTE, HOUR);
        let twice = interpolate_variables(&once, MINUTE, HOUR);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_untokenized_text_passes_through() {
        let expr = "SELECT __time FROM datasource";
        assert_eq!(interpolate_variables(expr, MINUTE, HOUR), expr);
    }
}
