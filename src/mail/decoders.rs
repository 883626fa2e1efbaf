use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;
use mailparse::ParsedMail;

/// Layout of a Date header once its zone suffix is cut off.
const DATE_HEADER_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// Width of the trailing " +hhmm" assumed on every Date header.
const ZONE_SUFFIX_CHARS: usize = 6;

/// Parse a Date header as local wall-clock time in `tz`.
///
/// The last six characters are assumed to be the zone offset and are dropped
/// without being read. Anything else in the header (a "(UTC)" comment, a
/// missing weekday) makes the parse fail.
pub fn parse_date_header(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let cut = value.char_indices().rev().nth(ZONE_SUFFIX_CHARS - 1)?.0;
    let naive = NaiveDateTime::parse_from_str(&value[..cut], DATE_HEADER_FORMAT).ok()?;
    localize(naive, tz)
}

/// Attach `tz` to a wall-clock time. Ambiguous times take the earlier
/// instant; times inside a spring-forward gap use the offset in effect
/// just before the gap.
fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(ts) | LocalResult::Ambiguous(ts, _) => Some(ts),
        LocalResult::None => {
            let before = tz
                .offset_from_local_datetime(&(naive - Duration::hours(3)))
                .earliest()?
                .fix();
            let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            Some(tz.from_utc_datetime(&utc))
        }
    }
}

/// Like [`parse_date_header`] but falls back to the current time in `tz`.
pub fn resolve_timestamp(value: Option<&str>, tz: Tz) -> DateTime<Tz> {
    let raw = value.unwrap_or_default();
    match parse_date_header(raw, tz) {
        Some(ts) => ts,
        None => {
            warn!("unparseable Date header {raw:?}; using current time");
            Utc::now().with_timezone(&tz)
        }
    }
}

/// Depth-first search for the first text/plain part that decodes.
pub fn first_plain_text(part: &ParsedMail) -> Option<String> {
    if part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
        match part.get_body() {
            Ok(text) => return Some(text),
            Err(e) => warn!("text/plain part failed to decode: {e}"),
        }
    }
    part.subparts.iter().find_map(first_plain_text)
}

/// Collapse a multi-line text into a single line of at most `max_chars`.
pub fn normalize_snippet(s: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(line);
        if out.chars().count() >= max_chars {
            break;
        }
    }
    out.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use chrono_tz::Europe::Dublin;

    #[test]
    fn date_header_is_read_as_dublin_wall_clock() {
        let ts = parse_date_header("Tue, 02 Jan 2024 14:30:00 +0100", Dublin).unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 1, 2));
        // offset is dropped, not applied
        assert_eq!((ts.hour(), ts.minute()), (14, 30));
        assert_eq!(ts.timezone(), Dublin);
    }

    #[test]
    fn spring_forward_gap_keeps_the_header_time() {
        // 01:30 does not exist in Dublin on this day; clocks jump 01:00 -> 02:00
        let ts = parse_date_header("Sun, 31 Mar 2024 01:30:00 +0000", Dublin).unwrap();
        let utc = ts.with_timezone(&Utc);
        assert_eq!((utc.year(), utc.month(), utc.day()), (2024, 3, 31));
        assert_eq!((utc.hour(), utc.minute()), (1, 30));
        assert_eq!((ts.hour(), ts.minute()), (2, 30));

        let resolved = resolve_timestamp(Some("Sun, 31 Mar 2024 01:30:00 +0000"), Dublin);
        assert_eq!(resolved, ts);
    }

    #[test]
    fn fall_back_overlap_takes_earlier_instant() {
        // 01:30 happens twice in Dublin on this day
        let ts = parse_date_header("Sun, 27 Oct 2024 01:30:00 +0000", Dublin).unwrap();
        let utc = ts.with_timezone(&Utc);
        assert_eq!((utc.hour(), utc.minute()), (0, 30));
    }

    #[test]
    fn single_digit_day_parses() {
        assert!(parse_date_header("Mon, 1 Jul 2024 08:00:00 +0000", Dublin).is_some());
    }

    #[test]
    fn unexpected_layouts_do_not_parse() {
        assert!(parse_date_header("", Dublin).is_none());
        assert!(parse_date_header("+0000", Dublin).is_none());
        assert!(parse_date_header("Tue, 02 Jan 2024 14:30:00 +0000 (UTC)", Dublin).is_none());
        assert!(parse_date_header("2024-01-02T14:30:00Z", Dublin).is_none());
    }

    #[test]
    fn fallback_is_now() {
        let before = Utc::now();
        let ts = resolve_timestamp(Some("garbage"), Dublin);
        let after = Utc::now();
        assert!(ts.with_timezone(&Utc) >= before && ts.with_timezone(&Utc) <= after);

        let missing = resolve_timestamp(None, Dublin);
        assert!(missing.with_timezone(&Utc) >= before);
    }

    #[test]
    fn snippet_flattens_and_caps_a_body() {
        let body = "Hi Sam,\r\n\r\nThanks for applying.\r\n\r\nBest,\r\nAcme Talent\r\n";
        assert_eq!(normalize_snippet(body, 80), "Hi Sam, Thanks for applying. Best, Acme Talent");
        assert_eq!(normalize_snippet(body, 14), "Hi Sam, Thanks");
    }

    #[test]
    fn snippet_joins_lines() {
        assert_eq!(normalize_snippet("Hello\n\n  there \nfriend", 11), "Hello there");
    }
}
