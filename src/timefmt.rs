//! Timestamp helpers for the contest API's textual times.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Parse an RFC 3339 / ISO 8601 timestamp string to Unix seconds.
/// Accepts `Z`, `+hh:mm` / `-hh:mm` offsets and fractional seconds.
pub fn parse_iso_to_unix_secs(s: &str) -> Option<f64> {
    let s = s.trim();
    // Byte offsets below assume one byte per char.
    if s.len() < 10 || !s.is_ascii() {
        return None;
    }

    // Split off the UTC offset, if any, so the civil part can be parsed alone.
    let (civil, offset_secs) = if let Some(rest) = s.strip_suffix('Z') {
        (rest, 0i64)
    } else if s.len() > 19 && matches!(s.as_bytes()[s.len() - 6], b'+' | b'-') {
        let (civil, off) = s.split_at(s.len() - 6);
        let sign = if off.starts_with('-') { -1 } else { 1 };
        let hours: i64 = off[1..3].parse().ok()?;
        let minutes: i64 = off[4..6].parse().ok()?;
        (civil, sign * (hours * 3600 + minutes * 60))
    } else {
        (s, 0)
    };

    let (civil, fraction) = match civil.find('.') {
        Some(dot) => (&civil[..dot], format!("0{}", &civil[dot..]).parse::<f64>().ok()?),
        None => (civil, 0.0),
    };

    let (year, month, day, hour, minute, second): (i64, i64, i64, i64, i64, i64) =
        if civil.len() == 10 {
            (civil[0..4].parse().ok()?, civil[5..7].parse().ok()?, civil[8..10].parse().ok()?, 0, 0, 0)
        } else if civil.len() >= 19 {
            (civil[0..4].parse().ok()?, civil[5..7].parse().ok()?, civil[8..10].parse().ok()?,
             civil[11..13].parse().ok()?, civil[14..16].parse().ok()?, civil[17..19].parse().ok()?)
        } else {
            return None;
        };

    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    let jdn = day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;
    let unix_days = jdn - 2_440_588;
    let secs = unix_days * 86400 + hour * 3600 + minute * 60 + second - offset_secs;
    Some(secs as f64 + fraction)
}

/// Parse a contest duration such as `5:00:00.000` or `-0:30:00` to seconds.
pub fn parse_duration_secs(s: &str) -> Option<f64> {
    let s = s.trim();
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut parts = body.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }
    Some(sign * (hours * 3600.0 + minutes * 60.0 + seconds))
}

/// Render Unix seconds as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_unix_secs(secs: f64) -> String {
    let total = secs.floor() as i64;
    let days = total.div_euclid(86_400);
    let rem = total.rem_euclid(86_400);

    // Inverse of the day-number computation in `parse_iso_to_unix_secs`.
    let jdn = days + 2_440_588;
    let a = jdn + 32044;
    let b = (4 * a + 3) / 146_097;
    let c = a - 146_097 * b / 4;
    let d = (4 * c + 3) / 1461;
    let e = c - 1461 * d / 4;
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = 100 * b + d - 4800 + m / 10;

    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02} UTC",
        rem / 3600,
        rem % 3600 / 60,
        rem % 60
    )
}
