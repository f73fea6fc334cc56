//! Participant-facing time formatting
//!
//! Game times and countdowns appear inside oracle directives and captain
//! notifications, so they are formatted here once, in plain language.

use chrono::{DateTime, Utc};

/// Long form used in notifications, e.g. "Friday, March 7 at 9:45 PM"
pub fn game_time(ts: &DateTime<Utc>) -> String {
    ts.format("%A, %B %-d at %-I:%M %p").to_string()
}

/// Short form used when proposing a game, e.g. "Friday at 9:45 PM"
pub fn game_day_time(ts: &DateTime<Utc>) -> String {
    ts.format("%A at %-I:%M %p").to_string()
}

/// Humanized distance between two instants, e.g. "in 2 days",
/// "in 3 hours, 20 min", "45 min ago". Rounded to minutes.
pub fn time_until(now: &DateTime<Utc>, then: &DateTime<Utc>) -> String {
    if now > then {
        return format!("{} ago", describe_delta(*then, *now));
    }
    format!("in {}", describe_delta(*now, *then))
}

fn describe_delta(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let total_minutes = (end - start).num_minutes().max(0);

    if total_minutes < 60 {
        return plural(total_minutes.max(1), "min");
    }

    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours < 6 {
        if minutes == 0 {
            return plural(hours, "hour");
        }
        return format!("{}, {}", plural(hours, "hour"), plural(minutes, "min"));
    }

    if hours < 24 {
        return plural(hours, "hour");
    }

    plural(hours / 24, "day")
}

fn plural(n: i64, unit: &str) -> String {
    // "min" stays uncounted, matching how people text
    if unit == "min" {
        return format!("{} min", n);
    }
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
