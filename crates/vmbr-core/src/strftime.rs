//! Timestamp/token formatting for artifact names and version tags.
//!
//! Templates mix literal text with two-character `%` tokens. Only the
//! tokens below are recognized; everything else passes through untouched,
//! including digit runs (`backup-%H-18.img` keeps the literal `18`) and
//! unrecognized tokens (`%Q` stays `%Q`).
//!
//! | token | field          | width |
//! |-------|----------------|-------|
//! | `%Y`  | year           | 4     |
//! | `%y`  | year mod 100   | 2     |
//! | `%m`  | month          | 2     |
//! | `%d`  | day            | 2     |
//! | `%H`  | hour (24h)     | 2     |
//! | `%M`  | minute         | 2     |
//! | `%S`  | second         | 2     |

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

/// Render `template` against `t`, substituting recognized tokens and
/// emitting every other character literally.
///
/// The scan substitutes field values directly and never re-parses its own
/// output, so literal digits adjacent to a token cannot be reinterpreted
/// as calendar fields. Always returns a string; there is no failure mode.
///
/// Templates are resolved once per run against the run's reference
/// timestamp, so repeated calls within a run agree on the artifact name.
pub fn format_timestamp(template: &str, t: &DateTime<FixedOffset>) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(&format!("{:04}", t.year())),
            Some('y') => out.push_str(&format!("{:02}", t.year().rem_euclid(100))),
            Some('m') => out.push_str(&format!("{:02}", t.month())),
            Some('d') => out.push_str(&format!("{:02}", t.day())),
            Some('H') => out.push_str(&format!("{:02}", t.hour())),
            Some('M') => out.push_str(&format!("{:02}", t.minute())),
            Some('S') => out.push_str(&format!("{:02}", t.second())),
            // Unrecognized token: keep both characters as literals.
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            // Trailing lone '%'.
            None => out.push('%'),
        }
    }
    out
}

/// Build the object-store path for an artifact:
/// `dss-public://{bucket}/{name}`, applying [`format_timestamp`] to the
/// name when it contains tokens.
pub fn artifact_path(bucket: &str, template: &str, t: &DateTime<FixedOffset>) -> String {
    let name = if template.contains('%') {
        format_timestamp(template, t)
    } else {
        template.to_string()
    };
    format!("dss-public://{}/{}", bucket, name)
}
