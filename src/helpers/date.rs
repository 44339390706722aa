//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Formats CMS timestamps for display in the site's locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    format: String,
    locale: Locale,
    tz: Tz,
}

impl DateFormatter {
    /// Create a formatter from a date-fns style pattern (e.g. `dd MMM yyyy`)
    /// and a BCP 47 / POSIX language tag (e.g. `pt-BR`)
    pub fn new(pattern: &str, language: &str, tz: Tz) -> Self {
        Self {
            format: date_fns_to_chrono_format(pattern),
            locale: parse_locale(language),
            tz,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.date_format, &config.language, config.tz())
    }

    /// Format a date in the configured timezone and locale
    pub fn format_date<T: TimeZone>(&self, date: &DateTime<T>) -> String {
        date.with_timezone(&self.tz)
            .format_localized(&self.format, self.locale)
            .to_string()
    }

    /// Parse and format a raw CMS timestamp. Unparseable input is returned as-is.
    pub fn format_raw(&self, raw: &str) -> String {
        match parse_cms_date(raw) {
            Some(date) => self.format_date(&date),
            None => {
                tracing::warn!("Unparseable publication date {:?}", raw);
                raw.to_string()
            }
        }
    }
}

/// Parse a CMS timestamp (`2021-03-25T19:25:28+0000` or RFC 3339)
pub fn parse_cms_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<T: TimeZone>(date: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Map `pt-BR` / `pt_BR` to a chrono locale, POSIX when unknown
fn parse_locale(language: &str) -> Locale {
    let name = language.replace('-', "_");
    match Locale::try_from(name.as_str()) {
        Ok(locale) => locale,
        Err(_) => {
            tracing::warn!("Unknown locale {:?}, using POSIX", language);
            Locale::POSIX
        }
    }
}

/// Convert a date-fns format pattern to a chrono format string
fn date_fns_to_chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Quoted literal: 'de'
        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let token = match (c, run) {
            ('y', 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', _) => Some("%d"),
            ('E', 4) => Some("%A"),
            ('E', _) => Some("%a"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            ('a', _) => Some("%p"),
            _ => None,
        };

        match token {
            Some(token) => result.push_str(token),
            None => {
                for _ in 0..run {
                    push_literal(&mut result, c);
                }
            }
        }
        i += run;
    }

    result
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
