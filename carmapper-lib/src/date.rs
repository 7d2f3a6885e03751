use crate::types::MapperError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

/// chrono format used for dates when the mapper has no pattern configured.
pub const ISO_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A date pattern in `SimpleDateFormat` notation (`yyyy-MM-dd HH:mm`),
/// compiled once into a chrono format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    chrono_format: String,
    has_date: bool,
    has_time: bool,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self, MapperError> {
        let (chrono_format, has_date, has_time) = compile_pattern(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            chrono_format,
            has_date,
            has_time,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn chrono_format(&self) -> &str {
        &self.chrono_format
    }

    pub fn format(&self, date: &NaiveDateTime) -> String {
        date.format(&self.chrono_format).to_string()
    }

    /// Parses text written with this pattern. Patterns without time fields
    /// yield midnight, patterns without date fields yield 1970-01-01.
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime, MapperError> {
        let parsed = match (self.has_date, self.has_time) {
            (true, true) => NaiveDateTime::parse_from_str(text, &self.chrono_format),
            (true, false) => NaiveDate::parse_from_str(text, &self.chrono_format)
                .map(|date| date.and_time(NaiveTime::MIN)),
            (false, _) => NaiveTime::parse_from_str(text, &self.chrono_format)
                .map(|time| NaiveDate::default().and_time(time)),
        };
        parsed.map_err(|_| MapperError::DateParse {
            value: text.to_string(),
            pattern: self.pattern.clone(),
        })
    }
}

impl FromStr for DateFormat {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn compile_pattern(pattern: &str) -> Result<(String, bool, bool), MapperError> {
    let invalid = |reason: String| MapperError::DatePattern {
        pattern: pattern.to_string(),
        reason,
    };

    let mut out = String::new();
    let mut has_date = false;
    let mut has_time = false;
    let mut chars = pattern.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\'' {
            // '' outside a quoted run is a literal quote
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        out.push('\'');
                    }
                    Some('\'') => break,
                    Some(c) => push_literal(&mut out, c),
                    None => return Err(invalid("unterminated quote".to_string())),
                }
            }
            continue;
        }

        if !ch.is_ascii_alphabetic() {
            push_literal(&mut out, ch);
            continue;
        }

        let mut count = 1;
        while chars.peek() == Some(&ch) {
            chars.next();
            count += 1;
        }

        let directive = match (ch, count) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            _ => return Err(invalid(format!("unsupported pattern letter '{}'", ch))),
        };
        if matches!(ch, 'y' | 'M' | 'd') {
            has_date = true;
        }
        if matches!(ch, 'H' | 'h' | 'm' | 's' | 'S' | 'a') {
            has_time = true;
        }
        out.push_str(directive);
    }

    Ok((out, has_date, has_time))
}

fn push_literal(out: &mut String, ch: char) {
    if ch == '%' {
        out.push_str("%%");
    } else {
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 5, 30)
            .unwrap()
            .and_hms_opt(11, 43, 0)
            .unwrap()
    }

    #[test]
    fn test_compile_minute_pattern() {
        let format = DateFormat::new("yyyy-MM-dd HH:mm").unwrap();
        assert_eq!(format.chrono_format(), "%Y-%m-%d %H:%M");
        assert_eq!(format.format(&purchase_date()), "2021-05-30 11:43");
    }

    #[test]
    fn test_parse_round_trip() {
        let format = DateFormat::new("dd/MM/yyyy HH:mm:ss").unwrap();
        let text = format.format(&purchase_date());
        assert_eq!(text, "30/05/2021 11:43:00");
        assert_eq!(format.parse(&text).unwrap(), purchase_date());
    }

    #[test]
    fn test_date_only_pattern_parses_to_midnight() {
        let format = DateFormat::new("yyyy-MM-dd").unwrap();
        let parsed = format.parse("2021-05-30").unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2021, 5, 30)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_time_only_pattern_parses_on_epoch_date() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

        let format = DateFormat::new("HH:mm").unwrap();
        let text = format.format(&purchase_date());
        assert_eq!(text, "11:43");
        assert_eq!(
            format.parse(&text).unwrap(),
            epoch.and_hms_opt(11, 43, 0).unwrap()
        );

        let format = DateFormat::new("h:mm a").unwrap();
        assert_eq!(
            format.parse("7:05 PM").unwrap(),
            epoch.and_hms_opt(19, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_quoted_literals() {
        let format = DateFormat::new("yyyy-MM-dd'T'HH:mm 'o''clock' 100%").unwrap();
        assert_eq!(format.chrono_format(), "%Y-%m-%dT%H:%M o'clock 100%%");
        assert_eq!(
            format.format(&purchase_date()),
            "2021-05-30T11:43 o'clock 100%"
        );
    }

    #[test]
    fn test_twelve_hour_clock() {
        let format = DateFormat::new("h:mm a").unwrap();
        let evening = NaiveDate::from_ymd_opt(2021, 5, 30)
            .unwrap()
            .and_hms_opt(19, 5, 0)
            .unwrap();
        assert_eq!(format.format(&evening), "7:05 PM");
    }

    #[test]
    fn test_unsupported_letter() {
        let err = DateFormat::new("yyyy-MM-dd Q").unwrap_err();
        assert!(matches!(err, MapperError::DatePattern { .. }));
        assert!(err.to_string().contains("'Q'"));
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(DateFormat::new("yyyy 'at").is_err());
    }

    #[test]
    fn test_parse_failure_names_pattern() {
        let format = DateFormat::new("yyyy-MM-dd HH:mm").unwrap();
        let err = format.parse("30 May 2021").unwrap_err();
        match err {
            MapperError::DateParse { value, pattern } => {
                assert_eq!(value, "30 May 2021");
                assert_eq!(pattern, "yyyy-MM-dd HH:mm");
            }
            other => panic!("Expected date parse error, got {other:?}"),
        }
    }
}
