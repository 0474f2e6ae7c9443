//! Client time zone handling driven by the `X-Timezone` request header.
//!
//! Datetimes are stored in UTC. Incoming naive datetimes are interpreted in the
//! client's zone and outgoing ones are rendered in it as `YYYY-MM-DD HH:MM:SS`.
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::utils::error::AppError;

pub const TIMEZONE_HEADER: &str = "x-timezone";

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const INVALID_FORMAT: &str = "Datetime has wrong format. Use one of these formats instead: \
     YYYY-MM-DD HH:MM[:SS[.ffffff]] or YYYY-MM-DDTHH:MM[:SS[.ffffff]][+HH:MM|-HH:MM|Z].";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientTimezone {
    tz: Tz,
    /// Header value that did not name a known zone, if any.
    unknown: Option<String>,
}

impl Default for ClientTimezone {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            unknown: None,
        }
    }
}

impl ClientTimezone {
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(name) = value.map(str::trim).filter(|name| !name.is_empty()) else {
            return Self::default();
        };
        match name.parse::<Tz>() {
            Ok(tz) => Self { tz, unknown: None },
            Err(_) => {
                tracing::debug!(timezone = %name, "Unknown client time zone, falling back to UTC");
                Self {
                    tz: Tz::UTC,
                    unknown: Some(name.to_string()),
                }
            }
        }
    }

    /// Zone used for rendering; unknown zones fall back to UTC.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Zone used for interpreting client input; an unknown zone is rejected
    /// rather than silently shifting the submitted times.
    pub fn for_input(&self) -> Result<Tz, AppError> {
        match &self.unknown {
            None => Ok(self.tz),
            Some(name) => Err(AppError::invalid_field(
                "Unknown time zone. Please send a valid IANA name in the X-Timezone header.",
                "X-Timezone",
                format!("'{name}' is not a recognised time zone."),
            )),
        }
    }

    pub fn format(&self, value: DateTime<Utc>) -> String {
        value.with_timezone(&self.tz).format(DISPLAY_FORMAT).to_string()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientTimezone
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Non-UTF-8 bytes still count as a zone name, so writes get rejected.
        let value = parts
            .headers
            .get(TIMEZONE_HEADER)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        Ok(Self::from_header(value.as_deref()))
    }
}

/// Parses a client datetime into UTC. Values carrying an offset keep it;
/// naive values are taken as wall-clock time in `tz`.
pub fn parse_client_datetime(input: &str, tz: Tz) -> Result<DateTime<Utc>, String> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| INVALID_FORMAT.to_string())?;

    // Earliest instant wins on a DST fold; a DST gap has no instant at all.
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("{input} does not exist in time zone {}.", tz.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_non_utf8_header_is_an_unknown_zone() {
        let mut parts = axum::http::Request::builder()
            .header(
                TIMEZONE_HEADER,
                axum::http::HeaderValue::from_bytes(b"Asia/\xffKolkata").unwrap(),
            )
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let client = ClientTimezone::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client.tz(), Tz::UTC);
        assert!(client.for_input().is_err());
    }

    #[test]
    fn test_missing_or_blank_header_means_utc() {
        assert_eq!(ClientTimezone::from_header(None).tz(), Tz::UTC);
        assert_eq!(ClientTimezone::from_header(Some("  ")).tz(), Tz::UTC);
        assert!(ClientTimezone::from_header(None).for_input().is_ok());
    }

    #[test]
    fn test_unknown_zone_renders_utc_but_rejects_input() {
        let tz = ClientTimezone::from_header(Some("Mars/Olympus_Mons"));
        assert_eq!(tz.tz(), Tz::UTC);
        assert!(matches!(
            tz.for_input(),
            Err(AppError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_naive_input_is_localized() {
        let parsed = parse_client_datetime("2030-07-25 12:00:00", chrono_tz::Asia::Kolkata).unwrap();
        assert_eq!(parsed, utc("2030-07-25T06:30:00Z"));

        let minutes_only =
            parse_client_datetime("2030-07-25T12:00", chrono_tz::Asia::Kolkata).unwrap();
        assert_eq!(minutes_only, parsed);
    }

    #[test]
    fn test_explicit_offset_wins_over_zone() {
        let parsed =
            parse_client_datetime("2030-07-25T12:00:00Z", chrono_tz::Asia::Kolkata).unwrap();
        assert_eq!(parsed, utc("2030-07-25T12:00:00Z"));

        let spaced =
            parse_client_datetime("2030-07-25 12:00:00+02:00", chrono_tz::Asia::Kolkata).unwrap();
        assert_eq!(spaced, utc("2030-07-25T10:00:00Z"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = parse_client_datetime("next tuesday", Tz::UTC).unwrap_err();
        assert!(err.starts_with("Datetime has wrong format"));
    }

    #[test]
    fn test_dst_gap_and_fold() {
        let ny = chrono_tz::America::New_York;
        // Clocks jump from 02:00 to 03:00 on 2030-03-10.
        assert!(parse_client_datetime("2030-03-10 02:30:00", ny).is_err());
        // 01:30 happens twice on 2030-11-03; the first (EDT) is chosen.
        let fold = parse_client_datetime("2030-11-03 01:30:00", ny).unwrap();
        assert_eq!(fold, utc("2030-11-03T05:30:00Z"));
    }

    #[test]
    fn test_format_renders_in_client_zone() {
        let tz = ClientTimezone::from_header(Some("Asia/Kolkata"));
        assert_eq!(tz.format(utc("2030-07-25T06:30:00Z")), "2030-07-25 12:00:00");
        let utc_client = ClientTimezone::default();
        assert_eq!(utc_client.format(utc("2030-07-25T06:30:00Z")), "2030-07-25 06:30:00");
    }
}
