// ── Wire-to-domain alert decoding ──
//
// Turns raw `p2000_api` alert objects into `model::Alert`. Optional fields
// fall back to defaults, `DII` included; only a missing or malformed
// `SPI` rejects an alert, and only that one alert.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use p2000_api::{RawAlert, RawCapcode};

use crate::classify::{clean_message, find_postal_code, is_priority};
use crate::error::DecodeError;
use crate::markup::Markup;
use crate::model::{Alert, Capcode, ServiceType};

/// Origin code the feed uses for the trauma helicopter.
pub const HELICOPTER_ORIGIN: u8 = 28;

// ── Batches ────────────────────────────────────────────────────────

/// Decode every element of a data batch, dropping the ones that fail.
pub fn decode_batch(items: &[Value]) -> Vec<Alert> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match decode_alert(item) {
            Ok(alert) => Some(alert),
            Err(e) => {
                warn!(index, error = %e, "dropping undecodable alert");
                None
            }
        })
        .collect()
}

/// Decode one raw alert object.
pub fn decode_alert(value: &Value) -> Result<Alert, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    let raw = RawAlert::deserialize(value).map_err(|e| DecodeError::InvalidField {
        field: "alert",
        reason: e.to_string(),
    })?;
    Alert::try_from(&raw)
}

impl TryFrom<&RawAlert> for Alert {
    type Error = DecodeError;

    fn try_from(raw: &RawAlert) -> Result<Self, Self::Error> {
        let spi = raw.spi().ok_or(DecodeError::MissingField { field: "SPI" })?;
        let stamp = decode_spi(spi)?;

        let service = if stamp.origin_code == HELICOPTER_ORIGIN {
            ServiceType::AmbulanceHelicopter
        } else {
            ServiceType::from_code(raw.service_code().unwrap_or_else(|| {
                debug!(dii = ?raw.dii, "alert has no integer DII, service unknown");
                0
            }))
        };

        let capcodes = raw
            .capcodes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(decode_capcode)
            .collect();

        let text = raw
            .text()
            .filter(|t| !t.trim().is_empty())
            .map(decode_text)
            .unwrap_or_default();

        Ok(Alert {
            time: stamp.time,
            service,
            origin_code: stamp.origin_code,
            region_code: stamp.region_code,
            capcodes,
            latitude: raw.latitude().unwrap_or(0.0),
            longitude: raw.longitude().unwrap_or(0.0),
            street: text.street,
            city: text.city,
            postal_code: text.postal_code,
            message: text.message,
            is_priority: text.is_priority,
        })
    }
}

// ── SPI ────────────────────────────────────────────────────────────

/// Fields packed into an SPI digit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiStamp {
    pub time: NaiveDateTime,
    pub origin_code: u8,
    pub region_code: Option<u8>,
}

/// Decode `YYMMDDhhmmssOO[RR]`: two-digit year from 2000, date, time,
/// origin code, and an optional region code.
pub fn decode_spi(spi: &str) -> Result<SpiStamp, DecodeError> {
    let invalid = |reason| DecodeError::InvalidTimestamp {
        spi: spi.to_owned(),
        reason,
    };

    let digits = spi.as_bytes();
    let consumed = match digits.len() {
        14 => 14,
        n if n >= 16 => 16,
        _ => return Err(invalid("expected 14 or 16 digits")),
    };
    let Some(prefix) = digits.get(..consumed) else {
        return Err(invalid("expected 14 or 16 digits"));
    };
    if !prefix.iter().all(u8::is_ascii_digit) {
        return Err(invalid("non-digit character"));
    }

    let pair = |at: usize| -> u8 {
        prefix
            .get(at..at + 2)
            .map_or(0, |p| (p[0] - b'0') * 10 + (p[1] - b'0'))
    };

    let time = NaiveDate::from_ymd_opt(
        2000 + i32::from(pair(0)),
        u32::from(pair(2)),
        u32::from(pair(4)),
    )
    .and_then(|date| date.and_hms_opt(u32::from(pair(6)), u32::from(pair(8)), u32::from(pair(10))))
    .ok_or_else(|| invalid("not a calendar date and time"))?;

    Ok(SpiStamp {
        time,
        origin_code: pair(12),
        region_code: (consumed == 16).then(|| pair(14)),
    })
}

// ── Capcodes ───────────────────────────────────────────────────────

fn decode_capcode(raw: &RawCapcode) -> Option<Capcode> {
    let Some(code) = raw.code().and_then(|c| u32::try_from(c).ok()) else {
        warn!(cpi = ?raw.cpi, "skipping capcode with invalid CPI");
        return None;
    };
    let unit_name = raw
        .description()
        .map(|d| Markup::parse(d).readable_text().trim().to_owned())
        .unwrap_or_default();
    Some(Capcode { code, unit_name })
}

// ── Free text ──────────────────────────────────────────────────────

/// Everything extracted from an alert's `TXT` markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedText {
    pub city: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub message: String,
    pub is_priority: bool,
}

/// Pull city, street, and postal code out of alert markup, and build the
/// cleaned message with those parts removed.
pub fn decode_text(text: &str) -> DecodedText {
    let markup = Markup::parse(text);
    let classes = markup.class_map();

    let city = classes.get("c").map(|s| (*s).to_owned());
    let street = classes.get("s").map(|s| (*s).to_owned());
    let postal_code = find_postal_code(text).map(str::to_owned);

    let parts: Vec<&str> = [&city, &street, &postal_code]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
    let message = clean_message(&markup.readable_text(), &parts);
    let is_priority = is_priority(&message);

    DecodedText {
        city,
        street,
        postal_code,
        message,
        is_priority,
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn spi_fields_decode_positionally() {
        let stamp = decode_spi("21031214093028").unwrap();
        assert_eq!(stamp.time.year(), 2021);
        assert_eq!(stamp.time.month(), 3);
        assert_eq!(stamp.time.day(), 12);
        assert_eq!(stamp.time.hour(), 14);
        assert_eq!(stamp.time.minute(), 9);
        assert_eq!(stamp.time.second(), 30);
        assert_eq!(stamp.origin_code, 28);
        assert_eq!(stamp.region_code, None);
    }

    #[test]
    fn spi_round_trips_for_many_stamps() {
        for (y, mo, d, h, mi, s) in [
            (0, 1, 1, 0, 0, 0),
            (24, 2, 29, 23, 59, 59),
            (99, 12, 31, 12, 30, 5),
        ] {
            let spi = format!("{y:02}{mo:02}{d:02}{h:02}{mi:02}{s:02}0317");
            let stamp = decode_spi(&spi).unwrap();
            assert_eq!(stamp.time.year(), 2000 + y);
            assert_eq!(stamp.time.month(), mo);
            assert_eq!(stamp.time.day(), d);
            assert_eq!(stamp.time.hour(), h);
            assert_eq!(stamp.time.minute(), mi);
            assert_eq!(stamp.time.second(), s);
            assert_eq!(stamp.origin_code, 3);
            assert_eq!(stamp.region_code, Some(17));
        }
    }

    #[test]
    fn malformed_spi_is_rejected() {
        for spi in ["", "2103121409", "210312140930281", "2103121409302X", "21131214093028", "21023014093028"] {
            assert!(
                matches!(decode_spi(spi), Err(DecodeError::InvalidTimestamp { .. })),
                "{spi}"
            );
        }
    }

    #[test]
    fn origin_28_forces_helicopter() {
        for dii in [1, 2, 3, 4, 5, 77] {
            let alert = decode_alert(&json!({ "DII": dii, "SPI": "21031214093028" })).unwrap();
            assert_eq!(alert.service, ServiceType::AmbulanceHelicopter, "DII {dii}");
        }
    }

    #[test]
    fn missing_optional_fields_default() {
        let alert = decode_alert(&json!({ "LAT": null, "DII": 1, "SPI": "21031214093001" })).unwrap();
        assert_eq!(alert.service, ServiceType::Fire);
        assert_eq!(alert.latitude, 0.0);
        assert_eq!(alert.longitude, 0.0);
        assert!(alert.capcodes.is_empty());
        assert_eq!(alert.message, "");
        assert_eq!(alert.city, None);
        assert!(!alert.is_priority);
        assert!(!alert.has_location());
    }

    #[test]
    fn missing_spi_fails() {
        assert_eq!(
            decode_alert(&json!({ "DII": 2 })).unwrap_err(),
            DecodeError::MissingField { field: "SPI" }
        );
        assert_eq!(decode_alert(&json!([1, 2])).unwrap_err(), DecodeError::NotAnObject);
    }

    #[test]
    fn missing_or_invalid_dii_defaults_to_unknown() {
        let missing = decode_alert(&json!({ "SPI": "21031214093001" })).unwrap();
        assert_eq!(missing.service, ServiceType::Unknown(0));

        let invalid = decode_alert(&json!({ "DII": "two", "SPI": "21031214093001" })).unwrap();
        assert_eq!(invalid.service, ServiceType::Unknown(0));
    }

    #[test]
    fn helicopter_without_dii_is_kept() {
        let alert = decode_alert(&json!({ "SPI": "2103121409302801", "TXT": "Lifeliner 1" })).unwrap();
        assert_eq!(alert.service, ServiceType::AmbulanceHelicopter);
        assert_eq!(alert.origin_code, 28);
        assert_eq!(alert.region_code, Some(1));
        assert_eq!(alert.message, "Lifeliner 1");
    }

    #[test]
    fn unmapped_service_code_is_kept() {
        let alert = decode_alert(&json!({ "DII": 9, "SPI": "21031214093001" })).unwrap();
        assert_eq!(alert.service, ServiceType::Unknown(9));
    }

    #[test]
    fn city_and_street_are_extracted_and_removed() {
        let text = decode_text(
            r#"A1 Kalverstraat Amsterdam Rit 40123 <span class="s">Kalverstraat</span> <span class="c">Amsterdam</span>"#,
        );
        assert_eq!(text.city.as_deref(), Some("Amsterdam"));
        assert_eq!(text.street.as_deref(), Some("Kalverstraat"));
        assert!(!text.message.contains("Amsterdam"));
        assert!(!text.message.contains("Kalverstraat"));
        assert_eq!(text.message, "A1 Rit 40123");
    }

    #[test]
    fn postal_code_comes_from_raw_text() {
        let text = decode_text(r#"B2 Dam 1012AB <span class="c">Amsterdam</span>"#);
        assert_eq!(text.postal_code.as_deref(), Some("1012AB"));
        assert_eq!(text.message, "B2 Dam");

        let excluded = decode_text("B2 1234SA Dam");
        assert_eq!(excluded.postal_code, None);
    }

    #[test]
    fn readable_elements_join_the_message() {
        let text = decode_text(r#"P 1 <span class="wb">BR</span> <span class="wb">woning</span> <span class="x">intern</span>"#);
        assert_eq!(text.message, "P 1 BR woning");
    }

    #[test]
    fn priority_is_flagged_from_the_cleaned_message() {
        assert!(decode_text("P 1 grote brand bij pand").is_priority);
        assert!(!decode_text("P 2 kleine brand").is_priority);
    }

    #[test]
    fn capcodes_decode_with_unit_names() {
        let alert = decode_alert(&json!({
            "DII": 1,
            "SPI": "21031214093001",
            "capcodes": [
                { "CPI": "1420001", "CTT": "Brandweer <span class=\"wb\">Amsterdam</span><span class=\"r\">regio</span>" },
                { "CPI": 1420002, "CTT": "TS 13-4531" },
                { "CPI": "bogus", "CTT": "dropped" }
            ]
        }))
        .unwrap();

        assert_eq!(
            alert.capcodes,
            vec![
                Capcode { code: 1_420_001, unit_name: "Brandweer  Amsterdam".into() },
                Capcode { code: 1_420_002, unit_name: "TS 13-4531".into() },
            ]
        );
        assert!(alert.pages(1_420_002));
    }

    #[test]
    fn full_alert_decodes() {
        let alert = decode_alert(&json!({
            "LAT": 52.3731,
            "LON": "4.8926",
            "DII": 2,
            "SPI": "2103121409301705",
            "TXT": "A1 Dam 1012JS <span class=\"s\">Dam</span> <span class=\"c\">Amsterdam</span> Rit 12345",
            "capcodes": [{ "CPI": "0123456", "CTT": "Ambulance 13-101" }]
        }))
        .unwrap();

        assert_eq!(alert.service, ServiceType::Ambulance);
        assert_eq!(alert.origin_code, 17);
        assert_eq!(alert.region_code, Some(5));
        assert_eq!(alert.latitude, 52.3731);
        assert_eq!(alert.longitude, 4.8926);
        assert_eq!(alert.street.as_deref(), Some("Dam"));
        assert_eq!(alert.city.as_deref(), Some("Amsterdam"));
        assert_eq!(alert.postal_code.as_deref(), Some("1012JS"));
        assert_eq!(alert.message, "A1 Rit 12345");
        assert_eq!(alert.capcodes[0].code, 123_456);
        assert!(alert.has_location());
    }

    #[test]
    fn batch_drops_only_failing_alerts() {
        let items = vec![
            json!({ "DII": 1, "SPI": "21031214093001" }),
            json!({ "DII": 1, "SPI": "garbage" }),
            json!("not an alert"),
            json!({ "DII": 3, "SPI": "21031214093101" }),
        ];
        let alerts = decode_batch(&items);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].service, ServiceType::Fire);
        assert_eq!(alerts[1].service, ServiceType::Police);
    }
}
