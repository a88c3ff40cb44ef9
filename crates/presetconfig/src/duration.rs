//! Serde helpers for transition durations.
//!
//! Durations are written as milliseconds. On input a bare number is read as
//! milliseconds and a string goes through `humantime` (`"750ms"`, `"1.5s"`).

use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Serializer;

pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = value.as_secs_f64() * 1000.0;
    if millis.fract() == 0.0 {
        serializer.serialize_u64(millis as u64)
    } else {
        serializer.serialize_f64(millis)
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as milliseconds or a human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be positive"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a positive, finite number"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map_err(|err| E::custom(format!("duration {v}ms is out of range: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        duration: Duration,
    }

    fn parse(json: &str) -> Result<Duration, serde_json::Error> {
        serde_json::from_str::<Holder>(json).map(|holder| holder.duration)
    }

    #[test]
    fn numbers_are_milliseconds() {
        assert_eq!(parse(r#"{"duration": 500}"#).unwrap(), Duration::from_millis(500));
        assert_eq!(
            parse(r#"{"duration": 12.5}"#).unwrap(),
            Duration::from_micros(12_500)
        );
    }

    #[test]
    fn strings_use_humantime() {
        assert_eq!(
            parse(r#"{"duration": "1.5s"}"#).unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            parse(r#"{"duration": "750ms"}"#).unwrap(),
            Duration::from_millis(750)
        );
        assert!(parse(r#"{"duration": "soon"}"#).is_err());
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(parse(r#"{"duration": -5}"#).is_err());
        assert!(parse(r#"{"duration": -0.5}"#).is_err());
    }

    #[test]
    fn oversized_values_are_rejected() {
        let err = parse(r#"{"duration": 1e300}"#).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn whole_milliseconds_serialize_as_integers() {
        let json = serde_json::to_string(&Holder {
            duration: Duration::from_millis(800),
        })
        .unwrap();
        assert_eq!(json, r#"{"duration":800}"#);
    }
}
