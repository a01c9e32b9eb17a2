//! Cache key derivation.
//!
//! Keys have the shape `weather:{kind}:{location}:{date}:{unit}`. The date
//! segment is the literal `current` when no date was supplied and the unit
//! segment falls back to `metric`. The location is used byte for byte, so
//! callers that differ only in case or whitespace land in different buckets.

use chrono::NaiveDate;

use crate::model::{QueryKind, UnitSystem, WeatherQuery};

pub const KEY_PREFIX: &str = "weather";

/// Date segment used when the query carries no date.
pub const NO_DATE_TOKEN: &str = "current";

pub fn derive_key(
    kind: QueryKind,
    location: &str,
    date: Option<NaiveDate>,
    unit_system: Option<UnitSystem>,
) -> String {
    let date = date.map(|d| d.format("%Y-%m-%d").to_string());
    let date = date.as_deref().unwrap_or(NO_DATE_TOKEN);
    let unit_system = unit_system.unwrap_or_default();

    format!("{KEY_PREFIX}:{kind}:{location}:{date}:{unit_system}")
}

pub fn key_for(kind: QueryKind, query: &WeatherQuery) -> String {
    derive_key(kind, &query.location, query.date, query.unit_system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn defaults_produce_sentinel_segments() {
        let key = derive_key(QueryKind::Current, "London", None, None);
        assert_eq!(key, "weather:current:London:current:metric");
    }

    #[test]
    fn explicit_values_are_rendered() {
        let key = derive_key(
            QueryKind::Forecast,
            "New York",
            Some(date("2026-10-18")),
            Some(UnitSystem::Us),
        );
        assert_eq!(key, "weather:forecast:New York:2026-10-18:us");
    }

    #[test]
    fn explicit_metric_matches_default() {
        let implicit = derive_key(QueryKind::Current, "Oslo", None, None);
        let explicit = derive_key(QueryKind::Current, "Oslo", None, Some(UnitSystem::Metric));
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn derivation_is_deterministic() {
        let query = WeatherQuery::new("Berlin").with_date(date("2026-01-02"));
        assert_eq!(key_for(QueryKind::Forecast, &query), key_for(QueryKind::Forecast, &query));
    }

    #[test]
    fn location_is_not_normalized() {
        let a = derive_key(QueryKind::Current, "London", None, None);
        let b = derive_key(QueryKind::Current, "london", None, None);
        let c = derive_key(QueryKind::Current, "London ", None, None);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn distinct_effective_tuples_map_to_distinct_keys() {
        let kinds = [QueryKind::Current, QueryKind::Forecast];
        let locations = ["London", "london", "a:b", "a", "b:current"];
        let dates = [None, Some(date("2026-10-18")), Some(date("2026-10-19"))];
        let units = [UnitSystem::Metric, UnitSystem::Us, UnitSystem::Uk];

        let mut seen = HashSet::new();
        let mut count = 0;
        for kind in kinds {
            for location in locations {
                for d in dates {
                    for unit in units {
                        seen.insert(derive_key(kind, location, d, Some(unit)));
                        count += 1;
                    }
                }
            }
        }

        assert_eq!(seen.len(), count);
    }
}
