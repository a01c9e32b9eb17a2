use std::fmt::Write;
use weather_engine::{UnitSystem, WeatherSnapshot};

struct Units {
    temp: &'static str,
    speed: &'static str,
}

fn units(unit_system: UnitSystem) -> Units {
    match unit_system {
        UnitSystem::Metric => Units { temp: "°C", speed: "km/h" },
        UnitSystem::Us => Units { temp: "°F", speed: "mph" },
        UnitSystem::Uk => Units { temp: "°C", speed: "mph" },
    }
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

/// Human-readable rendering: header, current conditions, one line per day.
pub fn render(snapshot: &WeatherSnapshot, unit_system: UnitSystem) -> String {
    let units = units(unit_system);
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", snapshot.resolved_location_name, snapshot.timezone);

    if let Some(now) = &snapshot.current_conditions {
        let _ = writeln!(
            out,
            "Now: {}{}, {}, humidity {}%, wind {} {}",
            num(now.temp),
            units.temp,
            now.conditions.as_deref().unwrap_or("Unknown"),
            num(now.humidity),
            num(now.windspeed),
            units.speed,
        );
    }

    for day in &snapshot.days {
        let _ = write!(
            out,
            "{}  {}..{}{}  {}",
            day.datetime.as_deref().unwrap_or("????-??-??"),
            num(day.tempmin),
            num(day.tempmax),
            units.temp,
            day.conditions.as_deref().unwrap_or("Unknown"),
        );
        if let (Some(sunrise), Some(sunset)) = (&day.sunrise, &day.sunset) {
            let _ = write!(out, "  (sunrise {sunrise}, sunset {sunset})");
        }
        out.push('\n');
    }

    out
}
