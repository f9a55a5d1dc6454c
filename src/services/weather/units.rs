//! Display units for the Dark Sky unit systems (`flags.units`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Temperature,
    Speed,
}

/// Unit label for a measure. Unknown systems fall back to `us`.
pub fn unit_label(measure: Measure, units: &str) -> &'static str {
    match (measure, units) {
        (Measure::Temperature, "si" | "ca" | "uk2") => "°C",
        (Measure::Temperature, _) => "°F",
        (Measure::Speed, "si") => "m/s",
        (Measure::Speed, "ca") => "km/h",
        (Measure::Speed, _) => "mph",
    }
}

pub(crate) fn fahrenheit_to(units: &str, f: f64) -> f64 {
    match units {
        "si" | "ca" | "uk2" => (f - 32.0) * 5.0 / 9.0,
        _ => f,
    }
}

pub(crate) fn mph_to(units: &str, mph: f64) -> f64 {
    match units {
        "si" => mph * 0.44704,
        "ca" => mph * 1.609344,
        _ => mph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(unit_label(Measure::Temperature, "us"), "°F");
        assert_eq!(unit_label(Measure::Temperature, "uk2"), "°C");
        assert_eq!(unit_label(Measure::Speed, "uk2"), "mph");
        assert_eq!(unit_label(Measure::Speed, "ca"), "km/h");
        assert_eq!(unit_label(Measure::Speed, "si"), "m/s");
        assert_eq!(unit_label(Measure::Temperature, "auto"), "°F");
    }

    #[test]
    fn conversions() {
        assert!((fahrenheit_to("si", 212.0) - 100.0).abs() < 1e-9);
        assert_eq!(fahrenheit_to("us", 70.0), 70.0);
        assert!((mph_to("ca", 10.0) - 16.09344).abs() < 1e-9);
        assert_eq!(mph_to("uk2", 10.0), 10.0);
    }
}
