//! Condition replies: a single feature ("what's the high") or a yes/no
//! question ("will it rain", "is it windy").
//!
//! Thresholds are in `us` units and converted to the forecast's units before
//! comparing.

use tracing::debug;

use super::context::WeatherContext;
use super::forecast::reading;
use crate::error::AppError;
use crate::services::WeatherService;
use crate::services::recognizer::{WeatherCondition, WeatherPrecipitation};
use crate::services::weather::units::{Measure, fahrenheit_to, mph_to, unit_label};
use crate::services::weather::{Block, DataPoint};
use crate::turn::TurnContext;

const HOT_TEMP_F: f64 = 80.0;
const COLD_TEMP_F: f64 = 40.0;
const CLOUDY_COVERAGE: f64 = 0.6;
const WINDY_GUST_MPH: f64 = 40.0;
const HUMID_DEW_POINT_SPREAD_F: f64 = 3.0;
const PRECIP_PROBABILITY: f64 = 0.2;

/// High, low or current temperature. Other conditions send nothing.
pub async fn feature(turn: &mut TurnContext, weather: &WeatherService, ctx: &WeatherContext) -> Result<(), AppError> {
    let Some(condition) = ctx.recognized.condition() else {
        return Ok(());
    };
    if !matches!(condition, WeatherCondition::High | WeatherCondition::Low | WeatherCondition::Temperature) {
        debug!(?condition, "not a feature condition");
        return Ok(());
    }

    let forecast = weather.forecast(ctx.position()?, &[Block::Minutely, Block::Hourly]).await?;
    let units = unit_label(Measure::Temperature, forecast.units());
    let location = ctx.location_name();
    let today = forecast.today();

    match condition {
        WeatherCondition::High => turn.send_text(format!(
            "The high temperature today in {location} is {} {units}",
            reading(today.and_then(|d| d.temperature_high))
        )),
        WeatherCondition::Low => turn.send_text(format!(
            "The low temperature today in {location} is {} {units}",
            reading(today.and_then(|d| d.temperature_low))
        )),
        _ => turn.send_text(format!(
            "The temperature in {location} is {} {units}",
            reading(forecast.currently.as_ref().and_then(|c| c.temperature))
        )),
    }
    Ok(())
}

/// Precipitation is checked first, then the named condition.
pub async fn yes_no(turn: &mut TurnContext, weather: &WeatherService, ctx: &WeatherContext) -> Result<(), AppError> {
    if let Some(precip) = ctx.recognized.precipitation() {
        let forecast = weather
            .forecast(ctx.position()?, &[Block::Minutely, Block::Hourly, Block::Daily])
            .await?;
        let now = forecast.currently.unwrap_or_default();
        turn.send_text(precipitation_reply(precip, &now, ctx.location_name()));
        return Ok(());
    }

    let Some(condition) = ctx.recognized.condition() else {
        turn.send_text("Sorry, I don't understand");
        return Ok(());
    };

    let forecast = weather.forecast(ctx.position()?, &[Block::Minutely, Block::Hourly]).await?;
    let Some(today) = forecast.today() else {
        debug!("forecast has no daily data");
        return Ok(());
    };
    if let Some(text) = condition_reply(condition, today, forecast.units(), ctx.location_name()) {
        turn.send_text(text);
    }
    Ok(())
}

fn precipitation_reply(asked: WeatherPrecipitation, now: &DataPoint, location: &str) -> String {
    let kind = now.precip_type.as_deref().unwrap_or(asked.as_str());
    let same = kind == asked.as_str();
    let probability = now.precip_probability.unwrap_or(0.0);

    if now.precip_intensity.unwrap_or(0.0) > 0.0 {
        if same {
            format!("Yes, it is currently {kind}ing in {location}")
        } else {
            format!("No, but it is {kind}ing now in {location}")
        }
    } else if probability > PRECIP_PROBABILITY {
        let percent = percent(probability);
        if same {
            format!("Yes there is a {percent} % chance of {kind} today in {location}")
        } else {
            format!("No, but there is a {percent} % chance of {kind} today in {location}")
        }
    } else {
        format!("No, it doesn't look like there is any {} today in {location}", asked.as_str())
    }
}

/// `None` for conditions that have no yes/no reading (high, low, temperature).
fn condition_reply(condition: WeatherCondition, day: &DataPoint, units: &str, location: &str) -> Option<String> {
    let high = day.temperature_high.unwrap_or(f64::NAN);
    let low = day.temperature_low.unwrap_or(f64::NAN);
    let cloud_cover = day.cloud_cover.unwrap_or(0.0);

    let text = match condition {
        WeatherCondition::Heat => {
            if high >= fahrenheit_to(units, HOT_TEMP_F) {
                format!("Yes, it will be hot today in {location}, with a high of {high}")
            } else {
                format!("No, the high today in {location} is {}", reading(day.temperature_high))
            }
        }
        WeatherCondition::Cold => {
            if low <= fahrenheit_to(units, COLD_TEMP_F) {
                format!("Yes, it will be cold today in {location} with a low of {low}")
            } else {
                format!("No, the low today in {location} is {}", reading(day.temperature_low))
            }
        }
        WeatherCondition::CloudCoverage => {
            if cloud_cover >= CLOUDY_COVERAGE {
                format!("Yes, the cloud coverage today in {location} is {}%", percent(cloud_cover))
            } else {
                format!("No, it will not be cloudy today in {location}")
            }
        }
        WeatherCondition::Sun => {
            if cloud_cover >= CLOUDY_COVERAGE {
                format!("No, the cloud coverage today in {location} is {}%", percent(cloud_cover))
            } else {
                format!("Yes it will be sunny today in {location}")
            }
        }
        WeatherCondition::WindGust => {
            let gust = day.wind_gust.unwrap_or(0.0);
            if gust >= mph_to(units, WINDY_GUST_MPH) {
                format!("Yes, the wind gust speed in {location} is {gust} {}", unit_label(Measure::Speed, units))
            } else {
                format!("No, it will not be windy today in {location}")
            }
        }
        WeatherCondition::Humidity => {
            let spread = high - day.dew_point.unwrap_or(f64::NAN);
            let threshold = fahrenheit_to(units, HUMID_DEW_POINT_SPREAD_F) - fahrenheit_to(units, 0.0);
            if spread < threshold {
                format!("Yes, the humidity today in {location} is {}%", percent(day.humidity.unwrap_or(0.0)))
            } else {
                format!("No, it will not be humid today in {location}")
            }
        }
        WeatherCondition::Fog => {
            if day.icon.as_deref() == Some("fog") {
                format!("Yes, it will be foggy today in {location}")
            } else {
                format!("No, it will not be foggy today in {location}")
            }
        }
        WeatherCondition::High | WeatherCondition::Low | WeatherCondition::Temperature => return None,
    };
    Some(text)
}

/// Fraction as a whole percentage.
fn percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DataPoint {
        DataPoint {
            temperature_high: Some(85.0),
            temperature_low: Some(62.0),
            cloud_cover: Some(0.3),
            wind_gust: Some(12.0),
            humidity: Some(0.55),
            dew_point: Some(60.0),
            icon: Some("clear-day".into()),
            ..Default::default()
        }
    }

    fn say(condition: WeatherCondition, day: &DataPoint) -> String {
        condition_reply(condition, day, "us", "Boston, MA").unwrap()
    }

    #[test]
    fn heat_and_cold() {
        assert_eq!(say(WeatherCondition::Heat, &day()), "Yes, it will be hot today in Boston, MA, with a high of 85");
        assert_eq!(say(WeatherCondition::Cold, &day()), "No, the low today in Boston, MA is 62");

        let winter = DataPoint { temperature_high: Some(35.5), temperature_low: Some(20.0), ..day() };
        assert_eq!(say(WeatherCondition::Heat, &winter), "No, the high today in Boston, MA is 35.5");
        assert_eq!(say(WeatherCondition::Cold, &winter), "Yes, it will be cold today in Boston, MA with a low of 20");
    }

    #[test]
    fn clouds_and_sun_are_opposites() {
        assert_eq!(say(WeatherCondition::Sun, &day()), "Yes it will be sunny today in Boston, MA");
        assert_eq!(say(WeatherCondition::CloudCoverage, &day()), "No, it will not be cloudy today in Boston, MA");

        let grey = DataPoint { cloud_cover: Some(0.87), ..day() };
        assert_eq!(say(WeatherCondition::Sun, &grey), "No, the cloud coverage today in Boston, MA is 87%");
        assert_eq!(say(WeatherCondition::CloudCoverage, &grey), "Yes, the cloud coverage today in Boston, MA is 87%");
    }

    #[test]
    fn wind_humidity_fog() {
        assert_eq!(say(WeatherCondition::WindGust, &day()), "No, it will not be windy today in Boston, MA");
        let gusty = DataPoint { wind_gust: Some(42.0), ..day() };
        assert_eq!(say(WeatherCondition::WindGust, &gusty), "Yes, the wind gust speed in Boston, MA is 42 mph");

        assert_eq!(say(WeatherCondition::Humidity, &day()), "No, it will not be humid today in Boston, MA");
        let muggy = DataPoint { dew_point: Some(83.0), humidity: Some(0.95), ..day() };
        assert_eq!(say(WeatherCondition::Humidity, &muggy), "Yes, the humidity today in Boston, MA is 95%");

        assert_eq!(say(WeatherCondition::Fog, &day()), "No, it will not be foggy today in Boston, MA");
        let fog = DataPoint { icon: Some("fog".into()), ..day() };
        assert_eq!(say(WeatherCondition::Fog, &fog), "Yes, it will be foggy today in Boston, MA");
    }

    #[test]
    fn metric_thresholds() {
        let warm = DataPoint { temperature_high: Some(28.0), ..day() };
        assert!(condition_reply(WeatherCondition::Heat, &warm, "si", "Paris").unwrap().starts_with("Yes"));
        let gusty = DataPoint { wind_gust: Some(20.0), ..day() };
        assert_eq!(
            condition_reply(WeatherCondition::WindGust, &gusty, "si", "Paris").unwrap(),
            "Yes, the wind gust speed in Paris is 20 m/s"
        );
    }

    #[test]
    fn features_have_no_yes_no_reading() {
        assert!(condition_reply(WeatherCondition::High, &day(), "us", "x").is_none());
    }

    #[test]
    fn precipitation_now_and_later() {
        let raining = DataPoint {
            precip_type: Some("rain".into()),
            precip_intensity: Some(0.05),
            precip_probability: Some(0.7),
            ..Default::default()
        };
        assert_eq!(precipitation_reply(WeatherPrecipitation::Rain, &raining, "Seattle, WA"), "Yes, it is currently raining in Seattle, WA");
        assert_eq!(precipitation_reply(WeatherPrecipitation::Snow, &raining, "Seattle, WA"), "No, but it is raining now in Seattle, WA");

        let later = DataPoint { precip_intensity: Some(0.0), ..raining.clone() };
        assert_eq!(
            precipitation_reply(WeatherPrecipitation::Rain, &later, "Seattle, WA"),
            "Yes there is a 70 % chance of rain today in Seattle, WA"
        );
        assert_eq!(
            precipitation_reply(WeatherPrecipitation::Sleet, &later, "Seattle, WA"),
            "No, but there is a 70 % chance of rain today in Seattle, WA"
        );

        assert_eq!(
            precipitation_reply(WeatherPrecipitation::Snow, &DataPoint::default(), "Seattle, WA"),
            "No, it doesn't look like there is any snow today in Seattle, WA"
        );
    }
}
