//! Forecast replies for a date, a time, a range, or right now.

use chrono::{DateTime, Datelike, FixedOffset};
use tracing::debug;

use super::context::WeatherContext;
use crate::datetime::{self, DateKind};
use crate::error::AppError;
use crate::services::WeatherService;
use crate::services::weather::units::{Measure, unit_label};
use crate::services::weather::{Block, Granularity, find_time, find_time_range};
use crate::turn::TurnContext;

pub async fn respond(turn: &mut TurnContext, weather: &WeatherService, ctx: &WeatherContext) -> Result<(), AppError> {
    let (Some(kind), Some(date)) = (ctx.date_kind, ctx.date) else {
        return current(turn, weather, ctx).await;
    };
    debug!(kind = kind.as_str(), %date, "forecast");
    match kind {
        DateKind::Date => for_date(turn, weather, ctx, date).await,
        DateKind::Time | DateKind::DateTime => for_time(turn, weather, ctx, date).await,
        DateKind::DateRange => for_date_range(turn, weather, ctx, date).await,
        DateKind::TimeRange | DateKind::DateTimeRange => for_time_range(turn, weather, ctx, date).await,
    }
}

async fn for_date(
    turn: &mut TurnContext,
    weather: &WeatherService,
    ctx: &WeatherContext,
    date: DateTime<FixedOffset>,
) -> Result<(), AppError> {
    let forecast = weather.forecast(ctx.position()?, &[Block::Minutely, Block::Hourly]).await?;
    match find_time(date, Granularity::Day, forecast.daily_points()) {
        Some(day) => {
            let when = ctx
                .date_label
                .clone()
                .unwrap_or_else(|| format!("on {}", date.format("%A")));
            turn.send_text(format!(
                "The weather in {} {when} will be {} with a high of {} {}",
                ctx.location_name(),
                day.summary.as_deref().unwrap_or_default(),
                reading(day.temperature_high),
                unit_label(Measure::Temperature, forecast.units()),
            ));
        }
        None => turn.send_text(format!("Sorry, my forecast does not include {}", day_text(date))),
    }
    Ok(())
}

async fn for_time(
    turn: &mut TurnContext,
    weather: &WeatherService,
    ctx: &WeatherContext,
    date: DateTime<FixedOffset>,
) -> Result<(), AppError> {
    let forecast = weather.forecast(ctx.position()?, &[Block::Minutely, Block::Daily]).await?;
    match find_time(date, Granularity::Hour, forecast.hourly_points()) {
        Some(hour) => turn.send_text(format!(
            "The weather in {} at {} will be {} and {} {}",
            ctx.location_name(),
            hour_text(date),
            hour.summary.as_deref().unwrap_or_default(),
            reading(hour.temperature),
            unit_label(Measure::Temperature, forecast.units()),
        )),
        None => turn.send_text(format!(
            "Sorry, my forecast does not include {} {}",
            day_text(date),
            hour_text(date)
        )),
    }
    Ok(())
}

async fn for_date_range(
    turn: &mut TurnContext,
    weather: &WeatherService,
    ctx: &WeatherContext,
    date: DateTime<FixedOffset>,
) -> Result<(), AppError> {
    let forecast = weather.forecast(ctx.position()?, &[Block::Minutely, Block::Hourly]).await?;
    let end = ctx.end_date.unwrap_or(date);
    let days = find_time_range(date, end, forecast.daily_points());
    let summary = forecast.daily.as_ref().and_then(|d| d.summary.as_deref());

    match summary {
        Some(summary) if !days.is_empty() => turn.send_text(format!(
            "The conditions {} in {} will be {summary}",
            ctx.date_label.as_deref().unwrap_or_default(),
            ctx.location_name(),
        )),
        _ => turn.send_text(format!(
            "Sorry, my forecast does not include {} to {}",
            day_text(date),
            day_text(end)
        )),
    }
    Ok(())
}

async fn for_time_range(
    turn: &mut TurnContext,
    weather: &WeatherService,
    ctx: &WeatherContext,
    date: DateTime<FixedOffset>,
) -> Result<(), AppError> {
    let forecast = weather.forecast(ctx.position()?, &[Block::Minutely, Block::Daily]).await?;
    let end = ctx.end_date.unwrap_or(date);
    let hours = find_time_range(date, end, forecast.hourly_points());

    let mut conditions: Vec<&str> = Vec::new();
    for summary in hours.iter().filter_map(|h| h.summary.as_deref()) {
        if !conditions.contains(&summary) {
            conditions.push(summary);
        }
    }

    if conditions.is_empty() {
        turn.send_text(format!(
            "Sorry, my forecast does not include {} {} to {}",
            day_text(date),
            hour_text(date),
            hour_text(end)
        ));
    } else {
        turn.send_text(format!(
            "The conditions {} in {} will be {}",
            ctx.date_label.as_deref().unwrap_or_default(),
            ctx.location_name(),
            conditions.join(", "),
        ));
    }
    Ok(())
}

async fn current(turn: &mut TurnContext, weather: &WeatherService, ctx: &WeatherContext) -> Result<(), AppError> {
    let forecast = weather
        .forecast(ctx.position()?, &[Block::Minutely, Block::Hourly, Block::Daily])
        .await?;
    let Some(now) = forecast.currently.as_ref() else {
        turn.send_text(format!("Sorry, I don't have current conditions for {}", ctx.location_name()));
        return Ok(());
    };
    turn.send_text(format!(
        "The current conditions in {} are {} and {} {}",
        ctx.location_name(),
        now.summary.as_deref().unwrap_or_default(),
        reading(now.temperature),
        unit_label(Measure::Temperature, forecast.units()),
    ));
    Ok(())
}

/// A forecast number as shown to the user; `unknown` when the service left it out.
pub(super) fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

/// `May 15th`
fn day_text(date: DateTime<FixedOffset>) -> String {
    let day = date.day();
    format!("{} {day}{}", date.format("%B"), datetime::ordinal_suffix(day))
}

/// `10 pm`
fn hour_text(date: DateTime<FixedOffset>) -> String {
    date.format("%-I %P").to_string()
}
