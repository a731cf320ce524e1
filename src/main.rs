use anyhow::Result;
use skicast_core::{AppError, Config, ForecastError};
use skicast_engine::{ForecastEngine, LoadState, RankingRequest, ResortOutcome, Selection};
use skicast_forecast::{ElevationBand, ForecastFetcher, HttpFetcher, ResortCatalog, ResortForecast};

#[tokio::main]
async fn main() -> Result<()> {
    skicast_core::init()?;

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let (mut config, _warnings) = Config::load_validated()?;
    config
        .preferences
        .apply_overrides(|name| std::env::var(name).ok())?;

    let fetcher = HttpFetcher::new(
        &config.source.base_url,
        config.source.timeout(),
        &config.source.user_agent,
    )
    .map_err(ForecastError::from)?;

    let catalog = ResortCatalog::default();
    let selection = config.preferences.selection(&catalog);
    let elevation = config.preferences.elevation;
    let ranking = config.preferences.ranking();
    let engine = ForecastEngine::new(fetcher, catalog, config.loader_config());

    tracing::info!("SkiCast started with {} resorts selected", selection.len());

    let report = engine.request_load(&selection, elevation).await;
    if engine.load_state() == LoadState::Unavailable {
        return Err(ForecastError::AllDataUnavailable.into());
    }

    tracing::debug!(
        "{} selected resorts failed to load",
        report.count(ResortOutcome::Failed)
    );

    for line in render(&engine, &selection, elevation, &ranking) {
        println!("{line}");
    }

    let prefetched = engine.wait_for_background().await;
    tracing::info!(
        "Prefetched {} more resorts ({} cached in total)",
        prefetched,
        engine.cached_count()
    );

    Ok(())
}

/// Output lines for one run. Resorts that failed to load are left out.
fn render<F>(
    engine: &ForecastEngine<F>,
    selection: &Selection,
    elevation: ElevationBand,
    ranking: &RankingRequest,
) -> Vec<String>
where
    F: ForecastFetcher + 'static,
{
    let mut lines = vec![format!(
        "SkiCast - {} ({})",
        elevation.label(),
        ranking.criterion.label()
    )];
    lines.extend(
        engine
            .visible_forecasts(selection, elevation, ranking)
            .iter()
            .map(|forecast| forecast_line(forecast)),
    );

    let options = engine.day_options(selection, elevation);
    if let Some(day) = options.iter().find(|o| o.selector == ranking.day) {
        lines.push(format!("\nRanked on: {}", day.label));
    }
    lines
}

fn forecast_line(forecast: &ResortForecast) -> String {
    let Some(today) = forecast.day(0) else {
        return format!("  {:<28} no forecast days", forecast.display_name);
    };

    let max_temp = skicast_engine::ranking::max_temperature(today)
        .map(|t| format!("{t:.0}°C"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "  {:<28} {:>6}  snow {:>5.1}cm  wind {:>3.0}km/h  {}",
        forecast.display_name,
        max_temp,
        skicast_engine::ranking::total_snowfall(today),
        skicast_engine::ranking::representative_wind(today),
        today.snow_conditions.text
    )
}
