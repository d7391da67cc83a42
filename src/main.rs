use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wetterbericht::config::AppConfig;
use wetterbericht::constants::prose::WEATHER_LINE;
use wetterbericht::fetch::Fetcher;
use wetterbericht::forum::{RedditClient, RedditCredentials};
use wetterbericht::{
    ForecastError, Forecaster, InstrumentCatalog, ProseGenerator, ProviderContext, ProviderRegistry,
    WetterComStation, WordBank,
};

#[tokio::main]
async fn main() {
    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        error!("💥 Forecast aborted: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ForecastError> {
    info!("Starting Wetterbericht...");

    // Everything that can be wrong with the setup fails here, before any request
    let config = AppConfig::load()?;
    let word_bank = WordBank::load(&config.prose_file)?;
    let catalog = InstrumentCatalog::load(&config.instruments_file)?;
    let prose = ProseGenerator::new(word_bank, catalog.document_template())?;
    info!(
        "📚 Loaded {} provider groups from {}",
        catalog.providers.len(),
        config.instruments_file.display()
    );

    // Posting credentials are checked before any request, too
    let credentials = if config.dry_run {
        None
    } else {
        Some(RedditCredentials::from_env()?)
    };

    let weather_line = catalog
        .line(WEATHER_LINE)
        .cloned()
        .ok_or_else(|| ForecastError::Config(format!("no '{}' line template", WEATHER_LINE)))?;

    let fetcher = Fetcher::new(&config.fetch).map_err(|e| ForecastError::Config(e.to_string()))?;
    let context = ProviderContext {
        fetcher: fetcher.clone(),
        settings: config.fetch.clone(),
    };
    let weather = WetterComStation::new(fetcher, config.weather.clone(), &weather_line);

    let forecaster = Forecaster::new(
        ProviderRegistry::with_builtin(),
        context,
        catalog,
        prose,
        Box::new(weather),
    );

    let document = forecaster.run(&mut rand::thread_rng()).await?;

    let Some(credentials) = credentials else {
        info!("🧪 Dry run, not posting");
        println!("{}", document);
        return Ok(());
    };

    let reddit = RedditClient::login(config.forum.clone(), &credentials).await?;
    let thread = reddit.find_daily_thread(Local::now().date_naive()).await?;
    reddit.reply(&thread, &document).await?;

    info!("✅ Forecast posted");
    Ok(())
}
