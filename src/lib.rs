pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::fetcher::RateFetcher;
use crate::core::history::HistoryStore;
use crate::core::rate_cache::RateCache;
use crate::core::session::Session;
use crate::providers::CoinGeckoProvider;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub enum AppCommand {
    Calc {
        amount: f64,
        office_rate: f64,
        refresh: bool,
        save: bool,
    },
    Rate {
        refresh: bool,
    },
    Status,
    HistoryList,
    HistoryDelete {
        id: i64,
    },
    HistoryClear {
        yes: bool,
    },
}

/// Wires the store, provider and history into a session for `config`.
pub fn build_session(config: &AppConfig) -> Result<Session<CoinGeckoProvider>> {
    let store = store::open_store(config)?;
    let provider =
        CoinGeckoProvider::new(&config.provider).context("Failed to create price provider")?;
    let cache = RateCache::with_freshness(store.clone(), config.rate.freshness());
    let history = HistoryStore::with_limits(
        store,
        config.history.max_entries,
        config.history.recovery_keep,
    );
    let fetcher = RateFetcher::with_timeout(provider, cache, config.rate.timeout())
        .with_history(history.clone());
    Ok(Session::new(fetcher, history))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("satcalc starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let session = build_session(&config)?;
    let currency = config.provider.vs_currency.to_uppercase();

    match command {
        AppCommand::Calc {
            amount,
            office_rate,
            refresh,
            save,
        } => cli::calc::run(&session, amount, office_rate, refresh, save, &currency).await,
        AppCommand::Rate { refresh } => cli::rate::run(&session, refresh, &currency).await,
        AppCommand::Status => cli::rate::status(&session).await,
        AppCommand::HistoryList => cli::history::list(&session, &currency).await,
        AppCommand::HistoryDelete { id } => cli::history::delete(&session, id, &currency).await,
        AppCommand::HistoryClear { yes } => cli::history::clear(&session, yes).await,
    }
}
