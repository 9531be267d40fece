use super::ui;
use crate::core::session::CacheStatus;
use crate::core::{Intent, MarketRateProvider, Outcome, RateStatus, Session};
use anyhow::{Result, bail};
use chrono::Utc;
use tracing::debug;

fn status_style(status: &RateStatus) -> ui::StyleType {
    match status {
        RateStatus::Online => ui::StyleType::Online,
        RateStatus::Cached => ui::StyleType::Cached,
        RateStatus::CachedWithError { .. } => ui::StyleType::Error,
    }
}

/// One line summary of where a rate came from, colored by status.
pub fn status_line(status: &RateStatus, age_ms: i64, source: &str) -> String {
    ui::style_text(
        &format!("● {}", status.describe(age_ms, source)),
        status_style(status),
    )
}

pub async fn run<P: MarketRateProvider>(
    session: &Session<P>,
    refresh: bool,
    currency: &str,
) -> Result<()> {
    let spinner = ui::new_spinner("Fetching...");
    let intent = if refresh { Intent::Refresh } else { Intent::Rate };
    let outcome = session.dispatch(intent).await;
    spinner.finish_and_clear();

    let market = match outcome {
        Ok(Outcome::Rate(market)) => market,
        Ok(_) => bail!("Unexpected outcome for rate request"),
        Err(e) => {
            println!("{}", ui::style_text("● Offline", ui::StyleType::Offline));
            return Err(e.into());
        }
    };

    let snapshot = &market.snapshot;
    debug!(rate = snapshot.rate, "Displaying market rate");
    println!(
        "{}",
        ui::style_text(
            &format!("● {}", market.describe(Utc::now().timestamp_millis())),
            status_style(&market.status)
        )
    );
    println!("Market: {} {currency} per BTC", ui::format_fiat(snapshot.rate));
    Ok(())
}

/// Prints the cached rate status without any network access.
pub async fn status<P: MarketRateProvider>(session: &Session<P>) -> Result<()> {
    let Outcome::Status(status) = session.dispatch(Intent::Status).await? else {
        bail!("Unexpected outcome for status request");
    };
    let line = status.describe(Utc::now().timestamp_millis());
    match status {
        CacheStatus::Cached(snapshot) => {
            println!("{}", ui::style_text(&line, ui::StyleType::Cached));
            println!(
                "Last rate: {} ({})",
                ui::format_fiat(snapshot.rate),
                ui::style_text(&snapshot.source, ui::StyleType::Subtle)
            );
        }
        CacheStatus::Empty => println!("{}", ui::style_text(&line, ui::StyleType::Offline)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MarketRate, RateSnapshot};

    #[test]
    fn test_status_line() {
        console::set_colors_enabled(false);
        assert_eq!(
            status_line(&RateStatus::Online, 0, "CoinGecko"),
            "● Online (CoinGecko)"
        );
        assert_eq!(
            status_line(&RateStatus::Cached, 61_000, "CoinGecko"),
            "● Cached (1 min ago)"
        );
        assert_eq!(
            status_line(
                &RateStatus::CachedWithError {
                    message: "HTTP 502".to_string()
                },
                0,
                "CoinGecko"
            ),
            "● Cached (0 min ago) - HTTP 502"
        );
    }

    #[test]
    fn test_status_line_matches_market_description() {
        console::set_colors_enabled(false);
        let now = 1_700_000_000_000;
        let market = MarketRate {
            snapshot: RateSnapshot {
                rate: 250_000.0,
                timestamp: now - 185_000,
                source: "CoinGecko".to_string(),
            },
            status: RateStatus::CachedWithError {
                message: "Rate limit reached".to_string(),
            },
        };
        assert_eq!(
            status_line(&market.status, market.snapshot.age_ms(now), &market.snapshot.source),
            format!("● {}", market.describe(now))
        );
    }
}
