use super::rate::status_line;
use super::ui;
use crate::core::rate::age_minutes;
use crate::core::{Calculation, Intent, MarketRateProvider, Outcome, Session};
use anyhow::{Result, bail};
use comfy_table::Cell;
use tracing::info;

impl Calculation {
    pub fn display_as_table(&self, currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Result"), ui::header_cell("Value")]);

        let mut source = self.source.clone();
        if self.rate_age_ms > 0 {
            source.push_str(&format!(", {} min ago", age_minutes(self.rate_age_ms)));
        }

        table.add_row(vec![
            Cell::new("Amount"),
            ui::right_cell(format!("{} {currency}", ui::format_fiat(self.gel))),
        ]);
        table.add_row(vec![
            Cell::new("Office rate"),
            ui::right_cell(format!("{} {currency}", ui::format_fiat(self.office_rate))),
        ]);
        table.add_row(vec![
            Cell::new("Bitcoin"),
            ui::right_cell(format!("{:.8} BTC", self.btc_amount)),
        ]);
        table.add_row(vec![
            Cell::new("Satoshis"),
            ui::right_cell(format!("{} sats", ui::group_thousands(self.sats))),
        ]);
        table.add_row(vec![Cell::new("Spread"), ui::spread_cell(self.spread)]);
        table.add_row(vec![
            Cell::new("Market"),
            ui::right_cell(format!("{} {currency}", ui::format_fiat(self.market_rate))),
        ]);
        table.add_row(vec![Cell::new("Source"), ui::right_cell(source)]);

        let mut output = table.to_string();
        if self.spread_warning() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    "Office rate is more than 2% above the market rate",
                    ui::StyleType::Error
                )
            ));
        }
        output
    }
}

pub async fn run<P: MarketRateProvider>(
    session: &Session<P>,
    amount: f64,
    office_rate: f64,
    refresh: bool,
    save: bool,
    currency: &str,
) -> Result<()> {
    let spinner = ui::new_spinner("Fetching market rate...");
    let outcome = session
        .dispatch(Intent::Calculate {
            gel: Some(amount),
            office_rate: Some(office_rate),
            refresh,
        })
        .await;
    spinner.finish_and_clear();

    let Outcome::Calculated(calculation) = outcome? else {
        bail!("Unexpected outcome for calculation");
    };

    println!("{}", status_line(&calculation.status, calculation.rate_age_ms, &calculation.source));
    println!("{}", calculation.display_as_table(currency));

    if save {
        let Outcome::Saved { entry, history } = session.dispatch(Intent::Save(calculation)).await?
        else {
            bail!("Unexpected outcome for save");
        };
        info!(id = entry.id, "Saved calculation");
        println!(
            "\nSaved to history as #{} ({} saved)",
            entry.id,
            history.len()
        );
    }
    Ok(())
}
