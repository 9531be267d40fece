use super::ui;
use crate::core::{CalculationEntry, Intent, MarketRateProvider, Outcome, Session};
use anyhow::{Result, bail};
use chrono::{DateTime, Local};
use comfy_table::Cell;
use console::Term;

fn format_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|d| d.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|_| date.to_string())
}

pub fn display_history(entries: &[CalculationEntry], currency: &str) -> String {
    if entries.is_empty() {
        return ui::style_text("No saved calculations", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Date"),
        ui::header_cell(&format!("Amount ({currency})")),
        ui::header_cell("Office rate"),
        ui::header_cell("Market rate"),
        ui::header_cell("BTC"),
        ui::header_cell("Spread"),
        ui::header_cell("Source"),
    ]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(format_date(&entry.date)),
            ui::right_cell(ui::format_fiat(entry.gel)),
            ui::right_cell(ui::format_fiat(entry.office_rate)),
            ui::right_cell(ui::format_fiat(entry.market_rate)),
            ui::right_cell(format!("{:.8}", entry.btc_amount)),
            ui::spread_cell(entry.spread),
            Cell::new(&entry.source),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Calculation history", ui::StyleType::Title),
        table
    )
}

pub async fn list<P: MarketRateProvider>(session: &Session<P>, currency: &str) -> Result<()> {
    let Outcome::History(history) = session.dispatch(Intent::History).await? else {
        bail!("Unexpected outcome for history request");
    };
    println!("{}", display_history(&history, currency));
    Ok(())
}

pub async fn delete<P: MarketRateProvider>(
    session: &Session<P>,
    id: i64,
    currency: &str,
) -> Result<()> {
    let Outcome::Deleted { removed, history } = session.dispatch(Intent::Delete(id)).await? else {
        bail!("Unexpected outcome for delete request");
    };
    if removed {
        println!("Deleted entry #{id}");
    } else {
        println!(
            "{}",
            ui::style_text(&format!("No entry #{id} in history"), ui::StyleType::Subtle)
        );
    }
    println!("{}", display_history(&history, currency));
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{prompt} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Clears the history after the user confirmed, or straight away with `yes`.
pub async fn clear<P: MarketRateProvider>(session: &Session<P>, yes: bool) -> Result<()> {
    if !yes && !confirm("Clear all calculation history?")? {
        println!("History left unchanged");
        return Ok(());
    }
    session.dispatch(Intent::ClearAll).await?;
    println!("History cleared");
    Ok(())
}
