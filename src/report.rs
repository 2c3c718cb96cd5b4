//! Human-readable report formatting.

use std::fmt::Write;

use crate::analysis::overview::{FilterOptions, GroupTrend, GroupVolume, LocationSpend};
use crate::analysis::RankedSuspects;
use crate::detect::Alert;
use crate::records::TransactionRecord;
use crate::reference::PriceComparison;

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn date_of(record: &TransactionRecord) -> String {
    record
        .document_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Ranked suspect table followed by the outlier purchases of each listed group.
pub fn format_suspects(suspects: &RankedSuspects<'_>, top: usize, outliers_per_group: usize) -> String {
    if suspects.is_empty() {
        return "No suspect SKU/location groups found.\n".to_string();
    }

    let shown = suspects.top(top);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Suspect groups: {} (showing {})\n",
        suspects.len(),
        shown.len()
    );
    let _ = writeln!(
        out,
        "{:<4} {:<14} {:<8} {:>6} {:>10} {:>10} {:>10} {:>8} {:>8}  Reason",
        "#", "SKU", "Location", "Buys", "Mean", "Min", "Max", "CV %", "Outl."
    );
    let _ = writeln!(out, "{:-<100}", "");

    for (i, group) in shown.iter().enumerate() {
        let agg = &group.aggregate;
        let _ = writeln!(
            out,
            "{:<4} {:<14} {:<8} {:>6} {:>10} {:>10} {:>10} {:>8.1} {:>8}  {}",
            i + 1,
            agg.key.sku,
            agg.key.location,
            agg.count,
            money(agg.mean_price),
            money(agg.min_price),
            money(agg.max_price),
            agg.coefficient_of_variation,
            group.outlier_count,
            group.suspicion_reason,
        );
    }

    for group in shown.iter().filter(|g| g.outlier_count > 0) {
        let agg = &group.aggregate;
        let _ = writeln!(
            out,
            "\n{} {}\n  mean {} | fences [{}, {}] | outliers: {} of {} purchases",
            agg.key,
            agg.description,
            money(agg.mean_price),
            money(agg.lower_bound),
            money(agg.upper_bound),
            group.outlier_count,
            agg.count,
        );
        for record in group.outliers.iter().take(outliers_per_group) {
            let _ = writeln!(
                out,
                "    order {:<12} {:<10} {:<24} qty {:>8} value {:>12} unit {:>10}",
                record.order_number(),
                date_of(record),
                record.supplier(),
                record.quantity(),
                money(record.net_value()),
                money(record.unit_price()),
            );
        }
        if group.outliers.len() > outliers_per_group {
            let _ = writeln!(out, "    ... {} more", group.outliers.len() - outliers_per_group);
        }
    }

    out
}

/// Detail listing of the first `limit` purchases.
pub fn format_records(records: &[&TransactionRecord], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<10} {:<14} {:<8} {:<24} {:>8} {:>12} {:>10}",
        "Order", "Date", "SKU", "Location", "Supplier", "Qty", "Value", "Unit"
    );
    for record in records.iter().take(limit) {
        let _ = writeln!(
            out,
            "{:<12} {:<10} {:<14} {:<8} {:<24} {:>8} {:>12} {:>10}",
            record.order_number(),
            date_of(record),
            record.sku(),
            record.location(),
            record.supplier(),
            record.quantity(),
            money(record.net_value()),
            money(record.unit_price()),
        );
    }
    if records.len() > limit {
        let _ = writeln!(out, "... {} more", records.len() - limit);
    }
    out
}

/// One line per alert.
pub fn format_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No purchases above the market reference.\n".to_string();
    }
    let mut out = String::new();
    for alert in alerts {
        let _ = writeln!(
            out,
            "[{}] order {} {} @ {}: {} (ceiling {}, {})",
            alert.severity,
            alert.order_number,
            alert.sku,
            alert.location,
            alert,
            money(alert.ceiling),
            alert.basis,
        );
    }
    let _ = writeln!(out, "{} alert{}", alerts.len(), if alerts.len() == 1 { "" } else { "s" });
    out
}

pub fn format_overview(
    spend: &[LocationSpend],
    busiest: &[GroupVolume],
    trends: &[GroupTrend],
    options: &FilterOptions,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Spend by location");
    for s in spend {
        let _ = writeln!(
            out,
            "  {:<10} {:>16} ({} purchases)",
            s.location,
            money(s.total_spend),
            s.transactions
        );
    }

    let _ = writeln!(out, "\nBusiest SKU/location groups (unit price min / q1 / median / q3 / max)");
    for g in busiest {
        let s = &g.spread;
        let _ = writeln!(
            out,
            "  {:<24} {:>6}  {} / {} / {} / {} / {}  {}",
            g.key.to_string(),
            g.transactions,
            money(s.min),
            money(s.q1),
            money(s.median),
            money(s.q3),
            money(s.max),
            g.description
        );
    }

    if !trends.is_empty() {
        let _ = writeln!(out, "\nMonthly average unit price");
        for t in trends {
            let months: Vec<String> = t
                .months
                .iter()
                .map(|m| format!("{} {}", m.month, money(m.mean_price)))
                .collect();
            let series = if months.is_empty() {
                "no dated purchases".to_string()
            } else {
                months.join(" | ")
            };
            let _ = writeln!(out, "  {:<24} {}", t.key.to_string(), series);
        }
    }

    let span = match (options.first_date, options.last_date) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "no dated purchases".to_string(),
    };
    let _ = writeln!(
        out,
        "\n{} SKUs, {} locations, {} suppliers, {} merchandise groups; {}",
        options.skus.len(),
        options.locations.len(),
        options.suppliers.len(),
        options.merchandise_groups.len(),
        span
    );
    out
}

pub fn format_comparisons(comparisons: &[PriceComparison]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:<8} {:>12} {:>12} {:>12} {:>8}  Note",
        "SKU", "Location", "Internal", "Observed", "External", "Ratio"
    );
    for c in comparisons {
        let _ = writeln!(
            out,
            "{:<14} {:<8} {:>12} {:>12} {:>12} {:>8}  {}",
            c.sku,
            c.location.as_deref().unwrap_or("*"),
            money(c.internal_average_price),
            c.observed_mean_price.map(money).unwrap_or_else(|| "-".to_string()),
            money(c.external_reference_price),
            c.ratio.map(|r| format!("{:.2}x", r)).unwrap_or_else(|| "-".to_string()),
            c.note,
        );
    }
    out
}
