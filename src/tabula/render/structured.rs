//! Formatters for composite values: locations, schedules, pricing tiers, and
//! layout fields (groups, repeaters, flexible content).
//!
//! Each formatter returns `None` when the value does not have the expected
//! shape, which sends the cell to the generic fallback.

use super::datetime::{format_date, Granularity, Schedule};
use super::fragment::Fragment;
use super::scalar::{value_number, value_text};
use super::text::{format_amount, format_money, plural, truncate_chars};
use super::RenderContext;
use crate::fields::title_case;
use crate::host::scalar_string;
use serde_json::{Map, Value};

const SUMMARY_CHARS: usize = 80;
const SUMMARY_ROWS: usize = 3;

fn coordinate(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(value_number))
}

pub(super) fn location(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let obj = value.as_object()?;
    let address = obj
        .get("address")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from);
    let lat = coordinate(obj, &["lat", "latitude"]);
    let lng = coordinate(obj, &["lng", "lon", "longitude"]);
    let coords = match (lat, lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => None,
    };
    let map_link = |(lat, lng): (f64, f64)| {
        let text = format!("{}, {}", lat, lng);
        Fragment::alt(
            Fragment::link(
                format!("https://www.openstreetmap.org/?mlat={}&mlon={}", lat, lng),
                text.clone(),
            ),
            text,
        )
    };
    match (ctx.settings.variant(), address, coords) {
        ("coordinates", _, Some(c)) => Some(map_link(c)),
        ("both", Some(a), Some(c)) => Some(Fragment::Join {
            parts: vec![Fragment::Text(a), map_link(c)],
            sep: " · ",
        }),
        (_, Some(a), _) => Some(Fragment::Text(a)),
        (_, None, Some(c)) => Some(map_link(c)),
        (_, None, None) => None,
    }
}

pub(super) fn recurring(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let schedule = Schedule::from_value(value)?;
    Some(match ctx.settings.variant() {
        "summary" => Fragment::Text(schedule.summary()),
        _ => match schedule.next_occurrence(ctx.options.now.date()) {
            Some(next) => format_date(next, Granularity::Exact, ctx.options),
            None => Fragment::text("No upcoming dates"),
        },
    })
}

/// One pricing tier. `amount` may be a number or a numeric string.
#[derive(Debug, Clone, PartialEq)]
struct Tier {
    amount: f64,
    sale: Option<f64>,
}

fn tier(value: &Value) -> Option<Tier> {
    let obj = value.as_object()?;
    let amount = obj.get("amount").and_then(value_number)?;
    let sale = obj
        .get("sale_amount")
        .and_then(value_number)
        .filter(|s| *s < amount);
    Some(Tier { amount, sale })
}

fn tiers(value: &Value) -> Vec<Tier> {
    match value {
        Value::Array(items) => items.iter().filter_map(tier).collect(),
        other => tier(other).into_iter().collect(),
    }
}

/// The first entry's tier, which is what price sorting orders by.
fn lead_tier(value: &Value) -> Option<Tier> {
    match value {
        Value::Array(items) => items.first().and_then(tier),
        other => tier(other),
    }
}

/// Pricing tiers. Exports always carry plain numeric amounts. The shown price is
/// always the first tier's, so a list whose first tier has no amount renders empty.
pub(super) fn pricing(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let tiers = tiers(value);
    if tiers.is_empty() {
        return None;
    }
    let Some(first) = lead_tier(value) else {
        return Some(Fragment::Empty);
    };
    let symbol = ctx.options.currency_symbol.as_str();
    let single = |amount: f64| {
        Fragment::alt(Fragment::text(format_money(amount, symbol)), format_amount(amount))
    };

    Some(match ctx.settings.variant() {
        "range" => {
            let low = tiers.iter().map(|t| t.amount).fold(f64::INFINITY, f64::min);
            let high = tiers.iter().map(|t| t.amount).fold(f64::NEG_INFINITY, f64::max);
            if low == high {
                single(low)
            } else {
                Fragment::alt(
                    Fragment::Text(format!(
                        "{} – {}",
                        format_money(low, symbol),
                        format_money(high, symbol)
                    )),
                    format!("{}-{}", format_amount(low), format_amount(high)),
                )
            }
        }
        "discounted" => match tiers.iter().find_map(|t| t.sale.map(|s| (t.amount, s))) {
            Some((amount, sale)) => Fragment::alt(
                Fragment::Join {
                    parts: vec![
                        Fragment::Struck(format_money(amount, symbol)),
                        Fragment::text(format_money(sale, symbol)),
                    ],
                    sep: " ",
                },
                format_amount(sale),
            ),
            None => single(first.amount),
        },
        _ => single(first.amount),
    })
}

fn field_summary(obj: &Map<String, Value>) -> String {
    obj.iter()
        .filter(|(k, _)| !k.starts_with('_') && k.as_str() != "acf_fc_layout")
        .filter_map(|(k, v)| {
            value_text(v)
                .filter(|t| !t.trim().is_empty())
                .map(|t| format!("{}: {}", title_case(k), t))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn row_summary(row: &Value) -> Option<String> {
    let obj = row.as_object()?;
    let parts: Vec<String> = obj
        .iter()
        .filter(|(k, _)| !k.starts_with('_') && k.as_str() != "acf_fc_layout")
        .filter_map(|(_, v)| scalar_string(v))
        .filter(|s| !s.trim().is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" / "))
}

pub(super) fn group(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let obj = value.as_object()?;
    Some(match ctx.settings.variant() {
        "summary" => truncate_chars(&field_summary(obj), SUMMARY_CHARS),
        _ => {
            let filled = obj
                .iter()
                .filter(|(k, v)| {
                    !k.starts_with('_') && value_text(v).is_some_and(|t| !t.trim().is_empty())
                })
                .count();
            Fragment::alt(
                Fragment::badge("count", plural(filled, "field", "fields")),
                filled.to_string(),
            )
        }
    })
}

pub(super) fn repeater(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let rows = value.as_array()?;
    Some(match ctx.settings.variant() {
        "summary" => {
            let parts = rows
                .iter()
                .filter_map(row_summary)
                .map(|s| truncate_chars(&s, SUMMARY_CHARS))
                .collect();
            Fragment::bounded(parts, SUMMARY_ROWS)
        }
        _ => Fragment::alt(
            Fragment::badge("count", plural(rows.len(), "row", "rows")),
            rows.len().to_string(),
        ),
    })
}

pub(super) fn flexible(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let blocks = value.as_array()?;
    Some(match ctx.settings.variant() {
        "summary" => {
            let names = blocks
                .iter()
                .filter_map(|b| {
                    b.get("acf_fc_layout")
                        .or_else(|| b.get("layout"))
                        .and_then(Value::as_str)
                })
                .map(|name| Fragment::Text(title_case(name)))
                .collect();
            Fragment::bounded(names, SUMMARY_ROWS)
        }
        _ => Fragment::alt(
            Fragment::badge("count", plural(blocks.len(), "block", "blocks")),
            blocks.len().to_string(),
        ),
    })
}
