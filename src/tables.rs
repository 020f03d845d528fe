use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    api::foxess::{TimeSlotSequence, WorkingMode as FoxEssWorkingMode},
    core::{
        interval::Interval,
        period::{ChargingPeriod, PeriodKind, Weekday},
        series::PriceSeries,
    },
    quantity::power::Watts,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

#[must_use]
pub fn build_periods_table(periods: &[ChargingPeriod]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Kind", "Start", "End", "Power", "Weekdays"]);
    for period in periods {
        table.add_row(vec![
            Cell::new(period.kind).fg(match period.kind {
                PeriodKind::Charge => Color::Green,
                PeriodKind::Discharge => Color::Red,
            }),
            Cell::new(period.start.format("%H:%M")),
            Cell::new(period.end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(period.power).set_alignment(CellAlignment::Right),
            Cell::new(period.weekdays.iter().map(Weekday::abbreviation).join(" "))
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

#[must_use]
pub fn build_windows_table(windows: &[Interval]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["EMS off", "EMS on", "Duration"]);
    for window in windows {
        table.add_row(vec![
            Cell::new(window.start.format("%b %d %H:%M:%S")),
            Cell::new(window.end.format("%b %d %H:%M:%S")),
            Cell::new(format!("{} min", window.duration().num_minutes()))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

/// Prices with the planned intervals highlighted.
#[must_use]
pub fn build_prices_table(prices: &PriceSeries, charge: Interval, discharge: Interval) -> Table {
    let mean_rate = prices.average();
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "Rate", "Plan"]);
    for index in 0..prices.len() {
        let (start, rate) = prices[index];
        let interval = prices.interval_at(index);
        let plan = if interval.overlaps(charge) {
            Cell::new("charge").fg(Color::Green)
        } else if interval.overlaps(discharge) {
            Cell::new("discharge").fg(Color::Red)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(start.format("%H:%M")),
            Cell::new(rate).set_alignment(CellAlignment::Right).fg(
                if mean_rate.is_some_and(|mean_rate| rate >= mean_rate) {
                    Color::Red
                } else {
                    Color::Green
                },
            ),
            plan,
        ]);
    }
    table
}

#[must_use]
pub fn build_time_slot_sequence_table(sequence: &TimeSlotSequence) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "End", "Mode", "Feed power"]);
    for time_slot in sequence {
        let mode_color = match time_slot.working_mode {
            FoxEssWorkingMode::ForceDischarge if time_slot.feed_power != Watts::ZERO => Color::Red,
            FoxEssWorkingMode::ForceCharge if time_slot.feed_power != Watts::ZERO => Color::Green,
            FoxEssWorkingMode::SelfUse => Color::DarkYellow,
            FoxEssWorkingMode::BackUp => Color::Magenta,
            _ => Color::Reset,
        };
        table.add_row(vec![
            Cell::new(&time_slot.start_time),
            Cell::new(&time_slot.end_time),
            Cell::new(time_slot.working_mode).fg(mode_color),
            Cell::new(time_slot.feed_power).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
