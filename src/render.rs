//! Plain-text tables for the command-line shell.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, Table};

use labstat_lib::models::{AnalyteCount, ComboStats, CountsReport, SuspectedSample};
use labstat_lib::timestamp::format_instant;

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(headers.to_vec());
    table
}

fn right(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

pub fn print_codes(codes: &[String]) {
    if codes.is_empty() {
        println!("(no analytes)");
        return;
    }
    for code in codes {
        println!("{code}");
    }
}

pub fn print_analyte_counts(counts: &[AnalyteCount]) {
    let mut t = table(&["Analyte", "Count"]);
    for c in counts {
        t.add_row(vec![Cell::new(&c.code), right(c.count)]);
    }
    println!("{t}");
}

pub fn print_counts_report(report: &CountsReport) {
    print_analyte_counts(&report.analyte_counts);

    let mut status = table(&["Open", "Done", "All"]);
    status.add_row(vec![
        right(report.status.open),
        right(report.status.done),
        right(report.status.all),
    ]);
    println!("{status}");

    let mut weekdays = table(&["Weekday", "Count", "Days", "Average"]);
    for d in &report.weekdays.days {
        weekdays.add_row(vec![
            Cell::new(d.label),
            right(d.count),
            right(d.days),
            right(format!("{:.2}", d.average)),
        ]);
    }
    println!("{weekdays}");
    println!("Total: {}", report.weekdays.total());
    if let Some(avg) = report.weekdays.overall_average {
        println!("Average per weekday: {avg:.2}");
    }
}

pub fn print_suspects(rows: &[SuspectedSample]) {
    if rows.is_empty() {
        println!("No suspected missing draws.");
        return;
    }
    let mut t = table(&["Sample", "Ordered", "Lines", "Analytes"]);
    for r in rows {
        t.add_row(vec![
            Cell::new(&r.sample_id),
            Cell::new(format_instant(&r.order_instant)),
            right(r.line_count),
            Cell::new(&r.analytes),
        ]);
    }
    println!("{t}");
}

pub fn print_combos(stats: &ComboStats) {
    for bucket in &stats.buckets {
        println!("Size {}:", bucket.size);
        if bucket.entries.is_empty() {
            println!("  (none)");
            continue;
        }
        let mut t = table(&["Combination", "Count"]);
        for e in &bucket.entries {
            t.add_row(vec![Cell::new(&e.key), right(e.count)]);
        }
        println!("{t}");
    }
}
