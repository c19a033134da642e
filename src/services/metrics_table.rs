use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, CellAlignment, Table,
};

use crate::models::metrics::AggregateRecord;

/// Terminal rendering of one day's aggregates
pub fn render_metrics_table(records: &[AggregateRecord]) -> String {
    if records.is_empty() {
        return "No data available".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Date").add_attribute(Attribute::Bold),
            Cell::new("Project ID").add_attribute(Attribute::Bold),
            Cell::new("Transaction Count").add_attribute(Attribute::Bold),
            Cell::new("Total Volume USD").add_attribute(Attribute::Bold),
        ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.date.format("%Y-%m-%d")),
            Cell::new(&record.project_id),
            Cell::new(record.transaction_count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", record.total_volume_usd))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_table() {
        assert_eq!(render_metrics_table(&[]), "No data available");
    }

    #[test]
    fn test_rows_are_rendered() {
        let records = vec![AggregateRecord {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            project_id: "4974".to_string(),
            transaction_count: 3,
            total_volume_usd: 1234.5678,
        }];

        let rendered = render_metrics_table(&records);

        assert!(rendered.contains("Project ID"));
        assert!(rendered.contains("2024-04-02"));
        assert!(rendered.contains("4974"));
        assert!(rendered.contains("1234.57"));
    }
}
