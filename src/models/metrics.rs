use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily per-project totals, unique per (date, project_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub date: NaiveDate,
    pub project_id: String,
    pub transaction_count: u64,
    pub total_volume_usd: f64,
}

/// Query parameters for GET /metrics
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsQuery {
    pub date: Option<String>, // YYYY-MM-DD format
}

impl MetricsQuery {
    /// Validates and parses the `date` parameter
    pub fn parse_date(&self) -> Result<NaiveDate, String> {
        let raw = match self.date.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return Err("Missing 'date' query parameter".to_string()),
        };

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date format: '{}'. Use YYYY-MM-DD.", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_valid() {
        let query = MetricsQuery {
            date: Some("2024-04-02".to_string()),
        };
        assert_eq!(
            query.parse_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
        );
    }

    #[test]
    fn test_parse_date_missing() {
        let query = MetricsQuery { date: None };
        assert!(query.parse_date().unwrap_err().contains("Missing"));

        let query = MetricsQuery {
            date: Some("  ".to_string()),
        };
        assert!(query.parse_date().unwrap_err().contains("Missing"));
    }

    #[test]
    fn test_parse_date_malformed() {
        let query = MetricsQuery {
            date: Some("02-04-2024".to_string()),
        };
        assert!(query.parse_date().unwrap_err().contains("Invalid date format"));
    }

    #[test]
    fn test_aggregate_record_json_shape() {
        let record = AggregateRecord {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            project_id: "4974".to_string(),
            transaction_count: 3,
            total_volume_usd: 12.5,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-04-02");
        assert_eq!(json["project_id"], "4974");
        assert_eq!(json["transaction_count"], 3);
        assert_eq!(json["total_volume_usd"], 12.5);
    }
}
