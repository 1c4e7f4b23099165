use chrono::{DateTime, Local};
use serde::Serialize;

/// The single "stock found" edge of a monitoring run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockEvent {
    candidate_count: usize,
    names: Vec<String>,
    timestamp: DateTime<Local>,
}

impl StockEvent {
    pub(crate) fn new(candidate_count: usize, names: Vec<String>, timestamp: DateTime<Local>) -> Self {
        debug_assert!(candidate_count >= 1);
        Self {
            candidate_count,
            names,
            timestamp,
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Display names that could be recovered; may be shorter than the count.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn message(&self) -> String {
        let items = if self.names.is_empty() {
            "(product names unavailable)".to_string()
        } else {
            self.names
                .iter()
                .map(|name| format!("・{}", name))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "🎯 Restock detected!\n\n✅ Purchasable items: {}\n\n📦 Items:\n{}\n\n🕐 {}\n🛒 Starting automated checkout...",
            self.candidate_count,
            items,
            self.timestamp.format("%Y/%m/%d %H:%M:%S"),
        )
    }

    pub fn screenshot_file_name(&self) -> String {
        format!("stock_found_{}.png", self.timestamp.format("%Y%m%d_%H%M%S"))
    }
}
