use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub const UNKNOWN_LABEL: &str = "unknown";
pub const UNKNOWN_STOCK: &str = "Unknown";

/// Canonical product shape handed to every document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub category: String,
    pub brand: String,
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    pub stock: String,
}

impl ProductRecord {
    /// Upsert key: `<category>_<product name with spaces as underscores>`.
    pub fn identifier(&self) -> String {
        format!("{}_{}", self.category, self.product_name.replace(' ', "_"))
    }

    /// Single-line text that gets embedded for similarity search.
    pub fn document_text(&self) -> String {
        format!(
            "{}: {}, Price: ${}, {}",
            self.product_name, self.description, self.price, self.stock
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual form of the cell; whole numbers render without a fraction so
    /// a product name of `12345` stays `"12345"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(value) => Some(format_number(*value)),
            CellValue::Bool(value) => Some(value.to_string()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One spreadsheet row keyed by its header cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularRow {
    pub row_number: usize,
    pub columns: BTreeMap<String, CellValue>,
}

impl TabularRow {
    /// Header lookup ignoring case and surrounding whitespace.
    pub fn column(&self, name: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .find(|(header, _)| header.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

/// Fields split out of a `- <brand> <name>: <description>, Price: $<n>, <stock>` line.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletLine {
    pub category: String,
    pub brand: String,
    pub product_name: String,
    pub description: String,
    pub price: f64,
    pub stock: String,
}

/// Extractor output before field mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Tabular(TabularRow),
    Bullet(BulletLine),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Spreadsheet,
    Pdf,
}

impl CatalogKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("xlsx") {
            Some(CatalogKind::Spreadsheet)
        } else if extension.eq_ignore_ascii_case("pdf") {
            Some(CatalogKind::Pdf)
        } else {
            None
        }
    }
}

/// What the store persists per product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub id: String,
    pub document: String,
    pub record: ProductRecord,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub record: ProductRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSummary {
    pub indexed: usize,
    pub failures: Vec<RecordFailure>,
}

/// External listing returned by the web-search collaborator. The provider's
/// fields vary, so they are kept as a raw map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OnlineListing {
    pub fields: Map<String, Value>,
}

impl OnlineListing {
    pub fn title(&self) -> Option<&str> {
        ["product_name", "title"]
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
    }

    pub fn price(&self) -> Option<String> {
        let value = self
            .fields
            .get("price")
            .or_else(|| {
                self.fields
                    .get("primary_offer")
                    .and_then(|offer| offer.get("offer_price"))
            })?;

        match value {
            Value::Number(number) => Some(number.to_string()),
            Value::String(text) => Some(text.trim_start_matches('$').to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub category_headings: Vec<String>,
    pub recursive: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            category_headings: [
                "Smartphones",
                "Laptops",
                "Tablets",
                "TVs",
                "Wearables",
                "Smart Home Devices",
                "Gaming Consoles",
                "Cameras",
                "Audio Devices",
            ]
            .iter()
            .map(|heading| heading.to_string())
            .collect(),
            recursive: false,
        }
    }
}
