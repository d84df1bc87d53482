//! Field mapping from extractor output onto [`ProductRecord`].
//!
//! Normalization is the only schema guarantee in the pipeline: stores persist
//! whatever they are handed, so every default is applied here.

use crate::error::LineError;
use crate::models::{
    BulletLine, CellValue, ProductRecord, RawRecord, TabularRow, UNKNOWN_LABEL, UNKNOWN_STOCK,
};

const CATEGORY_COLUMN: &str = "Category";
const BRAND_COLUMN: &str = "Brand";
const PRODUCT_NAME_COLUMN: &str = "Product Name";
const DESCRIPTION_COLUMNS: [&str; 2] = ["Full Description", "Description"];
const PRICE_COLUMN: &str = "Price";
const STOCK_COLUMN: &str = "Stock";

pub fn normalize(raw: &RawRecord) -> Result<ProductRecord, LineError> {
    match raw {
        RawRecord::Tabular(row) => normalize_row(row),
        RawRecord::Bullet(line) => Ok(normalize_bullet(line)),
    }
}

pub fn normalize_bullet(line: &BulletLine) -> ProductRecord {
    ProductRecord {
        category: label_or_unknown(Some(line.category.clone())),
        brand: label_or_unknown(Some(line.brand.clone())),
        product_name: line.product_name.clone(),
        description: line.description.clone(),
        price: line.price,
        stock: non_empty(Some(line.stock.clone())).unwrap_or_else(|| UNKNOWN_STOCK.to_string()),
    }
}

/// Fails only when the price cell holds text that is not a number.
pub fn normalize_row(row: &TabularRow) -> Result<ProductRecord, LineError> {
    let text = |name: &str| row.column(name).and_then(CellValue::as_text);

    let description = DESCRIPTION_COLUMNS
        .iter()
        .find_map(|&name| text(name))
        .unwrap_or_default();

    Ok(ProductRecord {
        category: label_or_unknown(text(CATEGORY_COLUMN)),
        brand: label_or_unknown(text(BRAND_COLUMN)),
        product_name: text(PRODUCT_NAME_COLUMN).unwrap_or_default(),
        description,
        price: price_from_cell(row.column(PRICE_COLUMN))?,
        stock: text(STOCK_COLUMN).unwrap_or_else(|| UNKNOWN_STOCK.to_string()),
    })
}

fn price_from_cell(cell: Option<&CellValue>) -> Result<f64, LineError> {
    match cell {
        None | Some(CellValue::Empty) | Some(CellValue::Bool(_)) => Ok(0.0),
        Some(CellValue::Number(value)) if value.is_finite() => Ok(*value),
        Some(CellValue::Number(value)) => Err(LineError::InvalidPrice(value.to_string())),
        Some(CellValue::Text(text)) if text.trim().is_empty() => Ok(0.0),
        Some(CellValue::Text(text)) => parse_price(text),
    }
}

/// Decimal price text. `NaN` and infinities are rejected since they cannot
/// be persisted as JSON numbers.
pub fn parse_price(text: &str) -> Result<f64, LineError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| LineError::InvalidPrice(text.to_string()))
}

fn label_or_unknown(value: Option<String>) -> String {
    non_empty(value)
        .map(|label| label.to_lowercase())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
