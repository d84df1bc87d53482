use crate::error::{IngestError, LineError};
use crate::models::{BulletLine, CatalogOptions};
use crate::normalize::parse_price;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

const BULLET_MARKER: &str = "- ";
const NAME_SEPARATOR: &str = ": ";
const PRICE_MARKER: &str = ", Price: $";
const STOCK_SEPARATOR: &str = ", ";

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

/// A line that produced no record, with its position for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLine {
    pub page: u32,
    pub line: String,
    pub error: LineError,
}

#[derive(Debug, Default)]
pub struct PageParse {
    pub entries: Vec<BulletLine>,
    pub rejected: Vec<RejectedLine>,
}

/// Walks catalog text line by line. A heading line from the configured set
/// switches the category for every following bullet, across page breaks,
/// until the next heading.
pub struct CatalogTextParser<'a> {
    options: &'a CatalogOptions,
    current_category: Option<String>,
}

impl<'a> CatalogTextParser<'a> {
    pub fn new(options: &'a CatalogOptions) -> Self {
        Self {
            options,
            current_category: None,
        }
    }

    pub fn current_category(&self) -> Option<&str> {
        self.current_category.as_deref()
    }

    pub fn parse_pages(mut self, pages: &[PageText]) -> PageParse {
        let mut parsed = PageParse::default();
        for page in pages {
            self.parse_page_into(page, &mut parsed);
        }
        parsed
    }

    fn parse_page_into(&mut self, page: &PageText, parsed: &mut PageParse) {
        for raw_line in page.text.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(heading) = self.match_heading(line) {
                debug!(page = page.number, category = %heading, "category heading");
                self.current_category = Some(heading);
                continue;
            }

            match self.parse_line(line) {
                Ok(entry) => parsed.entries.push(entry),
                // Prose between entries is expected; only broken bullets are reported.
                Err(LineError::NotABullet) => {}
                Err(error) => parsed.rejected.push(RejectedLine {
                    page: page.number,
                    line: line.to_string(),
                    error,
                }),
            }
        }
    }

    fn match_heading(&self, line: &str) -> Option<String> {
        self.options
            .category_headings
            .iter()
            .find(|heading| heading.as_str() == line)
            .map(|heading| heading.to_lowercase())
    }

    pub fn parse_line(&self, line: &str) -> Result<BulletLine, LineError> {
        let body = line.strip_prefix(BULLET_MARKER).ok_or(LineError::NotABullet)?;
        let category = self.current_category.clone().ok_or(LineError::NoCategory)?;
        parse_bullet(body, category)
    }
}

/// Anchored splits over the text after the bullet marker.
pub fn parse_bullet(body: &str, category: String) -> Result<BulletLine, LineError> {
    let (name_part, details) = body
        .split_once(NAME_SEPARATOR)
        .ok_or(LineError::MissingNameSeparator)?;
    let (description, price_stock) = details
        .split_once(PRICE_MARKER)
        .ok_or(LineError::MissingPriceMarker)?;
    let (price_text, stock) = price_stock
        .split_once(STOCK_SEPARATOR)
        .ok_or(LineError::MissingStock)?;

    // The product name may be empty when the name part is a single word.
    let mut tokens = name_part.split_whitespace();
    let brand = tokens.next().unwrap_or_default().to_string();
    let product_name = tokens.collect::<Vec<_>>().join(" ");
    let price = parse_price(price_text)?;

    Ok(BulletLine {
        category,
        brand,
        product_name,
        description: description.trim().to_string(),
        price,
        stock: stock.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: text.to_string(),
        }
    }

    #[test]
    fn bullet_under_heading_is_split_into_fields() {
        let options = CatalogOptions::default();
        let parsed = CatalogTextParser::new(&options).parse_pages(&[page(
            1,
            "Smartphones\n- Samsung Galaxy S24: 128GB Storage, Price: $699, In Stock\n",
        )]);

        assert!(parsed.rejected.is_empty());
        assert_eq!(
            parsed.entries,
            vec![BulletLine {
                category: "smartphones".to_string(),
                brand: "Samsung".to_string(),
                product_name: "Galaxy S24".to_string(),
                description: "128GB Storage".to_string(),
                price: 699.0,
                stock: "In Stock".to_string(),
            }]
        );
    }

    #[test]
    fn bullet_before_any_heading_yields_nothing() {
        let options = CatalogOptions::default();
        let parsed = CatalogTextParser::new(&options).parse_pages(&[page(
            1,
            "- Samsung Galaxy S24: 128GB Storage, Price: $699, In Stock",
        )]);

        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].error, LineError::NoCategory);
    }

    #[test]
    fn malformed_bullet_does_not_stop_following_lines() {
        let options = CatalogOptions::default();
        let text = "Laptops\n\
                    - Dell XPS 13: 16GB RAM, $999, In Stock\n\
                    - Apple MacBook Air M3: 8GB RAM, Price: $1099, 5 units\n";
        let parsed = CatalogTextParser::new(&options).parse_pages(&[page(3, text)]);

        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].product_name, "MacBook Air M3");
        assert_eq!(parsed.entries[0].stock, "5 units");
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].page, 3);
        assert_eq!(parsed.rejected[0].error, LineError::MissingPriceMarker);
    }

    #[test]
    fn category_carries_across_pages_until_next_heading() {
        let options = CatalogOptions::default();
        let parsed = CatalogTextParser::new(&options).parse_pages(&[
            page(1, "Tablets\n- Apple iPad Air: 11 inch, Price: $599, In Stock"),
            page(2, "- Samsung Galaxy Tab S9: AMOLED, Price: $799.99, Out of Stock"),
            page(3, "Cameras\n- Canon EOS R8: Full frame, Price: $1499, 2 units"),
        ]);

        let categories: Vec<_> = parsed
            .entries
            .iter()
            .map(|entry| entry.category.as_str())
            .collect();
        assert_eq!(categories, vec!["tablets", "tablets", "cameras"]);
        assert_eq!(parsed.entries[1].price, 799.99);
    }

    #[test]
    fn prose_lines_are_ignored_silently() {
        let options = CatalogOptions::default();
        let parsed = CatalogTextParser::new(&options)
            .parse_pages(&[page(1, "Spring Catalog 2024\nTVs\nAll prices in USD")]);

        assert!(parsed.entries.is_empty());
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn bullet_grammar_reports_each_failed_split() {
        let category = || "tvs".to_string();
        assert_eq!(
            parse_bullet("LG OLED C3 no details", category()),
            Err(LineError::MissingNameSeparator)
        );
        assert_eq!(
            parse_bullet("LG OLED C3: 55 inch, Price: $1299", category()),
            Err(LineError::MissingStock)
        );
        assert_eq!(
            parse_bullet("LG OLED C3: 55 inch, Price: $1,299.00, In Stock", category()),
            Err(LineError::InvalidPrice("1,299.00".to_string()))
        );
    }

    #[test]
    fn non_finite_prices_are_rejected() {
        let category = || "tvs".to_string();
        assert_eq!(
            parse_bullet("Acme Widget: thing, Price: $NaN, In Stock", category()),
            Err(LineError::InvalidPrice("NaN".to_string()))
        );
        assert_eq!(
            parse_bullet("Acme Widget: thing, Price: $inf, In Stock", category()),
            Err(LineError::InvalidPrice("inf".to_string()))
        );
        assert_eq!(
            parse_bullet("Acme Widget: thing, Price: $-infinity, In Stock", category()),
            Err(LineError::InvalidPrice("-infinity".to_string()))
        );
    }

    #[test]
    fn single_word_name_keeps_the_line_with_empty_product_name() -> Result<(), LineError> {
        let entry = parse_bullet("Apple: iPad, Price: $1, In Stock", "tablets".to_string())?;
        assert_eq!(entry.brand, "Apple");
        assert_eq!(entry.product_name, "");
        assert_eq!(entry.description, "iPad");
        assert_eq!(entry.price, 1.0);
        Ok(())
    }

    #[test]
    fn description_may_contain_commas() -> Result<(), LineError> {
        let entry = parse_bullet(
            "Sony WH-1000XM5: Noise cancelling, 30h battery, Price: $349.99, In Stock",
            "audio devices".to_string(),
        )?;
        assert_eq!(entry.brand, "Sony");
        assert_eq!(entry.product_name, "WH-1000XM5");
        assert_eq!(entry.description, "Noise cancelling, 30h battery");
        assert_eq!(entry.price, 349.99);
        Ok(())
    }

    #[test]
    fn unreadable_pdf_is_a_document_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        assert!(matches!(
            extract_page_texts(&path),
            Err(IngestError::PdfParse(_))
        ));
        Ok(())
    }
}
