//! Instruction-set strategies for vendors whose documents arrive as
//! unstructured text (typed or scanned PDFs, word-processor files).
//!
//! Each strategy is a prose instruction set handed to the delegated
//! extraction capability, encoding the formatting quirks of that vendor's
//! documents: fused row numbers, identifier formats, where the real
//! quantity column sits. Whether these heuristics should instead be
//! promoted to deterministic parsers is an open trade-off; keeping them as
//! instructions tolerates format drift at the cost of determinism, and the
//! zepto vendor shows the hybrid (a deterministic strategy handles its
//! spreadsheets, this one its PDFs).

use anyhow::Result;
use async_trait::async_trait;

use crate::extractor::LineItemExtractor;
use crate::models::ExtractionResult;
use crate::normalize::{ContentShape, NormalizedContent};
use crate::strategy::{expect_text, VendorStrategy};

/// Shared extraction rules, prepended to every vendor instruction set and
/// used alone by the generic fallback.
pub(crate) const BASE_INSTRUCTIONS: &str = "\
Extract every product line item from this procurement document. Read the entire \
document; check tables, lists, and summary sections. The product code is the primary \
identifier: extract it exactly as written (digits, letters, dashes). Extract the product \
name exactly as written. Extract the specific quantity for each row; quantities usually \
sit in a column labelled Qty, Quantity, Stock, or Closing. If the same code appears with \
different names, or the same product appears more than once, return every occurrence as \
its own entry. Better to extract too many rows than to miss one.";

/// A vendor strategy that delegates to the extraction capability with a
/// fixed instruction set.
pub struct DelegatedStrategy {
    vendor: &'static str,
    description: &'static str,
    instructions: String,
}

#[async_trait]
impl VendorStrategy for DelegatedStrategy {
    fn vendor(&self) -> &str {
        self.vendor
    }

    fn description(&self) -> &str {
        self.description
    }

    fn supports(&self, shape: ContentShape) -> bool {
        shape == ContentShape::Text
    }

    async fn extract(
        &self,
        content: &NormalizedContent,
        extractor: &dyn LineItemExtractor,
    ) -> Result<ExtractionResult> {
        let text = expect_text(content)?;
        let mut result = extractor.extract(&self.instructions, text).await?;
        result
            .header_info
            .insert("extraction_method".to_string(), "delegated".to_string());
        result
            .header_info
            .insert("extractor".to_string(), extractor.name().to_string());
        Ok(result)
    }
}

impl DelegatedStrategy {
    fn new(vendor: &'static str, description: &'static str, specifics: &str) -> Self {
        Self {
            vendor,
            description,
            instructions: format!("{}\n\n{}", BASE_INSTRUCTIONS, specifics),
        }
    }

    /// The full instruction set, for inspection and tests.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

/// Blinkit POs: vertical PDF text where the serial row number fuses onto
/// the item code and has to be split back off.
pub fn blinkit() -> DelegatedStrategy {
    DelegatedStrategy::new(
        "blinkit",
        "Blinkit PO documents (row number fused to item code)",
        "BLINKIT DOCUMENTS: the text often runs the serial row number into the item code. \
A value like \"1100028\" on the first row is row number 1 followed by item code 100028; \
\"10101119\" on the tenth row is row 10 followed by 101119. Always strip the leading \
integer when it matches the running row count; the remaining item code is usually 6-7 \
digits. Do not assume one shared quantity for all rows: find each row's own value in the \
column labelled O/S Qty or PO Qty, after the product description. Names follow the \
pattern Brand + Product + Weight, e.g. \"Mother's Recipe Appalam Papad (100 g)\". \
13-digit numbers starting 890 are EAN codes; include them in the description if present.",
    )
}

/// DMart POs: clean tables keyed by 13-digit EANs.
pub fn dmart() -> DelegatedStrategy {
    DelegatedStrategy::new(
        "dmart",
        "DMart PO documents (EAN-keyed tables)",
        "DMART DOCUMENTS: each item line carries a 13-digit EAN starting with 890 \
(e.g. 8906001051602); use it as the identifier. The product name follows the EAN \
(e.g. \"MOTHERS POTATO PAPAD-70G\"); remove any attached \"[HSN Code: ...]\" fragment \
from the name. The quantity is the large integer following the unit marker EA or CS \
(e.g. \"EA 4800\" means quantity 4800). The unit price is the L.Price value near the \
end of the line.",
    )
}

/// Zepto POs rendered as PDFs: numeric material code fused directly onto
/// the product name.
pub fn zepto() -> DelegatedStrategy {
    DelegatedStrategy::new(
        "zepto",
        "Zepto PO documents (material code fused to product name)",
        "ZEPTO DOCUMENTS: the text often fuses the numeric material code onto the product \
name, e.g. \"101446Eastern Chilli Powder\". Split it: identifier 101446, name \"Eastern \
Chilli Powder...\". The 7-digit material code is the primary identifier; a 13-digit EAN \
starting 890 may also appear later in the block and belongs in the description. For the \
quantity, prefer the tabular quantity column value (e.g. 160 or 40.00) over pack counts \
mentioned inside the description.",
    )
}

/// Swiggy POs: short numeric item codes at the start of each logical row.
pub fn swiggy() -> DelegatedStrategy {
    DelegatedStrategy::new(
        "swiggy",
        "Swiggy PO documents (5-7 digit item codes)",
        "SWIGGY DOCUMENTS: each logical row starts with a 5-7 digit item code (e.g. 11531 \
or 217762); use it as the identifier. The product name follows the code, often with a \
weight suffix (e.g. \"Mtr Upma Breakfast Mix 160.0 g\"). The quantity is the integer \
after the name and HSN code. The unit price is the Unit Base Cost value, which appears \
after the MRP. Ignore generic \"Colour: Size: size\" metadata lines.",
    )
}
