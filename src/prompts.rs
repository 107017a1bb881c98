//! The extraction prompt and its field schema.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — label mappings, cleaning rules and the
//!    currency rule live in exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the template directly without
//!    calling a model, making prompt regressions easy to catch.
//!
//! [`build_prompt`] only produces a default. The operator may replace it
//! before submission (see [`crate::session::Session::set_prompt`]).

use serde_json::{Map, Value};

/// Every field the model is asked to fill, in template order.
pub const FIELD_NAMES: [&str; 26] = [
    "reviewer",
    "reviewee",
    "analyst",
    "analystMail",
    "analystPhone",
    "rating",
    "current_price",
    "target_price",
    "previous_target",
    "comments",
    "revenueFY24E",
    "ebitdaFY24E",
    "ebitdaMarginFY24E",
    "patFY24E",
    "revenueFY25E",
    "ebitdaFY25E",
    "ebitdaMarginFY25E",
    "patFY25E",
    "revenue3QFY24",
    "ebitda3QFY24",
    "ebitda3QFY24yoy",
    "ebitda3QFY24qoq",
    "ebitdaMargin3QFY24",
    "pat3QFY24",
    "pat3QFY24yoy",
    "pat3QFY24qoq",
];

/// Rate the model is told to use for USD amounts. Never applied in code.
pub const USD_TO_INR: f64 = 85.71;

/// Canonical comment for a retained rating.
pub const MAINTAIN_RATING_COMMENT: &str = "Maintain Rating";

const PREAMBLE: &str = "\nYou are a financial data extractor.\n\n\
From the content below, extract and return this JSON object:\n\n";

const RULES: &str = r#"

Accept label variations such as:
- Give the name of the company that has produced or written this review under the key "reviewer"
- Give the name of the company about which this report is written about under the key "reviewee"
- Give the full name of the analyst that written the report under the key "analyst". In case of multiple analysts, give only the first person.
- Give the email of the analyst under the key "analystMail". Include all special characters.
- Give the phone number of the analyst under the key "analystPhone". Include '+' and space in place of '-'.
- Extract stock rating terms like: buy, sell, hold, add, reduce, overweight, neutral under "rating"
- "CMP","Price Now","Current Market Price" → current_price
- "TP","Target","Target Price" → target_price
- "Previous TP","PT" → previous_target
- If "Retain/maintain rating" → comments = "Maintain Rating". If changed, write as "Rating changed to (new rating)"

Look for revenue/EBITDA/PAT values in tables with rows like:
- Revenue, Sales → revenueFY24E, revenueFY25E, revenue3QFY24
- EBITDA → ebitdaFY24E, ebitdaFY25E, ebitda3QFY24
- PAT, Profit after tax → patFY24E, patFY25E, pat3QFY24
- EBITDA margin, EBITDS margin % → ebitdaMarginFY24E, etc.
- YoY/QoQ fields → like "EBITDA YoY", "PAT QoQ"

Clean all values:
- Only keep digits, negative signs, or decimal points
- For example, "-1.2 3%(7)" → "-1.23"
"#;

const OUTPUT_RULES: &str = r#"
Return **only a valid JSON object**. Do not explain. Do not wrap in code blocks.

PDF Content:
""""#;

/// Render the empty JSON object listing every field, two-space indented.
pub fn schema_block() -> String {
    let fields = FIELD_NAMES
        .iter()
        .map(|name| format!("  \"{name}\": \"\""))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{{\n{fields}\n}}")
}

/// Build the default extraction prompt around the flattened PDF text.
///
/// Pure and deterministic: the same text always yields the same prompt, and
/// `text` appears in it verbatim.
pub fn build_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(text.len() + 4096);
    prompt.push_str(PREAMBLE);
    prompt.push_str(&schema_block());
    prompt.push_str(RULES);
    prompt.push_str(&format!(
        "\nIf value is in USD, convert it to INR (1 USD = {USD_TO_INR}) → then to billions\n"
    ));
    prompt.push_str(OUTPUT_RULES);
    prompt.push('\n');
    prompt.push_str(text);
    prompt.push_str("\n\"\"\"\n");
    prompt
}

/// Schema fields absent from a model answer.
///
/// The parser never rejects an answer for this; callers use it to warn.
pub fn missing_fields(data: &Map<String, Value>) -> Vec<&'static str> {
    FIELD_NAMES
        .iter()
        .copied()
        .filter(|name| !data.contains_key(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text_verbatim() {
        let text = "\n--- Page 1 Text ---\nRating: Buy, CMP: 100, TP: 150";
        let prompt = build_prompt(text);
        assert!(prompt.contains(text));
        assert!(prompt.contains(&format!("PDF Content:\n\"\"\"\n{text}\n\"\"\"")));
    }

    #[test]
    fn prompt_lists_every_field_with_empty_default() {
        let prompt = build_prompt("");
        for name in FIELD_NAMES {
            assert!(
                prompt.contains(&format!("\"{name}\": \"\"")),
                "missing field {name}"
            );
        }
    }

    #[test]
    fn schema_block_is_valid_json_with_all_fields() {
        let value: Value = serde_json::from_str(&schema_block()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), FIELD_NAMES.len());
        assert!(obj.values().all(|v| v == ""));
    }

    #[test]
    fn field_names_are_unique() {
        let mut names = FIELD_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELD_NAMES.len());
    }

    #[test]
    fn prompt_carries_rules() {
        let prompt = build_prompt("x");
        assert!(prompt.contains("1 USD = 85.71"));
        assert!(prompt.contains(MAINTAIN_RATING_COMMENT));
        assert!(prompt.contains("Rating changed to (new rating)"));
        assert!(prompt.contains("\"CMP\",\"Price Now\",\"Current Market Price\" → current_price"));
        assert!(prompt.contains("Only keep digits, negative signs, or decimal points"));
        assert!(prompt.contains("Do not wrap in code blocks"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("same"), build_prompt("same"));
    }

    #[test]
    fn missing_fields_reports_absent_keys_only() {
        let data: Map<String, Value> = serde_json::from_str(
            r#"{"rating": "Buy", "current_price": "100", "unexpected": "x"}"#,
        )
        .unwrap();
        let missing = missing_fields(&data);
        assert_eq!(missing.len(), FIELD_NAMES.len() - 2);
        assert!(!missing.contains(&"rating"));
        assert!(missing.contains(&"reviewer"));
    }
}
