//! Prompt construction, reply parsing and fallback for item categorization.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::contract::{CategorizedItem, ReceiptItem, DEFAULT_CATEGORIES, DEFAULT_CATEGORY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategorizationError {
    #[error("no content in categorizer reply")]
    NoContent,
    #[error("invalid JSON in categorizer reply: {0}")]
    InvalidJson(String),
    #[error("unexpected data structure in categorizer reply")]
    UnexpectedShape,
}

/// Trims and de-duplicates configured category names, falling back to the
/// built-in list when none are configured.
pub fn category_list(names: Vec<String>) -> Vec<String> {
    let mut categories: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || categories
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(trimmed))
        {
            continue;
        }
        categories.push(trimmed.to_string());
    }

    if categories.is_empty() {
        DEFAULT_CATEGORIES.iter().map(|name| name.to_string()).collect()
    } else {
        categories
    }
}

pub fn build_prompt(items: &[ReceiptItem], categories: &[String]) -> String {
    let items_json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Given the following list of grocery items and these categories: {},\n\
         assign each item to the most appropriate category.\n\n\
         Items:\n{items_json}\n\n\
         Return a JSON array with each item having these properties: itemName, itemPrice, and category.",
        categories.join(", ")
    )
}

fn array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("static regex is valid"))
}

fn object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"))
}

/// Parses the model's reply. The JSON may be wrapped in prose or code fences;
/// the outermost array wins, then the outermost object with an `items` array.
pub fn parse_categorized_reply(content: &str) -> Result<Vec<CategorizedItem>, CategorizationError> {
    if content.trim().is_empty() {
        return Err(CategorizationError::NoContent);
    }

    let candidate = array_pattern()
        .find(content)
        .or_else(|| object_pattern().find(content))
        .map(|found| found.as_str())
        .unwrap_or(content);

    let parsed: Value = serde_json::from_str(candidate)
        .map_err(|error| CategorizationError::InvalidJson(error.to_string()))?;

    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(CategorizationError::UnexpectedShape),
        },
        _ => return Err(CategorizationError::UnexpectedShape),
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<CategorizedItem>(item)
                .map_err(|error| CategorizationError::InvalidJson(error.to_string()))
        })
        .collect()
}

/// Every item in the default category.
pub fn fallback_categories(items: &[ReceiptItem]) -> Vec<CategorizedItem> {
    items
        .iter()
        .map(|item| CategorizedItem {
            item_name: item.item_name.clone(),
            item_price: item.item_price.clone(),
            category: DEFAULT_CATEGORY.to_string(),
        })
        .collect()
}

/// Lines the model's suggestions up with the extracted items. Suggestions are
/// matched by item name first and by position second; any category outside
/// the allowed list becomes the default. Names and prices always come from the
/// extracted items.
pub fn reconcile(
    items: &[ReceiptItem],
    suggestions: &[CategorizedItem],
    categories: &[String],
) -> Vec<CategorizedItem> {
    let mut used = vec![false; suggestions.len()];

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let by_name = suggestions.iter().enumerate().position(|(candidate, suggestion)| {
                !used[candidate]
                    && suggestion
                        .item_name
                        .trim()
                        .eq_ignore_ascii_case(item.item_name.trim())
            });
            let chosen = by_name.or_else(|| (index < suggestions.len() && !used[index]).then_some(index));

            let category = chosen
                .map(|position| {
                    used[position] = true;
                    canonical_category(&suggestions[position].category, categories)
                })
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

            CategorizedItem {
                item_name: item.item_name.clone(),
                item_price: item.item_price.clone(),
                category,
            }
        })
        .collect()
}

fn canonical_category(suggested: &str, categories: &[String]) -> String {
    categories
        .iter()
        .find(|allowed| allowed.eq_ignore_ascii_case(suggested.trim()))
        .cloned()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
