use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use bill_capture_core::auth::UserRecord;
use bill_capture_core::contract::Bill;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::block_on;
use crate::adapters::repository::{
    BillPage, BillRepository, CategorySource, StartKey, UserRepository,
};
use crate::adapters::AdapterError;

type Item = HashMap<String, AttributeValue>;

pub struct DynamoBillTable {
    table: String,
    client: aws_sdk_dynamodb::Client,
}

impl DynamoBillTable {
    pub fn new(table: impl Into<String>, sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            table: table.into(),
            client: aws_sdk_dynamodb::Client::new(sdk_config),
        }
    }
}

impl BillRepository for DynamoBillTable {
    fn put_bill(&self, bill: &Bill) -> Result<(), AdapterError> {
        let item = to_item(bill)?;
        let request = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item));
        block_on(async move { request.send().await })
            .map(|_| ())
            .map_err(|error| database_error("put bill", error))
    }

    fn get_bill(&self, bill_id: &str) -> Result<Option<Bill>, AdapterError> {
        let request = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("billId", AttributeValue::S(bill_id.to_string()));
        let output = block_on(async move { request.send().await })
            .map_err(|error| database_error("get bill", error))?;
        output.item().map(from_item).transpose()
    }

    fn scan_bills_by_user(
        &self,
        user_id: &str,
        limit: usize,
        start_key: Option<&StartKey>,
    ) -> Result<BillPage, AdapterError> {
        let request = self
            .client
            .scan()
            .table_name(&self.table)
            .filter_expression("userId = :userId")
            .expression_attribute_values(":userId", AttributeValue::S(user_id.to_string()))
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .set_exclusive_start_key(start_key.map(start_key_item));
        let output = block_on(async move { request.send().await })
            .map_err(|error| database_error("scan bills", error))?;

        let bills = output
            .items()
            .iter()
            .map(from_item)
            .collect::<Result<Vec<Bill>, _>>()?;
        Ok(BillPage {
            bills,
            last_evaluated_key: output.last_evaluated_key().map(item_start_key),
        })
    }

    fn find_bill(&self, bill_id: &str) -> Result<Option<Bill>, AdapterError> {
        scan_first_match(&self.client, &self.table, "billId = :billId", (":billId", bill_id))?
            .as_ref()
            .map(from_item)
            .transpose()
    }
}

pub struct DynamoUserTable {
    table: String,
    client: aws_sdk_dynamodb::Client,
}

impl DynamoUserTable {
    pub fn new(table: impl Into<String>, sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            table: table.into(),
            client: aws_sdk_dynamodb::Client::new(sdk_config),
        }
    }
}

impl UserRepository for DynamoUserTable {
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AdapterError> {
        scan_first_match(&self.client, &self.table, "email = :email", (":email", email))?
            .as_ref()
            .map(from_item)
            .transpose()
    }

    fn insert_user(&self, user: &UserRecord) -> Result<(), AdapterError> {
        let request = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(user)?))
            .condition_expression("attribute_not_exists(userId)");
        block_on(async move { request.send().await })
            .map(|_| ())
            .map_err(|error| database_error("insert user", error))
    }

    fn record_login(&self, user_id: &str, at: &str) -> Result<(), AdapterError> {
        let request = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .update_expression("SET lastLogin = :at, updatedAt = :at")
            .expression_attribute_values(":at", AttributeValue::S(at.to_string()));
        block_on(async move { request.send().await })
            .map(|_| ())
            .map_err(|error| database_error("record login", error))
    }
}

/// Category names from the `categoryName` attribute.
pub struct DynamoCategoryTable {
    table: String,
    client: aws_sdk_dynamodb::Client,
}

impl DynamoCategoryTable {
    pub fn new(table: impl Into<String>, sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            table: table.into(),
            client: aws_sdk_dynamodb::Client::new(sdk_config),
        }
    }
}

impl CategorySource for DynamoCategoryTable {
    fn category_names(&self) -> Result<Vec<String>, AdapterError> {
        let request = self
            .client
            .scan()
            .table_name(&self.table)
            .projection_expression("categoryName");
        let output = block_on(async move { request.send().await })
            .map_err(|error| database_error("scan categories", error))?;
        Ok(output
            .items()
            .iter()
            .filter_map(|item| match item.get("categoryName") {
                Some(AttributeValue::S(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}

/// Filtered scan that follows pagination until the first page with a match.
fn scan_first_match(
    client: &aws_sdk_dynamodb::Client,
    table: &str,
    filter: &str,
    (placeholder, value): (&str, &str),
) -> Result<Option<Item>, AdapterError> {
    let mut start_key: Option<Item> = None;
    loop {
        let request = client
            .scan()
            .table_name(table)
            .filter_expression(filter)
            .expression_attribute_values(placeholder, AttributeValue::S(value.to_string()))
            .set_exclusive_start_key(start_key.take());
        let output = block_on(async move { request.send().await })
            .map_err(|error| database_error("scan", error))?;

        if let Some(item) = output.items().first() {
            return Ok(Some(item.clone()));
        }
        match output.last_evaluated_key() {
            Some(key) => start_key = Some(key.clone()),
            None => return Ok(None),
        }
    }
}

fn database_error(operation: &str, error: impl std::fmt::Display) -> AdapterError {
    AdapterError::Database(format!("failed to {operation}: {error}"))
}

fn start_key_item(key: &StartKey) -> Item {
    key.iter()
        .map(|(name, value)| (name.clone(), AttributeValue::S(value.clone())))
        .collect()
}

/// Only string key attributes survive; both tables use string keys.
fn item_start_key(item: &Item) -> StartKey {
    item.iter()
        .filter_map(|(name, value)| match value {
            AttributeValue::S(text) => Some((name.clone(), text.clone())),
            _ => None,
        })
        .collect()
}

pub fn to_item<T: Serialize>(record: &T) -> Result<Item, AdapterError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields
            .into_iter()
            .map(|(name, value)| (name, to_attribute(value)))
            .collect()),
        Ok(_) => Err(AdapterError::Database(
            "record did not serialize to a map".to_string(),
        )),
        Err(error) => Err(database_error("encode record", error)),
    }
}

pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T, AdapterError> {
    let fields: Map<String, Value> = item
        .iter()
        .map(|(name, value)| (name.clone(), from_attribute(value)))
        .collect();
    serde_json::from_value(Value::Object(fields)).map_err(|error| database_error("decode record", error))
}

fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .into_iter()
                .map(|(name, value)| (name, to_attribute(value)))
                .collect(),
        ),
    }
}

fn from_attribute(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(text) => parse_number(text),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::L(values) => Value::Array(values.iter().map(from_attribute).collect()),
        AttributeValue::M(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), from_attribute(value)))
                .collect(),
        ),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => Value::Array(values.iter().map(|n| parse_number(n)).collect()),
        _ => Value::Null,
    }
}

fn parse_number(text: &str) -> Value {
    if let Ok(whole) = text.parse::<u64>() {
        return Value::from(whole);
    }
    if let Ok(signed) = text.parse::<i64>() {
        return Value::from(signed);
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}
