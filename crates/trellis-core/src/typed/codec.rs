//! RowCodec - 型付きレコードと JSON 行の相互変換

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Collection, Row};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("value does not serialize to a JSON object")]
    NotAnObject,

    #[error("row json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("change notification carries no row")]
    MissingRow,

    #[error("row has no id")]
    MissingId,

    #[error("change for {actual} delivered to a {expected} subscriber")]
    WrongCollection {
        expected: Collection,
        actual: Collection,
    },
}

pub struct RowCodec;

impl RowCodec {
    pub fn encode<T: Serialize>(value: &T) -> Result<Row, CodecError> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(row) => Ok(row),
            _ => Err(CodecError::NotAnObject),
        }
    }

    pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, CodecError> {
        Ok(serde_json::from_value(serde_json::Value::Object(row))?)
    }
}
