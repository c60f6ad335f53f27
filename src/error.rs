//! Error type shared by the core and the browser host

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug)]
pub enum SnowError {
    /// No overlay canvas or 2D context could be obtained.
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// Session storage missing or refusing writes.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JavaScript error: {0}")]
    JavaScript(String),
}

impl From<JsValue> for SnowError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .unwrap_or_else(|| format!("{value:?}"));
        SnowError::JavaScript(message)
    }
}

impl From<SnowError> for JsValue {
    fn from(err: SnowError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub type SnowResult<T> = Result<T, SnowError>;
