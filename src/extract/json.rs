use anyhow::Context as AnyhowCtx;
use serde::de::DeserializeOwned;
use std::ops::{Deref, DerefMut};

use super::{ExtractionError, FromRequest};
use crate::request::Request;
use crate::result::Result;

/// Extracts the request body and parses it using [`serde`]
///
/// `Json` is also a response type, returning `Json(value)` from a handler answers with a 200
/// status and the serialized value as body.
///
/// ```rust
/// use bulkedit::extract::Json;
/// use bulkedit::response::status;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Flobbit {
///     flerbies: u32,
/// }
///
/// fn create(Json(flobbit): Json<Flobbit>) -> (u16, Json<Flobbit>) {
///     (status::CREATED, Json(flobbit))
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> FromRequest for Json<T> {
    fn from_request(request: &Request) -> Result<Self> {
        let value = T::deserialize(request.body())
            .with_context(|| {
                format!(
                    "Failed to deserialize request body into {}",
                    std::any::type_name::<T>()
                )
            })
            .map_err(ExtractionError::from)?;
        Ok(Json(value))
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
