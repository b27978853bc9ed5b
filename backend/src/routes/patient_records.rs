use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use blob_storage::BlobName;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    record_service::{Record, RecordService},
    types::AppError,
};

/// Path parameters of the record detail endpoint
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordPath {
    /// Name of the blob, e.g. `patient-000001`
    pub name: String,
}

/// Path parameters of the signed record endpoint
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SecureRecordPath {
    /// Name of the blob, e.g. `patient-000001`
    pub name: String,
    /// Any value; only selects the signed variant of the record
    pub flag: String,
}

/// List patient records
///
/// Returns one record per image in the container, in the store's listing order.
/// Records carry the unsigned image URI only.
///
/// # Errors
///
/// - `503 SERVICE_UNAVAILABLE` - The blob store could not be reached
/// - `500 INTERNAL_SERVER_ERROR` - The blob store rejected the listing
#[instrument(skip(record_service))]
pub async fn list_records(
    Extension(record_service): Extension<Arc<RecordService>>,
) -> Result<Json<Vec<Record>>, AppError> {
    let records = record_service.list_records().await?;
    Ok(Json(records))
}

/// Get a patient record
///
/// The image URI is derived from the name alone. The image is not looked up, so a
/// name with no image behind it still returns `200 OK`.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - The name is not a valid blob name
#[instrument(skip(record_service))]
pub async fn get_record(
    Extension(record_service): Extension<Arc<RecordService>>,
    Path(RecordPath { name }): Path<RecordPath>,
) -> Result<Json<Record>, AppError> {
    let name = BlobName::parse(name)?;
    Ok(Json(record_service.get_record(&name)))
}

/// Get a patient record with a signed token
///
/// Same as the plain record plus `sasToken`, a query string that grants read
/// access under the stored access policy when appended to `imageURI`.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - The name is not a valid blob name
/// - `500 INTERNAL_SERVER_ERROR` - No usable shared key credential is configured
#[instrument(skip(record_service, path), fields(name = %path.name))]
pub async fn get_secure_record(
    Extension(record_service): Extension<Arc<RecordService>>,
    Path(path): Path<SecureRecordPath>,
) -> Result<Json<Record>, AppError> {
    let name = BlobName::parse(path.name)?;
    let record = record_service.get_secure_record(&name)?;
    Ok(Json(record))
}
