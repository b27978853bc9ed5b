mod docs;
mod health;
/// Patient record handlers
pub mod patient_records;

use aide::axum::{routing::get, ApiRouter};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route(
            "/api/patientrecords",
            get(patient_records::list_records),
        )
        .api_route(
            "/api/patientrecords/{name}",
            get(patient_records::get_record),
        )
        .api_route(
            "/api/patientrecords/{name}/{flag}",
            get(patient_records::get_secure_record),
        )
}
