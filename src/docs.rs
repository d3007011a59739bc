//! OpenAPI document served at `/openapi.json`.

use crate::error::ValidationIssue;
use crate::handlers::common::{HealthBody, ReadyBody, VersionBody};
use crate::normalizer::{ErrorBody, ErrorDetails};
use crate::response::PageMeta;
use crate::service::prescriptions::{Medication, Prescription, PrescriptionPayload};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic API",
        description = "Profiles of admins, doctors and patients, and prescriptions."
    ),
    paths(
        crate::handlers::common::health,
        crate::handlers::common::ready,
        crate::handlers::common::version,
        crate::handlers::profiles::list,
        crate::handlers::profiles::read,
        crate::handlers::profiles::update,
        crate::handlers::profiles::delete,
        crate::handlers::profiles::soft_delete,
        crate::handlers::prescriptions::create,
        crate::handlers::prescriptions::list,
        crate::handlers::prescriptions::read,
    ),
    components(schemas(
        ErrorBody,
        ErrorDetails,
        ValidationIssue,
        PageMeta,
        Medication,
        Prescription,
        PrescriptionPayload,
        HealthBody,
        ReadyBody,
        VersionBody
    )),
    tags(
        (name = "profiles", description = "Admin, doctor and patient records"),
        (name = "prescriptions", description = "Prescriptions"),
        (name = "health", description = "Service probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/ready",
            "/version",
            "/api/v1/{model}",
            "/api/v1/{model}/{id}",
            "/api/v1/{model}/soft/{id}",
            "/api/v1/prescription",
            "/api/v1/prescription/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn error_envelope_schema_is_registered() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.expect("components").schemas;
        assert!(schemas.contains_key("ErrorBody"));
        assert!(schemas.contains_key("Prescription"));
    }
}
