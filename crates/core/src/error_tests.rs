use super::*;

#[test]
fn http_status_mapping_matches_taxonomy() {
    assert_eq!(ErrorCode::UnknownTarget.http_status(), 404);
    assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
    assert_eq!(ErrorCode::PathEscape.http_status(), 400);
    assert_eq!(ErrorCode::UnavailableDependency.http_status(), 503);
}

#[test]
fn classify_recovers_service_error_through_context_chain() {
    let base: anyhow::Error = ServiceError::new(ErrorCode::PathEscape, "outside root").into();
    let wrapped = base.context("resolving artifact path");
    let (code, detail) = classify(&wrapped);
    assert_eq!(code, ErrorCode::PathEscape);
    assert_eq!(detail, "outside root");
}

#[test]
fn classify_falls_back_to_internal() {
    let err = anyhow::anyhow!("something unexpected");
    let (code, _) = classify(&err);
    assert_eq!(code, ErrorCode::Internal);
}
