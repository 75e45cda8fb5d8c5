//! Unit tests for backend request construction and validation.

use camino::Utf8PathBuf;
use hmara::{BackendError, ImageUpload, NewStack};
use tempfile::TempDir;

const MINIMAL_TEMPLATE: &str = r#"{"heat_template_version": "2013-05-23", "resources": {}}"#;

#[test]
fn stack_request_parses_template() {
    let stack = NewStack::from_template_str(" lab ", MINIMAL_TEMPLATE).expect("valid stack");

    assert_eq!(stack.name, "lab");
    assert_eq!(stack.template["heat_template_version"], "2013-05-23");
}

#[test]
fn stack_request_rejects_blank_name() {
    let error = NewStack::from_template_str("  ", MINIMAL_TEMPLATE).expect_err("blank name");

    assert_eq!(error, BackendError::Validation(String::from("stack_name")));
}

#[test]
fn stack_request_rejects_malformed_template() {
    let error = NewStack::from_template_str("lab", "heat_template_version: 2013-05-23")
        .expect_err("YAML is not accepted");

    assert!(
        matches!(error, BackendError::InvalidTemplate(_)),
        "unexpected error: {error}"
    );
}

#[test]
fn stack_request_reads_template_file() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = Utf8PathBuf::from_path_buf(tmp.path().join("lab.json"))
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
    std::fs::write(&path, MINIMAL_TEMPLATE).unwrap_or_else(|err| panic!("write: {err}"));

    let stack = NewStack::from_template_file("lab", &path).expect("template file");

    assert_eq!(stack.template["resources"], serde_json::json!({}));
}

#[test]
fn stack_request_reports_unreadable_template() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = Utf8PathBuf::from_path_buf(tmp.path().join("missing.json"))
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));

    let error = NewStack::from_template_file("lab", &path).expect_err("missing file");

    assert!(
        matches!(error, BackendError::Io { path: ref reported, .. } if reported == &path),
        "unexpected error: {error}"
    );
}

#[test]
fn image_upload_defaults_to_qcow2_bare() {
    let upload = ImageUpload::qcow2("vmx", "/images/vmx.qcow2").expect("valid upload");

    assert_eq!(upload.disk_format, "qcow2");
    assert_eq!(upload.container_format, "bare");
    assert_eq!(upload.path.as_str(), "/images/vmx.qcow2");
}

#[test]
fn image_upload_rejects_blank_fields() {
    assert_eq!(
        ImageUpload::qcow2(" ", "/images/vmx.qcow2").expect_err("blank name"),
        BackendError::Validation(String::from("image_name"))
    );
    assert_eq!(
        ImageUpload::qcow2("vmx", "").expect_err("blank path"),
        BackendError::Validation(String::from("image_path"))
    );
}
