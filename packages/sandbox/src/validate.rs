// ABOUTME: Sandbox request validation against the image allow-list
// ABOUTME: Rejection short-circuits to result writing; no container is created

use std::path::{Component, Path};

use crate::error::{Result, SandboxError};
use crate::types::SandboxRequest;

/// Validate a request before any resources are committed to it
///
/// Image matching is exact: no wildcard or prefix forms. The rejection
/// message enumerates the allowed set so the submitter can self-correct.
pub fn validate_request(request: &SandboxRequest, allowed_images: &[String]) -> Result<()> {
    if request.request_id.trim().is_empty() {
        return Err(SandboxError::Validation(
            "request_id must not be empty".to_string(),
        ));
    }
    if request.command.trim().is_empty() {
        return Err(SandboxError::Validation(
            "command must not be empty".to_string(),
        ));
    }
    if request.image.trim().is_empty() {
        return Err(SandboxError::Validation(
            "image must not be empty".to_string(),
        ));
    }

    if !allowed_images.iter().any(|img| img == &request.image) {
        return Err(SandboxError::Validation(format!(
            "image {:?} is not allowed; allowed images: {}",
            request.image,
            allowed_images.join(", ")
        )));
    }

    for name in request.files.keys() {
        validate_file_name(name)?;
    }

    if let Some(0) = request.timeout {
        return Err(SandboxError::Validation(
            "timeout must be greater than 0".to_string(),
        ));
    }
    if let Some(0) = request.memory_limit {
        return Err(SandboxError::Validation(
            "memory_limit must be greater than 0".to_string(),
        ));
    }
    if let Some(cpu) = request.cpu_limit {
        if cpu <= 0.0 {
            return Err(SandboxError::Validation(
                "cpu_limit must be greater than 0".to_string(),
            ));
        }
    }

    Ok(())
}

/// File names must stay inside the scratch directory
fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SandboxError::Validation(
            "file name must not be empty".to_string(),
        ));
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Err(SandboxError::Validation(format!(
            "file name {:?} must be relative",
            name
        )));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(SandboxError::Validation(format!(
                    "file name {:?} must not traverse outside the scratch directory",
                    name
                )))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["python:3.11".to_string(), "alpine:3.19".to_string()]
    }

    #[test]
    fn allow_list_match_is_exact() {
        let request = SandboxRequest::new("python:3.11", "true");
        assert!(validate_request(&request, &allowed()).is_ok());

        let request = SandboxRequest::new("debian:unstable", "true");
        let err = validate_request(&request, &allowed()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("debian:unstable"));
        assert!(message.contains("python:3.11"));
        assert!(message.contains("alpine:3.19"));
    }

    #[test]
    fn prefix_of_an_allowed_image_is_rejected() {
        let request = SandboxRequest::new("python", "true");
        assert!(validate_request(&request, &allowed()).is_err());
    }

    #[test]
    fn empty_fields_are_rejected() {
        let mut request = SandboxRequest::new("python:3.11", "");
        assert!(validate_request(&request, &allowed()).is_err());

        request = SandboxRequest::new("", "true");
        assert!(validate_request(&request, &allowed()).is_err());

        request = SandboxRequest::new("python:3.11", "true");
        request.request_id = String::new();
        assert!(validate_request(&request, &allowed()).is_err());
    }

    #[test]
    fn traversal_file_names_are_rejected() {
        let mut request = SandboxRequest::new("python:3.11", "true");
        request
            .files
            .insert("../escape.txt".to_string(), "x".to_string());
        assert!(validate_request(&request, &allowed()).is_err());

        let mut request = SandboxRequest::new("python:3.11", "true");
        request
            .files
            .insert("/etc/passwd".to_string(), "x".to_string());
        assert!(validate_request(&request, &allowed()).is_err());

        let mut request = SandboxRequest::new("python:3.11", "true");
        request
            .files
            .insert("sub/dir/ok.txt".to_string(), "x".to_string());
        assert!(validate_request(&request, &allowed()).is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut request = SandboxRequest::new("python:3.11", "true");
        request.timeout = Some(0);
        assert!(validate_request(&request, &allowed()).is_err());

        let mut request = SandboxRequest::new("python:3.11", "true");
        request.memory_limit = Some(0);
        assert!(validate_request(&request, &allowed()).is_err());

        let mut request = SandboxRequest::new("python:3.11", "true");
        request.cpu_limit = Some(0.0);
        assert!(validate_request(&request, &allowed()).is_err());
    }
}
