//! Built-in status validators.

use bulwark_core::{Response, StatusSet};
use bulwark_error::RejectionErrorKind;
use bulwark_interface::Validator;

/// Accepts any 2xx response.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl Validator for DefaultValidator {
    fn name(&self) -> &str {
        "default"
    }

    fn check(&self, response: &Response) -> Result<(), RejectionErrorKind> {
        if response.is_success() {
            Ok(())
        } else {
            Err(RejectionErrorKind::NonOk {
                url: response.url().clone(),
                status: *response.status(),
            })
        }
    }
}

/// Accepts only the listed statuses, 2xx included.
///
/// # Examples
///
/// ```
/// use bulwark::StrictStatusValidator;
/// use bulwark_core::{Method, Response, StatusSet};
/// use bulwark_interface::Validator;
///
/// let validator = StrictStatusValidator::new(StatusSet::from(201));
/// assert!(validator.check(&Response::new(201, Method::Post, "https://api/x")).is_ok());
/// assert!(validator.check(&Response::new(200, Method::Post, "https://api/x")).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct StrictStatusValidator {
    statuses: StatusSet,
}

impl StrictStatusValidator {
    /// Creates a validator over `statuses`.
    pub fn new(statuses: StatusSet) -> Self {
        Self { statuses }
    }
}

impl Validator for StrictStatusValidator {
    fn name(&self) -> &str {
        "strict_status"
    }

    fn check(&self, response: &Response) -> Result<(), RejectionErrorKind> {
        if self.statuses.contains(*response.status()) {
            Ok(())
        } else {
            Err(RejectionErrorKind::Unexpected {
                url: response.url().clone(),
                status: *response.status(),
                expected: self.statuses.to_string(),
            })
        }
    }
}

/// Accepts 2xx plus the listed statuses.
#[derive(Debug, Clone)]
pub struct AllowedStatusValidator {
    statuses: StatusSet,
}

impl AllowedStatusValidator {
    /// Creates a validator over `statuses`.
    pub fn new(statuses: StatusSet) -> Self {
        Self { statuses }
    }
}

impl Validator for AllowedStatusValidator {
    fn name(&self) -> &str {
        "allowed_status"
    }

    fn check(&self, response: &Response) -> Result<(), RejectionErrorKind> {
        if response.is_success() || self.statuses.contains(*response.status()) {
            Ok(())
        } else {
            Err(RejectionErrorKind::NonOk {
                url: response.url().clone(),
                status: *response.status(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::Method;

    fn response(status: u16) -> Response {
        Response::new(status, Method::Get, "https://api/pokemon/ditto")
    }

    #[test]
    fn test_default_accepts_2xx_only() {
        assert!(DefaultValidator.check(&response(204)).is_ok());
        let err = DefaultValidator.check(&response(404)).unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, RejectionErrorKind::NonOk { .. }));
    }

    #[test]
    fn test_strict_rejects_other_successes() {
        let validator = StrictStatusValidator::new(StatusSet::from([200, 404]));
        assert!(validator.check(&response(404)).is_ok());
        let err = validator.check(&response(201)).unwrap_err();
        assert!(err.to_string().contains("200, 404"));
    }

    #[test]
    fn test_allowed_extends_success() {
        let validator = AllowedStatusValidator::new(StatusSet::from(404));
        assert!(validator.check(&response(200)).is_ok());
        assert!(validator.check(&response(404)).is_ok());
        assert!(validator.check(&response(500)).is_err());
    }
}
