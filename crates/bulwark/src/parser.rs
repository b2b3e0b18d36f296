//! Status-driven result mapping.

use bulwark_core::Response;
use bulwark_error::{MappingError, MappingErrorKind};
use bulwark_interface::ResultMapper;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

type ValueFn<T> = Arc<dyn Fn(&Response) -> Result<T, String> + Send + Sync>;
type FailFn = Arc<dyn Fn(&Response) -> String + Send + Sync>;

/// What to do with a response carrying a given status.
pub enum ParseAction<T> {
    /// Produce a value
    Value(ValueFn<T>),
    /// The response is valid but carries no value
    Absent,
    /// Fail with the returned message
    Fail(FailFn),
}

impl<T> Clone for ParseAction<T> {
    fn clone(&self) -> Self {
        match self {
            ParseAction::Value(f) => ParseAction::Value(f.clone()),
            ParseAction::Absent => ParseAction::Absent,
            ParseAction::Fail(f) => ParseAction::Fail(f.clone()),
        }
    }
}

impl<T> std::fmt::Debug for ParseAction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseAction::Value(_) => write!(f, "Value"),
            ParseAction::Absent => write!(f, "Absent"),
            ParseAction::Fail(_) => write!(f, "Fail"),
        }
    }
}

/// Maps accepted responses to values by status code.
///
/// Statuses without an entry use the default action. With no default either,
/// mapping fails.
///
/// # Examples
///
/// ```
/// use bulwark::StatusParser;
/// use bulwark_core::{Method, Response};
/// use bulwark_interface::ResultMapper;
///
/// let parser = StatusParser::new()
///     .on_value(200, |response: &Response| Ok(response.text()))
///     .on_absent(404);
///
/// let found = Response::new(200, Method::Get, "https://api/x").with_body("ditto");
/// let missing = Response::new(404, Method::Get, "https://api/x");
/// assert_eq!(parser.map(&found).unwrap(), Some("ditto".to_string()));
/// assert_eq!(parser.map(&missing).unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct StatusParser<T> {
    actions: BTreeMap<u16, ParseAction<T>>,
    default: Option<ParseAction<T>>,
}

impl<T> Default for StatusParser<T> {
    fn default() -> Self {
        Self {
            actions: BTreeMap::new(),
            default: None,
        }
    }
}

impl<T> StatusParser<T> {
    /// Empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the action for one status.
    pub fn on(mut self, status: u16, action: ParseAction<T>) -> Self {
        self.actions.insert(status, action);
        self
    }

    /// Produces a value for `status`.
    pub fn on_value<F>(self, status: u16, f: F) -> Self
    where
        F: Fn(&Response) -> Result<T, String> + Send + Sync + 'static,
    {
        self.on(status, ParseAction::Value(Arc::new(f)))
    }

    /// Treats `status` as valid with no value.
    pub fn on_absent(self, status: u16) -> Self {
        self.on(status, ParseAction::Absent)
    }

    /// Fails for `status` with the message `f` returns.
    pub fn on_fail<F>(self, status: u16, f: F) -> Self
    where
        F: Fn(&Response) -> String + Send + Sync + 'static,
    {
        self.on(status, ParseAction::Fail(Arc::new(f)))
    }

    /// Action for statuses without an entry.
    pub fn with_default(mut self, action: ParseAction<T>) -> Self {
        self.default = Some(action);
        self
    }
}

impl<T> ResultMapper<T> for StatusParser<T> {
    fn map(&self, response: &Response) -> Result<Option<T>, MappingError> {
        let status = *response.status();
        let action = self
            .actions
            .get(&status)
            .or(self.default.as_ref())
            .ok_or_else(|| {
                MappingError::new(MappingErrorKind::Failed {
                    url: response.url().clone(),
                    status,
                    message: format!("no parser registered for status {status}"),
                })
            })?;

        match action {
            ParseAction::Value(f) => f(response).map(Some).map_err(|message| {
                MappingError::new(MappingErrorKind::Failed {
                    url: response.url().clone(),
                    status,
                    message,
                })
            }),
            ParseAction::Absent => Ok(None),
            ParseAction::Fail(f) => Err(MappingError::new(MappingErrorKind::Declared {
                url: response.url().clone(),
                status,
                message: f(response),
            })),
        }
    }
}

/// Decodes the body of every accepted response as JSON.
#[derive(Debug, Clone, Copy)]
pub struct JsonParser<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for JsonParser<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> JsonParser<T> {
    /// Creates a JSON parser.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: DeserializeOwned> ResultMapper<T> for JsonParser<T> {
    fn map(&self, response: &Response) -> Result<Option<T>, MappingError> {
        response.json().map(Some).map_err(|e| {
            MappingError::new(MappingErrorKind::Failed {
                url: response.url().clone(),
                status: *response.status(),
                message: e.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::Method;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Pokemon {
        name: String,
    }

    fn response(status: u16, body: &str) -> Response {
        Response::new(status, Method::Get, "https://api/pokemon/ditto").with_body(body)
    }

    #[test]
    fn test_declared_failure() {
        let parser: StatusParser<String> =
            StatusParser::new().on_fail(410, |_| "pokemon retired".to_string());
        let err = parser.map(&response(410, "")).unwrap_err();
        assert!(matches!(err.kind(), MappingErrorKind::Declared { status: 410, .. }));
    }

    #[test]
    fn test_value_closure_error_is_wrapped() {
        let parser = StatusParser::new().on_value(200, |r: &Response| {
            r.text().parse::<u32>().map_err(|e| e.to_string())
        });
        let err = parser.map(&response(200, "not a number")).unwrap_err();
        assert!(matches!(err.kind(), MappingErrorKind::Failed { .. }));
        assert_eq!(parser.map(&response(200, "42")).unwrap(), Some(42));
    }

    #[test]
    fn test_default_action_and_missing_entry() {
        let parser: StatusParser<String> = StatusParser::new();
        assert!(parser.map(&response(200, "")).is_err());
        let parser = parser.with_default(ParseAction::Absent);
        assert_eq!(parser.map(&response(204, "")).unwrap(), None);
    }

    #[test]
    fn test_json_parser() {
        let parser = JsonParser::<Pokemon>::new();
        let value = parser.map(&response(200, r#"{"name":"ditto"}"#)).unwrap();
        assert_eq!(value, Some(Pokemon { name: "ditto".into() }));
        assert!(parser.map(&response(200, "<html>")).is_err());
    }
}
