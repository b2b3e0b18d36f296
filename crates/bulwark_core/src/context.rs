//! Per-call endpoint context.

use crate::Method;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything known about one logical call before it is dispatched.
///
/// Built once per call and shared by reference across every attempt of the
/// retry sequence.
///
/// # Examples
///
/// ```
/// use bulwark_core::{EndpointContext, Method};
/// use std::collections::BTreeMap;
///
/// let args = BTreeMap::from([("NAME".to_string(), "pikachu".to_string())]);
/// let ctx = EndpointContext::new(
///     Method::Get,
///     "https://pokeapi.co/api/v2",
///     "/pokemon/{NAME}",
///     args,
/// )
/// .unwrap();
///
/// assert_eq!(ctx.url(), "https://pokeapi.co/api/v2/pokemon/pikachu");
/// assert_eq!(ctx.unformatted_url(), "https://pokeapi.co/api/v2/pokemon/{NAME}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct EndpointContext {
    /// Unique id shared by every attempt of this call
    call_id: Uuid,
    /// HTTP method
    method: Method,
    /// Base URL of the client
    base_url: String,
    /// Endpoint template, e.g. `/pokemon/{NAME}`
    unformatted_endpoint: String,
    /// Endpoint with arguments substituted
    endpoint: String,
    /// Arguments substituted into the template
    args: BTreeMap<String, String>,
    /// Base URL plus formatted endpoint
    url: String,
    /// Base URL plus endpoint template
    unformatted_url: String,
}

impl EndpointContext {
    /// Formats the endpoint template and assigns a fresh call id.
    ///
    /// # Errors
    ///
    /// Fails when the template names a placeholder missing from `args` or
    /// contains an unbalanced brace.
    pub fn new(
        method: Method,
        base_url: &str,
        endpoint: &str,
        args: BTreeMap<String, String>,
    ) -> Result<Self, String> {
        let formatted = format_endpoint(endpoint, &args)?;
        Ok(Self {
            call_id: Uuid::new_v4(),
            method,
            base_url: base_url.to_string(),
            unformatted_endpoint: endpoint.to_string(),
            url: format!("{base_url}{formatted}"),
            unformatted_url: format!("{base_url}{endpoint}"),
            endpoint: formatted,
            args,
        })
    }

    /// Value of one substituted argument.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}

/// Substitutes `{NAME}` placeholders. `{{` and `}}` escape literal braces.
pub fn format_endpoint(template: &str, args: &BTreeMap<String, String>) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(format!("unclosed placeholder in {template:?}")),
                    }
                }
                let value = args
                    .get(&name)
                    .ok_or_else(|| format!("missing endpoint argument {name:?} for {template:?}"))?;
                out.push_str(value);
            }
            '}' => return Err(format!("unmatched '}}' in {template:?}")),
            other => out.push(other),
        }
    }
    Ok(out)
}
