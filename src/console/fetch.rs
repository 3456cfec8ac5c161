//! Concurrent loading of the remote collections.

use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use super::{ConsoleError, SessionGuard};
use crate::model::{CollectionKind, Record};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Characters of the raw body kept in a `MalformedResponse` diagnostic.
const EXCERPT_LEN: usize = 200;

/// One collection to load: which one, and where from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub kind: CollectionKind,
    pub endpoint: String,
}

impl CollectionSpec {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            endpoint: kind.endpoint().to_string(),
        }
    }

    /// All five dashboard collections at their standard endpoints.
    pub fn dashboard() -> Vec<Self> {
        CollectionKind::ALL.into_iter().map(Self::new).collect()
    }
}

/// What to do when some, but not all, collections fail to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Any failure fails the whole batch; nothing is applied.
    #[default]
    AllOrNothing,
    /// Successful collections are applied, failures are reported per
    /// collection.
    PerCollection,
}

/// Outcome of a batch that was not aborted.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(CollectionKind, Vec<Record>)>,
    pub failed: Vec<(CollectionKind, ConsoleError)>,
}

/// Loads a set of collections concurrently through a [`SessionGuard`].
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    specs: Vec<CollectionSpec>,
    policy: LoadPolicy,
}

impl ResourceFetcher {
    pub fn new(specs: Vec<CollectionSpec>, policy: LoadPolicy) -> Self {
        Self { specs, policy }
    }

    /// Fire every request at once and wait for all of them.
    ///
    /// A session expiry aborts the batch under either policy. Under
    /// [`LoadPolicy::AllOrNothing`] the first other failure (in collection order)
    /// aborts it too.
    pub async fn load<T: Transport>(
        &self,
        guard: &SessionGuard<T>,
    ) -> Result<LoadReport, ConsoleError> {
        let results = join_all(self.specs.iter().map(|spec| load_one(guard, spec))).await;

        if results
            .iter()
            .any(|(_, result)| matches!(result, Err(ConsoleError::SessionExpired)))
        {
            return Err(ConsoleError::SessionExpired);
        }

        let mut report = LoadReport::default();
        for (kind, result) in results {
            match result {
                Ok(items) => report.loaded.push((kind, items)),
                Err(e) => {
                    warn!(collection = %kind, reason = %e, "collection failed to load");
                    if self.policy == LoadPolicy::AllOrNothing {
                        return Err(e);
                    }
                    report.failed.push((kind, e));
                }
            }
        }
        Ok(report)
    }
}

async fn load_one<T: Transport>(
    guard: &SessionGuard<T>,
    spec: &CollectionSpec,
) -> (CollectionKind, Result<Vec<Record>, ConsoleError>) {
    (spec.kind, fetch_collection(guard, spec).await)
}

async fn fetch_collection<T: Transport>(
    guard: &SessionGuard<T>,
    spec: &CollectionSpec,
) -> Result<Vec<Record>, ConsoleError> {
    let response = ensure_success(guard.send(ApiRequest::get(spec.endpoint.as_str())).await?)?;
    let items = normalize(spec.kind.label(), &response.body)?;
    info!(collection = %spec.kind, count = items.len(), "collection loaded");
    Ok(items)
}

/// Turn a non-2xx response into [`ConsoleError::Rejected`].
pub(crate) fn ensure_success(response: ApiResponse) -> Result<ApiResponse, ConsoleError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ConsoleError::Rejected {
        status: response.status,
        body: excerpt(&response.body),
    })
}

/// Parse a listing body: either a bare array or an object wrapping the
/// array in `data` (missing `data` means empty).
pub fn normalize(context: &str, body: &str) -> Result<Vec<Record>, ConsoleError> {
    let malformed = || ConsoleError::MalformedResponse {
        context: context.to_string(),
        excerpt: excerpt(body),
    };

    let parsed: Value = serde_json::from_str(body).map_err(|_| malformed())?;
    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut wrapper) => match wrapper.remove("data") {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(malformed()),
        },
        _ => return Err(malformed()),
    };

    items
        .into_iter()
        .map(|item| Record::from_value(item).ok_or_else(malformed))
        .collect()
}

/// Parse a single record returned by a mutation endpoint.
pub fn parse_record(context: &str, body: &str) -> Result<Record, ConsoleError> {
    let malformed = || ConsoleError::MalformedResponse {
        context: context.to_string(),
        excerpt: excerpt(body),
    };
    let value: Value = serde_json::from_str(body).map_err(|_| malformed())?;
    let value = match value {
        Value::Object(mut wrapper) if !wrapper.contains_key("id") && !wrapper.contains_key("_id") => {
            wrapper.remove("data").ok_or_else(malformed)?
        }
        other => other,
    };
    Record::from_value(value).ok_or_else(malformed)
}

/// First [`EXCERPT_LEN`] characters of a body.
pub fn excerpt(body: &str) -> String {
    match body.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => body[..cut].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[Record]) -> Vec<&str> {
        items.iter().map(|r| r.id().as_str()).collect()
    }

    #[test]
    fn normalize_bare_array() {
        let items = normalize("Users", r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(ids(&items), ["1", "2"]);
    }

    #[test]
    fn normalize_data_wrapper() {
        let items = normalize("Users", r#"{"data": [{"id": "a"}], "total": 1}"#).unwrap();
        assert_eq!(ids(&items), ["a"]);
    }

    #[test]
    fn normalize_wrapper_without_data_is_empty() {
        assert!(normalize("Users", r#"{"total": 0}"#).unwrap().is_empty());
        assert!(normalize("Users", r#"{"data": null}"#).unwrap().is_empty());
    }

    #[test]
    fn normalize_html_is_malformed_with_excerpt() {
        let err = normalize("Wallets", "<!DOCTYPE html><html>oops</html>").unwrap_err();
        match err {
            ConsoleError::MalformedResponse { context, excerpt } => {
                assert_eq!(context, "Wallets");
                assert!(excerpt.starts_with("<!DOCTYPE html>"));
            }
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn normalize_rejects_scalars_and_items_without_id() {
        assert!(matches!(
            normalize("Users", "42"),
            Err(ConsoleError::MalformedResponse { .. })
        ));
        assert!(matches!(
            normalize("Users", r#"[{"name": "no id"}]"#),
            Err(ConsoleError::MalformedResponse { .. })
        ));
        assert!(matches!(
            normalize("Users", r#"{"data": "nope"}"#),
            Err(ConsoleError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), EXCERPT_LEN);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn parse_record_accepts_plain_and_wrapped() {
        let plain = parse_record("approve", r#"{"id": 9, "status": "APPROVED"}"#).unwrap();
        assert_eq!(plain.id().as_str(), "9");

        let wrapped = parse_record("approve", r#"{"data": {"id": 10}}"#).unwrap();
        assert_eq!(wrapped.id().as_str(), "10");

        assert!(parse_record("approve", "OK").is_err());
    }

    #[test]
    fn dashboard_specs_cover_every_collection() {
        let specs = CollectionSpec::dashboard();
        assert_eq!(specs.len(), 5);
        assert_eq!(specs[3].endpoint, "/api/admin/transactions?limit=200");
    }
}
