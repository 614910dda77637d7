use core::str::FromStr;

use stockroom_core::DomainError;

use crate::app::errors::ApiResult;

/// Parse a record id taken from the path or body.
///
/// A malformed id cannot name a stored record, so it is reported the same as
/// a missing one.
pub fn record_id<I>(raw: &str, what: &'static str) -> ApiResult<I>
where
    I: FromStr<Err = DomainError>,
{
    raw.parse().map_err(|_| DomainError::not_found(what).into())
}

/// Id carried as `_id` in a request body (alternate update/delete forms).
pub fn body_id<I>(raw: Option<&str>, what: &'static str) -> ApiResult<I>
where
    I: FromStr<Err = DomainError>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => record_id(raw, what),
        None => Err(DomainError::validation("_id is required").into()),
    }
}

#[cfg(test)]
mod tests {
    use stockroom_core::CustomerId;

    use super::*;
    use crate::app::errors::ApiError;

    #[test]
    fn malformed_ids_read_as_not_found() {
        let err = record_id::<CustomerId>("not-a-uuid", "customer").unwrap_err();
        assert!(matches!(err, ApiError::Domain(DomainError::NotFound("customer"))));
    }

    #[test]
    fn missing_body_id_is_a_validation_error() {
        let err = body_id::<CustomerId>(Some("  "), "customer").unwrap_err();
        assert!(matches!(err, ApiError::Domain(DomainError::Validation(_))));

        let id = CustomerId::new();
        assert_eq!(body_id::<CustomerId>(Some(&id.to_string()), "customer").unwrap(), id);
    }
}
