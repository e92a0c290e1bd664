//! Sanity checking of raw check records before probing.
//!
//! A record that fails any rule is skipped for the sweep; rejection is a
//! per-check diagnostic, never fatal.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::models::Check;

/// Required length of a check id
pub const ID_LENGTH: usize = 20;

/// Required length of the owner's phone number
pub const PHONE_LENGTH: usize = 10;

const MIN_TIMEOUT_SECONDS: u8 = 2;
const MAX_TIMEOUT_SECONDS: u8 = 5;

#[derive(Debug, Error)]
#[error("invalid check field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        reason: reason.into(),
    }
}

/// Validate a raw record read from the store into a typed check.
///
/// Shape and enum membership are enforced by deserialization (`state`
/// defaults to down, `lastChecked` stays absent); the range rules the
/// schema cannot express are checked field by field.
pub fn validate_check(raw: &Value) -> Result<Check, ValidationError> {
    let check: Check =
        serde_json::from_value(raw.clone()).map_err(|err| invalid("record", err.to_string()))?;

    if check.id.len() != ID_LENGTH {
        return Err(invalid(
            "id",
            format!("must be exactly {ID_LENGTH} characters"),
        ));
    }

    if check.user_phone.len() != PHONE_LENGTH
        || !check.user_phone.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid(
            "userPhone",
            format!("must be a {PHONE_LENGTH}-digit string"),
        ));
    }

    if check.url.is_empty() {
        return Err(invalid("url", "must be non-empty"));
    }

    if check.success_codes.is_empty() {
        return Err(invalid("successCodes", "must contain at least one code"));
    }

    if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&check.timeout_seconds) {
        return Err(invalid(
            "timeoutSeconds",
            format!("must be in {MIN_TIMEOUT_SECONDS}..={MAX_TIMEOUT_SECONDS} seconds"),
        ));
    }

    // The combined target must be a well-formed URL before we probe it
    if let Err(err) = Url::parse(&check.target()) {
        return Err(invalid("url", err.to_string()));
    }

    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckState;
    use serde_json::json;

    fn valid_record() -> Value {
        json!({
            "id": "abcdefghij0123456789",
            "userPhone": "5551234567",
            "protocol": "http",
            "url": "example.com",
            "method": "get",
            "successCodes": [200],
            "timeoutSeconds": 3
        })
    }

    #[test]
    fn accepts_valid_record() {
        let check = validate_check(&valid_record()).unwrap();
        assert_eq!(check.id, "abcdefghij0123456789");
        assert_eq!(check.state, CheckState::Down);
        assert!(check.last_checked.is_none());
    }

    #[test]
    fn rejects_record_missing_url() {
        let mut record = valid_record();
        record.as_object_mut().unwrap().remove("url");
        assert!(validate_check(&record).is_err());
    }

    #[test]
    fn rejects_empty_url() {
        let mut record = valid_record();
        record["url"] = json!("");
        let err = validate_check(&record).unwrap_err();
        assert_eq!(err.field, "url");
    }

    #[test]
    fn rejects_wrong_length_id() {
        let mut record = valid_record();
        record["id"] = json!("short");
        let err = validate_check(&record).unwrap_err();
        assert_eq!(err.field, "id");
    }

    #[test]
    fn rejects_non_numeric_phone() {
        let mut record = valid_record();
        record["userPhone"] = json!("555123456x");
        let err = validate_check(&record).unwrap_err();
        assert_eq!(err.field, "userPhone");
    }

    #[test]
    fn rejects_empty_success_codes() {
        let mut record = valid_record();
        record["successCodes"] = json!([]);
        let err = validate_check(&record).unwrap_err();
        assert_eq!(err.field, "successCodes");
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        for bad in [0, 1, 6, 200] {
            let mut record = valid_record();
            record["timeoutSeconds"] = json!(bad);
            assert!(validate_check(&record).is_err(), "timeout {bad} accepted");
        }
    }

    #[test]
    fn rejects_unparseable_target() {
        let mut record = valid_record();
        record["url"] = json!("exa mple.com/path");
        let err = validate_check(&record).unwrap_err();
        assert_eq!(err.field, "url");
    }

    #[test]
    fn rejects_unknown_method() {
        let mut record = valid_record();
        record["method"] = json!("patch");
        assert!(validate_check(&record).is_err());
    }

    #[test]
    fn preserves_existing_state_and_last_checked() {
        let mut record = valid_record();
        record["state"] = json!("up");
        record["lastChecked"] = json!(1_700_000_000_000u64);

        let check = validate_check(&record).unwrap();
        assert_eq!(check.state, CheckState::Up);
        assert!(check.last_checked.is_some());
    }
}
