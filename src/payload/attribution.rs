//! End-user attribution
//!
//! Finds the end user a request was made on behalf of, looking first at the
//! proxy's own metadata object and then at Anthropic's `metadata.user_id`.

use serde_json::Value;

/// Resolve the end user for a request body.
///
/// Order: `<internal_field>.user`, then `metadata.user_id`. Empty strings and
/// non-string values count as absent.
pub fn resolve_user_id(request_body: &Value, internal_field: &str) -> Option<String> {
    let lookup = |object: &str, key: &str| {
        request_body
            .get(object)
            .and_then(|o| o.get(key))
            .and_then(Value::as_str)
            .filter(|user| !user.is_empty())
            .map(str::to_string)
    };

    lookup(internal_field, "user").or_else(|| lookup("metadata", "user_id"))
}
