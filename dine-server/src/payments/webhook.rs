//! Bank transfer notification (SePay-style aggregator)
//!
//! ```json
//! {
//!   "id": 92704,
//!   "gateway": "Vietcombank",
//!   "transactionDate": "2025-01-01 19:45:00",
//!   "accountNumber": "0123499999",
//!   "code": null,
//!   "content": "DH1234567 thanh toan",
//!   "transferType": "in",
//!   "transferAmount": 96000,
//!   "referenceCode": "MBVCB.3278907687",
//!   "description": "..."
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Header prefix: `Authorization: Apikey <key>`
const API_KEY_SCHEME: &str = "Apikey ";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankNotification {
    /// Aggregator transaction id (number or string on the wire)
    #[serde(default, alias = "transactionId", deserialize_with = "id_as_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// "in" | "out"
    #[serde(default)]
    pub transfer_type: String,
    #[serde(default)]
    pub transfer_amount: f64,
    /// Bank-side reference (not our payment reference)
    #[serde(default)]
    pub reference_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl BankNotification {
    pub fn is_incoming(&self) -> bool {
        self.transfer_type.eq_ignore_ascii_case("in")
    }

    /// Locate `{prefix}<digits>` in code, content, description, then the bank reference
    pub fn find_reference(&self, prefix: &str) -> Option<String> {
        [
            &self.code,
            &self.content,
            &self.description,
            &self.reference_code,
        ]
        .into_iter()
        .flatten()
        .find_map(|text| extract_reference(text, prefix))
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Case-insensitive `{prefix}<digits>` match, returned in canonical (upper-case prefix) form
pub fn extract_reference(text: &str, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    let haystack = text.to_ascii_uppercase();
    let needle = prefix.to_ascii_uppercase();

    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let start = from + pos + needle.len();
        let digits: String = haystack[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            return Some(format!("{needle}{digits}"));
        }
        from = start;
    }
    None
}

/// Canonical reference code for a payment
pub fn reference_for(prefix: &str, payment_id: i64) -> String {
    format!("{}{}", prefix.to_ascii_uppercase(), payment_id)
}

/// Check `Authorization: Apikey <key>` against the configured key.
///
/// An empty configured key rejects everything. Keys are compared as SHA-256
/// digests so the comparison time does not depend on the common prefix.
pub fn verify_api_key(header: Option<&str>, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let Some(provided) = header.and_then(|h| {
        h.get(..API_KEY_SCHEME.len())
            .filter(|scheme| scheme.eq_ignore_ascii_case(API_KEY_SCHEME))
            .map(|_| h[API_KEY_SCHEME.len()..].trim())
    }) else {
        return false;
    };

    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sepay_payload() {
        let json = r#"{
            "id": 92704,
            "gateway": "Vietcombank",
            "transactionDate": "2025-01-01 19:45:00",
            "accountNumber": "0123499999",
            "code": null,
            "content": "chuyen tien dh1234 thanh toan",
            "transferType": "in",
            "transferAmount": 96000,
            "accumulated": 19077000,
            "referenceCode": "MBVCB.3278907687",
            "description": ""
        }"#;
        let n: BankNotification = serde_json::from_str(json).unwrap();
        assert_eq!(n.id.as_deref(), Some("92704"));
        assert!(n.is_incoming());
        assert_eq!(n.transfer_amount, 96000.0);
        assert_eq!(n.find_reference("DH").as_deref(), Some("DH1234"));
    }

    #[test]
    fn test_transaction_id_alias() {
        let n: BankNotification =
            serde_json::from_str(r#"{"transactionId":"FT123","transferType":"out"}"#).unwrap();
        assert_eq!(n.id.as_deref(), Some("FT123"));
        assert!(!n.is_incoming());
    }

    #[test]
    fn test_extract_reference() {
        assert_eq!(extract_reference("DH42", "DH").as_deref(), Some("DH42"));
        assert_eq!(extract_reference("pay DHx then DH7 ok", "dh").as_deref(), Some("DH7"));
        assert_eq!(extract_reference("no ref here", "DH"), None);
        assert_eq!(extract_reference("DH", "DH"), None);
        assert_eq!(reference_for("dh", 42), "DH42");
    }

    #[test]
    fn test_verify_api_key() {
        assert!(verify_api_key(Some("Apikey secret-key"), "secret-key"));
        assert!(verify_api_key(Some("apikey secret-key"), "secret-key"));
        assert!(!verify_api_key(Some("Apikey wrong"), "secret-key"));
        assert!(!verify_api_key(Some("Bearer secret-key"), "secret-key"));
        assert!(!verify_api_key(None, "secret-key"));
        assert!(!verify_api_key(Some("Apikey "), ""));
    }
}
