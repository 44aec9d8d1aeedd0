use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Wire format for every date carried in requests and responses.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    Unauthenticated,
    AlreadyExists,
    NotFound,
    DeadlineExceeded,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: String,
    pub owner_id: String,
    pub login: String,
    pub password: String,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditCard {
    pub id: String,
    pub owner_id: String,
    pub number: String,
    pub owner_name: String,
    pub expires_at: NaiveDate,
    pub cvv_code: String,
    pub pin_code: String,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData {
    pub id: String,
    pub owner_id: String,
    pub data: String,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterUserRequest {
    pub id: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginUserRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveCredentialRequest {
    pub id: String,
    pub login: String,
    pub password: String,
    pub metadata: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialFilter {
    pub login: String,
    pub password: String,
    pub metadata: String,
    pub created_after: String,
    pub created_before: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialView {
    pub id: String,
    pub login: String,
    pub password: String,
    pub metadata: String,
    pub created_at: String,
}

impl From<Credential> for CredentialView {
    fn from(value: Credential) -> Self {
        Self {
            id: value.id,
            login: value.login,
            password: value.password,
            metadata: value.metadata,
            created_at: format_date(value.created_at.date_naive()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCredentialsResponse {
    pub credentials: Vec<CredentialView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveCreditCardRequest {
    pub id: String,
    pub number: String,
    pub owner_name: String,
    pub expires_at: String,
    pub cvv_code: String,
    pub pin_code: String,
    pub metadata: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreditCardFilter {
    pub number: String,
    pub owner_name: String,
    pub expires_after: String,
    pub expires_before: String,
    pub cvv_code: String,
    pub pin_code: String,
    pub metadata: String,
    pub created_after: String,
    pub created_before: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardView {
    pub id: String,
    pub number: String,
    pub owner_name: String,
    pub expires_at: String,
    pub cvv_code: String,
    pub pin_code: String,
    pub metadata: String,
    pub created_at: String,
}

impl From<CreditCard> for CreditCardView {
    fn from(value: CreditCard) -> Self {
        Self {
            id: value.id,
            number: value.number,
            owner_name: value.owner_name,
            expires_at: format_date(value.expires_at),
            cvv_code: value.cvv_code,
            pin_code: value.pin_code,
            metadata: value.metadata,
            created_at: format_date(value.created_at.date_naive()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCreditCardsResponse {
    pub credit_cards: Vec<CreditCardView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveTextDataRequest {
    pub id: String,
    pub data: String,
    pub metadata: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextDataFilter {
    pub data: String,
    pub metadata: String,
    pub created_after: String,
    pub created_before: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDataView {
    pub id: String,
    pub data: String,
    pub metadata: String,
    pub created_at: String,
}

impl From<TextData> for TextDataView {
    fn from(value: TextData) -> Self {
        Self {
            id: value.id,
            data: value.data,
            metadata: value.metadata,
            created_at: format_date(value.created_at.date_naive()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTextDataResponse {
    pub text_data: Vec<TextDataView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_only_iso_calendar_dates() {
        assert_eq!(
            parse_date("2025-12-01"),
            NaiveDate::from_ymd_opt(2025, 12, 1)
        );
        assert_eq!(parse_date(" 2025-12-01 "), NaiveDate::from_ymd_opt(2025, 12, 1));
        assert_eq!(parse_date("2025-15-25"), None);
        assert_eq!(parse_date("01.12.2025"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn error_response_omits_empty_details() {
        let body = ErrorResponse {
            code: ErrorCode::Unauthenticated,
            message: "no token found".to_string(),
            details: Vec::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": "UNAUTHENTICATED", "message": "no token found"})
        );
    }

    #[test]
    fn filters_default_missing_fields_and_reject_unknown_ones() {
        let filter: CredentialFilter = serde_json::from_str(r#"{"login":"a"}"#).unwrap();
        assert_eq!(filter.login, "a");
        assert!(filter.created_after.is_empty());

        assert!(serde_json::from_str::<CredentialFilter>(r#"{"owner_id":"x"}"#).is_err());
    }
}
