use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::contract::model::{ContactUpdate, NewUser, User, UserFilters};

/// E.164: a leading `+`, then 7 to 15 digits with no leading zero.
static E164: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{6,14}$").expect("E.164 pattern compiles"));

/// `null` reads as an empty string so the validator, not the decoder, reports it.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// REST DTO for user representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// REST DTO for creating a new user.
///
/// Missing or `null` fields deserialize to empty strings so they are reported
/// by the validator (as "required") rather than by the JSON decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateUserReq {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "last_name is required"))]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(regex(path = *E164, message = "phone must be in E.164 format"))]
    pub phone: String,
}

/// REST DTO for replacing the contact fields of a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateContactReq {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(regex(path = *E164, message = "phone must be in E.164 format"))]
    pub phone: String,
}

/// Raw list query. Numbers stay strings so that junk values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUsersQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ListUsersQuery {
    /// Build from decoded `key=value` pairs. A repeated key keeps its first
    /// value; unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "limit" => &mut query.limit,
                "offset" => &mut query.offset,
                "first_name" => &mut query.first_name,
                "last_name" => &mut query.last_name,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    pub fn limit(&self) -> i64 {
        parse_lenient(self.limit.as_deref())
    }

    pub fn offset(&self) -> i64 {
        parse_lenient(self.offset.as_deref())
    }

    pub fn filters(&self) -> UserFilters {
        UserFilters::new(self.first_name.clone(), self.last_name.clone())
    }
}

/// Absent or unparsable values read as 0.
fn parse_lenient(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            created_at: user.created_at,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
        }
    }
}

impl From<UpdateContactReq> for ContactUpdate {
    fn from(req: UpdateContactReq) -> Self {
        Self {
            email: req.email,
            phone: req.phone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateUserReq {
        CreateUserReq {
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john@example.com".into(),
            phone: "+14155552671".into(),
        }
    }

    #[test]
    fn accepts_valid_create_request() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn rejects_bad_email_and_phone() {
        let req = CreateUserReq {
            email: "not-an-email".into(),
            phone: "12345".into(),
            ..valid_create()
        };
        let errs = req.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
        assert!(!fields.contains_key("first_name"));
    }

    #[test]
    fn missing_fields_are_reported_by_the_validator() {
        let req: CreateUserReq = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        let errs = req.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn e164_boundaries() {
        for ok in ["+1234567", "+442071838750", "+123456789012345"] {
            assert!(E164.is_match(ok), "{ok} should match");
        }
        for bad in [
            "+12",
            "+123456",
            "12345",
            "+01234567",
            "+1234567890123456",
            "+1 415 555",
            "",
        ] {
            assert!(!E164.is_match(bad), "{bad} should not match");
        }
    }

    #[test]
    fn update_request_requires_both_fields() {
        let req: UpdateContactReq = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        let errs = req.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("phone"));
    }

    #[test]
    fn list_query_parses_leniently() {
        let q = ListUsersQuery {
            limit: Some("25".into()),
            offset: Some("abc".into()),
            first_name: Some("jo".into()),
            last_name: Some("".into()),
        };
        assert_eq!(q.limit(), 25);
        assert_eq!(q.offset(), 0);
        let f = q.filters();
        assert_eq!(f.first_name.as_deref(), Some("jo"));
        assert_eq!(f.last_name, None);

        assert_eq!(ListUsersQuery::default().limit(), 0);
    }

    #[test]
    fn list_query_keeps_first_of_repeated_keys() {
        let pairs = [("limit", "1"), ("limit", "2"), ("sort", "x"), ("first_name", "Ann")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        let q = ListUsersQuery::from_pairs(pairs);
        assert_eq!(q.limit(), 1);
        assert_eq!(q.first_name.as_deref(), Some("Ann"));
        assert_eq!(q.offset, None);
    }

    #[test]
    fn null_fields_are_reported_by_the_validator() {
        let req: CreateUserReq = serde_json::from_str(
            r#"{"first_name":null,"last_name":"Doe","email":"a@b.co","phone":null}"#,
        )
        .unwrap();
        assert_eq!(req.first_name, "");
        let errs = req.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("phone"));
        assert!(!fields.contains_key("last_name"));

        // a wrong type is still a decode error
        assert!(serde_json::from_str::<CreateUserReq>(r#"{"first_name":5}"#).is_err());
    }
}
