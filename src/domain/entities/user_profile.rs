use serde::Serialize;
use uuid::Uuid;

/// Public profile of a verified user, keyed by the provider-issued user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub introduce: String,
    pub avatar_url: Option<String>,
    pub email: String,
}
