use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of `schools`, also the wire shape returned by the listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub contact: Option<String>,
    pub email_id: Option<String>,
    pub image: Option<String>,
}

/// Validated values ready for insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSchool {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub contact: Option<String>,
    pub email_id: Option<String>,
    pub image: Option<String>,
}
