use axum::body::Bytes;
use serde::{Deserialize, Serialize};

use crate::db::{NewSchool, School};
use crate::error::DirectoryError;

/// Multipart key carrying the binary image part.
pub const IMAGE_FIELD: &str = "image";

pub const CREATED_MESSAGE: &str = "School added successfully";

/// The six text fields of the submission form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolForm {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Address,
    City,
    State,
    Contact,
    EmailId,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        Self::Name,
        Self::Address,
        Self::City,
        Self::State,
        Self::Contact,
        Self::EmailId,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::Contact => "contact",
            Self::EmailId => "email_id",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl SchoolForm {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Address => &self.address,
            FormField::City => &self.city,
            FormField::State => &self.state,
            FormField::Contact => &self.contact,
            FormField::EmailId => &self.email_id,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Address => &mut self.address,
            FormField::City => &mut self.city,
            FormField::State => &mut self.state,
            FormField::Contact => &mut self.contact,
            FormField::EmailId => &mut self.email_id,
        };
        *slot = value.into();
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        FormField::ALL.into_iter().map(|f| (f.key(), self.get(f)))
    }

    /// Check required fields and normalize into an insertable row.
    ///
    /// With `require_location`, `city` and `state` are required alongside `name`.
    pub fn validate(&self, require_location: bool) -> Result<NewSchool, DirectoryError> {
        let name = self.name.trim();
        let city = self.city.trim();
        let state = self.state.trim();

        if require_location {
            if name.is_empty() || city.is_empty() || state.is_empty() {
                return Err(DirectoryError::validation(
                    "Name, city, and state are required",
                ));
            }
        } else if name.is_empty() {
            return Err(DirectoryError::validation("Name is required"));
        }

        Ok(NewSchool {
            name: name.to_string(),
            address: optional(&self.address),
            city: optional(city),
            state: optional(state),
            contact: optional(&self.contact),
            email_id: optional(&self.email_id),
            image: None,
        })
    }
}

fn optional(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// An uploaded file as received from the multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn validate(&self, max_bytes: usize) -> Result<(), DirectoryError> {
        check_image(self.size(), &self.content_type, max_bytes)
    }
}

/// Size and MIME rule shared by the server and the form.
pub fn check_image(size: usize, content_type: &str, max_bytes: usize) -> Result<(), DirectoryError> {
    if size > max_bytes {
        return Err(DirectoryError::validation(format!(
            "Image must be at most {} MB",
            max_bytes / (1024 * 1024)
        )));
    }
    if !is_image_type(content_type) {
        return Err(DirectoryError::validation("Only image files are allowed"));
    }
    Ok(())
}

pub fn is_image_type(content_type: &str) -> bool {
    let ct = content_type.trim();
    ct.len() > 6 && ct.get(..6).is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// A parsed `POST /api/schools` body.
#[derive(Debug, Clone, Default)]
pub struct SchoolSubmission {
    pub form: SchoolForm,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolResponse {
    pub success: bool,
    pub id: i64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSchoolsResponse {
    pub success: bool,
    pub schools: Vec<School>,
    pub count: usize,
}

/// What the record service hands back after a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSchool {
    pub id: i64,
    pub image_url: Option<String>,
}
