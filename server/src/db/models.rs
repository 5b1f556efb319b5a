use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

pub const CONTACTS: &str = "contacts";
pub const COURSES: &str = "courses";
pub const USERS: &str = "users";

/// Collections that must exist once the store is initialized.
pub const REQUIRED_COLLECTIONS: [&str; 3] = [CONTACTS, COURSES, USERS];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    /// Caller-assigned slug used in `/course/{id}`, not the storage identity.
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub duration: String,
    pub level: String,
}

impl Course {
    fn seed(id: &str, title: &str, description: &str, price: f64, duration: &str, level: &str) -> Self {
        Self {
            object_id: None,
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price,
            duration: duration.to_string(),
            level: level.to_string(),
        }
    }
}

/// Courses inserted when the `courses` collection is empty at startup.
pub fn seed_courses() -> Vec<Course> {
    vec![
        Course::seed(
            "web",
            "Full Stack Web Development",
            "Learn web development from scratch",
            200.0,
            "3 months",
            "Beginner",
        ),
        Course::seed(
            "marketing",
            "Digital Marketing",
            "Online marketing strategies",
            180.0,
            "2 months",
            "Intermediate",
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub created_at: mongodb::bson::DateTime,
    pub status: String,
    pub read: bool,
}

impl ContactMessage {
    pub fn new(name: String, email: String, phone: String, message: String) -> Self {
        Self {
            object_id: None,
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            phone,
            message,
            created_at: mongodb::bson::DateTime::now(),
            status: "pending".to_string(),
            read: false,
        }
    }
}

/// Storage-assigned identity of an inserted document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedId(Bson);

impl InsertedId {
    pub fn new(id: Bson) -> Self {
        Self(id)
    }

    pub fn as_bson(&self) -> &Bson {
        &self.0
    }
}

impl std::fmt::Display for InsertedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Bson::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            Bson::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// Render a stored document as JSON, with an ObjectId `_id` flattened to its
/// hex string.
pub fn document_to_json(mut document: Document) -> serde_json::Value {
    if let Ok(oid) = document.get_object_id("_id") {
        document.insert("_id", oid.to_hex());
    }
    Bson::Document(document).into_relaxed_extjson()
}
