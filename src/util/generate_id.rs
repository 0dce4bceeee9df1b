use uuid::Uuid;

/// A fresh opaque record id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
