mod generate_id;
mod slug;

pub use generate_id::generate_id;
pub use slug::slugify;
