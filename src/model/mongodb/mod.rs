mod bson;
mod collection;
mod errors;

pub use bson::Id;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{duplicate_key_index, is_duplicate_key_error, DUPLICATE_KEY};
