mod schema;
mod store;

pub use self::schema::ensure_schema;
pub use self::store::{BlockStore, StoreError};
