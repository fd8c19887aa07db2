pub mod clock;
pub mod collection;
pub mod decode;
pub mod error;
pub mod hash;
pub mod ids;
pub mod model;
pub mod presets;
pub mod schema;

pub use clock::{Clock, FixedClock, SystemClock};
pub use collection::{ProjectCollection, STORE_VERSION};
pub use decode::Decode;
pub use error::{CoreError, CorruptStoreError, DecodeError};
pub use hash::{ContentHasher, HashAlgo};
pub use ids::*;
pub use model::*;
