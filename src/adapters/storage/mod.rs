pub mod avatar;

pub use avatar::{ObjectStorageAvatarStorage, avatar_path};
