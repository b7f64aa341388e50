pub mod base64;
pub mod utf8;

pub use self::base64::{decode, encode, DecodeBase64Error};
pub use self::utf8::DecodeUtf8Error;
