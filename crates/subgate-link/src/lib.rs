//! Share-link codec for subgate.
//!
//! This crate decodes proxy share links (`ss://`, `socks5://`, `vmess://`)
//! into a normalized [`ProxyDescriptor`] and injects display remarks into
//! share links without corrupting scheme-specific encodings.
//!
//! # Example
//!
//! ```
//! use subgate_link::{decode, ProxyDescriptor};
//!
//! let desc = decode("ss://YWVzLTI1Ni1nY206cHcx@1.2.3.4:8388").unwrap();
//! match desc {
//!     ProxyDescriptor::Ss { server, port, .. } => {
//!         assert_eq!(server, "1.2.3.4");
//!         assert_eq!(port, 8388);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

mod decode;
mod descriptor;
mod error;
mod remark;

pub use decode::decode;
pub use descriptor::{ProxyDescriptor, TlsOptions, Transport};
pub use error::DecodeError;
pub use remark::inject_remark;
