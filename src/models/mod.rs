pub mod url;

pub use url::{hostname_of, HostnameCount, UrlRecord, UrlRequest};
