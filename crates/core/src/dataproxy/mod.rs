//! Flat (data-proxy) bucket and object API

mod bucket;
mod client;
mod object;

pub use bucket::{Bucket, BucketTarget, LIST_LIMIT};
pub use client::DataproxyClient;
pub use object::DataproxyObject;
