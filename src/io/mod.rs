//! Object storage access.

mod object;
mod s3_reader;

pub use object::{ObjectLocation, ObjectReader};
pub use s3_reader::{create_s3_client, S3ObjectReader};
