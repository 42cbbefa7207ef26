//! Step definitions matching scenario text to [`S3World`](crate::world::S3World)
//! operations.

mod multipart;
mod object;
