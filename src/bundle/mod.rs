//! Assemble the shared output tree: merge project outputs and write the host metadata.

pub mod landing;
pub mod merge;
pub mod routes;
