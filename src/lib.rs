// Library root
// -----------
// The binary (`main.rs`) only parses arguments, reads the credential and
// reports the outcome; everything else lives here.
//
// Module responsibilities:
// - `config`: fixed endpoints, timeouts and the credential.
// - `prompt`: the task table and content composition.
// - `image`: reading and checking the local image.
// - `api`: asset registration/upload and the inference call.
// - `archive`: saving and unpacking the zipped response.
// - `pipeline`: argument handling and the ordered run.
// - `ui`: usage text, spinners and the final listing.
pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod prompt;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use error::{FlorenceError, Result};
