//! Client for the banana-leaf disease inference service.
//!
//! The service is an external collaborator with two endpoints: a multipart
//! still-image prediction endpoint and a JSON live-frame endpoint. Both
//! return a `predictions` array; the live endpoint also reports its
//! processing time.
//!
//! `InferenceService` is the seam the detector depends on, so loops can be
//! exercised against in-process fakes.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientConfig, InferenceClient, InferenceService};
pub use error::{ClientError, ClientResult};
pub use types::{ImageUpload, LiveFrame, StillPrediction};
