//! Kubecost REST API client and data model

pub mod client;
pub mod types;

pub use client::{KubecostClient, KubecostError};
