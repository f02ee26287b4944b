//! REST API client module for the anganwadi backend.
//!
//! This module provides the `ApiClient` for fetching attendance rosters,
//! registered children and vaccination records, and for persisting
//! attendance marks.
//!
//! Every request carries a bearer token issued by the external session
//! service; token lifecycle is not handled here.

pub mod client;
pub mod error;

pub use client::{ApiClient, BulkMarkRequest, HistoryQuery, MarkRequest, ACTIVE_STATUS};
pub use error::{ApiError, ApiResult};
