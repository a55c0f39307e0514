//! # SortiMate Hub
//!
//! Backend service driving the recycling-session protocol: a user claims a
//! smart bin by scanning its QR code, the bin-side sensor pushes an
//! identification of the deposited item, the user confirms or corrects it,
//! and confirmed items are credited to the user's stats and family
//! leaderboard.

pub mod alerts;
pub mod api;
pub mod error;
pub mod feed;
pub mod groups;
pub mod identity;
pub mod ledger;
pub mod qr;
pub mod registry;
pub mod session;

pub use error::{Error, Result};
