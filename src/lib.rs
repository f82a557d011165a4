//! # Careline (Patient Communication Portal)
//!
//! `careline` is the backend for a healthcare communication portal. It owns
//! patient records, reusable message templates, appointment scheduling, and
//! outbound SMS/voice notifications delivered through a Twilio-shaped
//! telephony provider.
//!
//! ## Authentication
//!
//! Staff accounts are provisioned out-of-band and log in with username and
//! password (argon2id hashes, never plaintext comparison). A successful login
//! mints a signed, expiring bearer credential carrying the subject id, role,
//! and issued-at timestamp. Validity is re-derived on every request; there is
//! no server-side session store.
//!
//! ## Message lifecycle
//!
//! Outbound messages are persisted as `communications` rows. A dispatch
//! creates the row in `PENDING`, invokes the transport with a bounded
//! timeout, and records the immediate outcome (`SENT` or `FAILED`). The
//! provider may later post an asynchronous status callback which moves the
//! row towards `DELIVERED`, `FAILED`, or `CANCELLED`. Terminal statuses are
//! final: stale or duplicate callbacks are no-ops.

pub mod api;
pub mod cli;
pub mod messaging;

pub use api::GIT_COMMIT_HASH;
