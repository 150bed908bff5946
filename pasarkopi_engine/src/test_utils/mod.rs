//! Deterministic fakes and environment setup for tests.
//!
//! Everything here is behaviour-scripted rather than mocked: the in-memory order service really stores orders and
//! the scripted widget really serializes sessions, so tests exercise the same code paths production does.

pub mod fakes;
pub mod prepare_env;
