//! External delivery channels for creative notifications.

pub mod webhook;
