//! DOM-backed primitives used when running inside a browser page.

pub mod dom;
