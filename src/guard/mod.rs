//! Route guarding
//!
//! Two independent layers. [`EdgeGuard`] runs before a page is served and
//! only checks that an access token is present. [`PageGuard`] runs inside the
//! app and waits for the session to resolve before letting content render.
//! Both fail toward the login page.

mod edge;
mod page;

pub use edge::{EdgeDecision, EdgeGuard};
pub use page::{PageDecision, PageGuard};
