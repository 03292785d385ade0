//! The library code for the `static-fire` blog generator. A build is a
//! single pass over the site root:
//!
//! 1. Loading the `config` file ([`crate::config`])
//! 2. Asking version control which articles exist and when they were
//!    created and last updated ([`crate::history`])
//! 3. Reading each article's header and converting its markdown body
//!    ([`crate::article`], [`crate::markdown`])
//! 4. Rendering the article pages, home page, archive, feed and static
//!    pages to disk ([`crate::write`], [`crate::feed`])
//! 5. Announcing articles first committed in `HEAD` ([`crate::publish`])
//!
//! [`build::build_site`] runs these steps in order. Templates are Go-style
//! templates (via `gtmpl`) and receive the site-wide [`render::SiteContext`]
//! as `.site`.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod build;
pub mod config;
pub mod feed;
pub mod history;
mod htmlrenderer;
pub mod markdown;
pub mod publish;
pub mod render;
pub mod util;
pub mod value;
pub mod write;
