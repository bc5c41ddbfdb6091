//! Generic Cosmetic Rule Engine
//!
//! A small in-process counterpart to the native filter engine the content
//! script talks to. It parses the generic cosmetic rules of a filter list,
//! answers `classIdStylesheet` reports with the hide selectors keyed by
//! those ids and classes, and hands out the randomized hide class.
//!
//! [`Loopback`] wires a [`cf_core::PageSession`] to an engine so the whole
//! pipeline can run without a browser.

pub mod engine;
pub mod error;
pub mod hash;
pub mod index;
pub mod loopback;
pub mod parser;

pub use engine::CosmeticEngine;
pub use error::EngineError;
pub use hash::{hash_token, murmur3_32, randomized_class_name};
pub use index::GenericRuleIndex;
pub use loopback::{Loopback, LoopbackReport};
pub use parser::{parse_cosmetic_list, CosmeticRule, ParseStats, RuleKind, SelectorKey};
