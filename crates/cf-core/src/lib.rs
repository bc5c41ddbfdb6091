//! Cosmetic Filter Core Library
//!
//! This crate implements the page-context half of generic cosmetic filtering:
//! it learns which element ids and classes exist on a page, reports them to
//! the native filter engine, and hides the elements matched by the selectors
//! the engine sends back.
//!
//! # Architecture
//!
//! All state for one page lives in a [`PageSession`]. The session is driven
//! from the outside: the host delivers inbound messages, inserted nodes and
//! timer expiries, and the session answers with outbound messages and the
//! next timer it wants. Matching work is spread over time-sliced pumps so a
//! burst of new selectors never blocks the page.
//!
//! # Modules
//!
//! - `dom`: DOM abstraction plus an in-memory implementation with a selector matcher
//! - `harvest`: Attribute index that de-duplicates element ids and classes
//! - `party`: First-party / third-party subtree classifier
//! - `domain`: Memoized registrable-domain parsing
//! - `url`: Host extraction without allocations
//! - `queue`: Staged selector hide queue
//! - `session`: Page session tying everything together
//! - `message`: Wire messages exchanged with the native engine
//! - `scheduler`: Virtual clock for driving pumps without real timers
//! - `config`: Tunables
//! - `error`: Error types

pub mod config;
pub mod dom;
pub mod domain;
pub mod error;
pub mod harvest;
pub mod message;
pub mod party;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod url;

// Re-export commonly used types
pub use config::FilterConfig;
pub use dom::{Dom, NodeSet};
pub use domain::{DomainParser, ParsedDomain};
pub use error::{ConfigError, DomError, MessageError, SessionError};
pub use harvest::{AttributeIndex, IdentifierBatch};
pub use message::{InboundMessage, OutboundMessage};
pub use party::{PartyClassifier, PartySignals};
pub use queue::{HideAction, HideQueue, PumpOutcome, QueueStats};
pub use scheduler::VirtualClock;
pub use session::{Dispatch, MessageSink, PageSession, SessionReport};
