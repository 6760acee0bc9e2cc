//! Message bus integration
//!
//! ## Architecture
//!
//! ```text
//! Coordinator ──► EventPublisher (port) ──► KafkaEventPublisher ──► bus
//!                                                                    │
//! CorrelationBroker ◄── consumer loops (one group id per kind) ◄─────┘
//! TableStatusCache  ◄──┘
//! MenuProjection    ◄──┘
//! ```
//!
//! All payloads are JSON with a `type` header carrying the logical
//! event name; request/response messages are keyed by correlation id,
//! lifecycle events by reservation id.

pub mod consumers;
pub mod kafka;
pub mod messages;
pub mod publisher;
pub mod topics;

pub use publisher::{EventPublisher, OutboundEvent, SharedEventPublisher};
