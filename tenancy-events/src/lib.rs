//! # Tenancy Events
//!
//! Typed events for organization, membership, team and invitation changes,
//! plus a publish/subscribe bus to carry them.
//!
//! ## Overview
//!
//! The tenancy-events crate handles:
//! - **Event Envelope**: [`Event`] with routing, tracing and schema metadata
//! - **Typed Payloads**: one struct per state change, wrapped by [`TenancyEvent`]
//! - **Event Bus**: publish/subscribe messaging with topic patterns
//! - **Event Handlers**: async event processing
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust,no_run
//! use tenancy_events::{EventBus, MemberAdded, MemoryEventBus, TenancyEvent};
//! use uuid::Uuid;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     let added = TenancyEvent::MemberAdded(MemberAdded {
//!         organization_id: Uuid::now_v7(),
//!         user_id: Uuid::now_v7(),
//!         role: "member".to_string(),
//!         added_by: None,
//!     });
//!
//!     bus.publish(added.to_event().unwrap()).await.unwrap();
//! }
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust,no_run
//! use tenancy_events::{EventBus, MemoryEventBus};
//!
//! async fn subscribe_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     // Every membership change
//!     let mut sub = bus.subscribe("tenancy.member.*").await.unwrap();
//!
//!     while let Ok(event) = sub.recv().await {
//!         println!("Received: {}", event.event_type);
//!     }
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `tenancy.{category}.{verb}`:
//! - `tenancy.team.created` - Specific event
//! - `tenancy.invitation.*` - All invitation events
//! - `tenancy.#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    topic_matches, EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler,
    MemoryEventBus, Subscription,
};
pub use types::{
    Event, EventCategory, InvitationAccepted, InvitationIssued, InvitationKind, MemberAdded,
    MemberLeft, MemberRemoved, MemberRoleChanged, OrganizationCreated, OrganizationDeleted,
    OwnershipTransferred, TeamCreated, TeamDeleted, TeamMemberAdded, TeamMemberRemoved,
    TenancyEvent,
};
