//! Command path: MQTT message in, locker confirmation out.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Command path                           │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────┐   ┌────────┐ │
//! │  │ MQTT task │──▶│ channels │──▶│  Engine   │──▶│  App   │ │
//! │  │ (callback)│   │ (queue)  │   │ (+codec)  │   │Service │ │
//! │  └───────────┘   └──────────┘   └───────────┘   └────────┘ │
//! │        ▲                                            │      │
//! │        └──────────── codec ◀── EventSink ◀──────────┘      │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod codec;
pub mod engine;
