//! Orchestration: the control task, its commands and the state it owns.
//!
//! # Architecture
//!
//! ```text
//! front end ──Command (mpsc)──▶ Orchestrator::run()  ← one tokio task
//!                                   │
//!                                   ├─ detect / translate / speak / capture workers
//!                                   │     └─ results + StatusUpdates back over channels
//!                                   │
//!                                   └─ ApplicationState (owned, never shared)
//!                                         │
//! front end ◀──ViewEvent (mpsc)──────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use voice_translator::config::AppConfig;
//! use voice_translator::pipeline::{Command, Orchestrator, Services};
//! use voice_translator::status::StatusReporter;
//!
//! # async fn example(make_services: impl FnOnce(StatusReporter) -> Services) {
//! let config = AppConfig::default();
//! let (status, status_rx) = StatusReporter::channel();
//! let services = make_services(status);
//!
//! let (event_tx, mut event_rx) = mpsc::unbounded_channel();
//! let (command_tx, command_rx) = mpsc::channel(32);
//! let orchestrator = Orchestrator::new(services, &config, status_rx, event_tx);
//! tokio::spawn(orchestrator.run(command_rx));
//!
//! command_tx.send(Command::EditSource("hello".into())).await.unwrap();
//! command_tx.send(Command::Translate).await.unwrap();
//! while let Some(event) = event_rx.recv().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{Command, Orchestrator, Pane, Services, ViewEvent};
pub use state::{Activity, ApplicationState, SelectionState};
