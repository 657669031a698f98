//! # Crop Advisor
//!
//! Crop recommendations from soil and weather measurements, served over a
//! CLI and a JSON HTTP API with farm, soil report, and feedback records.
//!
//! The model, assessments, and FAQ knowledge live in `crop_advisor_core`;
//! this crate wires them to configuration, SQLite, and axum.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Labelled CSV │──▶│ Random forest│──▶│ model.json + │
//! │   corpus     │   │   training   │   │ encoder.json │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                 ┌──────────┐           ┌──────────┐   ┌────────┐
//!                 │   CLI    │           │   HTTP   │──▶│ SQLite │
//!                 │  (crop)  │           │  (axum)  │   │ records│
//!                 └──────────┘           └──────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crop init                     # create database
//! crop train                    # fit and save the model
//! crop predict --n 90 --p 42 --k 43 --temperature 21 --humidity 82 --ph 6.5 --rainfall 203
//! crop ask "how do I grow rice?"
//! crop serve                    # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite record store |
//! | [`logging`] | Tracing subscriber setup |
//! | [`train_cmd`] | `crop train` |
//! | [`predict_cmd`] | `crop predict` |
//! | [`server`] | HTTP API |

pub mod config;
pub mod db;
pub mod logging;
pub mod migrate;
pub mod predict_cmd;
pub mod server;
pub mod sqlite_store;
pub mod train_cmd;
