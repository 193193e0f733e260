//! A simulation of single-decree Basic Paxos.
//!
//! Proposers, acceptors and learners agree on one value while an in-process transport
//! reorders, delays and drops their messages. Every delivery runs as its own tokio task, so
//! handlers see arbitrary interleavings.
//!
//! ## How it works
//!
//! A proposer picks a [`types::ProposalId`] higher than any it used before and asks every
//! acceptor to promise it (phase 1). Acceptors promise only ids above anything they already
//! promised and report the last value they accepted. With promises from a majority, the
//! proposer asks the acceptors to accept its value, or the highest value an acceptor already
//! accepted (phase 2). Acceptors that still honor the id vote for it and tell every learner;
//! a learner that sees a majority vote for one id has learned the decided value.
//!
//! The main entry points are [`transport::TransportBuilder`], which registers actors and
//! seals them into a [`transport::Transport`], and [`simulation::Simulation`], which wires a
//! whole instance and starts its proposers.

pub mod acceptor;
pub mod config;
pub mod error;
pub mod events;
pub mod learner;
pub mod messages;
pub mod proposer;
pub mod simulation;
pub mod stats;
pub mod transport;
pub mod types;
pub mod utils;
