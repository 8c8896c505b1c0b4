//! Simulation clock, tick cycle and orchestration for the Habitat simulation.
//!
//! This crate owns the world-level loop: it advances time, rotates spawn
//! points between day and night, updates every agent, applies the effects
//! they report, feeds the habitat distribution, and consults the remote
//! reasoning seam.
//!
//! # Modules
//!
//! - [`clock`] -- Fixed-step clock with the day/night cycle.
//! - [`config`] -- Configuration loading from `habitat-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Stop requests, pacing and run bounds shared with the host.
//! - [`distribution`] -- Habitat food distribution in fitness order.
//! - [`map`] -- Global and per-agent map projection.
//! - [`metrics`] -- Run counters and the end-of-run report.
//! - [`reasoning`] -- [`ReasoningSource`] trait, [`StubReasoning`] and
//!   snapshot assembly.
//! - [`runner`] -- The bounded async run loop.
//! - [`tick`] -- Simulation state and the per-tick cycle.
//!
//! [`ReasoningSource`]: reasoning::ReasoningSource
//! [`StubReasoning`]: reasoning::StubReasoning

pub mod clock;
pub mod config;
pub mod control;
pub mod distribution;
pub mod map;
pub mod metrics;
pub mod reasoning;
pub mod runner;
pub mod tick;
