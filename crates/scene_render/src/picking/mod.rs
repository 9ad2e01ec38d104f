//! Ray picking
//!
//! Resolves which scene node (and which of its surfaces) lies under a
//! world-space ray. See [`ray_tester`] for the two-phase algorithm.

pub mod ray_tester;

pub use ray_tester::{RayCollisionTester, RayIntersection};
