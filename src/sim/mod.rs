//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - One seeded RNG, owned by [`GameState`]
//! - Stable iteration order (object list order, grid insertion order)
//! - No rendering, audio mixing or platform dependencies

pub mod boundary;
pub mod circle;
pub mod creature;
pub mod entity;
pub mod frame;
pub mod graph;
pub mod grid;
pub mod levelgen;
pub mod object;
pub mod objects;
pub mod pathfind;
pub mod perlin;
pub mod player;
pub mod props;
pub mod state;
pub mod state_machine;
pub mod tick;
pub mod verlet;

pub use boundary::{Boundary, BoundaryHandler, Rect};
pub use circle::{Circle, Positioned};
pub use frame::{Frame, Transition};
pub use graph::{Graph, GraphNode};
pub use grid::PositionGrid;
pub use levelgen::{Level, LevelGenerator, LevelGeneratorRoom};
pub use object::{Actor, AnimationKey, ObjectId, ObjectKind, WorldObject};
pub use objects::ObjectHandler;
pub use pathfind::AStarPathfinder;
pub use state::{GameEvent, GamePhase, GameState};
pub use state_machine::{State, StateMachine};
pub use tick::{TickInput, tick};
pub use verlet::{PhysicsConfig, VerletBody};
