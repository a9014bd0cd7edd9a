//! Layered state machines
//!
//! An entity runs several independent layers (vitals, movement, attacks), each a
//! [`StateMachine`] over its own state enum. States are plain values; the
//! context type `C` carries whatever the layer needs to read or mutate.
//!
//! Transitions are synchronous: a state returned from `update`/`collide` is
//! entered before the call returns. A suspended layer keeps its current state
//! but ignores updates, collisions and transitions.
//!
//! The initial state is never entered. Instead its `setup` runs once, the first
//! time the layer is updated or collides while active.

/// Behaviour of one state within a layer
pub trait State<C>: Sized {
    /// One-off initialisation of the starting state
    fn setup(&mut self, _ctx: &mut C) {}

    /// Called on every transition into this state
    fn enter(&mut self, _ctx: &mut C) {}

    /// Called every tick while the layer is active; returns the next state
    fn update(&mut self, _ctx: &mut C) -> Option<Self> {
        None
    }

    /// Called when the owner collides with something
    fn collide(&mut self, _ctx: &mut C) -> Option<Self> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateMachine<S> {
    current: S,
    active: bool,
    set_up: bool,
}

impl<S> StateMachine<S> {
    /// Start in `initial` without running its `enter`
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            active: true,
            set_up: false,
        }
    }

    pub fn current(&self) -> &S {
        &self.current
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Switch to `next` and enter it. No effect while suspended.
    pub fn set_state<C>(&mut self, next: S, ctx: &mut C) -> bool
    where
        S: State<C>,
    {
        if !self.active {
            return false;
        }
        self.set_up = true;
        self.current = next;
        self.current.enter(ctx);
        true
    }

    pub fn update<C>(&mut self, ctx: &mut C)
    where
        S: State<C>,
    {
        if !self.active {
            return;
        }
        self.ensure_setup(ctx);
        if let Some(next) = self.current.update(ctx) {
            self.set_state(next, ctx);
        }
    }

    pub fn collide<C>(&mut self, ctx: &mut C)
    where
        S: State<C>,
    {
        if !self.active {
            return;
        }
        self.ensure_setup(ctx);
        if let Some(next) = self.current.collide(ctx) {
            self.set_state(next, ctx);
        }
    }

    fn ensure_setup<C>(&mut self, ctx: &mut C)
    where
        S: State<C>,
    {
        if !self.set_up {
            self.set_up = true;
            self.current.setup(ctx);
        }
    }
}
