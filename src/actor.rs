// Who is making the current request

/// Read-only access to the acting user.
pub trait ActorContext: Send + Sync {
    fn current_actor_name(&self) -> &str;
}

/// Fixed actor, for tools and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticActor(pub String);

impl StaticActor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl ActorContext for StaticActor {
    fn current_actor_name(&self) -> &str {
        &self.0
    }
}
