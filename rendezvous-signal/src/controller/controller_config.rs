#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Commands queued from session handles.
    pub command_capacity: usize,
    /// Subscription deliveries queued for the controller loop.
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_capacity: 100,
            event_capacity: 256,
        }
    }
}
