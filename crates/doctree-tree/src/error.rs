#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Mandatory mappings must form a forest; `cycle` starts and ends on the
    /// same entity type.
    #[error("configuration error: mandatory mappings form a cycle: {}", cycle.join(" -> "))]
    MappingCycle { cycle: Vec<String> },
}
