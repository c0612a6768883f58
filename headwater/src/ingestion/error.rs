#[derive(Debug)]
pub enum IngestionError {
    HeadTick,
    GapScan,
    Deadline,
    TaskJoin,
}

impl error_stack::Context for IngestionError {}

impl std::fmt::Display for IngestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestionError::HeadTick => write!(f, "head tick failed"),
            IngestionError::GapScan => write!(f, "gap scan failed"),
            IngestionError::Deadline => write!(f, "work unit deadline expired"),
            IngestionError::TaskJoin => write!(f, "ingestion task panicked"),
        }
    }
}
