#[derive(Debug)]
pub enum HeadwaterError {
    Configuration,
    Fatal,
}

impl error_stack::Context for HeadwaterError {}

impl std::fmt::Display for HeadwaterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadwaterError::Configuration => write!(f, "configuration error"),
            HeadwaterError::Fatal => write!(f, "headwater error"),
        }
    }
}
