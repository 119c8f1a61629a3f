use failure::{Context, Fail};

#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum NluError {
    #[fail(display = "Model not found: '{}'", _0)]
    ModelNotFound(String),
    #[fail(
        display = "Unsupported model version {}, supported versions are {} to {}",
        _0, _1, _2
    )]
    UnsupportedSchemaVersion(String, &'static str, &'static str),
    #[fail(display = "Corrupt model: {}", _0)]
    CorruptModel(String),
    #[fail(display = "Invalid nlu engine archive: {}", _0)]
    InvalidArchive(String),
    #[fail(display = "Unknown intent: '{}'", _0)]
    UnknownIntent(String),
    #[fail(display = "Unknown slot '{}' for intent '{}'", _1, _0)]
    UnknownSlot(String, String),
    #[fail(display = "An intents whitelist and an intents blacklist cannot be used together")]
    InvalidFilterCombination,
    #[fail(display = "Internal error: {}", _0)]
    InternalError(String),
}

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;

pub trait ErrorExt {
    /// Returns the `NluError` carried by this error, either directly or as the context of a
    /// lower level error
    fn nlu_error(&self) -> Option<&NluError>;

    /// Renders the whole chain of causes, one per line
    fn pretty(&self) -> String;
}

impl ErrorExt for failure::Error {
    fn nlu_error(&self) -> Option<&NluError> {
        self.iter_chain().find_map(|cause| {
            cause
                .downcast_ref::<NluError>()
                .or_else(|| cause.downcast_ref::<Context<NluError>>().map(|c| c.get_context()))
        })
    }

    fn pretty(&self) -> String {
        let mut result = format!("{}", self);
        for cause in self.iter_causes() {
            result.push_str(&format!("\n  caused by: {}", cause));
        }
        result
    }
}
