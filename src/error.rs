use miette::Diagnostic;
use thiserror::Error;

use crate::{config::ConfigError, service::ServiceError};

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Failed to find any resources matching the given tag key/values: {tags}")]
    #[diagnostic(help("make sure the instances to assess carry these tags and run the Inspector agent"))]
    NoMatchingResources { tags: String },

    #[error("{operation} failed")]
    TransientService {
        operation: &'static str,
        #[source]
        source: ServiceError,
    },

    #[error("assessment interrupted before it settled")]
    Interrupted,

    #[error("can't write findings report")]
    Output(#[source] std::io::Error),
}

impl Error {
    pub fn service(operation: &'static str) -> impl FnOnce(ServiceError) -> Error {
        move |source| Error::TransientService { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
