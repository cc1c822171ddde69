#[derive(thiserror::Error, Debug)]
pub enum EnergyError {
    #[error("authentication failed: {0}")]
    Auth(#[source] reqwest::Error),
    #[error("upstream query failed: {0}")]
    Upstream(#[source] reqwest::Error),
    #[error("account has no systems registered")]
    NoSystems,
    #[error("writer `{writer}` failed: {source}")]
    Writer {
        writer: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EnergyError {
    pub fn writer(writer: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Writer {
            writer: writer.into(),
            source: source.into(),
        }
    }
}
