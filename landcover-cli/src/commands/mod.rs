pub mod batch;
pub mod decode;
pub mod encode;
pub mod terrain;

use anyhow::{Context, Result};
use landcover::{TerrainResolver, TerrainResolverBuilder};

/// Connection flags shared by the commands that query the MapServer.
pub struct RemoteArgs {
    pub service_url: Option<String>,
    pub timeout: u64,
    pub max_retries: u32,
}

impl RemoteArgs {
    /// Build a resolver from the flags, falling back to the environment.
    pub fn resolver(&self, code_length: usize, concurrency: usize) -> Result<TerrainResolver> {
        let mut builder = TerrainResolverBuilder::from_env()
            .timeout(self.timeout)
            .max_retries(self.max_retries)
            .code_length(code_length)
            .max_concurrency(concurrency);

        if let Some(url) = &self.service_url {
            builder = builder.service_url(url.as_str());
        }

        builder.build().context("Failed to create terrain resolver")
    }
}
