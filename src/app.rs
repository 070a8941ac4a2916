use std::{io::Write, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    client::Connector,
    output::{self, Payload},
    provider::{ForgeHosts, ForgeKind, ProviderConfig, ProviderRequest},
    result::Result,
};

/// Drives one invocation: resolve the forge, fetch, transform, render
pub struct App {
    hosts: ForgeHosts,
    connector: Arc<dyn Connector>,
}

impl App {
    pub fn new(hosts: ForgeHosts, connector: Arc<dyn Connector>) -> Self {
        Self { hosts, connector }
    }

    /// Render the issues of `request.url`, returning what the last output stage produced
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn run(
        &self,
        request: ProviderRequest,
        fallback_auth: Option<&str>,
        stdout: &mut (dyn Write + Send),
    ) -> Result<Payload> {
        let config = ProviderConfig::validate(request, fallback_auth)?;
        let kind = ForgeKind::detect(&config.url, &self.hosts)?;

        let output = config.output.clone();
        let forge = kind.build(config, self.connector.clone());
        let provider = forge.as_provider();

        let session = provider.authenticate().await?;
        let issues = provider.get_issues(&session).await?;
        let issues = provider.transform(issues).await?;

        debug!(issue_count = issues.len(), "Rendering issues");
        output::run(Payload::Records(issues), &output, stdout)
    }
}
