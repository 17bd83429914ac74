//! Building a client from kubeconfig

use anyhow::Context as _;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use std::path::PathBuf;

/// Selects which kubeconfig and which of its entries to use
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Path to a kubeconfig file, instead of `$KUBECONFIG` or `~/.kube/config`
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
}

impl ClientOptions {
    fn kubeconfig_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.user.clone(),
        }
    }

    fn is_default(&self) -> bool {
        self.kubeconfig.is_none()
            && self.context.is_none()
            && self.cluster.is_none()
            && self.user.is_none()
    }
}

/// Loads client configuration. Without explicit options the usual inference
/// applies (kubeconfig first, in-cluster environment second).
pub async fn load_config(options: &ClientOptions) -> anyhow::Result<Config> {
    if options.is_default() {
        return Config::infer()
            .await
            .context("failed to infer kubernetes configuration");
    }
    let kc_options = options.kubeconfig_options();
    match &options.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &kc_options)
                .await
                .context("failed to load kubeconfig")
        }
        None => Config::from_kubeconfig(&kc_options)
            .await
            .context("failed to load kubeconfig"),
    }
}

pub async fn make_client(options: &ClientOptions) -> anyhow::Result<kube::Client> {
    let config = load_config(options).await?;
    tracing::debug!(cluster_url = %config.cluster_url, "connecting to cluster");
    kube::Client::try_from(config).context("failed to create kubernetes client")
}
