use crate::output::OutputFormat;
use clap::Parser;
use kube_count::{kubeconfig::ClientOptions, AggregateOptions, CountConfig, SortOrder};
use std::{path::PathBuf, time::Duration};

const EXAMPLES: &str = "\
Examples:
  # display a table of specified resources count, resources split by comma.
  kubectl count pods,ds,deploy

  # display kube-system cluster count info in yaml format.
  kubectl count -oy -n kube-system rs,ep";

/// Show resources count in the cluster.
#[derive(Parser, Debug)]
#[command(name = "kubectl-count", version, after_help = EXAMPLES)]
pub(crate) struct Args {
    /// Comma-separated resource types. Plural, singular, kind,
    /// short names and `<plural>.<group>` are accepted.
    pub(crate) kinds: String,
    /// If present, resources aggregated by all namespaces
    #[arg(short = 'A', long)]
    pub(crate) all_namespaces: bool,
    /// Sort the counts in ascending or descending order. [asc(a)|desc(d)]
    #[arg(short = 'O', long, default_value_t = SortOrder::Ascending)]
    pub(crate) order: SortOrder,
    /// Output format. [json(j)|table(t)|yaml(y)]
    #[arg(short = 'o', long, default_value_t = OutputFormat::Table)]
    pub(crate) output_format: OutputFormat,
    /// Only count resources in this namespace
    #[arg(short = 'n', long)]
    pub(crate) namespace: Option<String>,
    /// Seconds to wait for every resource type to be listed, 0 waits forever
    #[arg(long, default_value_t = 120)]
    pub(crate) sync_timeout: u64,
    /// Path to the kubeconfig file to use
    #[arg(long)]
    pub(crate) kubeconfig: Option<PathBuf>,
    /// The name of the kubeconfig context to use
    #[arg(long)]
    pub(crate) context: Option<String>,
    /// The name of the kubeconfig cluster to use
    #[arg(long)]
    pub(crate) cluster: Option<String>,
    /// The name of the kubeconfig user to use
    #[arg(long)]
    pub(crate) user: Option<String>,
}

impl Args {
    pub(crate) fn client_options(&self) -> ClientOptions {
        ClientOptions {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.user.clone(),
        }
    }

    pub(crate) fn count_config(&self) -> CountConfig {
        CountConfig {
            namespace: self.namespace.clone(),
            sync_timeout: match self.sync_timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub(crate) fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            order: self.order,
            all_namespaces: self.all_namespaces,
        }
    }
}
