use clap::{builder::RangedU64ValueParser, Args, Parser};
use pnbundle_bundle::Bundle;
use pnbundle_fs::IoGate;
use pnbundle_lockfile::FilterPolicy;
use pnbundle_npmrc::Npmrc;
use std::path::PathBuf;

/// Bundle a pnpm workspace package and its dependency closure into one tarball.
#[derive(Debug, Parser)]
#[clap(name = "pnbundle")]
#[clap(bin_name = "pnbundle")]
#[clap(version)]
#[clap(about = "Bundle a pnpm workspace package and its dependencies into one tarball")]
pub struct CliArgs {
    /// Directory of the workspace.
    #[clap(default_value = ".")]
    pub workspace_dir: PathBuf,

    /// Id of the workspace package to bundle, relative to the lockfile directory.
    #[clap(default_value = ".")]
    pub importer_id: String,

    /// Path of the archive to write.
    #[clap(short, long, default_value = "out.tar")]
    pub output: PathBuf,

    #[clap(flatten)]
    pub dependency_options: DependencyOptions,

    /// Maximum number of filesystem operations in flight.
    #[clap(
        long,
        default_value_t = IoGate::DEFAULT_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
    )]
    pub io_concurrency: usize,
}

#[derive(Debug, Args)]
pub struct DependencyOptions {
    /// Also bundle devDependencies.
    #[clap(long)]
    pub dev: bool,
    /// Leave optionalDependencies out.
    #[clap(long)]
    pub no_optional: bool,
}

impl DependencyOptions {
    /// Which dependencies end up in the bundle.
    pub fn filter_policy(&self) -> FilterPolicy {
        let &DependencyOptions { dev, no_optional } = self;
        FilterPolicy { include_dev: dev, include_optional: !no_optional, ..FilterPolicy::default() }
    }
}

impl CliArgs {
    /// Execute the command.
    pub async fn run(self) -> miette::Result<()> {
        let CliArgs { workspace_dir, importer_id, output, dependency_options, io_concurrency } =
            self;
        let config = Npmrc::load(&workspace_dir);

        let report = Bundle {
            config: &config,
            workspace_dir: &workspace_dir,
            target_importer_id: &importer_id,
            output: &output,
            policy: dependency_options.filter_policy(),
            io_concurrency,
        }
        .run()
        .await
        .map_err(|error| {
            let kind = error.kind();
            miette::Report::new(error)
                .wrap_err(format!("Failed to bundle {importer_id:?} ({kind} error)"))
        })?;

        tracing::info!(target: "pnbundle::cli", ?output, ?report, "Done");
        Ok(())
    }
}
