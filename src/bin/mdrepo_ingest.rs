use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use mdrepo_ingest::app::App;
use mdrepo_ingest::atlas::AtlasHttpClient;
use mdrepo_ingest::domain::PdbId;
use mdrepo_ingest::error::IngestError;
use mdrepo_ingest::store::Store;
use mdrepo_ingest::template::DescriptorTemplate;

#[derive(Parser)]
#[command(name = "mdrepo-ingest")]
#[command(about = "Mirror ATLAS molecular-dynamics trajectories into MDRepo-style replica layouts")]
#[command(version, author)]
struct Cli {
    /// ORCID of the submitting author, embedded in every descriptor.
    orcid: String,

    /// Resume the catalog at this PDB id instead of the first row.
    pdb: Option<String>,

    /// Directory the output/ and data/ trees are created under.
    #[arg(long, default_value = ".")]
    root: Utf8PathBuf,

    /// Descriptor template with <<placeholder>> tokens.
    #[arg(long, default_value = "template.toml")]
    template: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(ingest) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(ingest));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    match error {
        IngestError::CatalogMissing(_)
        | IngestError::CatalogEmpty(_)
        | IngestError::TemplateRead(_)
        | IngestError::InvalidPdbId(_) => 2,
        IngestError::AtlasHttp(_) | IngestError::AtlasStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resume_from = cli
        .pdb
        .as_deref()
        .map(str::parse::<PdbId>)
        .transpose()
        .into_diagnostic()?;

    let store = Store::new(&cli.root);
    let atlas = AtlasHttpClient::new().into_diagnostic()?;
    let template = DescriptorTemplate::load(&cli.template).into_diagnostic()?;

    let app = App::new(store, atlas, template);
    let report = app.run(&cli.orcid, resume_from.as_ref()).into_diagnostic()?;

    println!(
        "done: {} acquired, {} skipped, {} failed",
        report.acquired,
        report.skipped,
        report.failed.len()
    );
    for pdb in &report.failed {
        println!("  failed: {pdb}");
    }
    Ok(())
}
